pub mod seaorm;

pub use seaorm::SeaOrmCdnRepository;
