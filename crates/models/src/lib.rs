pub mod errors;
pub mod db;
pub mod storage_config;
pub mod category;
pub mod folder;
pub mod file_metadata;
pub mod usage_statistic;

#[cfg(test)]
mod tests;
