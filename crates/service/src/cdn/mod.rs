//! CDN file storage: configuration, path resolution, retried file operations,
//! resolution cache and the upload/delete/rename orchestration on top of them.
//!
//! Leaves first: [`cache`] → [`resolver`] → [`executor`] → [`config_manager`] →
//! [`CdnService`] (split over `service.rs` and `files.rs`).

pub mod errors;
pub mod domain;
pub mod clock;
pub mod fs;
pub mod cache;
pub mod naming;
pub mod resolver;
pub mod retry;
pub mod executor;
pub mod repository;
pub mod config_manager;
mod service;
mod files;
#[cfg(feature = "seaorm")]
pub mod repo;
#[cfg(test)]
pub(crate) mod test_support;

pub use errors::CdnError;
pub use service::CdnService;
pub use files::UploadRequest;
