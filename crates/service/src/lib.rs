//! Service layer for the CDN file-storage engine.
//! - Resolves logical CDN URLs to physical files and back.
//! - Wraps physical file mutations in access checks and bounded retries.
//! - Keeps metadata and usage bookkeeping best-effort behind a repository trait.

pub mod runtime;
pub mod cdn;
#[cfg(all(test, feature = "seaorm"))]
pub mod test_support;

pub use cdn::{CdnError, CdnService};
