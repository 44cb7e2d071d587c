//! Cross-cutting helpers shared by the CDN binaries and crates.

pub mod utils;
pub mod env;
