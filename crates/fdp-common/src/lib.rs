//! FDP Common Library
//!
//! Shared error handling, logging, and checksum utilities for the FDP
//! workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the `FdpError` taxonomy shared by all pipeline stages
//! - **Logging**: tracing subscriber setup driven by `LogConfig`
//! - **Checksums**: file integrity helpers used when uploading artifacts
//!
//! # Example
//!
//! ```no_run
//! use fdp_common::{Result, checksum};
//!
//! fn verify(path: &str) -> Result<()> {
//!     let digest = checksum::sha256_file(path)?;
//!     println!("sha256: {}", digest);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{FdpError, Result};
