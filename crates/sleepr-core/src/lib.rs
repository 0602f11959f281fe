//! # sleepr-core
//!
//! Core crate for Sleepr. Contains the document base contract, the
//! store-client boundary, configuration schemas, typed identifiers,
//! filter/update expressions, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Sleepr crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
