//! # ECGAI Common Library
//!
//! Shared code for the ECGAI dataset services:
//! - Error types
//! - Bootstrap configuration loading (TOML)
//! - Data folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
