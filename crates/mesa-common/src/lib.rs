//! Shared building blocks for the MESA client SDK
//!
//! This crate holds the pieces that are not specific to any single API
//! surface: backend constants and the logging initialization used by host
//! applications and tests.

pub mod api_constants;
pub mod logging;

pub use api_constants::{DATA_DIR_NAME, DEFAULT_API_URL, TOKEN_STORE_FILE};
