//! Authentication module for the MESA SDK
//!
//! This module provides the access/refresh token lifecycle:
//! - Token validity and expiry-buffer predicates
//! - Single-flight refresh with bounded retry against the backend
//! - Proactive pre-expiry renewal scheduling
//! - Persistent token storage across process restarts
//! - Terminal session-expiration notification

pub mod manager;
pub mod token_store;
pub mod types;

// Re-export commonly used types and functions
pub use manager::TokenManager;
pub use token_store::TokenStore;
pub use types::{
    decode_access_token_claims, AuthError, AuthResult, TokenClaims, TokenConfig, TokenPair,
    TokenResponse,
};
