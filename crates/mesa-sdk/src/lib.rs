//! MESA SDK
//!
//! Rust client for the MESA (Medical Expert System Assistant) backend:
//! a typed HTTP client for the expert-system and chat endpoints, plus the
//! authentication token lifecycle (automatic refresh with single-flight
//! de-duplication, proactive pre-expiry renewal, and persistent storage).
//!
//! ```rust,no_run
//! use mesa_sdk::ClientBuilder;
//!
//! # async fn example() -> mesa_sdk::Result<()> {
//! let client = ClientBuilder::default()
//!     .base_url("https://mesa.example.org/api")
//!     .build_with_stored_auth()
//!     .await?;
//!
//! let info = client.api_info().await?;
//! println!("{} {}", info.name, info.version);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod routes;
pub mod types;

pub use auth::{
    decode_access_token_claims, AuthError, AuthResult, TokenClaims, TokenConfig, TokenManager,
    TokenPair, TokenResponse, TokenStore,
};
pub use client::{ClientBuilder, MesaClient, DEFAULT_TIMEOUT_SECS};
pub use error::{ApiError, Result};
pub use types::*;
