//! Authentication-related types and data structures
//!
//! This module defines all the types used throughout the auth module
//! including configuration, the token record, and error types.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use etcetera::{choose_base_strategy, BaseStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Token lifecycle configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Window before access expiry in which a refresh is triggered proactively
    pub refresh_buffer: Duration,
    /// Maximum number of refresh attempts before the session is declared expired
    pub max_refresh_retries: u32,
    /// Fixed backoff between failed refresh attempts
    pub retry_delay: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            refresh_buffer: Duration::from_secs(5 * 60),
            max_refresh_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Token pair as delivered by the login and refresh endpoints.
///
/// The backend sends both expiries as decimal strings of epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token for API requests
    pub access: String,
    /// Refresh token used to mint a new access token
    pub refresh: String,
    /// Access token expiry, epoch seconds as a decimal string
    pub access_expiry: String,
    /// Refresh token expiry, epoch seconds as a decimal string
    pub refresh_expiry: String,
}

/// Request body of the refresh endpoint
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// A validated access/refresh token pair with absolute expiries.
///
/// A pair only exists in the accepted state: both token strings and both
/// expiries are always present together. The empty record is `Option::None`
/// at the manager level, never a half-filled pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    /// Bearer credential for API calls
    pub access: String,
    /// Credential used to mint a new access token
    pub refresh: String,
    /// Access token expiry as epoch seconds
    pub access_expiry: u64,
    /// Refresh token expiry as epoch seconds
    pub refresh_expiry: u64,
}

impl TokenPair {
    /// Validate and accept a wire token response.
    ///
    /// Rejects pairs whose expiries cannot be parsed or are already in the
    /// past. An expired pair is never stored.
    pub fn from_response(response: &TokenResponse) -> AuthResult<Self> {
        let access_expiry = parse_epoch(&response.access_expiry)?;
        let refresh_expiry = parse_epoch(&response.refresh_expiry)?;

        let now = now_epoch();
        if access_expiry <= now || refresh_expiry <= now {
            return Err(AuthError::InvalidToken(
                "received an already expired token pair".to_string(),
            ));
        }

        Ok(Self {
            access: response.access.clone(),
            refresh: response.refresh.clone(),
            access_expiry,
            refresh_expiry,
        })
    }

    /// Check if the access token is still valid at this instant
    pub fn access_valid(&self) -> bool {
        self.access_expiry > now_epoch()
    }

    /// Check if the refresh token is still valid at this instant
    pub fn refresh_valid(&self) -> bool {
        self.refresh_expiry > now_epoch()
    }

    /// Check if the access token is inside the proactive-refresh window
    /// (or already expired)
    pub fn within_refresh_buffer(&self, buffer: Duration) -> bool {
        self.access_expiry.saturating_sub(now_epoch()) <= buffer.as_secs()
    }

    /// Delay until the proactive renewal for this pair should fire
    pub fn renewal_delay(&self, buffer: Duration) -> Duration {
        let until_expiry = Duration::from_secs(self.access_expiry.saturating_sub(now_epoch()));
        until_expiry.saturating_sub(buffer)
    }

    /// Time until the access token expires
    pub fn time_until_expiry(&self) -> Duration {
        Duration::from_secs(self.access_expiry.saturating_sub(now_epoch()))
    }
}

/// Claims carried in a MESA access token payload
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Token kind, e.g. "access"
    #[serde(default)]
    pub token_type: Option<String>,
    /// Expiry as epoch seconds
    #[serde(default)]
    pub exp: Option<u64>,
    /// Issued-at as epoch seconds
    #[serde(default)]
    pub iat: Option<u64>,
    /// Token identifier
    #[serde(default)]
    pub jti: Option<String>,
    /// Subject user id
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Decode the payload segment of a JWT without verifying any signature.
///
/// Returns `None` on malformed input. Advisory and debugging use only; the
/// result must never feed a trust decision.
pub fn decode_access_token_claims(token: &str) -> Option<TokenClaims> {
    // JWT has three parts: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD.decode(parts[1].as_bytes()).ok()?;
    serde_json::from_slice(&decoded).ok()
}

/// Current time as epoch seconds
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn parse_epoch(value: &str) -> AuthResult<u64> {
    // Backend expiries are decimal epoch seconds; tolerate a fractional part.
    let whole = value.split('.').next().unwrap_or(value);
    whole.trim().parse::<u64>().map_err(|_| {
        AuthError::InvalidToken(format!("malformed expiry timestamp: {value:?}"))
    })
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A token pair was rejected at acceptance time
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Terminal: refresh retries exhausted or refresh token expired.
    /// Only a fresh login can recover from this state.
    #[error("Authentication session expired")]
    SessionExpired,

    /// Network error while talking to the auth endpoint
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The auth endpoint returned a body the SDK cannot understand
    #[error("Invalid auth response: {0}")]
    InvalidResponse(String),

    /// Token storage error
    #[error("Token storage error: {0}")]
    StorageError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Get the default data directory for SDK token storage
/// Returns platform-specific data directory (e.g. ~/.local/share/mesa on Linux)
pub fn get_sdk_data_dir() -> AuthResult<PathBuf> {
    let strategy = choose_base_strategy().map_err(|e| {
        AuthError::ConfigError(format!("Failed to determine base directories: {}", e))
    })?;

    Ok(strategy.data_dir().join(mesa_common::DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(access_offset: i64, refresh_offset: i64) -> TokenResponse {
        let now = now_epoch() as i64;
        TokenResponse {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
            access_expiry: (now + access_offset).to_string(),
            refresh_expiry: (now + refresh_offset).to_string(),
        }
    }

    #[test]
    fn accepts_fresh_pair() {
        let pair = TokenPair::from_response(&response(3600, 86400)).unwrap();
        assert!(pair.access_valid());
        assert!(pair.refresh_valid());
        assert!(!pair.within_refresh_buffer(Duration::from_secs(300)));
    }

    #[test]
    fn rejects_expired_access() {
        let err = TokenPair::from_response(&response(-10, 86400)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn rejects_expired_refresh() {
        let err = TokenPair::from_response(&response(3600, -1)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn rejects_malformed_expiry() {
        let mut resp = response(3600, 86400);
        resp.access_expiry = "not-a-number".to_string();
        let err = TokenPair::from_response(&resp).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn accepts_fractional_expiry() {
        let now = now_epoch();
        let mut resp = response(3600, 86400);
        resp.access_expiry = format!("{}.5", now + 3600);
        let pair = TokenPair::from_response(&resp).unwrap();
        assert_eq!(pair.access_expiry, now + 3600);
    }

    #[test]
    fn buffer_window_detection() {
        let pair = TokenPair::from_response(&response(60, 86400)).unwrap();
        assert!(pair.within_refresh_buffer(Duration::from_secs(300)));
        assert!(!pair.within_refresh_buffer(Duration::from_secs(10)));
    }

    #[test]
    fn renewal_delay_clamps_to_zero() {
        let pair = TokenPair::from_response(&response(60, 86400)).unwrap();
        assert_eq!(pair.renewal_delay(Duration::from_secs(300)), Duration::ZERO);
        let delay = pair.renewal_delay(Duration::from_secs(30));
        assert!(delay <= Duration::from_secs(30));
    }

    #[test]
    fn decodes_claims_from_jwt() {
        let payload = serde_json::json!({
            "token_type": "access",
            "exp": 2_000_000_000u64,
            "iat": 1_900_000_000u64,
            "jti": "abc123",
            "user_id": "user-1",
        });
        let encoded = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        let token = format!("hdr.{}.sig", encoded);

        let claims = decode_access_token_claims(&token).unwrap();
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(claims.exp, Some(2_000_000_000));
        assert_eq!(claims.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn claim_decode_returns_none_on_garbage() {
        assert!(decode_access_token_claims("not-a-jwt").is_none());
        assert!(decode_access_token_claims("a.b").is_none());
        assert!(decode_access_token_claims("a.!!!.c").is_none());
    }
}
