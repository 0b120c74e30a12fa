//! Backend configuration constants for the MESA API
//!
//! These constants are compiled into the binary so the SDK works without any
//! external configuration files. Every one of them can be overridden through
//! the client builder.

/// Default MESA backend base URL used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Directory name under the platform data dir used for persisted SDK state
pub const DATA_DIR_NAME: &str = "mesa";

/// File name of the persisted token record inside the data directory
pub const TOKEN_STORE_FILE: &str = "auth_tokens.json";
