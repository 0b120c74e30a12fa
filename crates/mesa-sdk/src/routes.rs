//! MESA backend route table
//!
//! All paths are relative; the client joins them onto its base URL.

/// API information and status
pub const ROOT: &str = "/";
/// Health check
pub const PING: &str = "/ping";

/// Run the expert system on a symptom set
pub const DIAGNOSE: &str = "/expert/diagnose";
/// Valid symptom catalog
pub const SYMPTOMS: &str = "/expert/symptoms";
/// Disease catalog
pub const DISEASES: &str = "/expert/diseases";

/// Detail route for a single disease
pub fn disease(name: &str) -> String {
    format!("{}/{}", DISEASES, urlencoding::encode(name))
}

/// Send a chat message to the AI assistant
pub const CHAT_MESSAGE: &str = "/chat/message";
/// Available LLM models
pub const CHAT_MODELS: &str = "/chat/models";
/// Validate a model id
pub const VALIDATE_MODEL: &str = "/chat/validate-model";

/// Exchange a refresh token for a new token pair
pub const AUTH_REFRESH: &str = "/auth/refresh";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disease_route_encodes_name() {
        assert_eq!(disease("typhoid"), "/expert/diseases/typhoid");
        assert_eq!(
            disease("typhoid fever"),
            "/expert/diseases/typhoid%20fever"
        );
    }
}
