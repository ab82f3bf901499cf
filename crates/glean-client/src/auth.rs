use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use crate::error::{GleanError, Result};

/// Header naming the user a global token acts on behalf of
pub const ACT_AS_HEADER: &str = "x-glean-actas";

/// Produces the credential headers attached to each request
pub trait Authenticator: Send + Sync {
    /// Insert authentication headers, or fail if credentials are unusable
    fn apply(&self, headers: &mut HeaderMap) -> Result<()>;
}

/// Bearer API key authenticator
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: String,
    act_as: Option<String>,
}

impl ApiKeyAuth {
    /// Create a new API key authenticator
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            act_as: None,
        }
    }

    /// Act on behalf of the given user (global tokens only)
    pub fn with_act_as(mut self, email: impl Into<String>) -> Self {
        self.act_as = Some(email.into());
        self
    }
}

impl Authenticator for ApiKeyAuth {
    fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| GleanError::Authentication(format!("Invalid API key: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        if let Some(email) = &self.act_as {
            let value = HeaderValue::from_str(email)
                .map_err(|e| GleanError::Config(format!("Invalid act-as user: {}", e)))?;
            headers.insert(HeaderName::from_static(ACT_AS_HEADER), value);
        }
        Ok(())
    }
}

/// Stands in when no API key was configured; every request is refused
/// before it reaches the network.
#[derive(Debug, Clone)]
pub struct MissingCredentials;

impl Authenticator for MissingCredentials {
    fn apply(&self, _headers: &mut HeaderMap) -> Result<()> {
        Err(GleanError::Authentication(format!(
            "{} environment variable is not set",
            glean_config::ENV_API_KEY
        )))
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("api_key", &"<redacted>")
            .field("act_as", &self.act_as)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_header() {
        let mut headers = HeaderMap::new();
        ApiKeyAuth::new("abc").apply(&mut headers).unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
        assert!(headers.get(ACT_AS_HEADER).is_none());
    }

    #[test]
    fn test_act_as_header() {
        let mut headers = HeaderMap::new();
        ApiKeyAuth::new("abc")
            .with_act_as("alice@example.com")
            .apply(&mut headers)
            .unwrap();

        assert_eq!(headers.get(ACT_AS_HEADER).unwrap(), "alice@example.com");
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut headers = HeaderMap::new();
        let err = ApiKeyAuth::new("bad\nkey").apply(&mut headers).unwrap_err();
        assert!(matches!(err, GleanError::Authentication(_)));
    }

    #[test]
    fn test_missing_credentials() {
        let mut headers = HeaderMap::new();
        let err = MissingCredentials.apply(&mut headers).unwrap_err();
        assert!(err.to_string().contains("GLEAN_API_KEY"));
        assert!(headers.is_empty());
    }
}
