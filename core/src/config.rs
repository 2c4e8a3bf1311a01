//! Endpoint and credential configuration for the service facade.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const ENV_API_BASE_URL: &str = "DOUBAN_API_BASE_URL";
pub const ENV_CLIENT_ID: &str = "DOUBAN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "DOUBAN_CLIENT_SECRET";

/// Base URL plus client credentials.
///
/// A config is usable once all three fields are non-empty; see `is_valid`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    api_base_url: String,
    client_id: String,
    client_secret: String,
}

impl ServiceConfig {
    pub fn new(api_base_url: &str, client_id: &str, client_secret: &str) -> Self {
        let mut config = Self::default();
        config.set_api_base_url(api_base_url);
        config.set_client_id(client_id);
        config.set_client_secret(client_secret);
        config
    }

    /// Read the config from `DOUBAN_API_BASE_URL`, `DOUBAN_CLIENT_ID` and
    /// `DOUBAN_CLIENT_SECRET`. Unset variables leave the field empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(
            &lookup(ENV_API_BASE_URL).unwrap_or_default(),
            &lookup(ENV_CLIENT_ID).unwrap_or_default(),
            &lookup(ENV_CLIENT_SECRET).unwrap_or_default(),
        )
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ApiError> {
        let parsed: ServiceConfig =
            serde_json::from_str(raw).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        // Re-run the setters so normalization applies to file input too.
        Ok(Self::new(&parsed.api_base_url, &parsed.client_id, &parsed.client_secret))
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn set_api_base_url(&mut self, url: &str) {
        self.api_base_url = url.trim().trim_end_matches('/').to_string();
    }

    pub fn set_client_id(&mut self, id: &str) {
        self.client_id = id.trim().to_string();
    }

    pub fn set_client_secret(&mut self, secret: &str) {
        self.client_secret = secret.trim().to_string();
    }

    /// True when base URL, client id and client secret are all non-empty.
    pub fn is_valid(&self) -> bool {
        !self.api_base_url.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_base_url", &self.api_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config_is_invalid() {
        assert!(!ServiceConfig::default().is_valid());
    }

    #[test]
    fn valid_once_every_field_is_set() {
        let mut config = ServiceConfig::default();
        config.set_api_base_url("https://api.example.com");
        assert!(!config.is_valid());
        config.set_client_id("id");
        assert!(!config.is_valid());
        config.set_client_secret("secret");
        assert!(config.is_valid());
    }

    #[test]
    fn whitespace_only_credentials_are_invalid() {
        let config = ServiceConfig::new("https://api.example.com", "  ", "secret");
        assert!(!config.is_valid());
    }

    #[test]
    fn base_url_trailing_slashes_are_stripped() {
        let config = ServiceConfig::new("https://api.example.com//", "id", "secret");
        assert_eq!(config.api_base_url(), "https://api.example.com");
    }

    #[test]
    fn lookup_fills_known_keys_only() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_BASE_URL, "http://localhost:3000/"),
            (ENV_CLIENT_ID, "abc"),
        ]
        .into_iter()
        .collect();
        let config = ServiceConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_base_url(), "http://localhost:3000");
        assert_eq!(config.client_id(), "abc");
        assert_eq!(config.client_secret(), "");
        assert!(!config.is_valid());
    }

    #[test]
    fn json_config_is_normalized() {
        let config = ServiceConfig::from_json_str(
            r#"{"api_base_url":"http://localhost:3000/","client_id":"abc","client_secret":"xyz"}"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url(), "http://localhost:3000");
        assert!(config.is_valid());
    }

    #[test]
    fn json_config_missing_fields_default_to_empty() {
        let config = ServiceConfig::from_json_str(r#"{"client_id":"abc"}"#).unwrap();
        assert_eq!(config.api_base_url(), "");
        assert!(!config.is_valid());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = ServiceConfig::new("http://localhost", "abc", "super-secret");
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
