use serde::{Deserialize, Serialize};
use taskdeck_core::config::Config;
use tracing::debug;

use crate::error::AuthError;

pub const DEFAULT_SCOPES: &[&str] = &[
    "ZohoCRM.modules.ALL",
    "ZohoCRM.settings.modules.READ",
    "ZohoCRM.settings.fields.READ",
];

/// Client registration and endpoint settings for the OAuth flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,

    #[serde(default)]
    pub client_secret: Option<String>,

    pub redirect_uri: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    #[serde(default = "default_access_type")]
    pub access_type: String,

    /// `prompt` parameter of the authorization URL (default: consent)
    #[serde(default = "default_prompt")]
    pub prompt: Option<String>,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_auth_url() -> String {
    "https://accounts.zoho.com/oauth/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://accounts.zoho.com/oauth/v2/token".to_string()
}

fn default_api_url() -> String {
    "https://www.zohoapis.com/crm/v2".to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_access_type() -> String {
    "offline".to_string()
}

fn default_prompt() -> Option<String> {
    Some("consent".to_string())
}

const fn default_timeout() -> u64 {
    30
}

/// Environment variable consulted for each rc key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("auth.client_id", "TASKDECK_CLIENT_ID"),
    ("auth.client_secret", "TASKDECK_CLIENT_SECRET"),
    ("auth.redirect_uri", "TASKDECK_REDIRECT_URI"),
    ("auth.auth_url", "TASKDECK_AUTH_URL"),
    ("auth.token_url", "TASKDECK_TOKEN_URL"),
    ("auth.api_url", "TASKDECK_API_URL"),
    ("auth.scope", "TASKDECK_SCOPE"),
    ("auth.prompt", "TASKDECK_AUTH_PROMPT"),
    ("auth.timeout", "TASKDECK_AUTH_TIMEOUT"),
];

impl AuthConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_url: default_api_url(),
            scopes: default_scopes(),
            access_type: default_access_type(),
            prompt: default_prompt(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(env_value)
    }

    /// rc settings, with the matching `TASKDECK_*` environment variable
    /// taking precedence for each key.
    pub fn from_config(cfg: &Config) -> Result<Self, AuthError> {
        Self::from_lookup(|key| env_value(key).or_else(|| cfg.get(key)))
    }

    /// Builds the config from a key lookup over `auth.*` rc keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let client_id = get("auth.client_id").ok_or(AuthError::MissingConfig("client_id"))?;
        let redirect_uri = get("auth.redirect_uri").ok_or(AuthError::MissingConfig("redirect_uri"))?;

        let mut cfg = Self::new(client_id, redirect_uri);
        cfg.client_secret = get("auth.client_secret");
        if let Some(url) = get("auth.auth_url") {
            cfg.auth_url = url;
        }
        if let Some(url) = get("auth.token_url") {
            cfg.token_url = url;
        }
        if let Some(url) = get("auth.api_url") {
            cfg.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(scope) = get("auth.scope") {
            cfg.scopes = scope
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(prompt) = get("auth.prompt") {
            cfg.prompt = Some(prompt);
        }
        if let Some(raw) = get("auth.timeout") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => cfg.timeout_secs = secs,
                _ => debug!(value = %raw, "ignoring invalid auth timeout"),
            }
        }
        Ok(cfg)
    }

    /// Comma joined scope list as sent to the authorization endpoint.
    pub fn scope_param(&self) -> String {
        self.scopes.join(",")
    }
}

fn env_value(key: &str) -> Option<String> {
    let (_, var) = ENV_KEYS.iter().find(|(k, _)| *k == key)?;
    std::env::var(var).ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_client_id_and_redirect() {
        let err = AuthConfig::from_lookup(lookup(&[("auth.redirect_uri", "http://x/cb")])).unwrap_err();
        assert!(matches!(err, AuthError::MissingConfig("client_id")));
        let err = AuthConfig::from_lookup(lookup(&[("auth.client_id", "id"), ("auth.redirect_uri", "  ")])).unwrap_err();
        assert!(matches!(err, AuthError::MissingConfig("redirect_uri")));
    }

    #[test]
    fn defaults_and_overrides() {
        let cfg = AuthConfig::from_lookup(lookup(&[
            ("auth.client_id", "id"),
            ("auth.redirect_uri", "http://localhost:8080/callback"),
            ("auth.api_url", "http://crm.test/v2/"),
            ("auth.scope", "A.READ, B.ALL"),
            ("auth.timeout", "zero"),
            ("auth.prompt", "select_account"),
        ]))
        .unwrap();
        assert_eq!(cfg.prompt.as_deref(), Some("select_account"));
        assert_eq!(cfg.token_url, "https://accounts.zoho.com/oauth/v2/token");
        assert_eq!(cfg.api_url, "http://crm.test/v2");
        assert_eq!(cfg.scope_param(), "A.READ,B.ALL");
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.access_type, "offline");
    }

    #[test]
    fn reads_rc_keys() {
        let mut rc = Config::default();
        rc.set("auth.client_id", "rc-id");
        rc.set("auth.redirect_uri", "http://localhost:8080/callback");
        let cfg = AuthConfig::from_config(&rc).unwrap();
        assert!(!cfg.client_id.is_empty());
        assert_eq!(AuthConfig::new("a", "b").scope_param(), DEFAULT_SCOPES.join(","));
    }
}
