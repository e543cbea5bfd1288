use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::tokens::{TokenSet, TokenStore};

/// An authorization URL together with the state it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub url: String,
    pub state: String,
}

/// Raw token endpoint body. The accounts service reports some failures as
/// 200 responses with an `error` field.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self) -> Result<TokenSet, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::TokenExchange(error));
        }
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::TokenExchange("response has no access_token".to_string()))?;
        Ok(TokenSet {
            access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            token_type: self.token_type,
            scope: self.scope,
            expires_at: None,
        })
    }
}

/// Entry point for everything auth related: building the login URL,
/// exchanging the callback code, and keeping the stored tokens fresh.
pub struct AuthFacade {
    config: AuthConfig,
    client: Client,
    store: Arc<dyn TokenStore>,
    pending_state: Mutex<Option<String>>,
}

impl std::fmt::Debug for AuthFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFacade")
            .field("client_id", &self.config.client_id)
            .field("token_url", &self.config.token_url)
            .finish_non_exhaustive()
    }
}

impl AuthFacade {
    pub fn new(config: AuthConfig, store: Arc<dyn TokenStore>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self {
            config,
            client,
            store,
            pending_state: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Builds the authorization URL and remembers its state for the
    /// callback.
    #[tracing::instrument(skip(self))]
    pub fn generate_auth_url(&self) -> Result<AuthRequest, AuthError> {
        let state = generate_state();
        let mut url = Url::parse(&self.config.auth_url).map_err(|e| AuthError::InvalidUrl {
            url: self.config.auth_url.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scope_param())
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("access_type", &self.config.access_type)
            .append_pair("state", &state);
        if let Some(prompt) = self.config.prompt.as_deref() {
            url.query_pairs_mut().append_pair("prompt", prompt);
        }

        *self.pending_state.lock() = Some(state.clone());
        debug!("issued authorization request");
        Ok(AuthRequest {
            url: url.to_string(),
            state,
        })
    }

    pub fn login(&self) -> Result<AuthRequest, AuthError> {
        self.generate_auth_url()
    }

    pub fn pending_state(&self) -> Option<String> {
        self.pending_state.lock().clone()
    }

    /// Trades the callback code for tokens and persists them. When a state
    /// was issued and the callback carries one, they must match.
    #[tracing::instrument(skip(self, code, state, now))]
    pub async fn exchange_code_for_tokens(
        &self,
        code: &str,
        state: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenSet, AuthError> {
        {
            let mut pending = self.pending_state.lock();
            if let (Some(expected), Some(got)) = (pending.as_deref(), state)
                && expected != got
            {
                warn!("callback state does not match issued state");
                return Err(AuthError::StateMismatch);
            }
            *pending = None;
        }

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let tokens = self.post_token_form(&form).await?.stamped(now);
        self.store.save(&tokens)?;
        info!("authorization code exchanged");
        Ok(tokens)
    }

    pub fn tokens(&self) -> Result<Option<TokenSet>, AuthError> {
        self.store.load()
    }

    /// The stored access token, unless it is missing or expired.
    pub fn access_token(&self, now: DateTime<Utc>) -> Option<String> {
        match self.store.load() {
            Ok(Some(tokens)) if !tokens.access_token.is_empty() && !tokens.is_expired(now) => {
                Some(tokens.access_token)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "failed to read stored tokens");
                None
            }
        }
    }

    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        self.access_token(now).is_some()
    }

    /// Uses the stored refresh token for a new access token. Any failure
    /// clears the stored tokens.
    #[tracing::instrument(skip(self, now))]
    pub async fn refresh_tokens(&self, now: DateTime<Utc>) -> Result<TokenSet, AuthError> {
        let result = self.try_refresh(now).await;
        if let Err(err) = &result {
            warn!(error = %err, "token refresh failed; clearing stored tokens");
            self.store.clear()?;
        }
        result
    }

    async fn try_refresh(&self, now: DateTime<Utc>) -> Result<TokenSet, AuthError> {
        let previous = self.store.load()?;
        let refresh_token = previous
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or(AuthError::NoRefreshToken)?;

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let mut tokens = self.post_token_form(&form).await?.stamped(now);
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.clone());
        }
        self.store.save(&tokens)?;
        info!("access token refreshed");
        Ok(tokens)
    }

    /// `true` when a usable access token exists afterwards. Only expired
    /// tokens trigger a refresh.
    #[tracing::instrument(skip(self, now))]
    pub async fn refresh_if_needed(&self, now: DateTime<Utc>) -> bool {
        if self.is_authenticated(now) {
            return true;
        }
        match self.store.load() {
            Ok(Some(tokens)) if tokens.is_expired(now) => self.refresh_tokens(now).await.is_ok(),
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, "failed to read stored tokens");
                false
            }
        }
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        *self.pending_state.lock() = None;
        self.store.clear()?;
        info!("logged out");
        Ok(())
    }

    /// Probes the CRM API with the current access token.
    #[tracing::instrument(skip(self, now))]
    pub async fn validate_tokens(&self, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let Some(token) = self.access_token(now) else {
            return Ok(false);
        };
        let url = format!("{}/settings/modules", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let ok = response.status().is_success();
        debug!(status = response.status().as_u16(), "token validation response");
        Ok(ok)
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenSet, AuthError> {
        let response = self.client.post(&self.config.token_url).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::TokenExchange(format!("malformed response: {e}")))?;
        parsed.into_tokens()
    }
}

/// Random url-safe state value.
fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}
