use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required setting is absent or blank.
    #[error("missing auth configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("authorization state does not match the issued request")]
    StateMismatch,

    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("token storage error: {0}")]
    Storage(String),

    #[error("stored tokens could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Transport(err.to_string())
    }
}
