use paytrust_core::HttpMethod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Business-level error returned by the gateway in a verified response.
///
/// Only built after the response signature checked out. A response that
/// fails verification is a [`ClientError::Auth`], never an `ApiError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} {path} failed with http {status}: {code} {message}")]
pub struct ApiError {
    pub method: HttpMethod,
    pub path: String,
    pub status: u16,
    pub code: String,
    pub message: String,
    pub detail: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    detail: Option<ApiErrorDetail>,
}

impl ApiError {
    /// Decode the gateway's `{code, message, detail}` error body. Bodies that
    /// don't parse are kept as the message.
    pub fn from_response(method: HttpMethod, path: &str, status: u16, body: &[u8]) -> Self {
        let (code, message, detail) = match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) => (parsed.code, parsed.message, parsed.detail),
            Err(_) => (String::new(), String::from_utf8_lossy(body).into_owned(), None),
        };
        Self {
            method,
            path: path.to_string(),
            status,
            code,
            message,
            detail,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == paytrust_core::STATUS_TOO_MANY_REQUESTS
    }
}

/// Error type for the paytrust client, aggregating errors from the engine
/// crates.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Signing, verification, trust or decryption failure.
    #[error("auth error: {0}")]
    Auth(#[from] paytrust_auth::AuthError),

    #[error("notification error: {0}")]
    Notify(#[from] paytrust_notify::NotifyError),

    #[error("{0}")]
    Core(paytrust_core::CoreError),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<paytrust_core::CoreError> for ClientError {
    fn from(e: paytrust_core::CoreError) -> Self {
        match e {
            paytrust_core::CoreError::Transport(msg) => ClientError::Transport(msg),
            other => ClientError::Core(other),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(e: toml::de::Error) -> Self {
        ClientError::Config(format!("TOML parse error: {}", e))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
