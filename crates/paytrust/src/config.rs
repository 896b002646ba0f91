use paytrust_auth::{ExpiryPolicy, KeyMaterial};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClientError, ClientResult};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.mch.weixin.qq.com";

/// Trust store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrustConfig {
    /// Whether cached platform certificates are checked against their
    /// effective/expire window before use.
    #[serde(default)]
    pub expiry: ExpiryPolicy,
}

/// Client configuration.
///
/// Loaded from a TOML file (typically `~/.paytrust/config.toml`). Credentials
/// are referenced by path or environment variable, never inlined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default)]
    pub merchant_id: String,

    /// Merchant private key (PKCS#8 or PKCS#1 PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    /// Merchant certificate; the signing serial is read from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,

    /// Overrides the serial derived from `certificate_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_serial: Option<String>,

    /// Environment variable holding the API v3 key.
    #[serde(default = "default_api_v3_key_env")]
    pub api_v3_key_env: String,

    /// File holding the API v3 key. Takes precedence over the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_v3_key_path: Option<PathBuf>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub trust: TrustConfig,
}

fn default_api_v3_key_env() -> String {
    "PAYTRUST_API_V3_KEY".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("paytrust/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            private_key_path: None,
            certificate_path: None,
            certificate_serial: None,
            api_v3_key_env: default_api_v3_key_env(),
            api_v3_key_path: None,
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            trust: TrustConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> ClientResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(ClientError::Io)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ClientResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ClientError::Io)?;
        }
        std::fs::write(path, contents).map_err(ClientError::Io)?;
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Credentials are not checked here; a missing key surfaces on the first
    /// call that needs it.
    pub fn validate(&self) -> ClientResult<()> {
        let (secure, rest) = match self.base_url.strip_prefix("https://") {
            Some(rest) => (true, rest),
            None => match self.base_url.strip_prefix("http://") {
                Some(rest) => (false, rest),
                None => {
                    return Err(ClientError::Config(format!(
                        "base_url must start with https://, got '{}'",
                        self.base_url
                    )))
                }
            },
        };
        let host = host_of(rest);
        if host.is_empty() {
            return Err(ClientError::Config("base_url has no host".into()));
        }
        if !secure && host != "localhost" && host != "127.0.0.1" {
            return Err(ClientError::Config(format!(
                "base_url must use https outside localhost, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be > 0".into()));
        }
        if self.api_v3_key_env.is_empty() && self.api_v3_key_path.is_none() {
            return Err(ClientError::Config(
                "one of api_v3_key_env or api_v3_key_path must be set".into(),
            ));
        }
        Ok(())
    }

    /// Build key material from the configured paths and environment.
    ///
    /// Unset sources are left empty. A configured path that cannot be read is
    /// an error.
    pub fn key_material(&self) -> ClientResult<KeyMaterial> {
        let mut keys = KeyMaterial::new();
        if !self.merchant_id.is_empty() {
            keys = keys.with_merchant_id(self.merchant_id.as_str());
        }
        if let Some(path) = &self.private_key_path {
            keys = keys.with_private_key_pem(read_configured(path, "private_key_path")?);
        }
        if let Some(path) = &self.certificate_path {
            keys = keys.with_certificate_pem(read_configured(path, "certificate_path")?);
        }
        if let Some(serial) = &self.certificate_serial {
            keys = keys.with_certificate_serial(serial.as_str());
        }

        if let Some(path) = &self.api_v3_key_path {
            let raw = read_configured(path, "api_v3_key_path")?;
            let trimmed = String::from_utf8_lossy(&raw).trim().to_string();
            keys = keys.with_api_v3_key(trimmed);
        } else if let Ok(value) = std::env::var(&self.api_v3_key_env) {
            keys = keys.with_api_v3_key(value.trim());
        }
        Ok(keys)
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".paytrust/config.toml")
    }
}

fn host_of(authority_and_path: &str) -> &str {
    authority_and_path
        .split(['/', ':'])
        .next()
        .unwrap_or_default()
}

fn read_configured(path: &Path, field: &str) -> ClientResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        ClientError::Config(format!("{} '{}': {}", field, path.display(), e))
    })
}
