use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Hosted backend endpoint (identity provider, profile rows, edge
/// functions all live under one base URL).
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub base_url: String,
    /// Public (anon) key sent as the `apikey` header.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

/// Timeout and retry budget for the auth core's network reads.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_restore_timeout")]
    pub restore_timeout_secs: u64,
    #[serde(default = "default_restore_retries")]
    pub restore_retry_attempts: u32,
    #[serde(default = "default_profile_timeout")]
    pub profile_fetch_timeout_secs: u64,
    #[serde(default = "default_profile_attempts")]
    pub profile_retry_attempts: u32,
    #[serde(default = "default_profile_base_delay")]
    pub profile_retry_base_delay_ms: u64,
    #[serde(default = "default_refresh_margin")]
    pub session_refresh_margin_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            restore_timeout_secs: default_restore_timeout(),
            restore_retry_attempts: default_restore_retries(),
            profile_fetch_timeout_secs: default_profile_timeout(),
            profile_retry_attempts: default_profile_attempts(),
            profile_retry_base_delay_ms: default_profile_base_delay(),
            session_refresh_margin_secs: default_refresh_margin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_session_path")]
    pub session_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_path: default_session_path(),
        }
    }
}

fn default_http_timeout() -> u64 {
    10
}
fn default_restore_timeout() -> u64 {
    5
}
fn default_restore_retries() -> u32 {
    1
}
fn default_profile_timeout() -> u64 {
    3
}
fn default_profile_attempts() -> u32 {
    3
}
fn default_profile_base_delay() -> u64 {
    500
}
fn default_refresh_margin() -> u64 {
    60
}
fn default_session_path() -> String {
    "data/session.json".to_string()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load from CONFIG_PATH/config.toml if present, fill backend settings
    /// from the environment, and validate. Missing file is fine as long as
    /// the environment provides the backend endpoint.
    pub fn load_and_validate() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.backend.normalize_from_env();
        self.backend.validate()?;
        self.auth.validate()?;
        if self.storage.session_path.trim().is_empty() {
            self.storage.session_path = default_session_path();
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn normalize_from_env(&mut self) {
        if self.base_url.trim().is_empty() {
            if let Ok(url) = std::env::var("BACKEND_URL") {
                self.base_url = url;
            }
        }
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("BACKEND_API_KEY") {
                self.api_key = key;
            }
        }
        // Trailing slash would double up when joining paths
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(anyhow!(
                "backend.base_url is empty; set it in config.toml or BACKEND_URL"
            ));
        }
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(anyhow!("backend.base_url must start with http:// or https://"));
        }
        if self.http_timeout_secs == 0 {
            return Err(anyhow!("backend.http_timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.restore_timeout_secs == 0 || self.profile_fetch_timeout_secs == 0 {
            return Err(anyhow!("auth timeouts must be positive numbers of seconds"));
        }
        if self.profile_retry_attempts == 0 {
            return Err(anyhow!("auth.profile_retry_attempts must be >= 1"));
        }
        if self.profile_retry_base_delay_ms == 0 {
            return Err(anyhow!("auth.profile_retry_base_delay_ms must be >= 1"));
        }
        Ok(())
    }
}
