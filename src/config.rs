use serde::Deserialize;
use std::path::Path;
use time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub auth: Option<AuthConfig>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "DualCare".to_string(),
            auth: None,
        }
    }
}

/// Optional TOML config file; CLI flags and environment variables take
/// precedence over anything set here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub app_name: Option<String>,
    pub auth_key: Option<String>,
    pub auth_token_ttl: Option<String>,
    pub auth_cookie_name: Option<String>,
    pub auth_cookie_secure: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read config file {}: {err}", path.display()))?;
        toml::from_str(&raw).map_err(|err| format!("invalid config file {}: {err}", path.display()))
    }
}
