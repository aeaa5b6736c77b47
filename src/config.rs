//! Configuration management for pageaudit
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.pageaudit/config.toml

use crate::errors::{AuditError, Result};
use crate::provider::{StatusBands, DEFAULT_BASE_URL};
use crate::task::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the provider login
pub const LOGIN_ENV: &str = "DATAFORSEO_USERNAME";

/// Environment variable holding the provider password
pub const PASSWORD_ENV: &str = "DATAFORSEO_PASSWORD";

/// Complete configuration for pageaudit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub polling: BackoffPolicy,
    pub scoring: ScoringConfig,
}

/// Provider connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub login: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub status_codes: StatusBands,
}

/// Scoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Rule set file; the built-in on-page benchmark is used when absent
    pub rules_path: Option<PathBuf>,
}

/// Provider login pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login: None,
            password: None,
            timeout_secs: 30,
            status_codes: StatusBands::default(),
        }
    }
}

impl ProviderConfig {
    /// Both halves of the login pair, if present and non-empty
    pub fn credentials(&self) -> Option<Credentials> {
        match (self.login.as_deref(), self.password.as_deref()) {
            (Some(login), Some(password)) if !login.is_empty() && !password.is_empty() => {
                Some(Credentials {
                    login: login.to_string(),
                    password: password.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuditError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AuditError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".pageaudit").join("config.toml"))
    }

    /// Override credentials with values from the environment, when set
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::var(LOGIN_ENV).ok(), std::env::var(PASSWORD_ENV).ok());
    }

    fn apply_overrides(&mut self, login: Option<String>, password: Option<String>) {
        if let Some(login) = login.filter(|value| !value.is_empty()) {
            self.provider.login = Some(login);
        }
        if let Some(password) = password.filter(|value| !value.is_empty()) {
            self.provider.password = Some(password);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.provider.base_url.trim().is_empty() {
            return Err(AuditError::Config("base_url must not be empty".to_string()));
        }

        let codes = &self.provider.status_codes;
        if codes.success == codes.not_found {
            return Err(AuditError::Config(
                "success and not_found status codes must differ".to_string(),
            ));
        }

        if codes.pending.contains(&codes.success) || codes.pending.contains(&codes.not_found) {
            return Err(AuditError::Config(
                "pending status codes must not overlap success or not_found".to_string(),
            ));
        }

        if codes.retry_later.contains(&codes.success) || codes.retry_later.contains(&codes.created) {
            return Err(AuditError::Config(
                "retry_later status codes must not overlap success or created".to_string(),
            ));
        }

        self.polling.validate().map_err(AuditError::Config)?;

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| AuditError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.status_codes.success, 20000);
        assert_eq!(config.provider.status_codes.not_found, 40400);
        assert!(config.provider.credentials().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provider]
login = "user@example.com"
password = "secret"

[provider.status_codes]
success = 1
not_found = 2

[polling]
base_delay_ms = 500
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.status_codes.success, 1);
        assert_eq!(config.provider.status_codes.not_found, 2);
        assert_eq!(config.polling.base_delay_ms, 500);
        assert_eq!(config.polling.max_delay_ms, 30_000);

        let credentials = config.provider.credentials().unwrap();
        assert_eq!(credentials.login, "user@example.com");
        assert!(!format!("{:?}", credentials).contains("secret"));
    }

    #[test]
    fn test_invalid_status_codes_rejected() {
        let mut config = Config::default();
        config.provider.status_codes.not_found = config.provider.status_codes.success;
        assert!(matches!(config.validate(), Err(AuditError::Config(_))));

        let mut config = Config::default();
        config.provider.status_codes.retry_later.push(20100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_polling_rejected() {
        let mut config = Config::default();
        config.polling.factor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::load(Some(PathBuf::from("/nonexistent/pageaudit.toml")));
        assert!(matches!(result, Err(AuditError::Config(_))));
    }

    #[test]
    fn test_overrides_replace_credentials() {
        let mut config = Config::default();
        config.apply_overrides(Some("env-user".to_string()), Some("env-pass".to_string()));
        assert_eq!(config.provider.credentials().unwrap().login, "env-user");

        config.apply_overrides(Some(String::new()), None);
        assert_eq!(config.provider.login.as_deref(), Some("env-user"));
    }

    #[test]
    fn test_empty_password_means_no_credentials() {
        let mut config = Config::default();
        config.provider.login = Some("user".to_string());
        config.provider.password = Some(String::new());
        assert!(config.provider.credentials().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.polling.max_elapsed_secs = 120;
        config.save(&path).unwrap();

        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.polling.max_elapsed_secs, 120);
    }
}
