//! Run configuration, read from a TOML file and overridden from the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthMethod, AuthScheme};
use crate::error::ConfigError;
use crate::fixture::FixtureScope;
use crate::http::{ClientOptions, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "api-e2e.toml";
pub const DEFAULT_TESTS_DIR: &str = "tests/e2e";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub base_url: String,
    pub tests_dir: PathBuf,
    pub verify_tls: bool,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub fixture_scope: FixtureScope,
    pub auth: AuthConfig,
    pub retry: RetryConfig,
    pub variables: HashMap<String, String>,
    pub logging: LoggingConfig,
    pub history: HistoryConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: "https://127.0.0.1".to_string(),
            tests_dir: PathBuf::from(DEFAULT_TESTS_DIR),
            verify_tls: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: 1,
            fixture_scope: FixtureScope::Descriptor,
            auth: AuthConfig::default(),
            retry: RetryConfig::default(),
            variables: HashMap::new(),
            logging: LoggingConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

/// Credentials, given inline or through environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub scheme: AuthScheme,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_env: Option<String>,
    pub token: Option<String>,
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// SQLite file runs are recorded into. No history is kept when unset.
    pub path: Option<PathBuf>,
}

impl RunConfig {
    /// Load `path`, or defaults when the file does not exist and `required`
    /// is false.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !path.exists() && !required {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;

        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        if self.fixture_scope == FixtureScope::Run && self.concurrency > 1 {
            return Err(ConfigError::Invalid(
                "fixture_scope = \"run\" shares one id across descriptors and requires concurrency = 1"
                    .into(),
            ));
        }

        self.auth_method()?;
        Ok(())
    }

    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url `{}`: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url `{}` must use http or https",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Resolve credentials, reading secrets from the environment if configured.
    pub fn auth_method(&self) -> Result<AuthMethod, ConfigError> {
        let auth = &self.auth;
        match auth.scheme {
            AuthScheme::None => Ok(AuthMethod::None),
            AuthScheme::Basic => {
                let username = auth
                    .username
                    .clone()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| ConfigError::Invalid("basic auth requires a username".into()))?;
                let password =
                    secret(auth.password.as_deref(), auth.password_env.as_deref()).unwrap_or_default();
                Ok(AuthMethod::BasicAuth { username, password })
            }
            AuthScheme::Bearer => {
                let token = secret(auth.token.as_deref(), auth.token_env.as_deref())
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| ConfigError::Invalid("bearer auth requires a token".into()))?;
                Ok(AuthMethod::BearerToken { token })
            }
        }
    }

    pub fn client_options(&self) -> Result<ClientOptions, ConfigError> {
        Ok(ClientOptions {
            base_url: self.parsed_base_url()?,
            auth: self.auth_method()?,
            timeout: Duration::from_secs(self.timeout_secs),
            verify_tls: self.verify_tls,
            retry: RetryPolicy {
                attempts: self.retry.attempts,
                delay: Duration::from_millis(self.retry.delay_ms),
            },
        })
    }
}

fn secret(inline: Option<&str>, env_var: Option<&str>) -> Option<String> {
    if let Some(value) = inline {
        return Some(value.to_string());
    }
    env_var.and_then(|name| std::env::var(name).ok())
}
