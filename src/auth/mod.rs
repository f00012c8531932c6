//! # Authentication
//!
//! Credentials attached to every request sent to the target API. Where the
//! credentials come from (config file, environment, CLI flags) is decided by
//! [`crate::config`]; this module only applies them.

use serde::{Deserialize, Serialize};

/// Supported authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    #[default]
    None,
    Basic,
    Bearer,
}

/// Resolved credentials for a run.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum AuthMethod {
    #[default]
    None,
    BasicAuth {
        username: String,
        password: String,
    },
    BearerToken {
        token: String,
    },
}

impl AuthMethod {
    pub fn scheme(&self) -> AuthScheme {
        match self {
            AuthMethod::None => AuthScheme::None,
            AuthMethod::BasicAuth { .. } => AuthScheme::Basic,
            AuthMethod::BearerToken { .. } => AuthScheme::Bearer,
        }
    }

    pub fn apply(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthMethod::None => req_builder,
            AuthMethod::BasicAuth { username, password } => {
                req_builder.basic_auth(username, Some(password))
            }
            AuthMethod::BearerToken { token } => req_builder.bearer_auth(token),
        }
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::None => write!(f, "None"),
            AuthMethod::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            AuthMethod::BearerToken { .. } => f
                .debug_struct("BearerToken")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}
