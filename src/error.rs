//! Error taxonomy for the runner.
//!
//! Transport and validation failures are captured as data inside an
//! [`Outcome`](crate::testing::Outcome); only the kinds below ever travel
//! as `Err` values.

use std::path::PathBuf;

/// Network-level failure while talking to the target API.
///
/// Aborts the remaining cases of the current descriptor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("invalid URI `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("DNS lookup failed for {url}: {message}")]
    Dns { url: String, message: String },

    #[error("TLS handshake with {url} failed: {message}")]
    Tls { url: String, message: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("failed to read response from {url}: {message}")]
    Io { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Classify a reqwest failure for the given request URL.
    ///
    /// reqwest's own message only names the URL, so the kind and the message
    /// come from the underlying causes.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            return Self::Timeout { url };
        }

        let causes = cause_chain(err);
        let message = if causes.is_empty() {
            err.to_string()
        } else {
            causes.join(": ")
        };

        match classify_causes(&causes) {
            Some(CauseKind::Dns) => Self::Dns { url, message },
            Some(CauseKind::Tls) => Self::Tls { url, message },
            Some(CauseKind::Connect) => Self::Connect { url, message },
            None if err.is_connect() => Self::Connect { url, message },
            None if err.is_builder() => Self::InvalidUri {
                uri: url,
                reason: message,
            },
            None => Self::Io { url, message },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CauseKind {
    Dns,
    Tls,
    Connect,
}

/// Messages of every error below `err`, outermost first, without repeats.
fn cause_chain(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut causes: Vec<String> = Vec::new();
    for cause in std::iter::successors(err.source(), |e| e.source()) {
        let text = cause.to_string();
        if !text.is_empty() && causes.last() != Some(&text) {
            causes.push(text);
        }
    }
    causes
}

fn classify_causes(causes: &[String]) -> Option<CauseKind> {
    let lowered = causes.join(" ").to_ascii_lowercase();
    if lowered.contains("dns error") || lowered.contains("failed to lookup address") {
        Some(CauseKind::Dns)
    } else if lowered.contains("certificate")
        || lowered.contains("tls")
        || lowered.contains("handshake")
    {
        Some(CauseKind::Tls)
    } else if lowered.contains("connection refused")
        || lowered.contains("tcp connect error")
        || lowered.contains("connection reset")
    {
        Some(CauseKind::Connect)
    } else {
        None
    }
}

/// A descriptor file that does not match the required shape.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", origin.display())]
pub struct SchemaError {
    pub origin: PathBuf,
    pub message: String,
}

impl SchemaError {
    pub fn new(origin: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// `finalize()` was called more than once on the same reporter.
    #[error("run report has already been finalized")]
    AlreadyFinalized,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to create history directory `{}`: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode run report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no recorded run with id {0}")]
    RunNotFound(i64),
}
