//! # Testing
//!
//! The test-execution engine: the case model, the per-descriptor runner, the
//! response validator, the result reporter and the run driver tying them
//! together.

pub mod case;
pub mod report;
pub mod runner;
pub mod session;
pub mod validator;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::http::HttpMethod;

pub use case::{EndpointDescriptor, TestCase};
pub use report::{MethodSummary, Reporter, RunReport};
pub use runner::SuiteRunner;
pub use session::{RunMode, Session};

/// Result of executing one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub descriptor_uri: String,
    pub method: HttpMethod,
    pub case_name: String,
    pub passed: bool,
    /// Absent when no response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Outcome {
    pub fn transport_failure(
        descriptor_uri: &str,
        method: HttpMethod,
        case_name: &str,
        err: &TransportError,
    ) -> Self {
        Self {
            descriptor_uri: descriptor_uri.to_string(),
            method,
            case_name: case_name.to_string(),
            passed: false,
            status_code: None,
            duration_ms: 0,
            detail: Some(format!("transport error: {err}")),
        }
    }
}
