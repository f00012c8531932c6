use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::HttpMethod;

/// One declared test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    /// Exact status to expect instead of "any 2xx".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    #[serde(default)]
    pub expect_failure: bool,
}

impl TestCase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            expected_status: None,
            expect_failure: false,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        if let Value::Object(fields) = payload {
            self.payload = Some(fields);
        }
        self
    }
}

/// The test cases declared for one API resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointDescriptor {
    pub uri: String,
    #[serde(default)]
    pub get_tests: Vec<TestCase>,
    #[serde(default)]
    pub post_tests: Vec<TestCase>,
    #[serde(default)]
    pub put_tests: Vec<TestCase>,
    #[serde(default)]
    pub delete_tests: Vec<TestCase>,
}

impl EndpointDescriptor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            get_tests: Vec::new(),
            post_tests: Vec::new(),
            put_tests: Vec::new(),
            delete_tests: Vec::new(),
        }
    }

    pub fn cases(&self, method: HttpMethod) -> &[TestCase] {
        match method {
            HttpMethod::Get => &self.get_tests,
            HttpMethod::Post => &self.post_tests,
            HttpMethod::Put => &self.put_tests,
            HttpMethod::Delete => &self.delete_tests,
        }
    }

    pub fn case_count(&self) -> usize {
        HttpMethod::ORDER.iter().map(|m| self.cases(*m).len()).sum()
    }

    /// Every shape problem in the descriptor; empty when it is valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let uri = self.uri.trim();
        if uri.is_empty() {
            problems.push("uri must not be empty".to_string());
        } else if !uri.starts_with('/') {
            problems.push(format!("uri `{uri}` must start with `/`"));
        }

        for method in HttpMethod::ORDER {
            let mut seen = HashSet::new();
            for (index, case) in self.cases(method).iter().enumerate() {
                let name = case.name.trim();
                if name.is_empty() {
                    problems.push(format!("{method} case #{} has an empty name", index + 1));
                } else if !seen.insert(name) {
                    problems.push(format!("{method} case name `{name}` is declared more than once"));
                }

                if let Some(status) = case.expected_status {
                    if !(100..=599).contains(&status) {
                        problems.push(format!(
                            "{method} case `{name}` expects out-of-range status {status}"
                        ));
                    }
                }
            }
        }

        problems
    }
}
