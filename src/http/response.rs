use std::collections::HashMap;

/// What came back from the target, whatever the status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration_ms: u64,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
