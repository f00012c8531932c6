use serde_json::Value;

use crate::http::{HttpMethod, RawResponse};

use super::Outcome;
use super::case::TestCase;

/// Longest body excerpt carried in a failure detail.
pub const BODY_EXCERPT_LIMIT: usize = 240;

/// Envelope fields that carry the server's own verdict.
const ENVELOPE_FIELDS: [&str; 4] = ["status", "return", "error", "code"];

/// What the response body says about the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyVerdict {
    Clean,
    ErrorIndicated(String),
    Malformed(String),
}

/// Judge one response against the expectations of its case.
pub fn validate(
    descriptor_uri: &str,
    method: HttpMethod,
    response: &RawResponse,
    case: &TestCase,
) -> Outcome {
    let failure = if case.expect_failure {
        check_expected_failure(response, case)
    } else {
        check_success(method, response, case)
    };

    Outcome {
        descriptor_uri: descriptor_uri.to_string(),
        method,
        case_name: case.name.clone(),
        passed: failure.is_none(),
        status_code: Some(response.status_code),
        duration_ms: response.duration_ms,
        detail: failure.map(|reason| {
            format!(
                "{reason}; observed status {}; body: {}",
                response.status_code,
                excerpt(&response.body)
            )
        }),
    }
}

fn check_success(method: HttpMethod, response: &RawResponse, case: &TestCase) -> Option<String> {
    match case.expected_status {
        Some(expected) if response.status_code != expected => {
            return Some(format!("expected status {expected}"));
        }
        None if !response.is_success() => return Some("expected a 2xx status".to_string()),
        _ => {}
    }

    // DELETE only has to succeed; the others must also carry a clean envelope.
    // An overridden non-2xx status already describes the expected error.
    if method == HttpMethod::Delete || response.status_code == 204 || !response.is_success() {
        return None;
    }

    match inspect_body(&response.body) {
        BodyVerdict::Clean => None,
        BodyVerdict::ErrorIndicated(reason) => Some(format!("server reported an error ({reason})")),
        BodyVerdict::Malformed(reason) => Some(format!("malformed response body ({reason})")),
    }
}

fn check_expected_failure(response: &RawResponse, case: &TestCase) -> Option<String> {
    if let Some(expected) = case.expected_status {
        return (response.status_code != expected)
            .then(|| format!("expected failure status {expected}"));
    }

    if !response.is_success() {
        return None;
    }

    match inspect_body(&response.body) {
        BodyVerdict::ErrorIndicated(_) => None,
        _ => Some("expected the request to fail, but it succeeded".to_string()),
    }
}

/// Read the status/error envelope out of a JSON body.
pub fn inspect_body(body: &str) -> BodyVerdict {
    if body.trim().is_empty() {
        return BodyVerdict::Malformed("empty body".into());
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => return BodyVerdict::Malformed(format!("not JSON: {err}")),
    };

    let Some(envelope) = parsed.as_object() else {
        return BodyVerdict::Malformed("expected a JSON object".into());
    };

    if !ENVELOPE_FIELDS.iter().any(|field| envelope.contains_key(*field)) {
        return BodyVerdict::Malformed("no status or error field in response".into());
    }

    if let Some(Value::String(status)) = envelope.get("status") {
        if !status.eq_ignore_ascii_case("ok") && !status.eq_ignore_ascii_case("success") {
            return BodyVerdict::ErrorIndicated(format!("status `{status}`"));
        }
    }

    if let Some(code) = envelope.get("return").and_then(Value::as_i64) {
        if code != 0 {
            return BodyVerdict::ErrorIndicated(format!("return code {code}"));
        }
    }

    if let Some(code) = envelope.get("code").and_then(Value::as_u64) {
        if code >= 400 {
            return BodyVerdict::ErrorIndicated(format!("code {code}"));
        }
    }

    match envelope.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => BodyVerdict::Clean,
        Some(Value::String(message)) if message.is_empty() => BodyVerdict::Clean,
        Some(Value::String(message)) => BodyVerdict::ErrorIndicated(format!("error `{message}`")),
        Some(other) => BodyVerdict::ErrorIndicated(format!("error {other}")),
    }
}

/// Shorten a body for reports, on a char boundary.
pub fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "<empty>".to_string();
    }
    match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
