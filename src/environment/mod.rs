//! # Placeholder interpolation
//!
//! Payload strings may embed `{{name}}` placeholders. `{{uid}}` resolves to
//! the descriptor's fixture id; any other name is looked up in the run
//! variables from config. Unknown placeholders are left untouched.

use std::collections::HashMap;

use serde_json::Value;

use crate::fixture::Fixture;

/// Placeholder name bound to the shared fixture id.
pub const FIXTURE_ID_VARIABLE: &str = "uid";

/// Run-level variables available to every payload.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, String>,
}

impl Environment {
    pub fn new(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    /// Resolve every placeholder inside `payload`, walking nested objects and
    /// arrays. Only string values are rewritten; keys are left alone.
    pub fn resolve(&self, payload: &Value, fixture: &Fixture) -> Value {
        match payload {
            Value::String(text) => Value::String(self.interpolate(text, fixture)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.resolve(item, fixture)).collect())
            }
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), self.resolve(value, fixture)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Interpolate `{{variable}}` placeholders in the given text.
    ///
    /// The fixture id is only generated when a `{{uid}}` placeholder is
    /// actually present.
    pub fn interpolate(&self, text: &str, fixture: &Fixture) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let name = rest[start + 2..start + 2 + len].trim();
            let end = start + 2 + len + 2;

            result.push_str(&rest[..start]);
            match self.lookup(name, fixture) {
                Some(value) => result.push_str(&value),
                None => result.push_str(&rest[start..end]),
            }
            rest = &rest[end..];
        }

        result.push_str(rest);
        result
    }

    fn lookup(&self, name: &str, fixture: &Fixture) -> Option<String> {
        if name == FIXTURE_ID_VARIABLE {
            return Some(fixture.get_shared_id().to_string());
        }
        self.variables.get(name).cloned()
    }
}
