//! # Fixtures
//!
//! Run-scoped values shared by the cases of a descriptor, so that a POST, the
//! PUT after it and the DELETE at the end all address the same resource.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix on every generated id, making leftovers easy to spot on the target.
pub const FIXTURE_ID_PREFIX: &str = "e2e_";

const FIXTURE_ID_HEX_LEN: usize = 12;

/// A lazily generated id, immutable once created.
#[derive(Debug, Default)]
pub struct Fixture {
    id: OnceLock<String>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared id. Generated on first call, identical on every later call.
    pub fn get_shared_id(&self) -> &str {
        self.id.get_or_init(generate_id)
    }

    /// Whether any case has referenced the id yet.
    pub fn is_initialized(&self) -> bool {
        self.id.get().is_some()
    }
}

fn generate_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{FIXTURE_ID_PREFIX}{}", &hex[..FIXTURE_ID_HEX_LEN])
}

/// How widely one fixture is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureScope {
    /// Every descriptor gets its own fixture.
    #[default]
    Descriptor,
    /// One fixture for the whole run. Only valid for sequential runs.
    Run,
}

/// Hands out fixtures according to the configured scope.
#[derive(Debug)]
pub struct FixtureGenerator {
    scope: FixtureScope,
    run_fixture: Arc<Fixture>,
}

impl FixtureGenerator {
    pub fn new(scope: FixtureScope) -> Self {
        Self {
            scope,
            run_fixture: Arc::new(Fixture::new()),
        }
    }

    /// Fixture for the next descriptor to execute.
    pub fn next_fixture(&self) -> Arc<Fixture> {
        match self.scope {
            FixtureScope::Descriptor => Arc::new(Fixture::new()),
            FixtureScope::Run => Arc::clone(&self.run_fixture),
        }
    }
}
