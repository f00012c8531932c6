//! Test suite runner.
//!
//! Executes one descriptor's cases strictly in sequence: every GET, then every
//! POST, PUT and DELETE, each list in declared order. Later cases rely on
//! resources created by earlier ones, so nothing inside a descriptor runs
//! concurrently.

use serde_json::{Map, Value};
use tracing::{debug, error, instrument, warn};

use crate::environment::Environment;
use crate::fixture::Fixture;
use crate::http::{ApiClient, HttpMethod};

use super::Outcome;
use super::case::{EndpointDescriptor, TestCase};
use super::validator;

/// Payload field naming the resource a PUT or DELETE acts on.
pub const TARGET_ID_FIELD: &str = "id";

#[derive(Debug, Clone)]
pub struct SuiteRunner {
    client: ApiClient,
    environment: Environment,
}

/// Per-descriptor progress that later cases depend on.
#[derive(Debug, Default)]
struct DescriptorState {
    created: bool,
}

impl SuiteRunner {
    pub fn new(client: ApiClient, environment: Environment) -> Self {
        Self {
            client,
            environment,
        }
    }

    /// Run every case of `descriptor`, returning one outcome per executed case.
    ///
    /// A transport failure is recorded against the case that hit it and ends
    /// the descriptor; no further cases are sent.
    pub async fn run(&self, descriptor: &EndpointDescriptor, fixture: &Fixture) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(descriptor.case_count());
        self.run_each(descriptor, fixture, |outcome| outcomes.push(outcome))
            .await;
        outcomes
    }

    /// Like [`run`](Self::run), handing each outcome to `on_outcome` as soon
    /// as its case finishes.
    #[instrument(skip_all, fields(uri = %descriptor.uri))]
    pub async fn run_each(
        &self,
        descriptor: &EndpointDescriptor,
        fixture: &Fixture,
        mut on_outcome: impl FnMut(Outcome),
    ) {
        let mut state = DescriptorState::default();

        for method in HttpMethod::ORDER {
            for case in descriptor.cases(method) {
                let payload = self.prepare_payload(method, case, fixture, &state);
                debug!(%method, case = %case.name, ?payload, "executing case");

                let response = match self
                    .client
                    .send(method, &descriptor.uri, payload.as_ref())
                    .await
                {
                    Ok(response) => response,
                    Err(err) => {
                        error!(
                            %method,
                            case = %case.name,
                            error = %err,
                            "transport failure, skipping remaining cases of descriptor"
                        );
                        on_outcome(Outcome::transport_failure(
                            &descriptor.uri,
                            method,
                            &case.name,
                            &err,
                        ));
                        return;
                    }
                };

                let outcome = validator::validate(&descriptor.uri, method, &response, case);
                if outcome.passed {
                    if method == HttpMethod::Post && !case.expect_failure {
                        state.created = true;
                    }
                } else {
                    warn!(
                        %method,
                        case = %case.name,
                        status = response.status_code,
                        detail = outcome.detail.as_deref().unwrap_or_default(),
                        "case failed"
                    );
                }
                on_outcome(outcome);
            }
        }
    }

    /// The body (or GET query) a case is sent with, placeholders resolved.
    fn prepare_payload(
        &self,
        method: HttpMethod,
        case: &TestCase,
        fixture: &Fixture,
        state: &DescriptorState,
    ) -> Option<Value> {
        let mut payload = case
            .payload
            .as_ref()
            .map(|fields| self.environment.resolve(&Value::Object(fields.clone()), fixture));

        if method.targets_existing() && state.created {
            let fields = payload.get_or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(fields) = fields {
                fields
                    .entry(TARGET_ID_FIELD)
                    .or_insert_with(|| Value::String(fixture.get_shared_id().to_string()));
            }
        }

        payload
    }
}
