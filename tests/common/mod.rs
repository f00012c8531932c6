#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use api_e2e::auth::AuthMethod;
use api_e2e::environment::Environment;
use api_e2e::fixture::{FixtureGenerator, FixtureScope};
use api_e2e::http::{ApiClient, ClientOptions, RetryPolicy};
use api_e2e::testing::{EndpointDescriptor, Reporter, RunMode, RunReport, Session, SuiteRunner};
use reqwest::Url;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::{MockServer, Request};

pub const TUNABLE_URI: &str = "/api/v1/system/tunable";

pub fn client_for(server: &MockServer, timeout: Duration, auth: AuthMethod) -> ApiClient {
    ApiClient::new(ClientOptions {
        base_url: Url::parse(&server.uri()).unwrap(),
        auth,
        timeout,
        verify_tls: true,
        retry: RetryPolicy::default(),
    })
    .unwrap()
}

pub fn runner_for(server: &MockServer) -> SuiteRunner {
    SuiteRunner::new(
        client_for(server, Duration::from_secs(5), AuthMethod::None),
        Environment::default(),
    )
}

/// The create/update/delete chain against the tunable resource.
pub fn tunable_descriptor() -> EndpointDescriptor {
    serde_json::from_value(json!({
        "uri": TUNABLE_URI,
        "post_tests": [{"name": "create", "payload": {"tunable": "{{uid}}", "value": 0}}],
        "put_tests": [{"name": "update", "payload": {"id": "{{uid}}", "value": 2}}],
        "delete_tests": [{"name": "remove", "payload": {"id": "{{uid}}"}}]
    }))
    .unwrap()
}

pub fn ok_body() -> Value {
    json!({"status": "ok"})
}

pub async fn run_session(
    runner: SuiteRunner,
    descriptors: Vec<EndpointDescriptor>,
    concurrency: usize,
) -> RunReport {
    let session = Session::new(
        runner,
        FixtureGenerator::new(FixtureScope::Descriptor),
        RunMode::from_concurrency(concurrency),
    );
    let reporter = Arc::new(Reporter::new());
    session
        .run_all(descriptors, &reporter, &CancellationToken::new())
        .await;
    reporter.finalize().unwrap()
}

pub async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

pub fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap_or(Value::Null)
}
