//! End-to-end runs of the engine against stub servers.

mod common;

use std::time::Duration;

use api_e2e::auth::AuthMethod;
use api_e2e::environment::Environment;
use api_e2e::fixture::{FIXTURE_ID_PREFIX, Fixture};
use api_e2e::http::HttpMethod;
use api_e2e::testing::{EndpointDescriptor, Reporter, SuiteRunner};
use common::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn tunable_chain_passes_against_ok_stub() {
    let server = MockServer::start().await;
    Mock::given(path(TUNABLE_URI))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let report = run_session(runner_for(&server), vec![tunable_descriptor()], 1).await;

    assert_eq!(report.total, 3);
    assert!(report.outcomes.iter().all(|o| o.passed));
    assert!(report.overall_success);
    let names: Vec<_> = report.outcomes.iter().map(|o| o.case_name.as_str()).collect();
    assert_eq!(names, ["create", "update", "remove"]);
}

#[tokio::test]
async fn put_failure_does_not_block_delete() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(TUNABLE_URI))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"status": "server error"})))
        .mount(&server)
        .await;
    Mock::given(path(TUNABLE_URI))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let report = run_session(runner_for(&server), vec![tunable_descriptor()], 1).await;

    assert_eq!(report.total, 3);
    assert!(!report.overall_success);
    let failed: Vec<_> = report.failures().map(|o| o.case_name.as_str()).collect();
    assert_eq!(failed, ["update"]);

    let update = &report.outcomes[1];
    assert_eq!(update.status_code, Some(500));
    let detail = update.detail.as_deref().unwrap();
    assert!(detail.contains("500"));
    assert!(detail.contains("server error"));

    assert!(report.outcomes[0].passed);
    assert!(report.outcomes[2].passed);
}

#[tokio::test]
async fn chain_reuses_one_fixture_id() {
    let server = MockServer::start().await;
    Mock::given(path(TUNABLE_URI))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let outcomes = runner_for(&server).run(&tunable_descriptor(), &fixture).await;
    assert_eq!(outcomes.len(), 3);

    let requests = received(&server).await;
    assert_eq!(requests.len(), 3);
    let created = body_json(&requests[0])["tunable"].clone();
    let updated = body_json(&requests[1])["id"].clone();
    let removed = body_json(&requests[2])["id"].clone();

    assert_eq!(created, json!(fixture.get_shared_id()));
    assert_eq!(created, updated);
    assert_eq!(updated, removed);
    assert!(created.as_str().unwrap().starts_with(FIXTURE_ID_PREFIX));
}

#[tokio::test]
async fn methods_execute_in_dependency_order() {
    let server = MockServer::start().await;
    Mock::given(path(TUNABLE_URI))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    // Lists declared out of order on purpose.
    let descriptor: EndpointDescriptor = serde_json::from_value(json!({
        "uri": TUNABLE_URI,
        "delete_tests": [{"name": "remove"}],
        "put_tests": [{"name": "update one"}, {"name": "update two"}],
        "get_tests": [{"name": "read"}],
        "post_tests": [{"name": "create", "payload": {"tunable": "{{uid}}"}}]
    }))
    .unwrap();

    let outcomes = runner_for(&server).run(&descriptor, &Fixture::new()).await;
    let order: Vec<_> = outcomes.iter().map(|o| (o.method, o.case_name.as_str())).collect();
    assert_eq!(
        order,
        [
            (HttpMethod::Get, "read"),
            (HttpMethod::Post, "create"),
            (HttpMethod::Put, "update one"),
            (HttpMethod::Put, "update two"),
            (HttpMethod::Delete, "remove"),
        ]
    );

    let methods: Vec<_> = received(&server)
        .await
        .iter()
        .map(|r| r.method.as_str().to_string())
        .collect();
    assert_eq!(methods, ["GET", "POST", "PUT", "PUT", "DELETE"]);
}

#[tokio::test]
async fn transport_error_aborts_rest_of_descriptor_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"step": 2})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let broken: EndpointDescriptor = serde_json::from_value(json!({
        "uri": "/api/v1/firewall/alias",
        "post_tests": [
            {"name": "first", "payload": {"step": 1}},
            {"name": "second", "payload": {"step": 2}},
            {"name": "third", "payload": {"step": 3}},
            {"name": "fourth", "payload": {"step": 4}}
        ],
        "put_tests": [{"name": "never sent"}]
    }))
    .unwrap();
    let healthy: EndpointDescriptor = serde_json::from_value(json!({
        "uri": "/api/v1/services/sshd",
        "get_tests": [{"name": "read"}],
        "put_tests": [{"name": "update", "payload": {"port": 2222}}],
        "delete_tests": [{"name": "remove"}]
    }))
    .unwrap();

    let runner = SuiteRunner::new(
        client_for(&server, Duration::from_millis(500), AuthMethod::None),
        Environment::default(),
    );
    let report = run_session(runner, vec![broken, healthy], 1).await;

    let alias: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.descriptor_uri == "/api/v1/firewall/alias")
        .collect();
    assert_eq!(alias.len(), 2);
    assert!(alias[0].passed);
    assert_eq!(alias[1].case_name, "second");
    assert!(!alias[1].passed);
    assert_eq!(alias[1].status_code, None);
    assert!(alias[1].detail.as_deref().unwrap().contains("transport error"));

    let sshd: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.descriptor_uri == "/api/v1/services/sshd")
        .collect();
    assert_eq!(sshd.len(), 3);
    assert!(sshd.iter().all(|o| o.passed));

    assert!(!report.overall_success);
    assert_eq!(report.total, 5);
}

#[tokio::test]
async fn expected_failure_case_passes_on_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"status": "bad request", "return": 2001})),
        )
        .mount(&server)
        .await;

    let descriptor: EndpointDescriptor = serde_json::from_value(json!({
        "uri": "/api/v1/services/sshd",
        "put_tests": [{"name": "Reject invalid port", "payload": {"port": 99999}, "expect_failure": true}]
    }))
    .unwrap();

    let report = run_session(runner_for(&server), vec![descriptor], 1).await;
    assert!(report.overall_success);
    assert_eq!(report.total, 1);
}

#[tokio::test]
async fn empty_lists_emit_no_outcomes() {
    let server = MockServer::start().await;
    let descriptor = EndpointDescriptor::new("/api/v1/status/system");

    let report = run_session(runner_for(&server), vec![descriptor], 1).await;
    assert_eq!(report.total, 0);
    assert!(report.overall_success);
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn parallel_descriptors_get_distinct_fixtures() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let descriptors: Vec<EndpointDescriptor> = (0..4)
        .map(|i| {
            serde_json::from_value(json!({
                "uri": format!("/api/v1/system/tunable/{i}"),
                "post_tests": [{"name": "create", "payload": {"tunable": "{{uid}}"}}]
            }))
            .unwrap()
        })
        .collect();

    let report = run_session(runner_for(&server), descriptors, 4).await;
    assert_eq!(report.total, 4);
    assert!(report.overall_success);

    let mut ids: Vec<String> = received(&server)
        .await
        .iter()
        .map(|r| body_json(r)["tunable"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn abort_stops_launching_descriptors() {
    let server = MockServer::start().await;
    let session = api_e2e::testing::Session::new(
        runner_for(&server),
        api_e2e::fixture::FixtureGenerator::new(api_e2e::fixture::FixtureScope::Descriptor),
        api_e2e::testing::RunMode::Serial,
    );
    let reporter = std::sync::Arc::new(Reporter::new());
    let abort = tokio_util::sync::CancellationToken::new();
    abort.cancel();

    session
        .run_all(vec![tunable_descriptor(), tunable_descriptor()], &reporter, &abort)
        .await;

    let report = reporter.finalize().unwrap();
    assert!(report.aborted);
    assert_eq!(report.skipped_descriptors, 2);
    assert_eq!(report.total, 0);
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn target_id_injected_after_successful_create() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let descriptor: EndpointDescriptor = serde_json::from_value(json!({
        "uri": TUNABLE_URI,
        "post_tests": [{"name": "create", "payload": {"tunable": "{{uid}}"}}],
        "put_tests": [{"name": "update", "payload": {"value": 2}}],
        "delete_tests": [{"name": "remove"}]
    }))
    .unwrap();

    let fixture = Fixture::new();
    let outcomes = runner_for(&server).run(&descriptor, &fixture).await;
    assert!(outcomes.iter().all(|o| o.passed));

    let requests = received(&server).await;
    assert_eq!(body_json(&requests[1])["id"], json!(fixture.get_shared_id()));
    assert_eq!(body_json(&requests[2]), json!({"id": fixture.get_shared_id()}));
}

#[tokio::test]
async fn abort_mid_run_lets_running_descriptor_finish() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/services/sshd"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let slow: EndpointDescriptor = serde_json::from_value(json!({
        "uri": "/api/v1/services/sshd",
        "get_tests": [{"name": "read"}],
        "put_tests": [{"name": "update", "payload": {"port": "2222"}}]
    }))
    .unwrap();

    let session = api_e2e::testing::Session::new(
        runner_for(&server),
        api_e2e::fixture::FixtureGenerator::new(api_e2e::fixture::FixtureScope::Descriptor),
        api_e2e::testing::RunMode::Serial,
    );
    let reporter = std::sync::Arc::new(Reporter::new());
    let abort = tokio_util::sync::CancellationToken::new();

    let trigger = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    session
        .run_all(
            vec![slow, tunable_descriptor(), tunable_descriptor()],
            &reporter,
            &abort,
        )
        .await;

    let report = reporter.finalize().unwrap();
    assert!(report.aborted);
    assert_eq!(report.skipped_descriptors, 2);
    let names: Vec<_> = report.outcomes.iter().map(|o| o.case_name.as_str()).collect();
    assert_eq!(names, ["read", "update"]);
    assert!(report.outcomes.iter().all(|o| o.passed));
    assert_eq!(received(&server).await.len(), 2);
}
