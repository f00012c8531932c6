//! Declarative end-to-end testing for configuration-management REST APIs.
//!
//! Endpoint descriptors declare, per HTTP method, the cases to send to one
//! API resource. The engine discovers them, runs each descriptor's cases in
//! GET, POST, PUT, DELETE order against the target, validates the responses
//! and aggregates the outcomes into a single run report.

pub mod auth;
pub mod cli;
pub mod collections;
pub mod config;
pub mod environment;
pub mod error;
pub mod fixture;
pub mod history;
pub mod http;
pub mod logging;
pub mod testing;
