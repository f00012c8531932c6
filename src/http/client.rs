use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::AuthMethod;
use crate::error::TransportError;

use super::method::HttpMethod;
use super::request::resolve_url;
use super::response::RawResponse;

/// How transport failures are retried. HTTP statuses are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 0,
            delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: Url,
    pub auth: AuthMethod,
    pub timeout: Duration,
    pub verify_tls: bool,
    pub retry: RetryPolicy,
}

/// Authenticated HTTP access to the API under test.
///
/// One instance is built per run; the underlying connection pool is released
/// when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: AuthMethod,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(options: ClientOptions) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10));

        if !options.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| TransportError::Client(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: options.base_url,
            auth: options.auth,
            retry: options.retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send one request. Any HTTP status comes back as `Ok`; only failures to
    /// get a response at all are `Err`.
    pub async fn send(
        &self,
        method: HttpMethod,
        uri: &str,
        payload: Option<&Value>,
    ) -> Result<RawResponse, TransportError> {
        let mut url = resolve_url(&self.base_url, uri)?;
        // GET payloads travel as query parameters.
        if let (false, Some(Value::Object(fields))) = (method.sends_body(), payload) {
            if !fields.is_empty() {
                let mut query_pairs = url.query_pairs_mut();
                for (key, value) in fields {
                    query_pairs.append_pair(key, &query_value(value));
                }
            }
        }

        let mut last_error = None;
        for attempt in 0..=self.retry.attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay).await;
            }

            match self.send_once(method, &url, payload).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt < self.retry.attempts {
                        warn!(%method, url = %url, attempt, error = %err, "transport failure, retrying");
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TransportError::Client("request was never sent".into())))
    }

    async fn send_once(
        &self,
        method: HttpMethod,
        url: &Url,
        payload: Option<&Value>,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self
            .client
            .request(method.into(), url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        request = self.auth.apply(request);

        if method.sends_body() {
            if let Some(body) = payload {
                request = request.json(body);
            }
        }

        debug!(%method, url = %url, "sending request");
        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(url.as_str(), &err))?;

        let status_code = response.status().as_u16();
        let headers = format_headers(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::from_reqwest(url.as_str(), &err))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        Ok(RawResponse {
            status_code,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            duration_ms,
        })
    }
}

fn format_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect()
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
