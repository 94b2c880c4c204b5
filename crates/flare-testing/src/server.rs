//! Mock ingestion endpoint for transport tests.

use std::{io::Read, time::Duration};

use flare_core::Dsn;
use flate2::read::{GzDecoder, ZlibDecoder};
use http::HeaderMap;
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

use crate::fixtures::PROJECT_ID;

/// Canned behaviours of the mock endpoint.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// `200` with `{"id": <id>}`.
    Accepted {
        /// Identifier to acknowledge with.
        id: String,
    },
    /// `200` with an empty body.
    Empty,
    /// `200` with an arbitrary body, typically not valid JSON.
    Malformed {
        /// Raw response body.
        body: String,
    },
    /// Non-success status with an optional `X-Sentry-Error` reason.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Value for the `X-Sentry-Error` header.
        reason: Option<String>,
    },
    /// `200` with `{"id": <id>}` after `delay`.
    Delayed {
        /// How long to wait before answering.
        delay: Duration,
        /// Identifier to acknowledge with.
        id: String,
    },
    /// `200` acknowledging each request with its own `event_id`.
    EchoEventId,
}

impl MockResponse {
    /// Shorthand for an acceptance with `id`.
    pub fn accepted(id: impl Into<String>) -> Self {
        Self::Accepted { id: id.into() }
    }
}

/// Ingestion endpoint serving `POST /api/<PROJECT_ID>/store/`.
pub struct MockIngestServer {
    server: MockServer,
}

impl MockIngestServer {
    /// Starts a new mock server on a random port.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Base URL of the server.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Path events are posted to.
    pub fn store_path(&self) -> String {
        format!("/api/{PROJECT_ID}/store/")
    }

    /// DSN pointing at this server with both public and secret keys.
    pub fn dsn(&self) -> Dsn {
        self.dsn_with_keys("public", Some("secret"))
    }

    /// DSN pointing at this server with the given key material.
    pub fn dsn_with_keys(&self, public_key: &str, secret_key: Option<&str>) -> Dsn {
        let base = self.url();
        let host = base.trim_start_matches("http://");
        let credentials = match secret_key {
            Some(secret) => format!("{public_key}:{secret}"),
            None => public_key.to_string(),
        };
        format!("http://{credentials}@{host}/{PROJECT_ID}")
            .parse()
            .expect("mock server address should form a valid DSN")
    }

    /// Serves `response` for every event posted to the store path.
    pub async fn respond_with(&self, response: MockResponse) {
        let mock = Mock::given(method("POST")).and(path(self.store_path()));

        let mock = match response {
            MockResponse::Accepted { id } => mock.respond_with(acknowledge(&id)),
            MockResponse::Empty => mock.respond_with(ResponseTemplate::new(200)),
            MockResponse::Malformed { body } => {
                mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
            },
            MockResponse::Rejected { status, reason } => {
                let mut template = ResponseTemplate::new(status);
                if let Some(reason) = reason {
                    template = template.insert_header("X-Sentry-Error", reason.as_str());
                }
                mock.respond_with(template)
            },
            MockResponse::Delayed { delay, id } => {
                mock.respond_with(acknowledge(&id).set_delay(delay))
            },
            MockResponse::EchoEventId => mock.respond_with(EchoEventId),
        };

        mock.mount(&self.server).await;
    }

    /// Requests received so far, with bodies decompressed.
    pub async fn received_requests(&self) -> Vec<RecordedRequest> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(RecordedRequest::from_wiremock)
            .collect()
    }

    /// Asserts that exactly `expected` requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let requests = self.received_requests().await;
        assert_eq!(
            requests.len(),
            expected,
            "Expected {} requests, received {}",
            expected,
            requests.len()
        );
    }
}

fn acknowledge(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "id": id }))
}

/// Acknowledges each event with the `event_id` it carried.
struct EchoEventId;

impl Respond for EchoEventId {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let recorded = RecordedRequest::from_wiremock(request);
        match recorded.json().get("event_id").and_then(Value::as_str) {
            Some(event_id) => acknowledge(event_id),
            None => ResponseTemplate::new(400),
        }
    }
}

/// A request captured by the mock endpoint.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request headers.
    pub headers: HeaderMap,
    /// Body exactly as it arrived on the wire.
    pub raw_body: Vec<u8>,
    /// Body after undoing any `Content-Encoding`.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    fn from_wiremock(request: &Request) -> Self {
        let headers = request.headers.clone();
        let encoding = headers.get("content-encoding").and_then(|v| v.to_str().ok());
        let body = decode_body(encoding, &request.body);
        Self { raw_body: request.body.clone(), body, headers }
    }

    /// Value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decoded body as text.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decoded body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Undoes `encoding` (`gzip`, `deflate` or none) on `raw`.
pub fn decode_body(encoding: Option<&str>, raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let decoded = match encoding.map(str::to_ascii_lowercase).as_deref() {
        Some("gzip") => GzDecoder::new(raw).read_to_end(&mut out),
        Some("deflate") => ZlibDecoder::new(raw).read_to_end(&mut out),
        _ => return raw.to_vec(),
    };
    match decoded {
        Ok(_) => out,
        Err(_) => raw.to_vec(),
    }
}
