//! Integration tests for event transmission.
//!
//! Exercises the full send cycle against a mock ingestion endpoint:
//! acknowledgement decoding, failure containment, timeouts, scrubbing and
//! concurrent sends.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::{
    net::TcpListener,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use chrono::{TimeZone, Utc};
use flare_core::{
    Capture, CaptureContext, Dsn, EnvironmentPreparer, Packet, PatternScrubber, TestClock,
};
use flare_testing::{packet_for, sample_packet, MockIngestServer, MockResponse};
use flare_transport::{FaultKind, SendFault, TransportConfig, Transmitter};
use tokio::time::timeout;

fn counting_transmitter(config: TransportConfig) -> (Transmitter, Arc<Mutex<Vec<SendFault>>>) {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let recorder = faults.clone();
    let transmitter = Transmitter::builder(config)
        .fault_handler(Arc::new(move |fault: &SendFault| {
            recorder.lock().unwrap().push(fault.clone());
        }))
        .build()
        .expect("transmitter should build");
    (transmitter, faults)
}

#[tokio::test]
async fn returns_identifier_from_acknowledgement() {
    flare_testing::init_test_tracing();
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::accepted("X")).await;

    let (transmitter, faults) = counting_transmitter(TransportConfig::default());

    let id = transmitter.send(sample_packet("it broke"), &server.dsn()).await;

    assert_eq!(id.as_deref(), Some("X"));
    assert!(faults.lock().unwrap().is_empty());
    server.assert_request_count(1).await;
}

#[tokio::test]
async fn empty_acknowledgement_is_absent_without_fault() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::Empty).await;

    let (transmitter, faults) = counting_transmitter(TransportConfig::default());

    let id = transmitter.send(sample_packet("it broke"), &server.dsn()).await;

    assert_eq!(id, None);
    assert!(faults.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_acknowledgement_is_contained() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::Malformed { body: "<html>oops</html>".into() }).await;

    let (transmitter, faults) = counting_transmitter(TransportConfig::default());

    let id = transmitter.send(sample_packet("it broke"), &server.dsn()).await;

    assert_eq!(id, None);
    let faults = faults.lock().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind(), FaultKind::Protocol);
}

#[tokio::test]
async fn acknowledgement_without_id_is_contained() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::Malformed { body: r#"{"status":"ok"}"#.into() }).await;

    let (transmitter, faults) = counting_transmitter(TransportConfig::default());

    assert_eq!(transmitter.send(sample_packet("x"), &server.dsn()).await, None);
    assert!(matches!(faults.lock().unwrap()[0], SendFault::Protocol { .. }));
}

#[tokio::test]
async fn timeout_returns_absent_within_bound() {
    let server = MockIngestServer::start().await;
    server
        .respond_with(MockResponse::Delayed { delay: Duration::from_secs(5), id: "late".into() })
        .await;

    let config = TransportConfig { timeout: Duration::from_millis(200), ..Default::default() };
    let (transmitter, faults) = counting_transmitter(config);

    let started = Instant::now();
    let result = timeout(
        Duration::from_secs(2),
        transmitter.send(sample_packet("slow"), &server.dsn()),
    )
    .await
    .expect("send should finish within the configured timeout");

    assert_eq!(result, None);
    assert!(started.elapsed() < Duration::from_secs(2));
    let faults = faults.lock().unwrap();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0], SendFault::Timeout { timeout_ms: 200 }));
}

#[tokio::test]
async fn connection_failure_is_contained() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dsn: Dsn = format!("http://public@127.0.0.1:{port}/42").parse().unwrap();

    let (transmitter, faults) = counting_transmitter(TransportConfig::default());

    let result = timeout(Duration::from_secs(10), transmitter.send(sample_packet("x"), &dsn))
        .await
        .expect("send should not hang");

    assert_eq!(result, None);
    let faults = faults.lock().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind(), FaultKind::Transport);
}

#[tokio::test]
async fn compressed_body_decodes_to_packet_json() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::accepted("ok")).await;

    let (transmitter, _) = counting_transmitter(TransportConfig::default());
    let packet = sample_packet("compressed event");
    let event_id = packet.event_id.to_string();

    transmitter.send(packet, &server.dsn()).await;

    let requests = server.received_requests().await;
    let request = &requests[0];
    assert_eq!(request.header("content-encoding"), Some("gzip"));
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_ne!(request.raw_body, request.body);

    let json = request.json();
    assert_eq!(json["event_id"], event_id);
    assert_eq!(json["message"], "compressed event");
    assert!(!request.body_text().contains('\n'), "payload should be compact JSON");
}

#[tokio::test]
async fn auth_header_carries_key_material_and_clock_time() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::Empty).await;

    let sent_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let transmitter = Transmitter::builder(TransportConfig::default())
        .clock(Arc::new(TestClock::with_start_time(sent_at)))
        .build()
        .unwrap();

    transmitter.send(sample_packet("x"), &server.dsn_with_keys("pk", Some("sk"))).await;

    let requests = server.received_requests().await;
    let auth = requests[0].header("x-sentry-auth").unwrap().to_string();
    assert!(auth.starts_with("Sentry sentry_version=7"));
    assert!(auth.contains(&format!("sentry_timestamp={}", sent_at.timestamp())));
    assert!(auth.contains("sentry_key=pk"));
    assert!(auth.contains("sentry_secret=sk"));
}

#[tokio::test]
async fn auth_header_is_recomputed_per_send() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::Empty).await;

    let clock = TestClock::new();
    let transmitter =
        Transmitter::builder(TransportConfig::default()).clock(Arc::new(clock.clone())).build().unwrap();
    let dsn = server.dsn();

    transmitter.send(sample_packet("first"), &dsn).await;
    clock.advance(chrono::Duration::seconds(30));
    transmitter.send(sample_packet("second"), &dsn).await;

    let requests = server.received_requests().await;
    assert_eq!(requests.len(), 2);
    assert_ne!(requests[0].header("x-sentry-auth"), requests[1].header("x-sentry-auth"));
}

#[tokio::test]
async fn scrubbed_content_never_reaches_the_wire() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::accepted("ok")).await;

    let transmitter = Transmitter::builder(TransportConfig::default())
        .scrubber(Arc::new(PatternScrubber::standard().unwrap()))
        .build()
        .unwrap();
    let packet = packet_for(
        Capture::message("payment with 4111 1111 1111 1111 failed"),
        CaptureContext::default().extra("password", "hunter2"),
    );

    transmitter.send(packet, &server.dsn()).await;

    let requests = server.received_requests().await;
    let wire = requests[0].body_text();
    assert!(!wire.contains("4111 1111 1111 1111"));
    assert!(wire.contains("####-CC-TRUNCATED-####"));

    let uncompressed_server = MockIngestServer::start().await;
    uncompressed_server.respond_with(MockResponse::accepted("ok")).await;
    let transmitter = Transmitter::builder(TransportConfig { compression: false, ..Default::default() })
        .scrubber(Arc::new(|text: String| text.replace("hunter2", "[redacted]")))
        .build()
        .unwrap();
    let packet = packet_for(
        Capture::message("login failed"),
        CaptureContext::default().extra("password", "hunter2"),
    );

    transmitter.send(packet, &uncompressed_server.dsn()).await;

    let requests = uncompressed_server.received_requests().await;
    let raw = String::from_utf8_lossy(&requests[0].raw_body);
    assert!(!raw.contains("hunter2"));
    assert!(raw.contains("[redacted]"));
}

#[tokio::test]
async fn preparer_runs_before_serialization() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::accepted("ok")).await;

    let preparer = EnvironmentPreparer {
        release: Some("2.4.0".into()),
        environment: Some("production".into()),
        ..Default::default()
    };
    let transmitter = Transmitter::builder(TransportConfig::default())
        .preparer(Arc::new(preparer))
        .build()
        .unwrap();

    transmitter.send(sample_packet("x"), &server.dsn()).await;

    let json = server.received_requests().await[0].json();
    assert_eq!(json["release"], "2.4.0");
    assert_eq!(json["environment"], "production");
}

#[tokio::test]
async fn rejected_event_is_contained() {
    let server = MockIngestServer::start().await;
    server
        .respond_with(MockResponse::Rejected { status: 403, reason: Some("invalid key".into()) })
        .await;

    let (transmitter, faults) = counting_transmitter(TransportConfig::default());

    assert_eq!(transmitter.send(sample_packet("x"), &server.dsn()).await, None);
    assert_eq!(faults.lock().unwrap().len(), 1);
    server.assert_request_count(1).await;
}

#[tokio::test]
async fn concurrent_sends_receive_their_own_identifiers() {
    let server = MockIngestServer::start().await;
    server.respond_with(MockResponse::EchoEventId).await;

    let faults = Arc::new(AtomicUsize::new(0));
    let counter = faults.clone();
    let transmitter = Transmitter::builder(TransportConfig::default())
        .fault_handler(Arc::new(move |_: &SendFault| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();
    let dsn = server.dsn();

    let packets: Vec<Packet> = (0..16).map(|i| sample_packet(&format!("event {i}"))).collect();
    let expected: Vec<String> = packets.iter().map(|p| p.event_id.to_string()).collect();

    let handles: Vec<_> = packets
        .into_iter()
        .map(|packet| {
            let transmitter = transmitter.clone();
            let dsn = dsn.clone();
            tokio::spawn(async move { transmitter.send(packet, &dsn).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let results: Vec<String> = results.into_iter().map(|id| id.expect("send should succeed")).collect();
    assert_eq!(results, expected);
    assert_eq!(faults.load(Ordering::SeqCst), 0);
    server.assert_request_count(16).await;
}
