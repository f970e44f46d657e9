// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#[allow(dead_code)]
mod common;

use common::helpers::*;
use common::mocks::{CountingProvider, InMemoryObjectStore, RecordingSink};
use s3_log_forwarder::{
    error::ForwarderError,
    forwarder::{ForwardReport, ParseFailurePolicy},
    object_store::ObjectStoreError,
    payload::PayloadFormat,
};
use std::sync::Arc;

const BUCKET: &str = "access-logs";

#[tokio::test]
async fn test_forwards_every_line_in_record_order() {
    let store = Arc::new(
        InMemoryObjectStore::default()
            .with_object(BUCKET, "a.log", &lines(&[LINE_1, LINE_2]))
            .with_object(BUCKET, "b.log", &format!("{LINE_3}\n")),
    );
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store.clone(),
        sink.clone(),
        ParseFailurePolicy::default(),
        PayloadFormat::default(),
    );

    let report = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log"), (BUCKET, "b.log")]))
        .await
        .expect("event should be forwarded");

    assert_eq!(store.reads(), vec!["access-logs/a.log", "access-logs/b.log"]);
    assert_eq!(sink.payloads(), vec![PAYLOAD_1, PAYLOAD_2, PAYLOAD_3]);
    assert_eq!(
        report,
        ForwardReport {
            objects: 2,
            objects_aborted: 0,
            lines_read: 3,
            lines_forwarded: 3,
            lines_skipped: 0,
        }
    );
}

#[tokio::test]
async fn test_event_keys_are_decoded_before_reading() {
    let store = Arc::new(InMemoryObjectStore::default().with_object(
        BUCKET,
        "2024/01/web server.log",
        LINE_1,
    ));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store.clone(),
        sink.clone(),
        ParseFailurePolicy::default(),
        PayloadFormat::default(),
    );

    forwarder
        .handle_event(&event_for(&[(BUCKET, "2024/01/web+server.log")]))
        .await
        .expect("event should be forwarded");

    assert_eq!(store.reads(), vec!["access-logs/2024/01/web server.log"]);
    assert_eq!(sink.payloads(), vec![PAYLOAD_1]);
}

#[tokio::test]
async fn test_skip_line_policy_drops_only_malformed_lines() {
    let store = Arc::new(InMemoryObjectStore::default().with_object(
        BUCKET,
        "a.log",
        &lines(&[LINE_1, "not an access log line", "", LINE_2]),
    ));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store,
        sink.clone(),
        ParseFailurePolicy::SkipLine,
        PayloadFormat::default(),
    );

    let report = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log")]))
        .await
        .expect("event should be forwarded");

    assert_eq!(sink.payloads(), vec![PAYLOAD_1, PAYLOAD_2]);
    assert_eq!(report.lines_read, 4);
    assert_eq!(report.lines_skipped, 2);
    assert_eq!(report.lines_forwarded, 2);
    assert_eq!(report.objects_aborted, 0);
}

#[tokio::test]
async fn test_abort_object_policy_moves_on_to_next_record() {
    let store = Arc::new(
        InMemoryObjectStore::default()
            .with_object(BUCKET, "a.log", &lines(&[LINE_1, "garbage", LINE_2]))
            .with_object(BUCKET, "b.log", LINE_3),
    );
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store,
        sink.clone(),
        ParseFailurePolicy::AbortObject,
        PayloadFormat::default(),
    );

    let report = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log"), (BUCKET, "b.log")]))
        .await
        .expect("event should be forwarded");

    assert_eq!(sink.payloads(), vec![PAYLOAD_1, PAYLOAD_3]);
    assert_eq!(
        report,
        ForwardReport {
            objects: 2,
            objects_aborted: 1,
            lines_read: 3,
            lines_forwarded: 2,
            lines_skipped: 1,
        }
    );
}

#[tokio::test]
async fn test_abort_event_policy_fails_with_line_location() {
    let store = Arc::new(
        InMemoryObjectStore::default()
            .with_object(BUCKET, "a.log", &lines(&[LINE_1, "garbage", LINE_2]))
            .with_object(BUCKET, "b.log", LINE_3),
    );
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store.clone(),
        sink.clone(),
        ParseFailurePolicy::AbortEvent,
        PayloadFormat::default(),
    );

    let error = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log"), (BUCKET, "b.log")]))
        .await
        .unwrap_err();

    match error {
        ForwarderError::MalformedLine {
            bucket,
            key,
            line_number,
            ..
        } => {
            assert_eq!(bucket, BUCKET);
            assert_eq!(key, "a.log");
            assert_eq!(line_number, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.payloads(), vec![PAYLOAD_1]);
    assert_eq!(store.reads(), vec!["access-logs/a.log"]);
}

#[tokio::test]
async fn test_json_payload_format() {
    let store = Arc::new(InMemoryObjectStore::default().with_object(BUCKET, "a.log", LINE_2));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store,
        sink.clone(),
        ParseFailurePolicy::default(),
        PayloadFormat::Json,
    );

    forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log")]))
        .await
        .expect("event should be forwarded");

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "ip_address": "10.0.0.5",
            "timestamp": "11/Oct/2000:08:01:02 -0700",
            "message": "POST /login HTTP/1.1",
        })
    );
}

#[tokio::test]
async fn test_credentials_are_obtained_once_across_events() {
    let provider = Arc::new(CountingProvider::new());
    let store = Arc::new(InMemoryObjectStore::default().with_object(BUCKET, "a.log", LINE_1));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        provider.clone(),
        store,
        sink.clone(),
        ParseFailurePolicy::default(),
        PayloadFormat::default(),
    );

    let event = event_for(&[(BUCKET, "a.log")]);
    forwarder.handle_event(&event).await.unwrap();
    forwarder.handle_event(&event).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(sink.payloads(), vec![PAYLOAD_1, PAYLOAD_1]);
}

#[tokio::test]
async fn test_credential_failure_stops_before_any_read() {
    let provider = Arc::new(CountingProvider::failing());
    let store = Arc::new(InMemoryObjectStore::default().with_object(BUCKET, "a.log", LINE_1));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        provider.clone(),
        store.clone(),
        sink.clone(),
        ParseFailurePolicy::default(),
        PayloadFormat::default(),
    );

    let event = event_for(&[(BUCKET, "a.log")]);
    let error = forwarder.handle_event(&event).await.unwrap_err();
    assert!(matches!(error, ForwarderError::Credentials(_)));
    assert!(store.reads().is_empty());
    assert!(sink.payloads().is_empty());

    // failures are not cached
    assert!(forwarder.handle_event(&event).await.is_err());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_empty_event_still_resolves_credentials() {
    let provider = Arc::new(CountingProvider::new());
    let store = Arc::new(InMemoryObjectStore::default());
    let forwarder = forwarder_with(
        provider.clone(),
        store.clone(),
        Arc::new(RecordingSink::default()),
        ParseFailurePolicy::default(),
        PayloadFormat::default(),
    );

    let report = forwarder.handle_event(&event_for(&[])).await.unwrap();

    assert_eq!(report, ForwardReport::default());
    assert_eq!(provider.calls(), 1);
    assert!(store.reads().is_empty());
}

#[tokio::test]
async fn test_missing_object_aborts_event() {
    let store = Arc::new(InMemoryObjectStore::default().with_object(BUCKET, "b.log", LINE_1));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store.clone(),
        sink.clone(),
        ParseFailurePolicy::SkipLine,
        PayloadFormat::default(),
    );

    let error = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log"), (BUCKET, "b.log")]))
        .await
        .unwrap_err();

    assert!(matches!(error, ForwarderError::ObjectStore(_)));
    assert_eq!(error.kind(), "ObjectStoreError");
    assert_eq!(store.reads(), vec!["access-logs/a.log"]);
    assert!(sink.payloads().is_empty());
}

#[tokio::test]
async fn test_sink_failure_aborts_event() {
    let store = Arc::new(
        InMemoryObjectStore::default()
            .with_object(BUCKET, "a.log", &lines(&[LINE_1, LINE_2, LINE_3])),
    );
    let sink = Arc::new(RecordingSink::failing_at(1));
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store,
        sink.clone(),
        ParseFailurePolicy::SkipLine,
        PayloadFormat::default(),
    );

    let error = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log")]))
        .await
        .unwrap_err();

    match error {
        ForwarderError::Sink(sink_error) => assert!(!sink_error.is_permanent()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.payloads(), vec![PAYLOAD_1]);
}

#[tokio::test]
async fn test_forwards_lines_of_chunked_object() {
    let body = format!("{LINE_1}\r\n{LINE_2}\r{LINE_3}\n");
    let (first, rest) = body.split_at(LINE_1.len() / 2);
    let (second, rest) = rest.split_at(rest.find('\n').unwrap());
    let (third, fourth) = rest.split_at(LINE_2.len() + 1);
    let store = Arc::new(InMemoryObjectStore::default().with_chunked_object(
        BUCKET,
        "a.log",
        &[first, second, third, fourth],
    ));
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store,
        sink.clone(),
        ParseFailurePolicy::AbortEvent,
        PayloadFormat::default(),
    );

    let report = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log")]))
        .await
        .expect("event should be forwarded");

    assert_eq!(sink.payloads(), vec![PAYLOAD_1, PAYLOAD_2, PAYLOAD_3]);
    assert_eq!(report.lines_read, 3);
    assert_eq!(report.lines_forwarded, 3);
}

#[tokio::test]
async fn test_truncated_object_aborts_event_after_complete_lines() {
    let store = Arc::new(
        InMemoryObjectStore::default()
            .with_truncated_object(BUCKET, "a.log", &format!("{LINE_1}\n{LINE_2}\n"))
            .with_object(BUCKET, "b.log", LINE_3),
    );
    let sink = Arc::new(RecordingSink::default());
    let forwarder = forwarder_with(
        Arc::new(CountingProvider::new()),
        store.clone(),
        sink.clone(),
        ParseFailurePolicy::SkipLine,
        PayloadFormat::default(),
    );

    let error = forwarder
        .handle_event(&event_for(&[(BUCKET, "a.log"), (BUCKET, "b.log")]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ForwarderError::ObjectStore(ObjectStoreError::Status { status: 500, .. })
    ));
    assert_eq!(sink.payloads(), vec![PAYLOAD_1, PAYLOAD_2]);
    assert_eq!(store.reads(), vec!["access-logs/a.log"]);
}
