// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use s3_log_forwarder::{
    credentials::{SessionCredentials, SessionTokenProvider},
    event::S3Event,
    forwarder::{LogForwarder, LogForwarderConfig, ParseFailurePolicy},
    object_store::ObjectStore,
    payload::PayloadFormat,
    sink::Sink,
};
use serde_json::json;
use std::sync::Arc;

pub const LINE_1: &str =
    r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#;
pub const LINE_2: &str = r#"10.0.0.5 - - [11/Oct/2000:08:01:02 -0700] "POST /login HTTP/1.1" 302 0"#;
pub const LINE_3: &str =
    r#"192.168.1.20 - - [12/Oct/2000:23:59:59 -0700] "GET /health HTTP/1.1" 200 2"#;

pub const PAYLOAD_1: &str = "127.0.0.110/Oct/2000:13:55:36 -0700GET /apache_pb.gif HTTP/1.0";
pub const PAYLOAD_2: &str = "10.0.0.511/Oct/2000:08:01:02 -0700POST /login HTTP/1.1";
pub const PAYLOAD_3: &str = "192.168.1.2012/Oct/2000:23:59:59 -0700GET /health HTTP/1.1";

/// Builds an object-created notification naming `objects` in order
pub fn event_for(objects: &[(&str, &str)]) -> S3Event {
    let records: Vec<_> = objects
        .iter()
        .map(|(bucket, key)| {
            json!({
                "eventName": "ObjectCreated:Put",
                "awsRegion": "us-east-1",
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": key, "size": 0 }
                }
            })
        })
        .collect();
    serde_json::from_value(json!({ "Records": records })).expect("failed to build event")
}

pub fn lines(lines: &[&str]) -> String {
    lines.join("\n")
}

pub fn forwarder_with(
    provider: Arc<dyn SessionTokenProvider>,
    object_store: Arc<dyn ObjectStore>,
    sink: Arc<dyn Sink>,
    parse_failure_policy: ParseFailurePolicy,
    payload_format: PayloadFormat,
) -> LogForwarder {
    LogForwarder::new(LogForwarderConfig {
        credentials: Arc::new(SessionCredentials::new(provider)),
        object_store,
        sink,
        parse_failure_policy,
        payload_format,
    })
}
