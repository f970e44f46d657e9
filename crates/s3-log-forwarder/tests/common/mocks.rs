// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory collaborators for driving the forwarder without a network

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use reqwest::StatusCode;
use s3_log_forwarder::{
    credentials::{Credentials, CredentialsError, SessionTokenProvider},
    object_store::{ObjectLines, ObjectStore, ObjectStoreError},
    sink::{Sink, SinkError},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Object store serving bodies from memory and recording every read
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: HashMap<(String, String), StoredObject>,
    reads: Mutex<Vec<String>>,
}

struct StoredObject {
    chunks: Vec<Bytes>,
    /// The body breaks off with a transport-like failure after the last chunk
    truncated: bool,
}

impl InMemoryObjectStore {
    pub fn with_object(self, bucket: &str, key: &str, body: &str) -> Self {
        self.with_chunked_object(bucket, key, &[body])
    }

    /// Serves `chunks` one at a time, the way a streamed response arrives
    pub fn with_chunked_object(mut self, bucket: &str, key: &str, chunks: &[&str]) -> Self {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                chunks: chunks
                    .iter()
                    .map(|c| Bytes::copy_from_slice(c.as_bytes()))
                    .collect(),
                truncated: false,
            },
        );
        self
    }

    /// Serves `body`, then fails as if the connection dropped
    pub fn with_truncated_object(mut self, bucket: &str, key: &str, body: &str) -> Self {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
                truncated: true,
            },
        );
        self
    }

    /// `bucket/key` of every read, in call order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn read_lines(&self, bucket: &str, key: &str) -> Result<ObjectLines, ObjectStoreError> {
        self.reads.lock().unwrap().push(format!("{bucket}/{key}"));
        let Some(object) = self.objects.get(&(bucket.to_string(), key.to_string())) else {
            return Err(ObjectStoreError::Status {
                bucket: bucket.to_string(),
                key: key.to_string(),
                status: 404,
            });
        };

        let mut chunks: Vec<Result<Bytes, ObjectStoreError>> =
            object.chunks.iter().cloned().map(Ok).collect();
        if object.truncated {
            chunks.push(Err(ObjectStoreError::Status {
                bucket: bucket.to_string(),
                key: key.to_string(),
                status: 500,
            }));
        }
        Ok(ObjectLines::from_stream(stream::iter(chunks)))
    }
}

/// Sink keeping every payload, optionally rejecting the nth one
#[derive(Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<Bytes>>,
    fail_at: Option<usize>,
    calls: AtomicUsize,
}

impl RecordingSink {
    /// Rejects the call with zero-based index `index` with a 503
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Default::default()
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn send(&self, payload: Bytes) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(call) {
            return Err(SinkError::Destination {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "unavailable".to_string(),
            });
        }
        self.payloads.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Token provider counting how often it is asked, optionally always failing
pub struct CountingProvider {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTokenProvider for CountingProvider {
    async fn obtain(&self) -> Result<Credentials, CredentialsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CredentialsError::MissingEnvironment("AWS_ACCESS_KEY_ID"));
        }
        Ok(Credentials {
            access_key_id: "ASIASESSION".to_string(),
            secret_access_key: "session-secret".to_string(),
            session_token: Some("session-token".to_string()),
        })
    }
}
