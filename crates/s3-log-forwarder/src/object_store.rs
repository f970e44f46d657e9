// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Object retrieval, exposed as a lazy sequence of text lines.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::{Client, Url};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::credentials::{CredentialsError, SessionCredentials};
use crate::sigv4::{uri_encode, RequestSigner, SigningError};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("failed to sign object request: {0}")]
    Signing(#[from] SigningError),
    #[error("invalid object url: {0}")]
    InvalidUrl(String),
    #[error("s3://{bucket}/{key} has a '.' or '..' path segment and cannot be addressed")]
    UnaddressableKey { bucket: String, key: String },
    #[error("object request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reading s3://{bucket}/{key} returned status {status}")]
    Status {
        bucket: String,
        key: String,
        status: u16,
    },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn read_lines(&self, bucket: &str, key: &str) -> Result<ObjectLines, ObjectStoreError>;
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, ObjectStoreError>> + Send>>;

/// Lines of an object body, split as the body arrives.
///
/// A line ends at `\n`, `\r` or `\r\n`; the terminator is not part of the line. A terminator at
/// the very end of the body does not produce a trailing empty line. Invalid UTF-8 is replaced
/// with U+FFFD. Only the current partial line is buffered, never the whole body.
pub struct ObjectLines {
    chunks: ChunkStream,
    buffer: Vec<u8>,
    /// Start of the unread part of `buffer`.
    position: usize,
    /// Bytes of the unread part already searched for a terminator.
    scanned: usize,
    /// The last line ended with `\r` at a chunk boundary; a leading `\n` still belongs to it.
    pending_lf: bool,
    exhausted: bool,
}

impl ObjectLines {
    /// Lines of a body held in memory.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self::from_chunks(vec![body.into()])
    }

    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self::from_stream(stream::iter(chunks.into_iter().map(Ok)))
    }

    pub fn from_stream(
        chunks: impl Stream<Item = Result<Bytes, ObjectStoreError>> + Send + 'static,
    ) -> Self {
        Self {
            chunks: Box::pin(chunks),
            buffer: Vec::new(),
            position: 0,
            scanned: 0,
            pending_lf: false,
            exhausted: false,
        }
    }

    /// The next line, `None` once the body is consumed.
    ///
    /// Fails when the underlying body cannot be read any further.
    pub async fn next_line(&mut self) -> Result<Option<String>, ObjectStoreError> {
        loop {
            if self.pending_lf && self.position < self.buffer.len() {
                if self.buffer[self.position] == b'\n' {
                    self.position += 1;
                }
                self.pending_lf = false;
            }

            let unread = &self.buffer[self.position..];
            if let Some(offset) = unread[self.scanned..]
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')
            {
                let end = self.scanned + offset;
                let line = String::from_utf8_lossy(&unread[..end]).into_owned();
                let mut consumed = end + 1;
                if unread[end] == b'\r' {
                    match unread.get(end + 1) {
                        Some(b'\n') => consumed += 1,
                        Some(_) => {}
                        None => self.pending_lf = true,
                    }
                }
                self.position += consumed;
                self.scanned = 0;
                return Ok(Some(line));
            }
            self.scanned = unread.len();

            if self.exhausted {
                if unread.is_empty() {
                    return Ok(None);
                }
                let line = String::from_utf8_lossy(unread).into_owned();
                self.position = self.buffer.len();
                self.scanned = 0;
                return Ok(Some(line));
            }

            match self.chunks.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    self.buffer.drain(..self.position);
                    self.position = 0;
                    self.buffer.extend_from_slice(&chunk);
                }
                None => self.exhausted = true,
            }
        }
    }
}

/// Reads objects from an S3-compatible endpoint with path-style addressing.
pub struct S3ObjectStore {
    client: Client,
    endpoint: String,
    region: String,
    credentials: Arc<SessionCredentials>,
}

impl S3ObjectStore {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        region: impl Into<String>,
        credentials: Arc<SessionCredentials>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            region: region.into(),
            credentials,
        }
    }

    /// Path-style url of the object.
    ///
    /// Url parsing drops `.` and `..` segments, percent-encoded or not, so such keys would
    /// resolve to a different object and are refused.
    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, ObjectStoreError> {
        if key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(ObjectStoreError::UnaddressableKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        let raw = format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            uri_encode(bucket, true),
            uri_encode(key, false)
        );
        Url::parse(&raw).map_err(|e| ObjectStoreError::InvalidUrl(format!("{raw}: {e}")))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn read_lines(&self, bucket: &str, key: &str) -> Result<ObjectLines, ObjectStoreError> {
        let credentials = self.credentials.get().await?;
        let url = self.object_url(bucket, key)?;
        let signed =
            RequestSigner::new(credentials, &self.region, "s3").sign("GET", &url, &[], b"", Utc::now())?;

        let mut request = self.client.get(url);
        for (name, value) in signed {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "{status}: Failed to read s3://{bucket}/{key}: {:?}",
                response.text().await.unwrap_or_default()
            );
            return Err(ObjectStoreError::Status {
                bucket: bucket.to_string(),
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(
            "{status}: Streaming s3://{bucket}/{key} ({} bytes)",
            response
                .content_length()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );
        Ok(ObjectLines::from_stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ObjectStoreError::Transport)),
        ))
    }
}
