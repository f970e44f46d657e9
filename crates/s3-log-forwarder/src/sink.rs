// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of serialized records to the indexing endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode, Url};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, trace};

use crate::credentials::{CredentialsError, SessionCredentials};

const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("failed to send payload: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}: indexing endpoint rejected payload: {body}")]
    Destination { status: StatusCode, body: String },
}

impl SinkError {
    /// Whether resending the same payload cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Destination { status, .. } => status.is_client_error(),
            Self::Credentials(_) | Self::Transport(_) => false,
        }
    }
}

#[async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, payload: Bytes) -> Result<(), SinkError>;
}

/// POSTs every payload to a fixed url.
pub struct HttpSink {
    client: Client,
    url: Url,
    credentials: Arc<SessionCredentials>,
}

impl HttpSink {
    pub fn new(client: Client, url: Url, credentials: Arc<SessionCredentials>) -> Self {
        Self {
            client,
            url,
            credentials,
        }
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn send(&self, payload: Bytes) -> Result<(), SinkError> {
        let credentials = self.credentials.get().await?;
        let n_bytes = payload.len();

        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(payload);
        if let Some(token) = &credentials.session_token {
            request = request.header(SECURITY_TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("{status}: Sent {n_bytes} bytes to {}", self.url);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!("{status}: Failed to push to indexing endpoint: {body:?}");
        Err(SinkError::Destination { status, body })
    }
}
