// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the function runtime API: pull the next invocation, hand it to the forwarder,
//! report the outcome.

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Serialize;
use std::env;
use thiserror::Error;
use tracing::{debug, error};

use crate::event::S3Event;
use crate::forwarder::LogForwarder;
use crate::http::create_reqwest_client_builder;

const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";
const RUNTIME_API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("runtime api returned {status} for {path}")]
    Status { path: String, status: u16 },
    #[error("invocation is missing the Lambda-Runtime-Aws-Request-Id header")]
    MissingRequestId,
    #[error("failed to encode runtime api body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One pending invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub payload: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

pub struct RuntimeClient {
    client: Client,
    base_url: String,
}

impl RuntimeClient {
    /// `api` is the `host:port` of the runtime API.
    pub fn new(client: Client, api: &str) -> Self {
        Self {
            client,
            base_url: format!("http://{api}/{RUNTIME_API_VERSION}/runtime"),
        }
    }

    /// Returns `None` outside of the function runtime.
    pub fn from_env() -> Result<Option<Self>, RuntimeError> {
        let Some(api) = env::var(RUNTIME_API_ENV).ok().filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        // The next-invocation call blocks until an event arrives, so no timeout here.
        let client = create_reqwest_client_builder().no_proxy().build()?;
        Ok(Some(Self::new(client, api.trim())))
    }

    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let path = "invocation/next";
        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(RuntimeError::MissingRequestId)?;
        let payload = response.bytes().await?;
        debug!("Received invocation {request_id} ({} bytes)", payload.len());

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    pub async fn send_response<T: Serialize>(
        &self,
        request_id: &str,
        response: &T,
    ) -> Result<(), RuntimeError> {
        let body = serde_json::to_vec(response)?;
        self.post(&format!("invocation/{request_id}/response"), body, None)
            .await
    }

    pub async fn send_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeError> {
        let body = serde_json::to_vec(&ErrorBody {
            error_message: message,
            error_type,
        })?;
        self.post(
            &format!("invocation/{request_id}/error"),
            body,
            Some(error_type),
        )
        .await
    }

    pub async fn send_init_error(&self, error_type: &str, message: &str) -> Result<(), RuntimeError> {
        let body = serde_json::to_vec(&ErrorBody {
            error_message: message,
            error_type,
        })?;
        self.post("init/error", body, Some(error_type)).await
    }

    /// Waits for one invocation and reports its outcome.
    ///
    /// Forwarding failures are reported to the runtime and do not fail this call.
    pub async fn handle_next(&self, forwarder: &LogForwarder) -> Result<(), RuntimeError> {
        let invocation = self.next_invocation().await?;
        let request_id = invocation.request_id.as_str();

        let event = match S3Event::from_slice(&invocation.payload) {
            Ok(event) => event,
            Err(e) => {
                error!("Invocation {request_id} is not an object-created event: {e}");
                return self
                    .send_error(request_id, "InvalidEvent", &e.to_string())
                    .await;
            }
        };

        match forwarder.handle_event(&event).await {
            Ok(report) => self.send_response(request_id, &report).await,
            Err(e) => {
                error!("Invocation {request_id} failed: {e}");
                self.send_error(request_id, e.kind(), &e.to_string()).await
            }
        }
    }

    /// Handles invocations until the runtime API itself fails.
    pub async fn serve(&self, forwarder: &LogForwarder) -> Result<(), RuntimeError> {
        loop {
            self.handle_next(forwarder).await?;
        }
    }

    async fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        error_type: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let mut request = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(error_type) = error_type {
            request = request.header(ERROR_TYPE_HEADER, error_type);
        }

        let status = request.send().await?.status();
        if !status.is_success() {
            error!("{status}: Runtime api rejected {path}");
            return Err(RuntimeError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
