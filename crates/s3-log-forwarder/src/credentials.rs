// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Credentials used to read objects and to authenticate against the indexing endpoint.
//!
//! Long-lived credentials are read from the environment and, by default, exchanged once per
//! process for a short-lived session through the token service `GetSessionToken` action.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::ACCEPT, Client, Url};
use serde::Deserialize;
use std::env;
use std::fmt::{self, Debug};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::sigv4::{RequestSigner, SigningError};

const STS_API_VERSION: &str = "2011-06-15";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("environment variable {0} is not set")]
    MissingEnvironment(&'static str),
    #[error("invalid token service url: {0}")]
    InvalidUrl(String),
    #[error("failed to sign token request: {0}")]
    Signing(#[from] SigningError),
    #[error("token service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode token service response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// An access key pair, optionally scoped to a session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[async_trait]
pub trait SessionTokenProvider: Send + Sync {
    async fn obtain(&self) -> Result<Credentials, CredentialsError>;
}

/// Credentials taken verbatim from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and, when set,
/// `AWS_SESSION_TOKEN`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentCredentials;

impl EnvironmentCredentials {
    pub fn read() -> Result<Credentials, CredentialsError> {
        Self::read_from(|name| env::var(name).ok())
    }

    pub fn read_from(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, CredentialsError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Credentials {
            access_key_id: non_empty("AWS_ACCESS_KEY_ID")
                .ok_or(CredentialsError::MissingEnvironment("AWS_ACCESS_KEY_ID"))?,
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY")
                .ok_or(CredentialsError::MissingEnvironment("AWS_SECRET_ACCESS_KEY"))?,
            session_token: non_empty("AWS_SESSION_TOKEN"),
        })
    }
}

#[async_trait]
impl SessionTokenProvider for EnvironmentCredentials {
    async fn obtain(&self) -> Result<Credentials, CredentialsError> {
        Self::read()
    }
}

/// Always hands out the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

#[async_trait]
impl SessionTokenProvider for StaticCredentials {
    async fn obtain(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.0.clone())
    }
}

/// Exchanges long-lived credentials for a session through `GetSessionToken`.
pub struct StsSessionTokenProvider {
    client: Client,
    endpoint: String,
    region: String,
    duration_secs: u32,
    long_lived: Arc<dyn SessionTokenProvider>,
}

impl StsSessionTokenProvider {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        region: impl Into<String>,
        duration_secs: u32,
        long_lived: Arc<dyn SessionTokenProvider>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            region: region.into(),
            duration_secs,
            long_lived,
        }
    }

    fn request_url(&self) -> Result<Url, CredentialsError> {
        let raw = format!(
            "{}/?Action=GetSessionToken&DurationSeconds={}&Version={STS_API_VERSION}",
            self.endpoint.trim_end_matches('/'),
            self.duration_secs
        );
        Url::parse(&raw).map_err(|e| CredentialsError::InvalidUrl(format!("{raw}: {e}")))
    }
}

#[async_trait]
impl SessionTokenProvider for StsSessionTokenProvider {
    async fn obtain(&self) -> Result<Credentials, CredentialsError> {
        let long_lived = self.long_lived.obtain().await?;
        let url = self.request_url()?;
        let signed = RequestSigner::new(&long_lived, &self.region, "sts").sign(
            "GET",
            &url,
            &[],
            b"",
            Utc::now(),
        )?;

        debug!(
            "Requesting session token for {}s from {}",
            self.duration_secs, self.endpoint
        );
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json");
        for (name, value) in signed {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            error!("{status}: Failed to obtain session token: {body}");
            return Err(CredentialsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GetSessionTokenEnvelope = serde_json::from_slice(&body)?;
        let issued = envelope
            .get_session_token_response
            .get_session_token_result
            .credentials;
        Ok(Credentials {
            access_key_id: issued.access_key_id,
            secret_access_key: issued.secret_access_key,
            session_token: Some(issued.session_token),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSessionTokenEnvelope {
    get_session_token_response: GetSessionTokenResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSessionTokenResponse {
    get_session_token_result: GetSessionTokenResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSessionTokenResult {
    credentials: IssuedCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IssuedCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

/// Resolves credentials from a provider at most once and shares the result.
///
/// Concurrent first callers wait on the same resolution. A failed resolution is not cached, the
/// next caller asks the provider again.
pub struct SessionCredentials {
    provider: Arc<dyn SessionTokenProvider>,
    credentials: OnceCell<Credentials>,
}

impl SessionCredentials {
    pub fn new(provider: Arc<dyn SessionTokenProvider>) -> Self {
        Self {
            provider,
            credentials: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&Credentials, CredentialsError> {
        self.credentials
            .get_or_try_init(|| async { self.provider.obtain().await })
            .await
    }
}

impl Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionCredentials")
    }
}
