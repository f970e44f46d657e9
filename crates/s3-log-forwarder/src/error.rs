// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use access_log::MalformedLogLine;

use crate::credentials::CredentialsError;
use crate::object_store::ObjectStoreError;
use crate::sink::SinkError;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name} '{value}', expected one of: {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that stop the processing of an event.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("failed to obtain session credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("s3://{bucket}/{key} line {line_number}: {source}")]
    MalformedLine {
        bucket: String,
        key: String,
        line_number: usize,
        #[source]
        source: MalformedLogLine,
    },
}

impl ForwarderError {
    /// Short error type reported to the function runtime.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "CredentialsError",
            Self::ObjectStore(_) => "ObjectStoreError",
            Self::Sink(_) => "SinkError",
            Self::Payload(_) => "PayloadError",
            Self::HttpClient(_) => "HttpClientError",
            Self::Config(_) => "ConfigError",
            Self::MalformedLine { .. } => "MalformedLogLine",
        }
    }
}
