// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sequencing of one event: credentials, then every object in record order, then every line in
//! object order, one sink write per extracted line.

use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ForwarderConfig;
use crate::credentials::{
    EnvironmentCredentials, SessionCredentials, SessionTokenProvider, StsSessionTokenProvider,
};
use crate::error::{ConfigError, ForwarderError};
use crate::event::{ObjectRef, S3Event};
use crate::http::build_client;
use crate::object_store::{ObjectStore, S3ObjectStore};
use crate::payload::PayloadFormat;
use crate::sink::{HttpSink, Sink};

/// What to do with a line that does not match the access-log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseFailurePolicy {
    /// Drop the line and keep going.
    SkipLine,
    /// Stop reading the current object and move on to the next record.
    #[default]
    AbortObject,
    /// Fail the whole event.
    AbortEvent,
}

impl FromStr for ParseFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip-line" => Ok(Self::SkipLine),
            "abort-object" => Ok(Self::AbortObject),
            "abort-event" => Ok(Self::AbortEvent),
            other => Err(ConfigError::InvalidValue {
                name: "PARSE_FAILURE_POLICY",
                value: other.to_string(),
                expected: "skip-line, abort-object, abort-event",
            }),
        }
    }
}

/// Counters describing one handled event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwardReport {
    pub objects: usize,
    pub objects_aborted: usize,
    pub lines_read: usize,
    pub lines_forwarded: usize,
    pub lines_skipped: usize,
}

pub struct LogForwarderConfig {
    pub credentials: Arc<SessionCredentials>,
    pub object_store: Arc<dyn ObjectStore>,
    pub sink: Arc<dyn Sink>,
    pub parse_failure_policy: ParseFailurePolicy,
    pub payload_format: PayloadFormat,
}

pub struct LogForwarder {
    credentials: Arc<SessionCredentials>,
    object_store: Arc<dyn ObjectStore>,
    sink: Arc<dyn Sink>,
    parse_failure_policy: ParseFailurePolicy,
    payload_format: PayloadFormat,
}

impl LogForwarder {
    pub fn new(config: LogForwarderConfig) -> Self {
        LogForwarder {
            credentials: config.credentials,
            object_store: config.object_store,
            sink: config.sink,
            parse_failure_policy: config.parse_failure_policy,
            payload_format: config.payload_format,
        }
    }

    /// Wires the token service, object store and indexing endpoint clients described by `config`.
    ///
    /// Nothing is contacted until the first event is handled.
    pub fn from_config(config: &ForwarderConfig) -> Result<Self, ForwarderError> {
        let client = build_client(config.https_proxy.as_deref(), config.request_timeout)?;

        let provider: Arc<dyn SessionTokenProvider> = if config.session_token_exchange {
            Arc::new(StsSessionTokenProvider::new(
                client.clone(),
                &config.sts_endpoint_url,
                &config.region,
                config.session_duration_secs,
                Arc::new(EnvironmentCredentials),
            ))
        } else {
            Arc::new(EnvironmentCredentials)
        };
        let credentials = Arc::new(SessionCredentials::new(provider));

        let object_store = Arc::new(S3ObjectStore::new(
            client.clone(),
            &config.s3_endpoint_url,
            &config.region,
            Arc::clone(&credentials),
        ));
        let sink = Arc::new(HttpSink::new(
            client,
            config.index_endpoint()?,
            Arc::clone(&credentials),
        ));

        Ok(Self::new(LogForwarderConfig {
            credentials,
            object_store,
            sink,
            parse_failure_policy: config.parse_failure_policy,
            payload_format: config.payload_format,
        }))
    }

    /// Forwards every line of every object named by `event`.
    ///
    /// Credentials are resolved before anything else is contacted. Object store and sink failures
    /// end the event with an error; malformed lines are handled per [`ParseFailurePolicy`].
    pub async fn handle_event(&self, event: &S3Event) -> Result<ForwardReport, ForwarderError> {
        self.credentials.get().await?;

        let mut report = ForwardReport::default();
        for object in event.objects() {
            report.objects += 1;
            self.forward_object(&object, &mut report).await?;
        }

        info!(
            "Forwarded {} of {} lines from {} objects ({} lines skipped, {} objects aborted)",
            report.lines_forwarded,
            report.lines_read,
            report.objects,
            report.lines_skipped,
            report.objects_aborted
        );
        Ok(report)
    }

    async fn forward_object(
        &self,
        object: &ObjectRef<'_>,
        report: &mut ForwardReport,
    ) -> Result<(), ForwarderError> {
        let (bucket, key) = (object.bucket, object.key.as_ref());
        debug!("Reading s3://{bucket}/{key}");
        let mut lines = self.object_store.read_lines(bucket, key).await?;

        let mut line_number = 0;
        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            report.lines_read += 1;

            let parsed = match access_log::extract(&line) {
                Ok(parsed) => parsed,
                Err(source) => match self.parse_failure_policy {
                    ParseFailurePolicy::SkipLine => {
                        warn!("Skipping s3://{bucket}/{key} line {line_number}: {source}");
                        report.lines_skipped += 1;
                        continue;
                    }
                    ParseFailurePolicy::AbortObject => {
                        warn!(
                            "Abandoning rest of s3://{bucket}/{key} at line {line_number}: {source}"
                        );
                        report.lines_skipped += 1;
                        report.objects_aborted += 1;
                        return Ok(());
                    }
                    ParseFailurePolicy::AbortEvent => {
                        return Err(ForwarderError::MalformedLine {
                            bucket: bucket.to_string(),
                            key: key.to_string(),
                            line_number,
                            source,
                        });
                    }
                },
            };

            let payload = self.payload_format.encode(&parsed)?;
            self.sink.send(payload).await?;
            report.lines_forwarded += 1;
        }

        debug!("Finished s3://{bucket}/{key}");
        Ok(())
    }
}
