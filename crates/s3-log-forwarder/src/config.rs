// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::Url;
use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::forwarder::ParseFailurePolicy;
use crate::payload::PayloadFormat;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_SESSION_DURATION_SECS: u32 = 7200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const MIN_SESSION_DURATION_SECS: u32 = 900;
const MAX_SESSION_DURATION_SECS: u32 = 129_600;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration of the forwarder, read from the environment.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Url receiving one POST per extracted line
    pub index_endpoint_url: String,
    /// Region used to sign object store and token service requests
    pub region: String,
    /// Object store base url, path-style addressing
    pub s3_endpoint_url: String,
    /// Token service base url
    pub sts_endpoint_url: String,
    /// Whether long-lived environment credentials are exchanged for a session first
    pub session_token_exchange: bool,
    pub session_duration_secs: u32,
    pub parse_failure_policy: ParseFailurePolicy,
    pub payload_format: PayloadFormat,
    pub request_timeout: Duration,
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            index_endpoint_url: String::new(),
            region: DEFAULT_REGION.to_string(),
            s3_endpoint_url: s3_endpoint_for(DEFAULT_REGION),
            sts_endpoint_url: sts_endpoint_for(DEFAULT_REGION),
            session_token_exchange: true,
            session_duration_secs: DEFAULT_SESSION_DURATION_SECS,
            parse_failure_policy: ParseFailurePolicy::default(),
            payload_format: PayloadFormat::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl ForwarderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source, then validates it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let index_endpoint_url =
            var("INDEX_ENDPOINT_URL").ok_or(ConfigError::Missing("INDEX_ENDPOINT_URL"))?;
        let region = var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let s3_endpoint_url = var("S3_ENDPOINT_URL").unwrap_or_else(|| s3_endpoint_for(&region));
        let sts_endpoint_url =
            var("STS_ENDPOINT_URL").unwrap_or_else(|| sts_endpoint_for(&region));
        let session_token_exchange = var("SESSION_TOKEN_EXCHANGE")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);
        let session_duration_secs = match var("SESSION_DURATION_SECS") {
            Some(val) => val.trim().parse::<u32>().map_err(|_| {
                ConfigError::Invalid(format!("SESSION_DURATION_SECS is not a number: '{val}'"))
            })?,
            None => DEFAULT_SESSION_DURATION_SECS,
        };
        let parse_failure_policy = var("PARSE_FAILURE_POLICY")
            .map(|val| val.parse::<ParseFailurePolicy>())
            .transpose()?
            .unwrap_or_default();
        let payload_format = var("PAYLOAD_FORMAT")
            .map(|val| val.parse::<PayloadFormat>())
            .transpose()?
            .unwrap_or_default();
        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(val) => Duration::from_secs(val.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("REQUEST_TIMEOUT_SECS is not a number: '{val}'"))
            })?),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        let https_proxy = var("HTTPS_PROXY").or_else(|| var("https_proxy"));
        let log_level = var("LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|| "info".to_string());

        let config = Self {
            index_endpoint_url,
            region,
            s3_endpoint_url,
            sts_endpoint_url,
            session_token_exchange,
            session_duration_secs,
            parse_failure_policy,
            payload_format,
            request_timeout,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_endpoint("INDEX_ENDPOINT_URL", &self.index_endpoint_url)?;
        parse_endpoint("S3_ENDPOINT_URL", &self.s3_endpoint_url)?;
        if self.session_token_exchange {
            parse_endpoint("STS_ENDPOINT_URL", &self.sts_endpoint_url)?;
        }

        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("AWS_REGION cannot be empty".to_string()));
        }

        if !(MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS)
            .contains(&self.session_duration_secs)
        {
            return Err(ConfigError::Invalid(format!(
                "SESSION_DURATION_SECS must be between {MIN_SESSION_DURATION_SECS} and {MAX_SESSION_DURATION_SECS}, got {}",
                self.session_duration_secs
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                name: "LOG_LEVEL",
                value: self.log_level.clone(),
                expected: "trace, debug, info, warn, error",
            });
        }

        Ok(())
    }

    pub fn index_endpoint(&self) -> Result<Url, ConfigError> {
        parse_endpoint("INDEX_ENDPOINT_URL", &self.index_endpoint_url)
    }
}

fn s3_endpoint_for(region: &str) -> String {
    format!("https://s3.{region}.amazonaws.com")
}

fn sts_endpoint_for(region: &str) -> String {
    format!("https://sts.{region}.amazonaws.com")
}

/// Endpoints must be https. Plain http is only accepted for loopback hosts.
fn parse_endpoint(name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::Invalid(format!("{name} is not a valid url '{value}': {e}")))?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => Err(ConfigError::Invalid(format!(
            "{name} must use https, got {scheme}: '{value}'"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
