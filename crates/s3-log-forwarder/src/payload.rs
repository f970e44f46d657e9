// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use access_log::ParsedLogLine;
use bytes::Bytes;
use std::str::FromStr;

use crate::error::ConfigError;

/// How an extracted record is encoded before it is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `ip + timestamp + message` with no delimiter. Existing indexes expect this.
    #[default]
    Concatenated,
    /// `{"ip_address": .., "timestamp": .., "message": ..}`.
    Json,
}

impl PayloadFormat {
    pub fn encode(&self, parsed: &ParsedLogLine<'_>) -> Result<Bytes, serde_json::Error> {
        match self {
            Self::Concatenated => Ok(Bytes::from(parsed.to_legacy_payload())),
            Self::Json => serde_json::to_vec(parsed).map(Bytes::from),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concatenated" => Ok(Self::Concatenated),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                name: "PAYLOAD_FORMAT",
                value: other.to_string(),
                expected: "concatenated, json",
            }),
        }
    }
}
