// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use derive_more::Display;
use std::fmt;

/// The fields every access-log line must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LogField {
    #[display("ip address")]
    IpAddress,
    #[display("timestamp")]
    Timestamp,
    #[display("message")]
    Message,
}

/// Fields absent from a line, kept in extraction order (IP, timestamp, message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFields(Vec<LogField>);

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

/// A line that does not match the access-log format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed log line: missing {missing}")]
pub struct MalformedLogLine {
    missing: MissingFields,
}

impl MalformedLogLine {
    pub(crate) fn new(missing: Vec<LogField>) -> Self {
        Self {
            missing: MissingFields(missing),
        }
    }

    pub fn missing(&self) -> &[LogField] {
        &self.missing.0
    }

    pub fn is_missing(&self, field: LogField) -> bool {
        self.missing.0.contains(&field)
    }
}
