// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Extraction of the IP address, timestamp and message from an access-log line.
//!
//! The three patterns are matched independently against the whole line, so the fields may appear
//! in any order. Character classes are ASCII only: `\d` means `[0-9]` and `\w` means
//! `[A-Za-z0-9_]`.

use regex::Regex;
use serde::Serialize;

use crate::errors::{LogField, MalformedLogLine};
use patterns::{IP_ADDRESS_REGEX, MESSAGE_REGEX, TIMESTAMP_REGEX};

#[allow(clippy::expect_used)]
mod patterns {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        /// Four dot-separated digit runs. Octets are not range checked, `999.999.999.999` matches.
        pub(super) static ref IP_ADDRESS_REGEX: Regex =
            Regex::new(r"([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)").expect("failed creating regex");

        /// Bracketed NCSA timestamp such as `[10/Oct/2023:13:55:36 -0700]`.
        ///
        /// The zone offset must carry a literal `-`.
        pub(super) static ref TIMESTAMP_REGEX: Regex = Regex::new(
            r"\[([0-9]+/[A-Za-z0-9_]{3}/[0-9]{4}:[0-9]{2}:[0-9]{2}:[0-9]{2}(?-u:\s)-[0-9]{4})\]"
        )
        .expect("failed creating regex");

        /// Greedy, so the capture runs from the first quote to the last quote before any line
        /// terminator. `\r`, U+0085, U+2028 and U+2029 end the message like `\n` does.
        pub(super) static ref MESSAGE_REGEX: Regex =
            Regex::new(r#""([^\n\r\x{85}\x{2028}\x{2029}]+)""#).expect("failed creating regex");
    }
}

/// The fields extracted from one access-log line, borrowed from that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedLogLine<'a> {
    pub ip_address: &'a str,
    /// Timestamp without the surrounding brackets.
    pub timestamp: &'a str,
    /// Message without the surrounding quotes.
    pub message: &'a str,
}

impl<'a> ParsedLogLine<'a> {
    /// Equivalent to [`extract`].
    pub fn parse(line: &'a str) -> Result<Self, MalformedLogLine> {
        extract(line)
    }

    /// Serializes the record as `ip + timestamp + message` with no delimiter, UTF-8 encoded.
    ///
    /// This is the format existing indexes were fed with. It cannot be split back into fields
    /// reliably, prefer a structured encoding for new consumers.
    pub fn to_legacy_payload(&self) -> Vec<u8> {
        let mut payload =
            String::with_capacity(self.ip_address.len() + self.timestamp.len() + self.message.len());
        payload.push_str(self.ip_address);
        payload.push_str(self.timestamp);
        payload.push_str(self.message);
        payload.into_bytes()
    }
}

/// Decomposes a single line (without its line terminator) into its IP address, timestamp and
/// message.
///
/// Fails with [`MalformedLogLine`] listing every field whose pattern does not occur in the line.
pub fn extract(line: &str) -> Result<ParsedLogLine<'_>, MalformedLogLine> {
    let ip_address = first_capture(&IP_ADDRESS_REGEX, line);
    let timestamp = first_capture(&TIMESTAMP_REGEX, line);
    let message = first_capture(&MESSAGE_REGEX, line);

    match (ip_address, timestamp, message) {
        (Some(ip_address), Some(timestamp), Some(message)) => Ok(ParsedLogLine {
            ip_address,
            timestamp,
            message,
        }),
        (ip_address, timestamp, message) => {
            let missing = [
                (ip_address.is_none(), LogField::IpAddress),
                (timestamp.is_none(), LogField::Timestamp),
                (message.is_none(), LogField::Message),
            ]
            .into_iter()
            .filter_map(|(absent, field)| absent.then_some(field))
            .collect();
            Err(MalformedLogLine::new(missing))
        }
    }
}

fn first_capture<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    regex
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
