// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Field extraction for web-server access-log lines.
//!
//! Each line in the common/combined log format is decomposed into the client IP address, the
//! bracketed request timestamp and the quoted request message. Extraction is a pure function of
//! the line and never produces partial output: a line missing any of the three fields is reported
//! as [`MalformedLogLine`] naming every field that could not be found.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod errors;
pub mod extractor;

pub use errors::{LogField, MalformedLogLine};
pub use extractor::{extract, ParsedLogLine};
