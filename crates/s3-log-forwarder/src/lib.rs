// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards access-log lines from newly created S3 objects to an indexing endpoint.
//!
//! An object-created notification names one or more objects. Each object is read line by line,
//! every line is decomposed with [`access_log::extract`], and each extracted record is POSTed to
//! the indexing endpoint on its own. Object store and endpoint calls share one set of session
//! credentials, obtained once per process.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod credentials;
pub mod error;
pub mod event;
pub mod forwarder;
pub mod http;
pub mod object_store;
pub mod payload;
pub mod runtime;
pub mod sigv4;
pub mod sink;
