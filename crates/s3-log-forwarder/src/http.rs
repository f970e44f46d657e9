// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::{Client, ClientBuilder, Proxy};
use std::time::Duration;
use tracing::debug;

/// Creates a reqwest client builder using rustls for TLS.
pub fn create_reqwest_client_builder() -> ClientBuilder {
    Client::builder().use_rustls_tls()
}

/// Builds the client shared by the token service, object store and sink calls.
///
/// `timeout` bounds every request end to end. When `https_proxy` is set, all HTTPS traffic goes
/// through it.
pub fn build_client(
    https_proxy: Option<&str>,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut builder = create_reqwest_client_builder().timeout(timeout);
    if let Some(proxy) = https_proxy {
        debug!("Routing HTTPS requests through proxy {proxy}");
        builder = builder.proxy(Proxy::https(proxy)?);
    }
    builder.build()
}
