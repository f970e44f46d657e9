// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use s3_log_forwarder::{
    config::ForwarderConfig, error::ForwarderError, event::S3Event, forwarder::LogForwarder,
    runtime::RuntimeClient,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let runtime = match RuntimeClient::from_env() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Error creating function runtime client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let forwarder = match ForwarderConfig::from_env()
        .map_err(ForwarderError::from)
        .and_then(|config| LogForwarder::from_config(&config))
    {
        Ok(forwarder) => forwarder,
        Err(e) => {
            error!("Error creating forwarder on startup: {e}");
            if let Some(runtime) = &runtime {
                if let Err(e) = runtime.send_init_error(e.kind(), &e.to_string()).await {
                    error!("Failed to report init error: {e}");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    match runtime {
        Some(runtime) => {
            info!("Waiting for invocations");
            match runtime.serve(&forwarder).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Function runtime api failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        None => forward_once(&forwarder, env::args().nth(1)).await,
    }
}

/// Handles a single event read from `path`, or from stdin, and prints the report.
async fn forward_once(forwarder: &LogForwarder, path: Option<String>) -> ExitCode {
    let payload = match &path {
        Some(path) => tokio::fs::read(path).await,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await.map(|_| buf)
        }
    };
    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            error!(
                "Failed to read event from {}: {e}",
                path.as_deref().unwrap_or("stdin")
            );
            return ExitCode::FAILURE;
        }
    };

    let event = match S3Event::from_slice(&payload) {
        Ok(event) => event,
        Err(e) => {
            error!("Input is not an object-created event: {e}");
            return ExitCode::FAILURE;
        }
    };

    match forwarder.handle_event(&event).await {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(report) => {
                println!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to encode report: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("Failed to forward event: {e}");
            ExitCode::FAILURE
        }
    }
}
