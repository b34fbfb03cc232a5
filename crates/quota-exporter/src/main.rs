// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod server;

use crate::config::ExporterConfig;
use quota_watcher::clients;
use quota_watcher::scheduler::{self, AccountState};
use std::{env, path::Path, process};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "quotas.yaml";

#[tokio::main]
pub async fn main() {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = match ExporterConfig::load(Path::new(&config_path)) {
        Ok(config) => config,
        Err(err) => {
            // Subscriber is not up yet; this is the one place stderr is used.
            eprintln!("error loading configuration from {config_path}: {err}");
            process::exit(1);
        }
    };

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", config.service.log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
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

    debug!("logging subsystem enabled");

    for account in config.account_configs() {
        let bundle = match clients::build_bundle(&account).await {
            Ok(bundle) => bundle,
            Err(err) => {
                error!(account = %account.label, error = %err, "failed to build initial AWS clients");
                process::exit(1);
            }
        };
        let state = AccountState::new(account, bundle);
        scheduler::spawn_account(state, config.poll_interval(), config.refresh_interval());
    }

    info!("service quotas exporter started");

    if let Err(err) = server::serve(config.service.port).await {
        error!(error = %err, "metrics server failed");
        process::exit(1);
    }
}
