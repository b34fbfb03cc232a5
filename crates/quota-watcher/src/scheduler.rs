// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-account poll scheduling and credential rotation.
//!
//! Each (account, resource kind) pair gets its own repeating loop: the
//! first tick fires immediately, later ticks on the configured interval.
//! Ticks for the same pair never overlap; a tick that arrives while the
//! previous cycle is still running is skipped, and the next tick retries.
//! Ticks for different pairs and accounts are fully independent.

use crate::clients::{self, AccountConfig, ClientBundle};
use crate::poller::{self, ResourceKind};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::interval;
use tracing::{debug, error, warn};

/// Shared per-account state: the immutable config plus the latest client
/// bundle generation.
pub struct AccountState {
    config: AccountConfig,
    bundle: RwLock<Arc<ClientBundle>>,
}

impl AccountState {
    pub fn new(config: AccountConfig, bundle: ClientBundle) -> Arc<Self> {
        Arc::new(AccountState {
            config,
            bundle: RwLock::new(Arc::new(bundle)),
        })
    }

    pub fn account(&self) -> &str {
        &self.config.label
    }

    /// The current bundle generation. Callers hold the returned `Arc` for
    /// the whole cycle, so a refresh mid-cycle never swaps clients under
    /// them.
    pub fn bundle(&self) -> Arc<ClientBundle> {
        #[allow(clippy::expect_used)]
        let bundle = self.bundle.read().expect("lock poisoned");
        Arc::clone(&bundle)
    }

    fn replace(&self, bundle: ClientBundle) {
        #[allow(clippy::expect_used)]
        let mut current = self.bundle.write().expect("lock poisoned");
        *current = Arc::new(bundle);
    }
}

/// At-most-one-in-flight gate for a single (account, resource kind) pair.
pub struct PollGate {
    permits: Arc<Semaphore>,
}

impl PollGate {
    pub fn new() -> Self {
        PollGate {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claim the gate for a cycle. Returns `None` while a previous cycle
    /// still holds it; the permit releases the gate on drop.
    pub fn try_start(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }
}

impl Default for PollGate {
    fn default() -> Self {
        PollGate::new()
    }
}

/// Spawn the four poll loops plus the credential refresh loop for one
/// account.
pub fn spawn_account(
    state: Arc<AccountState>,
    poll_interval: Duration,
    refresh_interval: Duration,
) {
    for kind in ResourceKind::ALL {
        tokio::spawn(poll_loop(Arc::clone(&state), kind, poll_interval));
    }
    tokio::spawn(refresh_loop(state, refresh_interval));
}

async fn poll_loop(state: Arc<AccountState>, kind: ResourceKind, poll_interval: Duration) {
    let gate = PollGate::new();
    let mut ticker = interval(poll_interval);

    loop {
        ticker.tick().await;

        let Some(permit) = gate.try_start() else {
            warn!(
                account = state.account(),
                kind = kind.as_str(),
                "previous poll cycle still running, skipping tick"
            );
            continue;
        };

        let bundle = state.bundle();
        tokio::spawn(async move {
            poller::run_cycle(kind, &bundle).await;
            drop(permit);
        });
    }
}

async fn refresh_loop(state: Arc<AccountState>, refresh_interval: Duration) {
    let mut ticker = interval(refresh_interval);
    ticker.tick().await; // discard first tick, which is instantaneous

    loop {
        ticker.tick().await;

        match clients::build_bundle(&state.config).await {
            Ok(bundle) => {
                state.replace(bundle);
                debug!(account = state.account(), "client bundle refreshed");
            }
            Err(err) => {
                error!(
                    account = state.account(),
                    error = %err,
                    "client bundle refresh failed, keeping previous generation"
                );
            }
        }
    }
}
