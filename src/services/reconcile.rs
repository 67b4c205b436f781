//! Converges the live subscription set toward a target set.
//!
//! Subscribe requests are fire-and-forget and the store is eventually
//! consistent, so the only way to know a request took effect is to poll the
//! snapshot. The loop is bounded, and cancellation interrupts any sleep,
//! snapshot read or dispatch in progress.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::SubscriptionClient;

pub const DEFAULT_MAX_VERIFY_CYCLES: u32 = 15;
pub const DEFAULT_VERIFY_INTERVAL_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    Dispatching,
    Verifying { cycle: u32 },
    Converged,
    PartiallyFailed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// `cycle` is the 1-based poll that saw every target; 0 if nothing was missing.
    Converged { cycle: u32 },
    PartiallyFailed { missing: BTreeSet<String> },
    Cancelled { missing: BTreeSet<String> },
}

impl ReconcileOutcome {
    pub fn missing(&self) -> Option<&BTreeSet<String>> {
        match self {
            ReconcileOutcome::Converged { .. } => None,
            ReconcileOutcome::PartiallyFailed { missing } | ReconcileOutcome::Cancelled { missing } => {
                Some(missing)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
    pub cycles: u32,
    pub requests_sent: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct VerifyPolicy {
    pub max_cycles: u32,
    pub interval: Duration,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        VerifyPolicy {
            max_cycles: DEFAULT_MAX_VERIFY_CYCLES,
            interval: Duration::from_secs_f64(DEFAULT_VERIFY_INTERVAL_SECS),
        }
    }
}

pub struct Reconciler<'a, C: SubscriptionClient + ?Sized> {
    client: &'a C,
    policy: VerifyPolicy,
    cancel: CancellationToken,
    state: ReconcileState,
    cycles: u32,
    requests_sent: usize,
}

impl<'a, C: SubscriptionClient + ?Sized> Reconciler<'a, C> {
    pub fn new(client: &'a C, policy: VerifyPolicy, cancel: CancellationToken) -> Self {
        Reconciler {
            client,
            policy,
            cancel,
            state: ReconcileState::Idle,
            cycles: 0,
            requests_sent: 0,
        }
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    pub async fn run(
        &mut self,
        targets: &BTreeSet<String>,
        initial: &BTreeSet<String>,
    ) -> ReconcileReport {
        let mut missing: BTreeSet<String> = targets.difference(initial).cloned().collect();
        if missing.is_empty() {
            self.state = ReconcileState::Converged;
            return self.report(ReconcileOutcome::Converged { cycle: 0 });
        }

        let cancel = self.cancel.clone();
        let client = self.client;

        self.state = ReconcileState::Dispatching;
        info!(count = missing.len(), "Sending subscribe requests");
        if !self.dispatch(&missing).await {
            return self.cancelled(missing);
        }

        for cycle in 1..=self.policy.max_cycles {
            self.state = ReconcileState::Verifying { cycle };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancelled(missing);
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            self.cycles = cycle;
            self.log_notices();

            let refreshed = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancelled(missing);
                }
                r = client.subscribed_ids() => r,
            };

            match refreshed {
                Ok(snapshot) => {
                    missing = targets.difference(&snapshot).cloned().collect();
                }
                Err(e) => {
                    warn!(cycle, error = %e, "Could not refresh subscriptions, keeping last known state");
                }
            }

            if missing.is_empty() {
                info!(cycle, "All targets are subscribed");
                self.state = ReconcileState::Converged;
                return self.report(ReconcileOutcome::Converged { cycle });
            }

            info!(
                cycle,
                max = self.policy.max_cycles,
                missing = missing.len(),
                "Targets not visible yet"
            );

            if cycle < self.policy.max_cycles && !self.dispatch(&missing).await {
                return self.cancelled(missing);
            }
        }

        self.log_notices();
        warn!(missing = ?missing, "Gave up waiting for subscriptions");
        self.state = ReconcileState::PartiallyFailed;
        self.report(ReconcileOutcome::PartiallyFailed { missing })
    }

    /// Returns false if cancelled before every id was handed off.
    async fn dispatch(&mut self, ids: &BTreeSet<String>) -> bool {
        let cancel = self.cancel.clone();
        let client = self.client;

        for id in ids {
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                r = client.request_subscribe(id) => r,
            };
            match sent {
                Ok(()) => self.requests_sent += 1,
                // Left in `missing`; the next cycle retries it.
                Err(e) => warn!(id = %id, error = %e, "Subscribe request not sent"),
            }
        }
        true
    }

    fn log_notices(&self) {
        for notice in self.client.drain_notices() {
            if notice.is_ok() {
                info!(id = %notice.item_id, "Subscribe accepted");
            } else {
                warn!(id = %notice.item_id, result = notice.result, "Subscribe rejected");
            }
        }
    }

    fn cancelled(&mut self, missing: BTreeSet<String>) -> ReconcileReport {
        warn!(missing = missing.len(), "Reconciliation cancelled");
        self.state = ReconcileState::Cancelled;
        self.report(ReconcileOutcome::Cancelled { missing })
    }

    fn report(&self, outcome: ReconcileOutcome) -> ReconcileReport {
        ReconcileReport {
            outcome,
            cycles: self.cycles,
            requests_sent: self.requests_sent,
        }
    }
}
