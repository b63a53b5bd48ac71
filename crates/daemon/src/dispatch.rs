// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatch: fan one event out to an agent's subscriptions.

use cx_adapters::{Notification, NotifyAdapter};
use cx_core::{truncate_chars, AgentDefinition, NotificationEvent, RunResult};
use tracing::{debug, warn};

/// Fraction of `max_cost_usd` at which a run triggers a budget warning
pub(crate) const BUDGET_WARNING_RATIO: f64 = 0.8;

#[derive(Clone)]
pub(crate) struct Dispatcher<N> {
    notifier: N,
}

impl<N: NotifyAdapter> Dispatcher<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }

    /// Deliver to every subscription that wants `event`. Failures are logged
    /// and never stop delivery to the remaining channels.
    pub async fn dispatch(&self, def: &AgentDefinition, event: NotificationEvent, message: String) {
        for subscription in def.notifications.iter().filter(|s| s.wants(event)) {
            let channel = subscription.channel;
            let notification = Notification::new(channel, &def.name, event, message.clone());
            match self.notifier.notify(&notification).await {
                Ok(()) => debug!(agent = %def.name, %event, %channel, "notification sent"),
                Err(e) => {
                    warn!(agent = %def.name, %event, %channel, error = %e, "notification failed")
                }
            }
        }
    }

    /// Warn when one run used most of the agent's cost limit.
    pub async fn check_budget(&self, def: &AgentDefinition, result: &RunResult) {
        let Some(limit) = def.max_budget_usd().filter(|l| *l > 0.0) else {
            return;
        };
        if result.cost_usd < limit * BUDGET_WARNING_RATIO {
            return;
        }
        let message = format!(
            "Run cost ${:.4} is {:.0}% of the ${:.2} budget",
            result.cost_usd,
            result.cost_usd / limit * 100.0,
            limit
        );
        self.dispatch(def, NotificationEvent::BudgetWarning, message).await;
    }
}

/// `Run completed in 1.5s ($0.0100)` followed by the result text.
pub(crate) fn completion_message(result: &RunResult) -> String {
    format!(
        "Run completed in {:.1}s (${:.4})\n\n{}",
        result.duration_secs(),
        result.cost_usd,
        truncate_chars(&result.result, 3000)
    )
}

pub(crate) fn failure_message(result: &RunResult) -> String {
    format!("Run failed: {}", truncate_chars(&result.result, 200))
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
