// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled mode: run when the cron expression has fired since the last check.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cx_adapters::{ExecutionBackend, NotifyAdapter, WatchScriptRunner};
use cx_core::{AgentDefinition, Clock, CronSchedule, DefinitionError, NotificationEvent};
use tracing::{debug, info};

use super::{HandlerError, Scheduler};
use crate::dispatch::{completion_message, failure_message};
use crate::memory::load_context;

pub(crate) const SCHEDULED_RUN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

impl<B, S, N, C> Scheduler<B, S, N, C>
where
    B: ExecutionBackend,
    S: WatchScriptRunner,
    N: NotifyAdapter,
    C: Clock,
{
    pub(crate) async fn handle_scheduled(&self, def: &AgentDefinition) -> Result<(), HandlerError> {
        let name = def.name.as_str();
        let schedule = def
            .execution
            .schedule
            .as_ref()
            .ok_or_else(|| DefinitionError::MissingSchedule(def.name.clone()))?;
        let cron = CronSchedule::parse(&schedule.expression, schedule.timezone.as_deref())?;

        let now = self.clock.now();
        let Some(last_check) = self.state.update_agent(name, |a| {
            a.last_check.replace(now).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        }) else {
            return Ok(());
        };

        if !cron.is_due(last_check, now) {
            self.state.update_agent(name, |a| a.next_run = cron.next_after(now));
            return Ok(());
        }

        let Some(_running) = self.state.try_begin_run(name) else {
            debug!(agent = name, "already running, skipping");
            return Ok(());
        };

        info!(agent = name, expression = %schedule.expression, "scheduled run due");
        let prompt = load_context(&self.vault, def, None)?;
        let request = self.invoke_request(def, prompt, SCHEDULED_RUN_TIMEOUT);
        let result = self.backend.invoke(request).await;
        if self.shutting_down() {
            info!(agent = name, "scheduled run interrupted by shutdown");
            return Ok(());
        }

        self.record_run(def, &result, None).await;

        let finished = self.clock.now();
        if result.is_error {
            let failures = self.state.update_agent(name, |a| a.record_failure());
            info!(agent = name, ?failures, "scheduled run failed");
            self.dispatcher.dispatch(def, NotificationEvent::Failure, failure_message(&result)).await;
        } else {
            self.state.update_agent(name, |a| {
                a.consecutive_failures = 0;
                a.last_run = Some(finished);
                a.next_run = cron.next_after(finished);
            });
            info!(agent = name, cost_usd = result.cost_usd, "scheduled run completed");
            self.dispatcher
                .dispatch(def, NotificationEvent::Completion, completion_message(&result))
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduled_tests.rs"]
mod tests;
