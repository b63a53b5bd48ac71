// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use async_trait::async_trait;
use cx_core::{NotificationChannel, NotificationEvent};
use serde_json::json;
use thiserror::Error;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("{0} channel is not configured")]
    NotConfigured(NotificationChannel),
}

/// One message about one agent, bound for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub channel: NotificationChannel,
    pub agent: String,
    pub event: NotificationEvent,
    pub message: String,
}

impl Notification {
    pub fn new(
        channel: NotificationChannel,
        agent: impl Into<String>,
        event: NotificationEvent,
        message: impl Into<String>,
    ) -> Self {
        Self { channel, agent: agent.into(), event, message: message.into() }
    }

    pub fn emoji(&self) -> &'static str {
        match self.event {
            NotificationEvent::Completion => "\u{2705}",
            NotificationEvent::Failure => "\u{274C}",
            NotificationEvent::Trigger => "\u{1F514}",
            NotificationEvent::BudgetWarning => "\u{26A0}\u{FE0F}",
        }
    }

    /// Markdown body for chat channels: emoji, bold agent line, then the message.
    pub fn chat_text(&self) -> String {
        format!("{} *cx: {}*\n\n{}", self.emoji(), self.agent, self.message)
    }

    pub fn title(&self) -> String {
        match self.event {
            NotificationEvent::Completion => format!("cx: {} completed", self.agent),
            NotificationEvent::Failure => format!("cx: {} failed", self.agent),
            NotificationEvent::Trigger => format!("cx: {} triggered", self.agent),
            NotificationEvent::BudgetWarning => format!("cx: {} budget warning", self.agent),
        }
    }
}

/// Delivery channel for notifications
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Desktop notifications through notify-rust.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let title = notification.title();
        let message = notification.message.clone();
        // show() blocks on some platforms; keep it off the async workers.
        let shown = tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new().appname("cx").summary(&title).body(&message).show()
        })
        .await
        .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        shown.map(|_| ()).map_err(|e| NotifyError::SendFailed(e.to_string()))
    }
}

/// Telegram Bot API `sendMessage` to one chat.
#[derive(Clone)]
pub struct TelegramNotifyAdapter {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifyAdapter {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: TELEGRAM_API.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Point at another Bot API host (self-hosted server or tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url.trim_end_matches('/'), self.bot_token)
    }

    fn payload(&self, notification: &Notification) -> serde_json::Value {
        json!({
            "chat_id": self.chat_id,
            "text": notification.chat_text(),
            "parse_mode": "Markdown",
        })
    }
}

impl std::fmt::Debug for TelegramNotifyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifyAdapter")
            .field("base_url", &self.base_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotifyAdapter for TelegramNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&self.payload(notification))
            .send()
            .await
            // reqwest errors can carry the URL, which holds the token.
            .map_err(|e| NotifyError::SendFailed(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::SendFailed(format!("telegram returned {}: {}", status, body)))
    }
}

/// Routes each notification to the adapter for its channel.
#[derive(Clone, Debug, Default)]
pub struct ChannelNotifyAdapter {
    desktop: DesktopNotifyAdapter,
    telegram: Option<TelegramNotifyAdapter>,
}

impl ChannelNotifyAdapter {
    pub fn new(telegram: Option<TelegramNotifyAdapter>) -> Self {
        Self { desktop: DesktopNotifyAdapter::new(), telegram }
    }
}

#[async_trait]
impl NotifyAdapter for ChannelNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification.channel {
            NotificationChannel::Desktop => self.desktop.notify(notification).await,
            NotificationChannel::Telegram => match &self.telegram {
                Some(telegram) => telegram.notify(notification).await,
                None => Err(NotifyError::NotConfigured(NotificationChannel::Telegram)),
            },
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use cx_core::NotificationChannel;

    use super::{Notification, NotifyAdapter, NotifyError};

    /// Records every delivered notification instead of showing it.
    #[derive(Clone, Default)]
    pub struct FakeNotifyAdapter {
        sent: Arc<Mutex<Vec<Notification>>>,
        unconfigured: Arc<Mutex<Vec<NotificationChannel>>>,
    }

    impl FakeNotifyAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().clone()
        }

        /// Reject `channel` the way an unconfigured channel is rejected.
        pub fn unconfigure(&self, channel: NotificationChannel) {
            self.unconfigured.lock().push(channel);
        }
    }

    #[async_trait]
    impl NotifyAdapter for FakeNotifyAdapter {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            if self.unconfigured.lock().contains(&notification.channel) {
                return Err(NotifyError::NotConfigured(notification.channel));
            }
            self.sent.lock().push(notification.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifyAdapter;

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop(agent: &str, event: NotificationEvent, message: &str) -> Notification {
        Notification::new(NotificationChannel::Desktop, agent, event, message)
    }

    #[test]
    fn title_names_agent_and_event() {
        let n = desktop("digest", NotificationEvent::BudgetWarning, "80%");
        assert_eq!(n.title(), "cx: digest budget warning");
        let n = desktop("inbox", NotificationEvent::Trigger, "");
        assert_eq!(n.title(), "cx: inbox triggered");
    }

    #[test]
    fn chat_text_leads_with_event_emoji() {
        let n = desktop("digest", NotificationEvent::Failure, "Run failed: boom");
        assert_eq!(n.chat_text(), "\u{274C} *cx: digest*\n\nRun failed: boom");
        let n = desktop("inbox", NotificationEvent::Completion, "done");
        assert!(n.chat_text().starts_with("\u{2705} *cx: inbox*"));
    }

    #[test]
    fn telegram_payload_targets_configured_chat() {
        let telegram = TelegramNotifyAdapter::new("123:abc", "-10042")
            .with_base_url("http://127.0.0.1:9/");
        assert_eq!(telegram.endpoint(), "http://127.0.0.1:9/bot123:abc/sendMessage");

        let n = Notification::new(
            NotificationChannel::Telegram,
            "inbox",
            NotificationEvent::Trigger,
            "3 new",
        );
        let payload = telegram.payload(&n);
        assert_eq!(payload["chat_id"], "-10042");
        assert_eq!(payload["parse_mode"], "Markdown");
        assert_eq!(payload["text"], "\u{1F514} *cx: inbox*\n\n3 new");
    }

    #[tokio::test]
    async fn telegram_unreachable_is_send_failure_without_token() {
        let telegram = TelegramNotifyAdapter::new("secret-token", "1")
            .with_base_url("http://127.0.0.1:9");
        let n = Notification::new(NotificationChannel::Telegram, "a", NotificationEvent::Trigger, "");
        let err = telegram.notify(&n).await.unwrap_err();
        assert!(matches!(err, NotifyError::SendFailed(_)));
        assert!(!err.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn unconfigured_telegram_is_rejected() {
        let router = ChannelNotifyAdapter::new(None);
        let n = Notification::new(NotificationChannel::Telegram, "a", NotificationEvent::Failure, "x");
        let err = router.notify(&n).await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured(NotificationChannel::Telegram)));
        assert_eq!(err.to_string(), "telegram channel is not configured");
    }

    #[tokio::test]
    async fn fake_records_in_order() {
        let fake = FakeNotifyAdapter::new();
        fake.notify(&desktop("a", NotificationEvent::Completion, "one")).await.unwrap();
        fake.notify(&desktop("a", NotificationEvent::Failure, "two")).await.unwrap();
        let messages: Vec<_> = fake.sent().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, ["one", "two"]);
    }
}
