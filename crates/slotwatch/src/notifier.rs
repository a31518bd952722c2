use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError, TelegramCredentials};
use crate::types::NotificationEvent;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Telegram request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Telegram responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Telegram rejected the message: {0}")]
    Rejected(String),
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Backslash-escapes the characters legacy Telegram Markdown treats as
/// entity delimiters.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Telegram "Markdown" body with a link back to the city page.
pub fn format_message(event: &NotificationEvent) -> String {
    format!(
        "*{}* appointment open in *{}*\nEarliest: {}\n[Book now]({})",
        escape_markdown(&event.country),
        escape_markdown(&event.city),
        escape_markdown(&event.earliest_availability),
        event.source_url
    )
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    credentials: TelegramCredentials,
}

impl TelegramNotifier {
    pub fn new(
        api_url: impl Into<String>,
        credentials: TelegramCredentials,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            credentials,
        })
    }

    pub async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        // The token is part of the path, so the URL is never logged.
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_url.trim_end_matches('/'),
            self.credentials.token
        );
        let text = format_message(event);
        let body = SendMessage {
            chat_id: &self.credentials.chat_id,
            text: &text,
            parse_mode: "Markdown",
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }

        let reply: TelegramReply = response.json().await?;
        if !reply.ok {
            return Err(NotifyError::Rejected(
                reply
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }
        Ok(())
    }
}

/// How alerts leave the process.
#[derive(Debug, Clone)]
pub enum Notifier {
    Telegram(TelegramNotifier),
    /// Logs the alert instead of delivering it.
    DryRun,
}

impl Notifier {
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self, NotifyError> {
        if dry_run {
            return Ok(Notifier::DryRun);
        }
        let credentials = config.telegram_credentials()?;
        Ok(Notifier::Telegram(TelegramNotifier::new(
            config.telegram_api_url.clone(),
            credentials,
        )?))
    }

    pub async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        match self {
            Notifier::Telegram(telegram) => {
                telegram.send(event).await?;
                log::info!(
                    "Sent alert for {} in {}: {}",
                    event.country,
                    event.city,
                    event.earliest_availability
                );
            }
            Notifier::DryRun => {
                log::info!("[dry run] would send:\n{}", format_message(event));
            }
        }
        Ok(())
    }
}
