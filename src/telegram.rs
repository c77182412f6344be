use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::checkout::{OrderNotifier, Receipt};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Relays order notifications to a chat through the Bot API `sendPhoto` method.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self::with_api_url(DEFAULT_API_URL, bot_token, chat_id)
    }

    pub fn with_api_url(api_url: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    pub fn send_photo_url(&self) -> String {
        format!("{}/bot{}/sendPhoto", self.api_url, self.bot_token)
    }

    fn form(&self, caption: &str, receipt: &Receipt) -> Result<Form> {
        let photo = Part::bytes(receipt.bytes.clone())
            .file_name(receipt.file_name.clone())
            .mime_str(&receipt.mime)
            .map_err(|e| anyhow!("Invalid receipt content type {}: {}", receipt.mime, e))?;

        Ok(Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("parse_mode", "Markdown")
            .text("caption", caption.to_string())
            .part("photo", photo))
    }
}

#[async_trait]
impl OrderNotifier for TelegramNotifier {
    async fn notify(&self, caption: &str, receipt: &Receipt) -> Result<()> {
        tracing::info!("Sending order notification to chat {}", self.chat_id);

        let response = self
            .http
            .post(self.send_photo_url())
            .multipart(self.form(caption, receipt)?)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach Telegram: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read Telegram response: {}", e))?;

        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();
        match parsed {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse { description: Some(description), .. }) => {
                tracing::error!("Telegram rejected notification: {}", description);
                Err(anyhow!("Telegram rejected notification: {}", description))
            }
            _ => {
                tracing::error!("Telegram returned {}: {}", status, text);
                Err(anyhow!("Telegram returned {}", status))
            }
        }
    }
}
