use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::checkout::Merchant;
use crate::order::STORE_NAME;

const DEFAULT_STORE_PATH: &str = ".purat/store.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub merchant_id: Option<String>,
    pub merchant_name: String,
    pub store_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let supabase_url = std::env::var("SUPABASE_URL")
            .map_err(|_| anyhow!("SUPABASE_URL not set"))?;
        Url::parse(&supabase_url)
            .map_err(|e| anyhow!("Invalid SUPABASE_URL: {}", e))?;

        Ok(Config {
            supabase_url,
            supabase_anon_key: std::env::var("SUPABASE_ANON_KEY")
                .map_err(|_| anyhow!("SUPABASE_ANON_KEY not set"))?,
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
            merchant_id: std::env::var("KHQR_MERCHANT_ID").ok(),
            merchant_name: std::env::var("KHQR_MERCHANT_NAME")
                .unwrap_or_else(|_| STORE_NAME.to_string()),
            store_path: std::env::var("PURAT_STORE_PATH")
                .unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string())
                .into(),
        })
    }

    pub fn merchant(&self) -> Result<Merchant> {
        let id = self
            .merchant_id
            .clone()
            .ok_or_else(|| anyhow!("KHQR_MERCHANT_ID not set"))?;
        Ok(Merchant {
            id,
            name: self.merchant_name.clone(),
        })
    }

    /// Bot token and chat id, both required to send order notifications.
    pub fn telegram(&self) -> Result<(&str, &str)> {
        let token = self
            .telegram_bot_token
            .as_deref()
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN not set"))?;
        let chat_id = self
            .telegram_chat_id
            .as_deref()
            .ok_or_else(|| anyhow!("TELEGRAM_CHAT_ID not set"))?;
        Ok((token, chat_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            supabase_url: "https://x.supabase.co".into(),
            supabase_anon_key: "anon".into(),
            telegram_bot_token: None,
            telegram_chat_id: Some("42".into()),
            merchant_id: None,
            merchant_name: STORE_NAME.into(),
            store_path: DEFAULT_STORE_PATH.into(),
        }
    }

    #[test]
    fn test_missing_optional_values_error_on_use() {
        let config = config();
        assert_eq!(config.merchant().unwrap_err().to_string(), "KHQR_MERCHANT_ID not set");
        assert_eq!(config.telegram().unwrap_err().to_string(), "TELEGRAM_BOT_TOKEN not set");
    }

    #[test]
    fn test_present_values() {
        let config = Config {
            merchant_id: Some("shop@aclb".into()),
            telegram_bot_token: Some("t".into()),
            ..config()
        };
        assert_eq!(config.merchant().unwrap().name, "Purat Site");
        assert_eq!(config.telegram().unwrap(), ("t", "42"));
    }
}
