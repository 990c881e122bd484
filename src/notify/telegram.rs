// src/notify/telegram.rs
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::retry::DeliveryOutcome;

/// One-shot sender for the Bot API `sendMessage` method. Retrying is the
/// dispatcher's job; this type only maps a single round-trip to an outcome.
#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    url: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    description: Option<String>,
    parameters: Option<ApiErrorParams>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorParams {
    retry_after: Option<f64>,
}

impl TelegramTransport {
    pub fn new(api_base: &str, token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("crypto-news-sentinel/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            client,
            url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        })
    }

    pub async fn send_once(&self, text: &str) -> DeliveryOutcome {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let rsp = match self.client.post(&self.url).json(&body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return DeliveryOutcome::Timeout,
            // without_url: the URL carries the bot token.
            Err(e) => return DeliveryOutcome::ConnectionError(e.without_url().to_string()),
        };

        let status = rsp.status();
        if status.is_success() {
            return DeliveryOutcome::Success;
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeliveryOutcome::AuthFailed {
                status: status.as_u16(),
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let err: ApiError = rsp.json().await.unwrap_or_default();
                DeliveryOutcome::RateLimited {
                    retry_after: err.parameters.and_then(|p| p.retry_after),
                }
            }
            _ => {
                let err: ApiError = rsp.json().await.unwrap_or_default();
                DeliveryOutcome::OtherFailure {
                    status: status.as_u16(),
                    description: err
                        .description
                        .unwrap_or_else(|| "Unknown error".to_string()),
                }
            }
        }
    }
}
