// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Telegram Bot API notification sink.

use std::time::Duration;

use async_trait::async_trait;
use pitr_heal::{Notification, NotificationSink, PitrError, PitrResult};
use tracing::{debug, info};

use crate::config::TelegramConfig;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Posts notifications to a chat through `sendMessage`.
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    config: TelegramConfig,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> PitrResult<Self> {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Use a different Bot API endpoint, e.g. a local bot server.
    pub fn with_api_base(config: TelegramConfig, api_base: impl Into<String>) -> PitrResult<Self> {
        crate::install_crypto_provider();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PitrError::DeliveryFailed(format!("cannot build HTTP client: {e}")))?;
        info!(
            token_chars = config.bot_token.len(),
            chat_id = %config.chat_id,
            "Telegram notifications enabled"
        );
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            config,
        })
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token)
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, notification: &Notification) -> PitrResult<()> {
        let text = notification.render();
        let response = self
            .client
            .post(self.send_url())
            .form(&[("chat_id", self.config.chat_id.as_str()), ("text", text.as_str())])
            .send()
            .await
            // Drop the URL from the error; it carries the bot token.
            .map_err(|e| PitrError::DeliveryFailed(format!("network error: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PitrError::DeliveryFailed(format!("API error {status}: {body}")));
        }
        debug!("Telegram message delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Form;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use pitr_heal::Severity;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Received = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn fake_bot_api(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::default();
        let sink = received.clone();
        let app = Router::new().route(
            "/bottoken-1/sendMessage",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(form);
                    (status, "{}")
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), received)
    }

    fn config() -> TelegramConfig {
        TelegramConfig {
            bot_token: "token-1".to_string(),
            chat_id: "-100".to_string(),
        }
    }

    #[tokio::test]
    async fn test_posts_form_to_send_message() {
        let (base, received) = fake_bot_api(StatusCode::OK).await;
        let sink = TelegramSink::with_api_base(config(), base).unwrap();

        sink.deliver(&Notification::new(Severity::Critical, "disk gone"))
            .await
            .unwrap();

        let forms = received.lock().unwrap().clone();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["chat_id"], "-100");
        assert_eq!(forms[0]["text"], "[CRITICAL] disk gone");
    }

    #[tokio::test]
    async fn test_api_errors_are_reported() {
        let (base, _) = fake_bot_api(StatusCode::BAD_REQUEST).await;
        let sink = TelegramSink::with_api_base(config(), base).unwrap();

        let err = sink
            .deliver(&Notification::new(Severity::Info, "hello"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("400"));
    }
}
