//! Messaging notifier.
//!
//! Sends customer messages through the messaging provider's HTTP API.
//! A template send is attempted first; when the provider rejects the
//! template the message is retried once as plain text.

use async_trait::async_trait;
use serde_json::json;

use super::{Notifier, OutboundMessage};
use crate::config::NotifierConfig;
use crate::error::{AppError, AppResult};
use crate::models::DeliveryOutcome;

/// Messaging notifier backed by the provider's JSON API
pub struct MessagingNotifier {
    client: reqwest::Client,
    api_url: Option<String>,
    api_token: Option<String>,
}

impl MessagingNotifier {
    /// Creates a messaging notifier from the provider configuration
    pub fn new(config: &NotifierConfig) -> AppResult<Self> {
        if let Some(ref api_url) = config.messaging_api_url {
            let parsed = url::Url::parse(api_url)
                .map_err(|_| AppError::Validation("Invalid MESSAGING_API_URL".to_string()))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(AppError::Validation(
                    "MESSAGING_API_URL must use HTTP or HTTPS".to_string(),
                ));
            }
        }

        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.messaging_api_url.clone(),
            api_token: config.messaging_api_token.clone(),
        })
    }

    /// Builds the template-message request body
    fn template_body(message: &OutboundMessage) -> serde_json::Value {
        json!({
            "to": message.recipient,
            "type": "template",
            "template": message.template,
            "variables": message.variables,
        })
    }

    /// Builds the plain-text fallback request body
    fn text_body(message: &OutboundMessage) -> serde_json::Value {
        json!({
            "to": message.recipient,
            "type": "text",
            "text": message.plain_text(),
        })
    }

    async fn post_message(&self, api_url: &str, body: serde_json::Value) -> PostResult {
        let mut request = self.client.post(api_url).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let payload: serde_json::Value = response.json().await.unwrap_or_default();
                if (200..300).contains(&status) {
                    PostResult::Accepted {
                        message_id: payload
                            .get("message_id")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                        delivery_status: payload
                            .get("status")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                    }
                } else {
                    let detail = payload
                        .get("error")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("HTTP {}", status));
                    // 4xx = the provider refused this message (bad template,
                    // unknown recipient); 5xx/timeouts are transport failures.
                    if (400..500).contains(&status) {
                        PostResult::Rejected(detail)
                    } else {
                        PostResult::TransportError(detail)
                    }
                }
            }
            Err(e) => {
                let error_msg = if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    "Connection failed".to_string()
                } else {
                    format!("Request failed: {}", e)
                };
                PostResult::TransportError(error_msg)
            }
        }
    }
}

enum PostResult {
    Accepted {
        message_id: Option<String>,
        delivery_status: Option<String>,
    },
    Rejected(String),
    TransportError(String),
}

#[async_trait]
impl Notifier for MessagingNotifier {
    async fn send(&self, message: &OutboundMessage) -> DeliveryOutcome {
        let api_url = match &self.api_url {
            Some(u) => u,
            None => {
                return DeliveryOutcome::failure("Messaging provider not configured".to_string())
            }
        };

        match self
            .post_message(api_url, Self::template_body(message))
            .await
        {
            PostResult::Accepted {
                message_id,
                delivery_status,
            } => DeliveryOutcome::success(message_id, delivery_status),
            PostResult::TransportError(detail) => DeliveryOutcome::failure(detail),
            PostResult::Rejected(detail) => {
                log::warn!(
                    "Template '{}' rejected for {} ({}), falling back to plain text",
                    message.template,
                    message.recipient,
                    detail
                );
                match self.post_message(api_url, Self::text_body(message)).await {
                    PostResult::Accepted {
                        message_id,
                        delivery_status,
                    } => DeliveryOutcome::success(message_id, delivery_status),
                    PostResult::Rejected(detail) | PostResult::TransportError(detail) => {
                        DeliveryOutcome::failure(detail)
                    }
                }
            }
        }
    }
}
