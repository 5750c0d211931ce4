//! Transactional email notifier.
//!
//! Sends customer emails via SMTP using the lettre crate.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Notifier, OutboundMessage};
use crate::config::NotifierConfig;
use crate::models::DeliveryOutcome;

/// Email notifier backed by an SMTP relay
pub struct EmailNotifier {
    smtp_host: Option<String>,
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    from_address: String,
}

impl EmailNotifier {
    /// Creates an email notifier from the provider configuration
    pub fn new(config: &NotifierConfig) -> Self {
        Self {
            smtp_host: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            smtp_username: config.smtp_username.clone(),
            smtp_password: config.smtp_password.clone(),
            from_address: config.email_from.clone(),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, message: &OutboundMessage) -> DeliveryOutcome {
        let smtp_host = match &self.smtp_host {
            Some(h) => h,
            None => return DeliveryOutcome::failure("SMTP host not configured".to_string()),
        };

        let from = match self.from_address.parse() {
            Ok(addr) => addr,
            Err(e) => {
                return DeliveryOutcome::failure(format!(
                    "Invalid from address {}: {}",
                    self.from_address, e
                ))
            }
        };

        let to = match message.recipient.parse() {
            Ok(addr) => addr,
            Err(e) => {
                return DeliveryOutcome::failure(format!(
                    "Invalid email recipient {}: {}",
                    message.recipient, e
                ))
            }
        };

        let email = match Message::builder()
            .from(from)
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.plain_text())
        {
            Ok(email) => email,
            Err(e) => return DeliveryOutcome::failure(format!("Failed to build email: {}", e)),
        };

        // Port 465 = implicit TLS (SMTPS), anything else = STARTTLS
        let mailer_builder = if self.smtp_port == 465 {
            let tls_params =
                match lettre::transport::smtp::client::TlsParameters::new(smtp_host.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        return DeliveryOutcome::failure(format!(
                            "Invalid TLS parameters for SMTP host: {}",
                            e
                        ))
                    }
                };

            match AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host) {
                Ok(b) => b
                    .port(self.smtp_port)
                    .tls(lettre::transport::smtp::client::Tls::Wrapper(tls_params)),
                Err(e) => return DeliveryOutcome::failure(format!("Invalid SMTP host: {}", e)),
            }
        } else {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host) {
                Ok(b) => b.port(self.smtp_port),
                Err(e) => return DeliveryOutcome::failure(format!("Invalid SMTP host: {}", e)),
            }
        };

        let mailer = if let (Some(username), Some(password)) =
            (self.smtp_username.as_ref(), self.smtp_password.as_ref())
        {
            mailer_builder
                .credentials(Credentials::new(username.clone(), password.clone()))
                .build()
        } else {
            mailer_builder.build()
        };

        match mailer.send(email).await {
            Ok(response) => {
                log::debug!("Email sent to {}", message.recipient);
                DeliveryOutcome::success(None, Some(response.code().to_string()))
            }
            Err(e) => DeliveryOutcome::failure(format!(
                "Failed to send email to {}: {}",
                message.recipient, e
            )),
        }
    }
}
