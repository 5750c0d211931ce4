//! Channel notifiers using the Strategy pattern.
//!
//! The engine reaches both providers (transactional email, messaging)
//! through the single [`Notifier`] trait; the [`NotifierSet`] resolves a
//! channel to its concrete notifier.

pub mod email;
pub mod messaging;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NotifierConfig;
use crate::error::AppResult;
use crate::models::{Channel, DeliveryOutcome};

pub use email::EmailNotifier;
pub use messaging::MessagingNotifier;

// =============================================================================
// Outbound Message
// =============================================================================

/// Channel-agnostic message handed to a notifier.
///
/// Template content itself lives with the provider; the engine only selects
/// the template and supplies its variables.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Email address or phone number, depending on channel
    pub recipient: String,
    /// Subject line (used by the email channel)
    pub subject: String,
    /// Provider-side template identifier
    pub template: String,
    /// Ordered template variables
    pub variables: BTreeMap<String, String>,
}

impl OutboundMessage {
    /// Renders the variables as a plain-text body, used by the email
    /// channel and as the messaging fallback when a template is rejected.
    pub fn plain_text(&self) -> String {
        let mut body = String::new();
        for (key, value) in &self.variables {
            body.push_str(key);
            body.push_str(": ");
            body.push_str(value);
            body.push('\n');
        }
        body
    }
}

// =============================================================================
// Notifier Trait
// =============================================================================

/// Trait for channel notifiers (Strategy pattern).
///
/// Implementations never panic on provider errors and bound their
/// round-trip time; a timeout is a failed [`DeliveryOutcome`], not a crash.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message to the provider
    async fn send(&self, message: &OutboundMessage) -> DeliveryOutcome;
}

// =============================================================================
// Notifier Set
// =============================================================================

/// Resolves a delivery channel to its concrete notifier
#[derive(Clone)]
pub struct NotifierSet {
    email: Arc<dyn Notifier>,
    messaging: Arc<dyn Notifier>,
}

impl NotifierSet {
    /// Builds the production notifiers from configuration
    pub fn from_config(config: &NotifierConfig) -> AppResult<Self> {
        Ok(Self {
            email: Arc::new(EmailNotifier::new(config)),
            messaging: Arc::new(MessagingNotifier::new(config)?),
        })
    }

    /// Builds a set from explicit notifiers (used by tests)
    pub fn with_notifiers(email: Arc<dyn Notifier>, messaging: Arc<dyn Notifier>) -> Self {
        Self { email, messaging }
    }

    pub fn for_channel(&self, channel: Channel) -> &dyn Notifier {
        match channel {
            Channel::Email => self.email.as_ref(),
            Channel::Messaging => self.messaging.as_ref(),
        }
    }
}
