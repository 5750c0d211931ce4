//! Notification models: the scheduled-record table, the append-only audit
//! log, and the closed set of notification kinds the engine knows about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// Channel Enum
// =============================================================================

/// Delivery channel for a notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Messaging,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Messaging => write!(f, "messaging"),
        }
    }
}

// =============================================================================
// Notification Kind Enum
// =============================================================================

/// Closed enumeration of notification kinds.
///
/// Each kind has a delivery channel and a scheduling rule anchored on the
/// booking's creation time, event date, or appointment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum NotificationKind {
    #[sqlx(rename = "initial")]
    #[serde(rename = "initial")]
    Initial,
    #[sqlx(rename = "followup-3h")]
    #[serde(rename = "followup-3h")]
    Followup3h,
    #[sqlx(rename = "followup-6h")]
    #[serde(rename = "followup-6h")]
    Followup6h,
    #[sqlx(rename = "followup-24h")]
    #[serde(rename = "followup-24h")]
    Followup24h,
    #[sqlx(rename = "followup-3d")]
    #[serde(rename = "followup-3d")]
    Followup3d,
    #[sqlx(rename = "followup-6d")]
    #[serde(rename = "followup-6d")]
    Followup6d,
    #[sqlx(rename = "followup-30d")]
    #[serde(rename = "followup-30d")]
    Followup30d,
    #[sqlx(rename = "event-reminder-24h")]
    #[serde(rename = "event-reminder-24h")]
    EventReminder24h,
    #[sqlx(rename = "appointment-day-reminder")]
    #[serde(rename = "appointment-day-reminder")]
    AppointmentDayReminder,
    #[sqlx(rename = "post-appointment-followup")]
    #[serde(rename = "post-appointment-followup")]
    PostAppointmentFollowup,
    #[sqlx(rename = "urgency-2w")]
    #[serde(rename = "urgency-2w")]
    Urgency2w,
    #[sqlx(rename = "urgency-1w")]
    #[serde(rename = "urgency-1w")]
    Urgency1w,
    #[sqlx(rename = "urgency-7d")]
    #[serde(rename = "urgency-7d")]
    Urgency7d,
}

impl NotificationKind {
    /// Every kind the scheduler evaluates, in evaluation order.
    pub const ALL: [NotificationKind; 13] = [
        NotificationKind::Initial,
        NotificationKind::Followup3h,
        NotificationKind::Followup6h,
        NotificationKind::Followup24h,
        NotificationKind::Followup3d,
        NotificationKind::Followup6d,
        NotificationKind::Followup30d,
        NotificationKind::EventReminder24h,
        NotificationKind::AppointmentDayReminder,
        NotificationKind::PostAppointmentFollowup,
        NotificationKind::Urgency2w,
        NotificationKind::Urgency1w,
        NotificationKind::Urgency7d,
    ];

    /// Delivery channel for this kind.
    ///
    /// Quote follow-ups go out as transactional email; event and
    /// appointment reminders use the messaging provider. `urgency-7d` is
    /// the email twin of the one-week messaging urgency, which is why two
    /// kinds share the 7-day offset.
    pub fn channel(self) -> Channel {
        match self {
            NotificationKind::Initial
            | NotificationKind::Followup3h
            | NotificationKind::Followup6h
            | NotificationKind::Followup24h
            | NotificationKind::Followup3d
            | NotificationKind::Followup6d
            | NotificationKind::Followup30d
            | NotificationKind::Urgency7d => Channel::Email,
            NotificationKind::EventReminder24h
            | NotificationKind::AppointmentDayReminder
            | NotificationKind::PostAppointmentFollowup
            | NotificationKind::Urgency2w
            | NotificationKind::Urgency1w => Channel::Messaging,
        }
    }

    /// True for the follow-ups counted from booking creation.
    pub fn is_creation_relative(self) -> bool {
        matches!(
            self,
            NotificationKind::Followup3h
                | NotificationKind::Followup6h
                | NotificationKind::Followup24h
                | NotificationKind::Followup3d
                | NotificationKind::Followup6d
                | NotificationKind::Followup30d
        )
    }

    /// True for the pre-event urgency reminders.
    pub fn is_urgency(self) -> bool {
        matches!(
            self,
            NotificationKind::Urgency2w | NotificationKind::Urgency1w | NotificationKind::Urgency7d
        )
    }

    /// True for the kinds that only apply to confirmed-and-paid bookings.
    pub fn is_event_bound(self) -> bool {
        matches!(
            self,
            NotificationKind::EventReminder24h
                | NotificationKind::AppointmentDayReminder
                | NotificationKind::PostAppointmentFollowup
        )
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::Initial => "initial",
            NotificationKind::Followup3h => "followup-3h",
            NotificationKind::Followup6h => "followup-6h",
            NotificationKind::Followup24h => "followup-24h",
            NotificationKind::Followup3d => "followup-3d",
            NotificationKind::Followup6d => "followup-6d",
            NotificationKind::Followup30d => "followup-30d",
            NotificationKind::EventReminder24h => "event-reminder-24h",
            NotificationKind::AppointmentDayReminder => "appointment-day-reminder",
            NotificationKind::PostAppointmentFollowup => "post-appointment-followup",
            NotificationKind::Urgency2w => "urgency-2w",
            NotificationKind::Urgency1w => "urgency-1w",
            NotificationKind::Urgency7d => "urgency-7d",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Notification Record Model
// =============================================================================

/// One scheduled notification for a booking.
///
/// Uniqueness invariant: at most one record per `(booking_id, kind)`.
/// Records are never deleted; suppression flips `cancelled`, a successful
/// dispatch flips `sent`, and neither transition is ever reversed by
/// state change alone.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub booking_id: Uuid,
    pub kind: NotificationKind,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub cancel_reason: Option<String>,
    pub delivered: bool,
    pub provider_message_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Display status for the admin UI: failures stay operational and are
    /// never shown as a separate state.
    pub fn display_status(&self) -> RecordStatus {
        if self.cancelled {
            RecordStatus::Cancelled
        } else if self.sent {
            RecordStatus::Sent
        } else {
            RecordStatus::Scheduled
        }
    }
}

/// Per-kind status badge shown by the admin UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    NotScheduled,
    Scheduled,
    Sent,
    Cancelled,
}

/// Per-kind status view for the admin UI, covering kinds with no record.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationStatusView {
    pub kind: NotificationKind,
    pub channel: Channel,
    pub status: RecordStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered: bool,
    pub cancel_reason: Option<String>,
}

// =============================================================================
// Audit Log Model
// =============================================================================

/// Status of an audit log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationEventStatus {
    Scheduled,
    Cancelled,
    Sent,
    Failed,
    Delivered,
}

impl std::fmt::Display for NotificationEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationEventStatus::Scheduled => write!(f, "scheduled"),
            NotificationEventStatus::Cancelled => write!(f, "cancelled"),
            NotificationEventStatus::Sent => write!(f, "sent"),
            NotificationEventStatus::Failed => write!(f, "failed"),
            NotificationEventStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// Append-only audit entry; multiple attempts never overwrite history.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationEvent {
    pub id: i64,
    pub booking_id: Uuid,
    pub kind: NotificationKind,
    pub status: NotificationEventStatus,
    pub detail: Option<String>,
    pub provider_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Delivery Outcome
// =============================================================================

/// Transient result of one dispatch attempt against a provider
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub provider_message_id: Option<String>,
    /// Set when the provider confirms delivery synchronously
    pub delivered: bool,
    pub delivery_status: Option<String>,
    pub error_message: Option<String>,
}

impl DeliveryOutcome {
    /// Creates a successful outcome
    pub fn success(provider_message_id: Option<String>, delivery_status: Option<String>) -> Self {
        Self {
            success: true,
            provider_message_id,
            delivered: false,
            delivery_status,
            error_message: None,
        }
    }

    /// Creates a failed outcome
    pub fn failure(error_message: String) -> Self {
        Self {
            success: false,
            provider_message_id: None,
            delivered: false,
            delivery_status: None,
            error_message: Some(error_message),
        }
    }
}
