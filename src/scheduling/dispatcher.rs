//! Maps a due record to a channel-specific send.
//!
//! Selects the provider-side template and destination for a kind, builds
//! the template variables from the booking snapshot, and invokes the
//! channel's notifier. Template content itself lives with the provider.

use std::collections::BTreeMap;

use chrono_tz::Tz;

use crate::models::{
    BookingSnapshot, Channel, DeliveryOutcome, NotificationKind, NotificationRecord,
};
use crate::services::notification::{NotifierSet, OutboundMessage};

pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Provider-side template identifier for a kind
    pub fn template(kind: NotificationKind) -> &'static str {
        match kind {
            NotificationKind::Initial => "quote-initial",
            NotificationKind::Followup3h => "quote-followup-3h",
            NotificationKind::Followup6h => "quote-followup-6h",
            NotificationKind::Followup24h => "quote-followup-24h",
            NotificationKind::Followup3d => "quote-followup-3d",
            NotificationKind::Followup6d => "quote-followup-6d",
            NotificationKind::Followup30d => "quote-followup-30d",
            NotificationKind::EventReminder24h => "event-reminder-24h",
            NotificationKind::AppointmentDayReminder => "appointment-day-reminder",
            NotificationKind::PostAppointmentFollowup => "post-appointment-followup",
            NotificationKind::Urgency2w => "urgency-2w",
            NotificationKind::Urgency1w => "urgency-1w",
            NotificationKind::Urgency7d => "urgency-7d",
        }
    }

    /// Subject line for the email channel
    fn subject(kind: NotificationKind) -> &'static str {
        match kind {
            NotificationKind::Initial => "Your booking quote",
            NotificationKind::Followup3h
            | NotificationKind::Followup6h
            | NotificationKind::Followup24h
            | NotificationKind::Followup3d
            | NotificationKind::Followup6d
            | NotificationKind::Followup30d => "About your booking quote",
            NotificationKind::Urgency7d => "Your event date is coming up",
            // Messaging kinds carry no subject
            _ => "",
        }
    }

    /// Builds the channel-agnostic outbound message for a due record
    pub fn build_message(
        snapshot: &BookingSnapshot,
        kind: NotificationKind,
        tz: Tz,
    ) -> OutboundMessage {
        let recipient = match kind.channel() {
            Channel::Email => snapshot.booking.customer_email.clone(),
            Channel::Messaging => snapshot.booking.customer_phone.clone(),
        };

        let mut variables = BTreeMap::new();
        variables.insert(
            "customer_name".to_string(),
            snapshot.booking.customer_name.clone(),
        );
        variables.insert(
            "booking_reference".to_string(),
            snapshot.booking.id.to_string(),
        );
        if let Some(event_date) = snapshot.event_date() {
            variables.insert(
                "event_date".to_string(),
                event_date.format("%d/%m/%Y").to_string(),
            );
        }
        if let Some(time) = snapshot.appointment_time() {
            variables.insert(
                "appointment_time".to_string(),
                time.format("%H:%M").to_string(),
            );
        }
        variables.insert("timezone".to_string(), tz.name().to_string());

        OutboundMessage {
            recipient,
            subject: Self::subject(kind).to_string(),
            template: Self::template(kind).to_string(),
            variables,
        }
    }

    /// Dispatches one due record through its channel's notifier
    pub async fn dispatch(
        notifiers: &NotifierSet,
        snapshot: &BookingSnapshot,
        record: &NotificationRecord,
        tz: Tz,
    ) -> DeliveryOutcome {
        let message = Self::build_message(snapshot, record.kind, tz);
        notifiers
            .for_channel(record.kind.channel())
            .send(&message)
            .await
    }
}
