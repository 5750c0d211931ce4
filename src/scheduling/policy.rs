//! Stateless suppression predicates.
//!
//! Re-evaluated on every booking mutation and once more by the sweep
//! immediately before dispatch. These functions never touch the store;
//! they only look at the booking snapshot handed to them.

use crate::models::{Booking, BookingStatus, NotificationKind};

/// Reason when a quote follow-up is moot because the advance was settled
pub const REASON_ADVANCE_SETTLED: &str = "advance payment settled";
/// Reason when the booking was confirmed before the follow-up fired
pub const REASON_BOOKING_CONFIRMED: &str = "booking confirmed";
/// Reason when the booking itself was cancelled
pub const REASON_BOOKING_CANCELLED: &str = "booking cancelled";
/// Reason when an event-bound reminder lost its confirmed-and-paid footing
pub const REASON_NOT_CONFIRMED_PAID: &str = "booking not confirmed and paid";

/// Returns the reason a pending notification of this kind must be
/// suppressed for the given booking state, or `None` when it may proceed.
///
/// Cancellation is monotonic: callers apply this to unsent, uncancelled
/// records only; a cancelled record is never flipped back by state change.
pub fn suppression_reason(kind: NotificationKind, booking: &Booking) -> Option<&'static str> {
    if kind.is_creation_relative() || kind.is_urgency() {
        // Quote-chasing messages stop the moment the customer commits.
        if booking.advance_payment_status.is_settled() {
            return Some(REASON_ADVANCE_SETTLED);
        }
        return match booking.status {
            BookingStatus::Quoted => None,
            BookingStatus::Confirmed => Some(REASON_BOOKING_CONFIRMED),
            BookingStatus::Cancelled => Some(REASON_BOOKING_CANCELLED),
        };
    }

    if kind.is_event_bound() {
        // The inverse rule: these only exist for confirmed, settled bookings.
        let eligible = booking.status == BookingStatus::Confirmed
            && booking.advance_payment_status.is_settled();
        return if eligible {
            None
        } else {
            Some(REASON_NOT_CONFIRMED_PAID)
        };
    }

    // `initial` announces the quote itself and is exempt from suppression.
    None
}

/// `initial` is skipped entirely (no record) for bookings created directly
/// in cancelled status; every other kind goes through `suppression_reason`.
pub fn skip_entirely(kind: NotificationKind, booking: &Booking) -> bool {
    kind == NotificationKind::Initial && booking.status == BookingStatus::Cancelled
}
