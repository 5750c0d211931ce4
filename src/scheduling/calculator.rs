//! Pure fire-time calculation for notification kinds.
//!
//! All date arithmetic happens in the business's canonical civil timezone.
//! A date-only anchor resolves to local midnight in that zone before any
//! offset math; anchoring to UTC midnight instead would shift reminders by
//! a day across DST boundaries.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::{BookingSnapshot, NotificationKind};

/// Cancellation reason when the two-week urgency has insufficient lead time
pub const REASON_TOO_CLOSE: &str = "too close to event";
/// Cancellation reason when a reminder target already lies in the past
pub const REASON_DATE_PASSED: &str = "reminder date has passed";

// =============================================================================
// Anchors
// =============================================================================

/// The timestamps notification offsets are computed from
#[derive(Debug, Clone, Copy)]
pub struct BookingAnchors {
    pub created_at: DateTime<Utc>,
    pub event_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
}

impl BookingAnchors {
    /// Extracts the anchors from a booking snapshot
    pub fn of(snapshot: &BookingSnapshot) -> Self {
        Self {
            created_at: snapshot.booking.created_at,
            event_date: snapshot.event_date(),
            appointment_time: snapshot.appointment_time(),
        }
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Outcome of evaluating one kind against a booking's anchors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Schedule the notification for this absolute instant
    Schedule(DateTime<Utc>),
    /// Create the record already cancelled; the admin UI must be able to
    /// show why the reminder will never fire
    CancelNow {
        at: DateTime<Utc>,
        reason: &'static str,
    },
    /// The kind does not apply to this booking shape; no record is created
    Inapplicable,
}

// =============================================================================
// Rules
// =============================================================================

/// Computes the fire-time decision for one kind.
///
/// Pure and deterministic: same anchors, `now` and timezone always produce
/// the same decision.
pub fn fire_time(
    kind: NotificationKind,
    anchors: &BookingAnchors,
    now: DateTime<Utc>,
    tz: Tz,
) -> ScheduleDecision {
    match kind {
        NotificationKind::Initial => ScheduleDecision::Schedule(anchors.created_at),
        NotificationKind::Followup3h => creation_offset(anchors, Duration::hours(3)),
        NotificationKind::Followup6h => creation_offset(anchors, Duration::hours(6)),
        NotificationKind::Followup24h => creation_offset(anchors, Duration::hours(24)),
        NotificationKind::Followup3d => creation_offset(anchors, Duration::days(3)),
        NotificationKind::Followup6d => creation_offset(anchors, Duration::days(6)),
        NotificationKind::Followup30d => creation_offset(anchors, Duration::days(30)),
        NotificationKind::EventReminder24h => {
            match event_midnight(anchors, tz) {
                Some(midnight) => ScheduleDecision::Schedule(midnight - Duration::hours(24)),
                None => ScheduleDecision::Inapplicable,
            }
        }
        NotificationKind::AppointmentDayReminder => {
            match appointment_instant(anchors, tz) {
                Some(at) => ScheduleDecision::Schedule(at - Duration::minutes(150)),
                None => ScheduleDecision::Inapplicable,
            }
        }
        NotificationKind::PostAppointmentFollowup => match appointment_instant(anchors, tz) {
            Some(at) => ScheduleDecision::Schedule(at + Duration::hours(6)),
            None => ScheduleDecision::Inapplicable,
        },
        NotificationKind::Urgency2w => match event_midnight(anchors, tz) {
            Some(midnight) => {
                let at = midnight - Duration::days(14);
                if at > now {
                    ScheduleDecision::Schedule(at)
                } else {
                    ScheduleDecision::CancelNow {
                        at,
                        reason: REASON_TOO_CLOSE,
                    }
                }
            }
            None => ScheduleDecision::Inapplicable,
        },
        NotificationKind::Urgency1w | NotificationKind::Urgency7d => {
            match event_midnight(anchors, tz) {
                Some(midnight) => {
                    let at = midnight - Duration::days(7);
                    if at > now {
                        ScheduleDecision::Schedule(at)
                    } else {
                        ScheduleDecision::CancelNow {
                            at,
                            reason: REASON_DATE_PASSED,
                        }
                    }
                }
                None => ScheduleDecision::Inapplicable,
            }
        }
    }
}

fn creation_offset(anchors: &BookingAnchors, offset: Duration) -> ScheduleDecision {
    ScheduleDecision::Schedule(anchors.created_at + offset)
}

fn event_midnight(anchors: &BookingAnchors, tz: Tz) -> Option<DateTime<Utc>> {
    let date = anchors.event_date?;
    resolve_local(date.and_time(NaiveTime::MIN), tz)
}

fn appointment_instant(anchors: &BookingAnchors, tz: Tz) -> Option<DateTime<Utc>> {
    let date = anchors.event_date?;
    let time = anchors.appointment_time?;
    resolve_local(date.and_time(time), tz)
}

/// Resolves a civil datetime in the business zone to a UTC instant.
///
/// Ambiguous local times (DST fall-back) take the earlier instant; local
/// times erased by a DST gap shift forward one hour.
fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}
