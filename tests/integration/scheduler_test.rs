//! Integration tests for the idempotent notification scheduler.

use chrono::Duration;
use chrono_tz::Europe::Madrid;
use pretty_assertions::assert_eq;

use salonbook::models::{
    BookingStatus, NotificationKind, PaymentStatus, RecordStatus,
};
use salonbook::scheduling::NotificationScheduler;
use salonbook::services::BookingService;

use crate::common::{set_booking_state, BookingBuilder, TestDb};

#[tokio::test]
async fn test_ensure_scheduled_is_idempotent() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new().insert(&db.pool).await;

    for _ in 0..3 {
        NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
            .await
            .expect("scheduling should succeed");
    }

    let records = NotificationScheduler::list_records(&db.pool, snapshot.booking.id)
        .await
        .expect("listing should succeed");

    // No event date: initial + the six creation-relative follow-ups
    assert_eq!(records.len(), 7);
    assert!(records.iter().all(|r| !r.sent && !r.cancelled));

    let followup_3h = records
        .iter()
        .find(|r| r.kind == NotificationKind::Followup3h)
        .expect("followup-3h should be scheduled");
    assert_eq!(
        followup_3h.scheduled_for,
        snapshot.booking.created_at + Duration::hours(3)
    );
}

#[tokio::test]
async fn test_quoted_to_paid_suppresses_quote_chasers() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .with_event_in_days(20, Some("14:00:00"))
        .insert(&db.pool)
        .await;

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    // Quoted and unpaid: quote chasers plus all three urgency reminders,
    // and none of the event-bound kinds.
    let records = NotificationScheduler::list_records(&db.pool, snapshot.booking.id)
        .await
        .expect("listing should succeed");
    assert_eq!(records.len(), 10);
    assert!(records
        .iter()
        .all(|r| !r.kind.is_event_bound() && !r.sent && !r.cancelled));

    // The customer confirms and the advance is approved.
    set_booking_state(
        &db.pool,
        snapshot.booking.id,
        BookingStatus::Confirmed,
        PaymentStatus::Approved,
    )
    .await;
    let snapshot = BookingService::get_snapshot(&db.pool, snapshot.booking.id)
        .await
        .expect("snapshot should reload");

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("rescheduling should succeed");

    let records = NotificationScheduler::list_records(&db.pool, snapshot.booking.id)
        .await
        .expect("listing should succeed");

    // Event-bound kinds appear for the first time; nothing was duplicated.
    assert_eq!(records.len(), 13);

    for record in &records {
        if record.kind.is_creation_relative() || record.kind.is_urgency() {
            assert!(
                record.cancelled,
                "{} should be cancelled after payment",
                record.kind
            );
            assert!(!record.sent, "{} must never be sent", record.kind);
        } else if record.kind.is_event_bound() {
            assert!(
                !record.cancelled,
                "{} should be pending once confirmed and paid",
                record.kind
            );
        }
    }

    // `initial` announces the quote itself and is exempt from suppression.
    let initial = records
        .iter()
        .find(|r| r.kind == NotificationKind::Initial)
        .expect("initial record should exist");
    assert!(!initial.cancelled);
}

#[tokio::test]
async fn test_cancelled_records_do_not_resurrect() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new().insert(&db.pool).await;

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    set_booking_state(
        &db.pool,
        snapshot.booking.id,
        BookingStatus::Quoted,
        PaymentStatus::Approved,
    )
    .await;
    let snapshot = BookingService::get_snapshot(&db.pool, snapshot.booking.id)
        .await
        .expect("snapshot should reload");
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("rescheduling should succeed");

    // The payment bounces afterwards; the booking is quoted-and-unpaid
    // again, but suppression is monotonic.
    set_booking_state(
        &db.pool,
        snapshot.booking.id,
        BookingStatus::Quoted,
        PaymentStatus::Rejected,
    )
    .await;
    let snapshot = BookingService::get_snapshot(&db.pool, snapshot.booking.id)
        .await
        .expect("snapshot should reload");
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("rescheduling should succeed");

    let records = NotificationScheduler::list_records(&db.pool, snapshot.booking.id)
        .await
        .expect("listing should succeed");

    for record in records {
        if record.kind.is_creation_relative() {
            assert!(
                record.cancelled,
                "{} must stay cancelled after reinstatement",
                record.kind
            );
        }
    }
}

#[tokio::test]
async fn test_urgency_two_weeks_needs_lead_time() {
    let db = TestDb::new().await;

    // 20 days of lead time: scheduled normally
    let roomy = BookingBuilder::new()
        .with_event_in_days(20, None)
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &roomy, Madrid)
        .await
        .expect("scheduling should succeed");

    let record = NotificationScheduler::get_record(
        &db.pool,
        roomy.booking.id,
        NotificationKind::Urgency2w,
    )
    .await
    .expect("lookup should succeed")
    .expect("urgency-2w record should exist");
    assert!(!record.cancelled);

    // 10 days of lead time: the record exists but is born cancelled
    let tight = BookingBuilder::new()
        .with_event_in_days(10, None)
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &tight, Madrid)
        .await
        .expect("scheduling should succeed");

    let record = NotificationScheduler::get_record(
        &db.pool,
        tight.booking.id,
        NotificationKind::Urgency2w,
    )
    .await
    .expect("lookup should succeed")
    .expect("urgency-2w record should exist even when too close");
    assert!(record.cancelled);
    assert_eq!(record.cancel_reason.as_deref(), Some("too close to event"));

    // With 10 days the one-week reminders still fit
    let one_week = NotificationScheduler::get_record(
        &db.pool,
        tight.booking.id,
        NotificationKind::Urgency1w,
    )
    .await
    .expect("lookup should succeed")
    .expect("urgency-1w record should exist");
    assert!(!one_week.cancelled);
}

#[tokio::test]
async fn test_one_week_urgency_in_the_past_is_born_cancelled() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .with_event_in_days(5, None)
        .insert(&db.pool)
        .await;

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    for kind in [NotificationKind::Urgency1w, NotificationKind::Urgency7d] {
        let record = NotificationScheduler::get_record(&db.pool, snapshot.booking.id, kind)
            .await
            .expect("lookup should succeed")
            .expect("record should exist");
        assert!(record.cancelled, "{} should be born cancelled", kind);
        assert_eq!(
            record.cancel_reason.as_deref(),
            Some("reminder date has passed")
        );
    }
}

#[tokio::test]
async fn test_booking_born_cancelled_gets_no_records() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .with_status(BookingStatus::Cancelled)
        .with_event_in_days(20, Some("14:00:00"))
        .insert(&db.pool)
        .await;

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    let records = NotificationScheduler::list_records(&db.pool, snapshot.booking.id)
        .await
        .expect("listing should succeed");
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_sent_records_are_never_touched() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new().insert(&db.pool).await;

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    // Simulate a follow-up that already went out
    sqlx::query(
        "UPDATE notification_records SET sent = TRUE, sent_at = NOW() \
         WHERE booking_id = $1 AND kind = 'followup-3h'",
    )
    .bind(snapshot.booking.id)
    .execute(&db.pool)
    .await
    .expect("update should succeed");

    set_booking_state(
        &db.pool,
        snapshot.booking.id,
        BookingStatus::Confirmed,
        PaymentStatus::Paid,
    )
    .await;
    let snapshot = BookingService::get_snapshot(&db.pool, snapshot.booking.id)
        .await
        .expect("snapshot should reload");
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("rescheduling should succeed");

    let record = NotificationScheduler::get_record(
        &db.pool,
        snapshot.booking.id,
        NotificationKind::Followup3h,
    )
    .await
    .expect("lookup should succeed")
    .expect("record should exist");

    assert!(record.sent);
    assert!(!record.cancelled, "sent history must not be rewritten");
}

#[tokio::test]
async fn test_status_view_covers_all_kinds() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new().insert(&db.pool).await;

    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    let views = NotificationScheduler::list_status(&db.pool, snapshot.booking.id)
        .await
        .expect("status listing should succeed");

    assert_eq!(views.len(), NotificationKind::ALL.len());

    let by_kind = |kind: NotificationKind| {
        views
            .iter()
            .find(|v| v.kind == kind)
            .expect("every kind has a view")
    };

    assert_eq!(
        by_kind(NotificationKind::Followup24h).status,
        RecordStatus::Scheduled
    );
    // No event date on this booking: event kinds were never scheduled
    assert_eq!(
        by_kind(NotificationKind::EventReminder24h).status,
        RecordStatus::NotScheduled
    );
    assert_eq!(
        by_kind(NotificationKind::Urgency2w).status,
        RecordStatus::NotScheduled
    );
}
