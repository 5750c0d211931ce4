//! Integration tests for the due-notification sweep.

use chrono::Duration;
use chrono_tz::Europe::Madrid;
use pretty_assertions::assert_eq;

use salonbook::config::SweepConfig;
use salonbook::models::{
    BookingStatus, NotificationEventStatus, NotificationKind, PaymentStatus,
};
use salonbook::scheduling::{DeliveryTracker, DueSweeper, NotificationScheduler};

use crate::common::{
    recording_notifier_set, set_booking_state, BookingBuilder, RecordingNotifier, TestDb,
};

fn sweep_config() -> SweepConfig {
    SweepConfig {
        interval_secs: 60,
        batch_limit: 200,
        max_concurrent_dispatches: 4,
    }
}

#[tokio::test]
async fn test_sweep_sends_due_records_only() {
    let db = TestDb::new().await;
    // Created four hours ago: `initial` and `followup-3h` are due,
    // `followup-6h` and later are not.
    let snapshot = BookingBuilder::new()
        .created_ago(Duration::hours(4))
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    let email = RecordingNotifier::succeeding(None);
    let messaging = RecordingNotifier::succeeding(None);
    let notifiers = recording_notifier_set(email.clone(), messaging.clone());

    let stats = DueSweeper::run_sweep(&db.pool, &notifiers, &sweep_config(), Madrid)
        .await
        .expect("sweep should succeed");

    assert_eq!(stats.due, 2);
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.failed, 0);

    let mut templates = email.sent_templates();
    templates.sort();
    assert_eq!(templates, vec!["quote-followup-3h", "quote-initial"]);
    assert_eq!(messaging.sent_count(), 0);

    let sent_record = NotificationScheduler::get_record(
        &db.pool,
        snapshot.booking.id,
        NotificationKind::Followup3h,
    )
    .await
    .expect("lookup should succeed")
    .expect("record should exist");
    assert!(sent_record.sent);
    assert!(sent_record.sent_at.is_some());

    let pending_record = NotificationScheduler::get_record(
        &db.pool,
        snapshot.booking.id,
        NotificationKind::Followup6h,
    )
    .await
    .expect("lookup should succeeed")
    .expect("record should exist");
    assert!(!pending_record.sent);
}

#[tokio::test]
async fn test_sweep_recheck_cancels_stale_records() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .created_ago(Duration::hours(4))
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    // The advance gets approved after scheduling but before the sweep;
    // no rescheduling pass ran in between.
    set_booking_state(
        &db.pool,
        snapshot.booking.id,
        BookingStatus::Quoted,
        PaymentStatus::Approved,
    )
    .await;

    let email = RecordingNotifier::succeeding(None);
    let messaging = RecordingNotifier::succeeding(None);
    let notifiers = recording_notifier_set(email.clone(), messaging.clone());

    let stats = DueSweeper::run_sweep(&db.pool, &notifiers, &sweep_config(), Madrid)
        .await
        .expect("sweep should succeed");

    // `initial` is exempt and goes out; `followup-3h` is cancelled by the
    // final authoritative check instead of being sent.
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(email.sent_templates(), vec!["quote-initial"]);

    let record = NotificationScheduler::get_record(
        &db.pool,
        snapshot.booking.id,
        NotificationKind::Followup3h,
    )
    .await
    .expect("lookup should succeed")
    .expect("record should exist");
    assert!(record.cancelled);
    assert!(!record.sent);
}

#[tokio::test]
async fn test_concurrent_sweeps_send_at_most_once() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .created_ago(Duration::hours(4))
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    let email = RecordingNotifier::succeeding(None);
    let messaging = RecordingNotifier::succeeding(None);
    let notifiers = recording_notifier_set(email.clone(), messaging.clone());

    let config = sweep_config();
    let (a, b) = tokio::join!(
        DueSweeper::run_sweep(&db.pool, &notifiers, &config, Madrid),
        DueSweeper::run_sweep(&db.pool, &notifiers, &config, Madrid),
    );
    let a = a.expect("first sweep should succeed");
    let b = b.expect("second sweep should succeed");

    // Two due records total; overlapping passes must not double-send.
    assert_eq!(email.sent_count(), 2);
    assert_eq!(a.sent + b.sent, 2);
}

#[tokio::test]
async fn test_failed_dispatch_is_recorded_not_retried() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .created_ago(Duration::hours(1))
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    let email = RecordingNotifier::failing();
    let messaging = RecordingNotifier::succeeding(None);
    let notifiers = recording_notifier_set(email.clone(), messaging.clone());

    let stats = DueSweeper::run_sweep(&db.pool, &notifiers, &sweep_config(), Madrid)
        .await
        .expect("sweep should succeed");
    assert_eq!(stats.failed, 1);

    let record = NotificationScheduler::get_record(
        &db.pool,
        snapshot.booking.id,
        NotificationKind::Initial,
    )
    .await
    .expect("lookup should succeed")
    .expect("record should exist");
    assert!(!record.sent, "failed dispatch must reopen the record");
    assert_eq!(record.last_error.as_deref(), Some("provider unavailable"));

    // No automatic retry: the next pass leaves the failed record for
    // operator follow-up.
    let stats = DueSweeper::run_sweep(&db.pool, &notifiers, &sweep_config(), Madrid)
        .await
        .expect("sweep should succeed");
    assert_eq!(stats.due, 0);
    assert_eq!(email.sent_count(), 1);

    let events = DeliveryTracker::list_events(&db.pool, snapshot.booking.id)
        .await
        .expect("event listing should succeed");
    assert!(events
        .iter()
        .any(|e| e.kind == NotificationKind::Initial
            && e.status == NotificationEventStatus::Failed));
}

#[tokio::test]
async fn test_delivery_callback_sets_delivered_without_touching_sent() {
    let db = TestDb::new().await;
    let snapshot = BookingBuilder::new()
        .with_status(BookingStatus::Confirmed)
        .with_advance_payment(PaymentStatus::Approved)
        .with_event_in_days(20, Some("14:00:00"))
        .insert(&db.pool)
        .await;
    NotificationScheduler::ensure_scheduled(&db.pool, &snapshot, Madrid)
        .await
        .expect("scheduling should succeed");

    // Bring the event reminder due without waiting 19 days
    sqlx::query(
        "UPDATE notification_records SET scheduled_for = NOW() - INTERVAL '1 hour' \
         WHERE booking_id = $1 AND kind = 'event-reminder-24h'",
    )
    .bind(snapshot.booking.id)
    .execute(&db.pool)
    .await
    .expect("backdate should succeed");

    let email = RecordingNotifier::succeeding(None);
    let messaging = RecordingNotifier::succeeding(Some("wamid-42"));
    let notifiers = recording_notifier_set(email.clone(), messaging.clone());

    // `initial` (email) is also due right after creation; the backdated
    // event reminder goes out over messaging.
    let stats = DueSweeper::run_sweep(&db.pool, &notifiers, &sweep_config(), Madrid)
        .await
        .expect("sweep should succeed");
    assert_eq!(stats.sent, 2);
    assert_eq!(email.sent_count(), 1);
    assert_eq!(messaging.sent_count(), 1);

    let record = NotificationScheduler::get_record(
        &db.pool,
        snapshot.booking.id,
        NotificationKind::EventReminder24h,
    )
    .await
    .expect("lookup should succeed")
    .expect("record should exist");
    assert!(record.sent);
    assert!(!record.delivered);
    assert_eq!(record.provider_message_id.as_deref(), Some("wamid-42"));
    let sent_at = record.sent_at;

    let updated = DeliveryTracker::confirm_delivery(&db.pool, "wamid-42")
        .await
        .expect("callback should succeed")
        .expect("record should match");
    assert!(updated.delivered);
    assert!(updated.sent);
    assert_eq!(updated.sent_at, sent_at);

    let events = DeliveryTracker::list_events(&db.pool, snapshot.booking.id)
        .await
        .expect("event listing should succeed");
    assert!(events
        .iter()
        .any(|e| e.status == NotificationEventStatus::Delivered));

    // An unknown message id is a benign no-op
    let unknown = DeliveryTracker::confirm_delivery(&db.pool, "wamid-unknown")
        .await
        .expect("callback should succeed");
    assert!(unknown.is_none());
}
