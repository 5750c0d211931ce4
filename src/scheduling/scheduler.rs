//! Idempotent notification scheduling.
//!
//! `ensure_scheduled` is called after every booking mutation and is safe
//! to call any number of times: the `(booking_id, kind)` uniqueness
//! constraint turns concurrent first-time inserts into benign no-ops, and
//! records are only ever moved forward (pending -> cancelled, pending ->
//! sent), never resurrected.

use chrono::Utc;
use chrono_tz::Tz;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    BookingSnapshot, NotificationEventStatus, NotificationKind, NotificationRecord,
    NotificationStatusView, RecordStatus,
};
use crate::scheduling::calculator::{self, BookingAnchors, ScheduleDecision};
use crate::scheduling::policy;
use crate::scheduling::tracker::DeliveryTracker;

pub struct NotificationScheduler;

impl NotificationScheduler {
    /// Brings the notification records for a booking in line with its
    /// current state. Evaluates every kind; callers do not need to know
    /// what changed.
    pub async fn ensure_scheduled(
        pool: &PgPool,
        snapshot: &BookingSnapshot,
        tz: Tz,
    ) -> AppResult<()> {
        let now = Utc::now();
        let anchors = BookingAnchors::of(snapshot);

        for kind in NotificationKind::ALL {
            match Self::get_record(pool, snapshot.booking.id, kind).await? {
                None => Self::schedule_new(pool, snapshot, &anchors, kind, now, tz).await?,
                Some(record) => {
                    // Terminal records are left alone: sent is history, and
                    // a cancelled record never flips back by state change.
                    if record.sent || record.cancelled {
                        continue;
                    }
                    if let Some(reason) = policy::suppression_reason(kind, &snapshot.booking) {
                        Self::cancel_record(pool, &record, reason).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// First-time evaluation of one kind for a booking
    async fn schedule_new(
        pool: &PgPool,
        snapshot: &BookingSnapshot,
        anchors: &BookingAnchors,
        kind: NotificationKind,
        now: chrono::DateTime<Utc>,
        tz: Tz,
    ) -> AppResult<()> {
        if policy::skip_entirely(kind, &snapshot.booking) {
            return Ok(());
        }

        // A kind suppressed before its first record exists is simply not
        // scheduled; the admin UI renders it as "Not Scheduled".
        if policy::suppression_reason(kind, &snapshot.booking).is_some() {
            return Ok(());
        }

        match calculator::fire_time(kind, anchors, now, tz) {
            ScheduleDecision::Inapplicable => Ok(()),
            ScheduleDecision::Schedule(at) => {
                let inserted = Self::insert_record(
                    pool,
                    snapshot.booking.id,
                    kind,
                    at,
                    false,
                    None,
                )
                .await?;

                if inserted {
                    DeliveryTracker::log_event(
                        pool,
                        snapshot.booking.id,
                        kind,
                        NotificationEventStatus::Scheduled,
                        None,
                        None,
                    )
                    .await?;
                    log::debug!(
                        "Scheduled {} for booking {} at {}",
                        kind,
                        snapshot.booking.id,
                        at
                    );
                }
                Ok(())
            }
            ScheduleDecision::CancelNow { at, reason } => {
                // The record must exist so the UI can show why this
                // reminder will never fire.
                let inserted =
                    Self::insert_record(pool, snapshot.booking.id, kind, at, true, Some(reason))
                        .await?;

                if inserted {
                    DeliveryTracker::log_event(
                        pool,
                        snapshot.booking.id,
                        kind,
                        NotificationEventStatus::Cancelled,
                        Some(reason),
                        None,
                    )
                    .await?;
                }
                Ok(())
            }
        }
    }

    /// Inserts one record; returns false when a concurrent caller won the
    /// race, which is success as far as scheduling is concerned.
    async fn insert_record(
        pool: &PgPool,
        booking_id: Uuid,
        kind: NotificationKind,
        scheduled_for: chrono::DateTime<Utc>,
        cancelled: bool,
        cancel_reason: Option<&str>,
    ) -> AppResult<bool> {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO notification_records (booking_id, kind, scheduled_for, cancelled, cancel_reason)
            VALUES ($1, $2::text::varchar, $3, $4, $5)
            ON CONFLICT (booking_id, kind) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(booking_id)
        .bind(kind.to_string())
        .bind(scheduled_for)
        .bind(cancelled)
        .bind(cancel_reason)
        .fetch_optional(pool)
        .await?;

        Ok(inserted.is_some())
    }

    /// Cancels a pending record. Conditional on the record still being
    /// unsent and uncancelled so a concurrent sweep claim wins cleanly.
    pub async fn cancel_record(
        pool: &PgPool,
        record: &NotificationRecord,
        reason: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notification_records
            SET cancelled = TRUE,
                cancel_reason = $2,
                updated_at = NOW()
            WHERE id = $1 AND sent = FALSE AND cancelled = FALSE
            "#,
        )
        .bind(record.id)
        .bind(reason)
        .execute(pool)
        .await?;

        let cancelled = result.rows_affected() > 0;
        if cancelled {
            DeliveryTracker::log_event(
                pool,
                record.booking_id,
                record.kind,
                NotificationEventStatus::Cancelled,
                Some(reason),
                None,
            )
            .await?;
            log::debug!(
                "Cancelled {} for booking {}: {}",
                record.kind,
                record.booking_id,
                reason
            );
        }

        Ok(cancelled)
    }

    /// Fetches the record for one (booking, kind), if any
    pub async fn get_record(
        pool: &PgPool,
        booking_id: Uuid,
        kind: NotificationKind,
    ) -> AppResult<Option<NotificationRecord>> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT id, booking_id, kind, scheduled_for, sent, sent_at, cancelled,
                   cancel_reason, delivered, provider_message_id, last_error,
                   created_at, updated_at
            FROM notification_records
            WHERE booking_id = $1 AND kind = $2::text::varchar
            "#,
        )
        .bind(booking_id)
        .bind(kind.to_string())
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Lists all records for a booking
    pub async fn list_records(
        pool: &PgPool,
        booking_id: Uuid,
    ) -> AppResult<Vec<NotificationRecord>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT id, booking_id, kind, scheduled_for, sent, sent_at, cancelled,
                   cancel_reason, delivered, provider_message_id, last_error,
                   created_at, updated_at
            FROM notification_records
            WHERE booking_id = $1
            ORDER BY scheduled_for
            "#,
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Per-kind status list for the admin UI; kinds with no record show
    /// as "Not Scheduled".
    pub async fn list_status(
        pool: &PgPool,
        booking_id: Uuid,
    ) -> AppResult<Vec<NotificationStatusView>> {
        let records = Self::list_records(pool, booking_id).await?;

        let views = NotificationKind::ALL
            .iter()
            .map(|&kind| {
                match records.iter().find(|r| r.kind == kind) {
                    Some(record) => NotificationStatusView {
                        kind,
                        channel: kind.channel(),
                        status: record.display_status(),
                        scheduled_for: Some(record.scheduled_for),
                        sent_at: record.sent_at,
                        delivered: record.delivered,
                        cancel_reason: record.cancel_reason.clone(),
                    },
                    None => NotificationStatusView {
                        kind,
                        channel: kind.channel(),
                        status: RecordStatus::NotScheduled,
                        scheduled_for: None,
                        sent_at: None,
                        delivered: false,
                        cancel_reason: None,
                    },
                }
            })
            .collect();

        Ok(views)
    }
}
