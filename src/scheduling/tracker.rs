//! Delivery outcome tracking.
//!
//! Writes dispatch results back onto notification records and appends the
//! corresponding rows to the append-only audit log, so repeated attempts
//! never overwrite each other's history.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    DeliveryOutcome, NotificationEvent, NotificationEventStatus, NotificationKind,
    NotificationRecord,
};

pub struct DeliveryTracker;

impl DeliveryTracker {
    /// Appends one audit log entry
    pub async fn log_event(
        pool: &PgPool,
        booking_id: Uuid,
        kind: NotificationKind,
        status: NotificationEventStatus,
        detail: Option<&str>,
        provider_message_id: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_events (booking_id, kind, status, detail, provider_message_id)
            VALUES ($1, $2::text::varchar, $3::text::varchar, $4, $5)
            "#,
        )
        .bind(booking_id)
        .bind(kind.to_string())
        .bind(status.to_string())
        .bind(detail)
        .bind(provider_message_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Records a successful dispatch on an already-claimed record
    pub async fn record_success(
        pool: &PgPool,
        record: &NotificationRecord,
        outcome: &DeliveryOutcome,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE notification_records
            SET provider_message_id = $2,
                delivered = delivered OR $3,
                last_error = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&outcome.provider_message_id)
        .bind(outcome.delivered)
        .execute(pool)
        .await?;

        Self::log_event(
            pool,
            record.booking_id,
            record.kind,
            NotificationEventStatus::Sent,
            outcome.delivery_status.as_deref(),
            outcome.provider_message_id.as_deref(),
        )
        .await?;

        log::info!(
            "Notification {} for booking {} sent",
            record.kind,
            record.booking_id
        );

        Ok(())
    }

    /// Records a failed dispatch and reopens the record.
    ///
    /// No automatic retry is scheduled; the failure is surfaced through
    /// `last_error` and the audit log for operators.
    pub async fn record_failure(
        pool: &PgPool,
        record: &NotificationRecord,
        error: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE notification_records
            SET sent = FALSE,
                sent_at = NULL,
                last_error = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(error)
        .execute(pool)
        .await?;

        Self::log_event(
            pool,
            record.booking_id,
            record.kind,
            NotificationEventStatus::Failed,
            Some(error),
            None,
        )
        .await?;

        log::warn!(
            "Notification {} for booking {} failed: {}",
            record.kind,
            record.booking_id,
            error
        );

        Ok(())
    }

    /// Applies an asynchronous delivery confirmation from the provider.
    ///
    /// Sets the `delivered` flag without touching `sent`; returns the
    /// updated record, or `None` when no record carries this message id.
    pub async fn confirm_delivery(
        pool: &PgPool,
        provider_message_id: &str,
    ) -> AppResult<Option<NotificationRecord>> {
        let record: Option<NotificationRecord> = sqlx::query_as(
            r#"
            UPDATE notification_records
            SET delivered = TRUE,
                updated_at = NOW()
            WHERE provider_message_id = $1
            RETURNING *
            "#,
        )
        .bind(provider_message_id)
        .fetch_optional(pool)
        .await?;

        if let Some(ref record) = record {
            Self::log_event(
                pool,
                record.booking_id,
                record.kind,
                NotificationEventStatus::Delivered,
                None,
                Some(provider_message_id),
            )
            .await?;
        }

        Ok(record)
    }

    /// Lists the audit log for one booking, oldest first
    pub async fn list_events(
        pool: &PgPool,
        booking_id: Uuid,
    ) -> AppResult<Vec<NotificationEvent>> {
        let events = sqlx::query_as::<_, NotificationEvent>(
            r#"
            SELECT id, booking_id, kind, status, detail, provider_message_id, created_at
            FROM notification_events
            WHERE booking_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }
}
