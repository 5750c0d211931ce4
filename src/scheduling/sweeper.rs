//! The recurring due-notification sweep.
//!
//! Finds records that are due, unsent and uncancelled, re-checks
//! eligibility against the live booking state, atomically claims each
//! record, and dispatches it. Safe to run concurrently with itself: the
//! conditional claim update guarantees a record is dispatched at most
//! once across overlapping passes.

use std::time::Duration;

use chrono_tz::Tz;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::config::SweepConfig;
use crate::error::{AppError, AppResult};
use crate::models::NotificationRecord;
use crate::scheduling::dispatcher::NotificationDispatcher;
use crate::scheduling::policy;
use crate::scheduling::scheduler::NotificationScheduler;
use crate::scheduling::tracker::DeliveryTracker;
use crate::services::notification::NotifierSet;
use crate::services::BookingService;

/// Counters for one sweep pass
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SweepStats {
    pub due: usize,
    pub sent: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub skipped: usize,
}

enum RecordOutcome {
    Sent,
    Cancelled,
    Failed,
    /// Another sweep pass claimed the record first
    Skipped,
}

pub struct DueSweeper;

impl DueSweeper {
    /// Runs one sweep pass. Idempotent; invoking it more often than the
    /// nominal interval is safe.
    pub async fn run_sweep(
        pool: &PgPool,
        notifiers: &NotifierSet,
        config: &SweepConfig,
        tz: Tz,
    ) -> AppResult<SweepStats> {
        let due = Self::fetch_due(pool, config.batch_limit).await?;

        let mut stats = SweepStats {
            due: due.len(),
            ..SweepStats::default()
        };

        // Bounded fan-out: one slow provider call must not stall the
        // batch, but concurrency stays capped for provider rate limits.
        let outcomes = stream::iter(due)
            .map(|record| {
                let pool = pool.clone();
                let notifiers = notifiers.clone();
                async move { Self::process_record(&pool, &notifiers, record, tz).await }
            })
            .buffer_unordered(config.max_concurrent_dispatches)
            .collect::<Vec<_>>()
            .await;

        for outcome in outcomes {
            match outcome {
                RecordOutcome::Sent => stats.sent += 1,
                RecordOutcome::Cancelled => stats.cancelled += 1,
                RecordOutcome::Failed => stats.failed += 1,
                RecordOutcome::Skipped => stats.skipped += 1,
            }
        }

        Ok(stats)
    }

    /// Fetches due records, oldest first.
    ///
    /// Records with a recorded dispatch failure stay pending but are not
    /// retried automatically; operators clear `last_error` to requeue.
    async fn fetch_due(pool: &PgPool, limit: i64) -> AppResult<Vec<NotificationRecord>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT id, booking_id, kind, scheduled_for, sent, sent_at, cancelled,
                   cancel_reason, delivered, provider_message_id, last_error,
                   created_at, updated_at
            FROM notification_records
            WHERE sent = FALSE AND cancelled = FALSE AND last_error IS NULL
              AND scheduled_for <= NOW()
            ORDER BY scheduled_for
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Processes one due record; a single record's failure never aborts
    /// the rest of the batch.
    async fn process_record(
        pool: &PgPool,
        notifiers: &NotifierSet,
        record: NotificationRecord,
        tz: Tz,
    ) -> RecordOutcome {
        match Self::try_process(pool, notifiers, &record, tz).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!(
                    "Sweep failed on notification {} for booking {}: {}",
                    record.kind,
                    record.booking_id,
                    e
                );
                RecordOutcome::Failed
            }
        }
    }

    async fn try_process(
        pool: &PgPool,
        notifiers: &NotifierSet,
        record: &NotificationRecord,
        tz: Tz,
    ) -> AppResult<RecordOutcome> {
        // Re-fetch the owning booking: this is the final authoritative
        // eligibility check before anything leaves the building.
        let snapshot = match BookingService::get_snapshot(pool, record.booking_id).await {
            Ok(snapshot) => snapshot,
            Err(AppError::NotFound(_)) => {
                NotificationScheduler::cancel_record(pool, record, "booking no longer exists")
                    .await?;
                return Ok(RecordOutcome::Cancelled);
            }
            Err(e) => return Err(e),
        };

        if let Some(reason) = policy::suppression_reason(record.kind, &snapshot.booking) {
            NotificationScheduler::cancel_record(pool, record, reason).await?;
            return Ok(RecordOutcome::Cancelled);
        }

        // Atomic claim: whichever pass flips sent first owns the dispatch.
        if !Self::claim(pool, record.id).await? {
            return Ok(RecordOutcome::Skipped);
        }

        let outcome = NotificationDispatcher::dispatch(notifiers, &snapshot, record, tz).await;

        if outcome.success {
            DeliveryTracker::record_success(pool, record, &outcome).await?;
            Ok(RecordOutcome::Sent)
        } else {
            let error = outcome
                .error_message
                .unwrap_or_else(|| "unknown provider error".to_string());
            DeliveryTracker::record_failure(pool, record, &error).await?;
            Ok(RecordOutcome::Failed)
        }
    }

    /// Conditional update that converts send races into a single winner
    async fn claim(pool: &PgPool, record_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notification_records
            SET sent = TRUE,
                sent_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND sent = FALSE AND cancelled = FALSE
            "#,
        )
        .bind(record_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Spawns the recurring sweep loop, independent of request traffic
    pub fn start(
        pool: PgPool,
        notifiers: NotifierSet,
        config: SweepConfig,
        tz: Tz,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            log::info!(
                "Notification sweep running every {}s (batch {}, {} concurrent dispatches)",
                config.interval_secs,
                config.batch_limit,
                config.max_concurrent_dispatches
            );

            loop {
                interval.tick().await;

                match Self::run_sweep(&pool, &notifiers, &config, tz).await {
                    Ok(stats) if stats.due > 0 => {
                        log::info!(
                            "Sweep pass: {} due, {} sent, {} cancelled, {} failed, {} skipped",
                            stats.due,
                            stats.sent,
                            stats.cancelled,
                            stats.failed,
                            stats.skipped
                        );
                    }
                    Ok(_) => log::debug!("Sweep pass: nothing due"),
                    Err(e) => log::error!("Sweep pass failed: {}", e),
                }
            }
        })
    }
}
