//! Booking snapshots and the mutation surface that drives scheduling.
//!
//! The notification engine only ever reads bookings; these writes belong
//! to the booking subsystem and exist here as the trigger path for
//! `ensure_scheduled`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingDay, BookingSnapshot, CreateBooking, UpdateBookingPayment,
    UpdateBookingStatus,
};

pub struct BookingService;

impl BookingService {
    /// Reads a booking with its ordered service days
    pub async fn get_snapshot(pool: &PgPool, id: Uuid) -> AppResult<BookingSnapshot> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, customer_name, customer_email, customer_phone, status,
                   advance_payment_status, final_payment_status, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

        let days = sqlx::query_as::<_, BookingDay>(
            r#"
            SELECT id, booking_id, day_date, appointment_time, position
            FROM booking_days
            WHERE booking_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(BookingSnapshot { booking, days })
    }

    /// Creates a booking with its service days
    pub async fn create(pool: &PgPool, input: CreateBooking) -> AppResult<BookingSnapshot> {
        if input.customer_name.trim().is_empty() {
            return Err(AppError::Validation("Customer name is required".to_string()));
        }
        if !input.customer_email.contains('@') || input.customer_email.len() < 5 {
            return Err(AppError::Validation(format!(
                "Invalid email address: {}",
                input.customer_email
            )));
        }
        if input.customer_phone.trim().is_empty() {
            return Err(AppError::Validation(
                "Customer phone is required".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (customer_name, customer_email, customer_phone, status)
            VALUES ($1, $2, $3, $4::text::varchar)
            RETURNING id, customer_name, customer_email, customer_phone, status,
                      advance_payment_status, final_payment_status, created_at, updated_at
            "#,
        )
        .bind(input.customer_name.trim())
        .bind(input.customer_email.trim())
        .bind(input.customer_phone.trim())
        .bind(input.status.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let mut days = Vec::with_capacity(input.days.len());
        for (position, day) in input.days.iter().enumerate() {
            let day = sqlx::query_as::<_, BookingDay>(
                r#"
                INSERT INTO booking_days (booking_id, day_date, appointment_time, position)
                VALUES ($1, $2, $3, $4)
                RETURNING id, booking_id, day_date, appointment_time, position
                "#,
            )
            .bind(booking.id)
            .bind(day.date)
            .bind(day.appointment_time)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await?;
            days.push(day);
        }

        tx.commit().await?;

        Ok(BookingSnapshot { booking, days })
    }

    /// Applies a status transition and returns the fresh snapshot
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        input: UpdateBookingStatus,
    ) -> AppResult<BookingSnapshot> {
        let updated = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2::text::varchar, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.status.to_string())
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Booking {} not found", id)));
        }

        Self::get_snapshot(pool, id).await
    }

    /// Applies a payment status change and returns the fresh snapshot
    pub async fn update_payment(
        pool: &PgPool,
        id: Uuid,
        input: UpdateBookingPayment,
    ) -> AppResult<BookingSnapshot> {
        if input.advance_payment_status.is_none() && input.final_payment_status.is_none() {
            return Err(AppError::Validation(
                "No payment status provided".to_string(),
            ));
        }

        let updated = sqlx::query(
            r#"
            UPDATE bookings
            SET advance_payment_status = COALESCE($2::text::varchar, advance_payment_status),
                final_payment_status = COALESCE($3::text::varchar, final_payment_status),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.advance_payment_status.map(|s| s.to_string()))
        .bind(input.final_payment_status.map(|s| s.to_string()))
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Booking {} not found", id)));
        }

        Self::get_snapshot(pool, id).await
    }
}
