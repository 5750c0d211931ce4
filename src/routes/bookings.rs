//! Booking routes: the mutation surface that drives notification
//! scheduling, plus the read-only per-booking notification views.
//!
//! - POST /api/bookings - Create booking
//! - GET /api/bookings/{id} - Get booking with days
//! - PATCH /api/bookings/{id}/status - Status transition
//! - PATCH /api/bookings/{id}/payment - Payment status change
//! - GET /api/bookings/{id}/notifications - Per-kind status badges
//! - GET /api/bookings/{id}/notifications/history - Audit log

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{BookingSnapshot, CreateBooking, UpdateBookingPayment, UpdateBookingStatus};
use crate::scheduling::{DeliveryTracker, NotificationScheduler};
use crate::services::BookingService;

/// Kicks off a scheduling pass without blocking the booking write.
///
/// Scheduling is best-effort relative to the booking's own transaction;
/// a store hiccup here is retried on the next mutation or sweep.
fn schedule_in_background(pool: DbPool, snapshot: BookingSnapshot, config: &Config) {
    let tz = config.business_timezone;
    tokio::spawn(async move {
        if let Err(e) = NotificationScheduler::ensure_scheduled(&pool, &snapshot, tz).await {
            log::error!(
                "Failed to schedule notifications for booking {}: {}",
                snapshot.booking.id,
                e
            );
        }
    });
}

/// POST /api/bookings
pub async fn create_booking(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    body: web::Json<CreateBooking>,
) -> AppResult<HttpResponse> {
    let snapshot = BookingService::create(pool.get_ref(), body.into_inner()).await?;

    schedule_in_background(pool.get_ref().clone(), snapshot.clone(), config.get_ref());

    Ok(HttpResponse::Created().json(snapshot))
}

/// GET /api/bookings/{id}
pub async fn get_booking(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let snapshot = BookingService::get_snapshot(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// PATCH /api/bookings/{id}/status
pub async fn update_status(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateBookingStatus>,
) -> AppResult<HttpResponse> {
    let snapshot =
        BookingService::update_status(pool.get_ref(), path.into_inner(), body.into_inner()).await?;

    schedule_in_background(pool.get_ref().clone(), snapshot.clone(), config.get_ref());

    Ok(HttpResponse::Ok().json(snapshot))
}

/// PATCH /api/bookings/{id}/payment
pub async fn update_payment(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateBookingPayment>,
) -> AppResult<HttpResponse> {
    let snapshot =
        BookingService::update_payment(pool.get_ref(), path.into_inner(), body.into_inner())
            .await?;

    schedule_in_background(pool.get_ref().clone(), snapshot.clone(), config.get_ref());

    Ok(HttpResponse::Ok().json(snapshot))
}

/// GET /api/bookings/{id}/notifications
pub async fn list_notification_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let views = NotificationScheduler::list_status(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// GET /api/bookings/{id}/notifications/history
pub async fn list_notification_history(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let events = DeliveryTracker::list_events(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

/// Configures booking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/bookings")
            .route("", web::post().to(create_booking))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/status", web::patch().to(update_status))
            .route("/{id}/payment", web::patch().to(update_payment))
            .route(
                "/{id}/notifications",
                web::get().to(list_notification_status),
            )
            .route(
                "/{id}/notifications/history",
                web::get().to(list_notification_history),
            ),
    );
}
