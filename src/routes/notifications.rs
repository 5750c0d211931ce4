//! Notification provider callback route.
//!
//! - POST /api/notifications/delivery-callback - Asynchronous delivery
//!   confirmation from the messaging provider

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::scheduling::DeliveryTracker;

#[derive(Debug, Deserialize)]
pub struct DeliveryCallback {
    pub provider_message_id: String,
}

#[derive(Serialize)]
struct DeliveryCallbackResponse {
    matched: bool,
}

/// POST /api/notifications/delivery-callback
///
/// Always answers 200 so the provider does not retry unknown message ids;
/// `matched` reports whether a record was updated.
pub async fn delivery_callback(
    pool: web::Data<DbPool>,
    body: web::Json<DeliveryCallback>,
) -> AppResult<HttpResponse> {
    let record =
        DeliveryTracker::confirm_delivery(pool.get_ref(), &body.provider_message_id).await?;

    if record.is_none() {
        log::debug!(
            "Delivery callback for unknown message id {}",
            body.provider_message_id
        );
    }

    Ok(HttpResponse::Ok().json(DeliveryCallbackResponse {
        matched: record.is_some(),
    }))
}

/// Configures notification routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notifications")
            .route("/delivery-callback", web::post().to(delivery_callback)),
    );
}
