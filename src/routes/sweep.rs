//! Manual sweep trigger.
//!
//! - POST /api/sweep/run - Run one sweep pass now
//!
//! The pass is idempotent and safe to invoke more often than the
//! background interval; an external cron can drive this instead of (or
//! on top of) the built-in loop.

use actix_web::{web, HttpResponse};

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::scheduling::DueSweeper;
use crate::services::NotifierSet;

/// POST /api/sweep/run
pub async fn run_sweep(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    notifiers: web::Data<NotifierSet>,
) -> AppResult<HttpResponse> {
    let stats = DueSweeper::run_sweep(
        pool.get_ref(),
        notifiers.get_ref(),
        &config.sweep,
        config.business_timezone,
    )
    .await?;

    Ok(HttpResponse::Ok().json(stats))
}

/// Configures sweep routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/sweep").route("/run", web::post().to(run_sweep)));
}
