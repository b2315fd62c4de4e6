//! Read-only HTTP API over the monitor

use actix_cors::Cors;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tracing::{error, info};

use crate::errors::MonitorError;
use crate::models::HistoryResponse;
use crate::monitor::StatusMonitor;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api")
            .wrap(cors())
            .route("/status", web::get().to(get_status))
            .route("/service/{id}/history", web::get().to(get_service_history)),
    );
}

/// Status pages are served from other origins, so the read-only API is
/// open to all of them.
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json("OK")
}

// Current status for all services
pub async fn get_status(data: web::Data<StatusMonitor>) -> impl Responder {
    info!("Request for status of all services");

    match data.status_page().await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            error!("Error fetching status: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Failed to fetch status" }))
        }
    }
}

// Daily history for one service
pub async fn get_service_history(
    data: web::Data<StatusMonitor>,
    service_id: web::Path<String>,
) -> impl Responder {
    let id = service_id.into_inner();
    info!("Request for history of service: {}", id);

    match data.service_history(&id).await {
        Ok(history) => HttpResponse::Ok().json(HistoryResponse {
            service_name: id,
            history,
        }),
        Err(MonitorError::ServiceNotFound(_)) => {
            HttpResponse::NotFound().json(json!({ "error": format!("Service {} not found", id) }))
        }
        Err(e) => {
            error!("Error fetching history for {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to fetch service history" }))
        }
    }
}
