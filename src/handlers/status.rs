use std::sync::atomic::Ordering;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::services::metrics::metrics;
use crate::AppState;

pub async fn status_handler(data: web::Data<AppState>) -> HttpResponse {
    let uptime_seconds = data.start_time.elapsed().as_secs();
    let metrics = metrics();

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "connections": {
            "active": data.sessions.active_count(),
            "participants": data.sessions.participants(),
            "groups": data.sessions.groups(),
            "description": "Connected participants and the groups they belong to"
        },
        "messages": {
            "processed": metrics.messages_processed.load(Ordering::Relaxed),
            "parse_errors": metrics.parse_errors.load(Ordering::Relaxed),
            "description": "Inbound chat frames since server start"
        },
        "deliveries": {
            "failed": metrics.delivery_failures.load(Ordering::Relaxed),
            "description": "Outbound sends dropped because a session was closed or backed up"
        }
    }))
}
