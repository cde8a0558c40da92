use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};

use super::error_response;
use crate::telegram::Update;
use crate::AppState;

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/telegram/webhook").route(web::post().to(webhook)));
}

async fn webhook(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let provided = req
        .headers()
        .get(SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if provided != state.config.telegram_webhook_secret {
        log::warn!("[TELEGRAM] Rejected webhook call with a bad secret token");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("[TELEGRAM] Unparseable webhook payload: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    match state.workflow.handle_update(update).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "ok": true })),
        Err(e) => {
            log::error!("[WORKFLOW] Failed to handle update: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
