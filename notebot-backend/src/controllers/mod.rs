pub mod health;
pub mod notes;
pub mod telegram;
pub mod thoughts;

use actix_web::{http::StatusCode, HttpResponse};

/// `{ "ok": false, "error": ... }` with the given status
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "ok": false,
        "error": message
    }))
}

/// Fallback for unmatched routes
pub async fn not_found() -> HttpResponse {
    error_response(StatusCode::NOT_FOUND, "Not found")
}
