use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};

use super::error_response;
use crate::models::ThoughtSubmission;
use crate::thoughts::RelayError;
use crate::AppState;

/// Largest accepted thought request body
pub const MAX_BODY_BYTES: usize = 16 * 1024;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/notes/{id}/thoughts").route(web::post().to(submit_thought)));
}

fn rate_limit_key(req: &HttpRequest) -> String {
    let ip = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("thought:{}", ip)
}

async fn submit_thought(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> HttpResponse {
    let note_id = path.into_inner();

    let decision = match state.thought_limiter.check(&rate_limit_key(&req)) {
        Ok(d) => d,
        Err(e) => {
            log::error!("[DB] Rate limit check failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    if !decision.allowed {
        return HttpResponse::TooManyRequests()
            .insert_header(("Retry-After", decision.retry_after_seconds.to_string()))
            .json(serde_json::json!({
                "ok": false,
                "error": "Too many requests, please wait and try again.",
                "retry_after_seconds": decision.retry_after_seconds
            }));
    }

    if body.len() > MAX_BODY_BYTES {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
    }

    let submission: ThoughtSubmission = match serde_json::from_slice(&body) {
        Ok(s) => s,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload"),
    };
    let (sender, message) = match submission.validate() {
        Ok(fields) => fields,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };

    match state.thought_relay.relay(note_id, &sender, &message).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "ok": true })),
        Err(RelayError::NoteNotFound) => error_response(StatusCode::NOT_FOUND, "Note not found"),
        Err(e) => {
            log::error!("[THOUGHTS] Could not relay thought on note #{}: {}", note_id, e);
            error_response(StatusCode::BAD_GATEWAY, "Could not send thought right now")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{test_config, test_state, test_state_with, AUTHOR_ID};
    use crate::models::NoteSource;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn thought(note_id: i64, payload: impl Into<String>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(&format!("/api/notes/{}/thoughts", note_id))
            .set_payload(payload.into())
    }

    #[actix_web::test]
    async fn test_relays_thought() {
        let t = test_state();
        let note = t.state.db.insert_note("hello world", &NoteSource::default()).unwrap();
        let app = test::init_service(App::new().app_data(t.state.clone()).configure(config)).await;

        let payload = json!({ "sender": " @jdoe ", "message": " loved it " }).to_string();
        let body: Value = test::call_and_read_body_json(&app, thought(note.id, payload).to_request()).await;
        assert_eq!(body, json!({ "ok": true }));

        let sent = t.transport.last_sent().unwrap();
        assert_eq!(sent.chat_id, AUTHOR_ID);
        assert!(sent.text.contains("From: @jdoe (https://x.com/jdoe)"));
        assert!(sent.text.ends_with("\n\nloved it"));
    }

    #[actix_web::test]
    async fn test_validation_and_not_found() {
        let mut relaxed = test_config();
        relaxed.thought_rate_limit_max = 100;
        let t = test_state_with(relaxed);
        let app = test::init_service(App::new().app_data(t.state.clone()).configure(config)).await;

        let resp = test::call_service(&app, thought(1, "{").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let long_sender = "x".repeat(81);
        let resp = test::call_service(
            &app,
            thought(1, json!({ "sender": long_sender, "message": "hi" }).to_string()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "sender is required and must be <= 80 characters");

        let resp = test::call_service(&app, thought(42, json!({ "sender": "a", "message": "b" }).to_string()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, thought(1, "x".repeat(MAX_BODY_BYTES + 1)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(t.transport.sent().is_empty());
    }

    #[actix_web::test]
    async fn test_rate_limited() {
        let t = test_state();
        let note = t.state.db.insert_note("popular", &NoteSource::default()).unwrap();
        let app = test::init_service(App::new().app_data(t.state.clone()).configure(config)).await;
        let payload = json!({ "sender": "anon", "message": "hi" }).to_string();

        for _ in 0..2 {
            let resp = test::call_service(&app, thought(note.id, payload.clone()).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = test::call_service(&app, thought(note.id, payload).to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("Retry-After"));
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Too many requests, please wait and try again.");
        assert!(body["retry_after_seconds"].as_i64().unwrap() >= 1);
        assert_eq!(t.transport.sent().len(), 2);
    }
}
