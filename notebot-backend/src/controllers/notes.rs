//! Public notes feed plus the token-guarded internal edit endpoint.

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use super::error_response;
use crate::pagination::{paginate_notes, DEFAULT_PAGE_SIZE};
use crate::words::count_words;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/notes").route(web::get().to(list_notes)))
        .service(web::resource("/notes").route(web::get().to(list_notes)))
        .service(web::resource("/api/notes/{id}/edit").route(web::post().to(edit_note)));
}

/// Raw query values; anything non-numeric falls back to the default
#[derive(Debug, Deserialize)]
struct NotesQuery {
    page: Option<String>,
    page_size: Option<String>,
}

fn query_number(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

async fn list_notes(state: web::Data<AppState>, query: web::Query<NotesQuery>) -> HttpResponse {
    let page = query_number(query.page.as_deref(), 1);
    let page_size = query_number(query.page_size.as_deref(), DEFAULT_PAGE_SIZE as i64);

    match state.db.list_notes() {
        Ok(notes) => HttpResponse::Ok().json(paginate_notes(&notes, page, page_size)),
        Err(e) => {
            log::error!("[DB] Failed to list notes: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[derive(Debug, Deserialize)]
struct EditNoteRequest {
    content: Option<String>,
}

fn is_authorized(state: &AppState, req: &HttpRequest) -> bool {
    let Some(expected) = state.config.internal_api_token.as_deref() else {
        return false;
    };
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

async fn edit_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> HttpResponse {
    if !is_authorized(&state, &req) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let note_id = path.into_inner();

    let request: EditNoteRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload"),
    };

    let content = request.content.as_deref().unwrap_or("").trim();
    if content.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "content is required");
    }

    let max_words = state.config.max_note_words;
    let word_count = count_words(content);
    if word_count > max_words {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("content exceeds {} words", max_words),
        );
    }

    match state.db.update_note(note_id, content) {
        Ok(true) => {
            log::info!("[DB] Note #{} edited through the internal API", note_id);
            HttpResponse::Ok().json(serde_json::json!({
                "ok": true,
                "note_id": note_id,
                "word_count": word_count
            }))
        }
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Note not found"),
        Err(e) => {
            log::error!("[DB] Failed to edit note #{}: {}", note_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
