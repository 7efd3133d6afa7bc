// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod auth;
mod session;
mod timer;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use serde_json::json;
use tokio::net::TcpListener;

use crate::db::Database;
use crate::error::Fallible;
use crate::error::ServiceError;

#[derive(Clone)]
pub struct ServerState {
    pub db: Database,
}

pub fn router(state: ServerState) -> Router {
    let app = Router::new();
    let app = app.route("/study-sessions/start", post(session::start));
    let app = app.route("/study-sessions/{question_set_id}/status", get(session::status));
    let app = app.route(
        "/study-sessions/{question_set_id}/next-question",
        get(session::next_question),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/submit-answer",
        post(session::submit_answer),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/complete",
        post(session::complete),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/restart",
        post(session::restart),
    );
    let app = app.route("/study-sessions/{question_set_id}/reset", post(session::reset));
    let app = app.route(
        "/study-sessions/{question_set_id}/timer/start",
        post(timer::start),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/timer/pause",
        post(timer::pause),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/timer/advance",
        post(timer::advance),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/timer/stop",
        post(timer::stop),
    );
    let app = app.route("/study-sessions/{question_set_id}/timer", get(timer::state));
    let app = app.route(
        "/study-sessions/{question_set_id}/timer/stats",
        get(timer::stats),
    );
    let app = app.route(
        "/study-sessions/{question_set_id}/timer/config",
        put(timer::config),
    );
    let app = app.fallback(not_found_handler);
    app.with_state(state)
}

pub async fn start_server(db: Database, bind: String) -> Fallible<()> {
    let state = ServerState { db };
    let app = router(state);
    log::debug!("Starting server on {bind}");
    let listener = TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServiceError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "validation_error", message.clone())
            }
            ServiceError::NotFound(message) => {
                (StatusCode::NOT_FOUND, "not_found", message.clone())
            }
            ServiceError::NoActiveSession => (
                StatusCode::CONFLICT,
                "no_active_session",
                "no active study session".to_string(),
            ),
            ServiceError::NoActiveTimer => (
                StatusCode::CONFLICT,
                "no_active_timer",
                "no active timer session".to_string(),
            ),
            ServiceError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or invalid token".to_string(),
            ),
            ServiceError::Internal(report) => {
                log::error!("internal error: {report}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };
        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

async fn not_found_handler() -> Response {
    ServiceError::NotFound("no such route".to_string()).into_response()
}
