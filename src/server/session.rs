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

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ServiceError;
use crate::server::ServerState;
use crate::server::auth::AuthedUser;
use crate::study;
use crate::study::StartOutcome;
use crate::types::mode::StudyMode;
use crate::types::progress::Progress;
use crate::types::question::Question;
use crate::types::timestamp::Timestamp;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    question_set_id: i64,
    mode: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    question_id: i64,
    confidence_rating: i64,
}

#[derive(Deserialize)]
pub struct RestartRequest {
    mode: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    mode: Option<String>,
}

/// A bad mode string is a validation failure, not a malformed request.
fn parse_mode(mode: &str) -> Result<StudyMode, ServiceError> {
    StudyMode::try_from(mode.to_string())
        .map_err(|_| ServiceError::Validation(format!("invalid study mode: {mode}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    session: SessionDto,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionDto {
    id: i64,
    question_set_id: i64,
    mode: StudyMode,
    started_at: Timestamp,
    is_resumed: bool,
}

impl From<StartOutcome> for SessionBody {
    fn from(outcome: StartOutcome) -> Self {
        SessionBody {
            session: SessionDto {
                id: outcome.session.id,
                question_set_id: outcome.session.question_set_id,
                mode: outcome.session.mode,
                started_at: outcome.session.started_at,
                is_resumed: outcome.is_resumed,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    has_active_session: bool,
    progress: Progress,
    session_complete: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionBody {
    question: Option<Question>,
    question_number: usize,
    previous_score: Option<i64>,
    session_complete: bool,
    progress: Progress,
}

#[derive(Serialize)]
pub struct SuccessBody {
    success: bool,
}

pub async fn start(
    State(state): State<ServerState>,
    user: AuthedUser,
    Json(request): Json<StartRequest>,
) -> Result<Json<SessionBody>, ServiceError> {
    let mode = parse_mode(&request.mode)?;
    let outcome = study::start_or_resume(
        &state.db,
        user.user_id,
        request.question_set_id,
        mode,
        Timestamp::now(),
    )?;
    Ok(Json(outcome.into()))
}

pub async fn status(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<StatusBody>, ServiceError> {
    let status = study::status(&state.db, user.user_id, question_set_id)?;
    Ok(Json(StatusBody {
        has_active_session: status.has_active_session,
        progress: status.progress,
        session_complete: status.session_complete,
    }))
}

pub async fn next_question(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<NextQuestionBody>, ServiceError> {
    let selection = study::next_question(&state.db, user.user_id, question_set_id)?;
    Ok(Json(NextQuestionBody {
        question: selection.question,
        question_number: selection.question_number,
        previous_score: selection.previous_rating,
        session_complete: selection.session_complete,
        progress: selection.progress,
    }))
}

pub async fn submit_answer(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Json<SuccessBody>, ServiceError> {
    study::submit_answer(
        &state.db,
        user.user_id,
        question_set_id,
        request.question_id,
        request.confidence_rating,
        Timestamp::now(),
    )?;
    Ok(Json(SuccessBody { success: true }))
}

pub async fn complete(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<SuccessBody>, ServiceError> {
    study::complete(&state.db, user.user_id, question_set_id, Timestamp::now())?;
    Ok(Json(SuccessBody { success: true }))
}

pub async fn restart(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
    Json(request): Json<RestartRequest>,
) -> Result<Json<SessionBody>, ServiceError> {
    let mode = parse_mode(&request.mode)?;
    let outcome = study::restart(
        &state.db,
        user.user_id,
        question_set_id,
        mode,
        Timestamp::now(),
    )?;
    Ok(Json(outcome.into()))
}

pub async fn reset(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<SessionBody>, ServiceError> {
    let mode = request.mode.as_deref().map(parse_mode).transpose()?;
    let outcome = study::reset(
        &state.db,
        user.user_id,
        question_set_id,
        mode,
        Timestamp::now(),
    )?;
    Ok(Json(outcome.into()))
}
