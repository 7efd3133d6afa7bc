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
use crate::timer;
use crate::timer::ConfigPatch;
use crate::types::phase::TimerEventType;
use crate::types::phase::TimerPhase;
use crate::types::timer::TimerEvent;
use crate::types::timer::TimerSession;
use crate::types::timestamp::Timestamp;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfigRequest {
    work_duration: Option<i64>,
    rest_duration: Option<i64>,
    is_infinite: Option<bool>,
}

impl From<TimerConfigRequest> for ConfigPatch {
    fn from(request: TimerConfigRequest) -> Self {
        ConfigPatch {
            work_duration: request.work_duration,
            rest_duration: request.rest_duration,
            is_infinite: request.is_infinite,
        }
    }
}

#[derive(Serialize)]
pub struct TimerBody {
    timer: TimerStateDto,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalTimerBody {
    timer: Option<TimerStateDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimerStateDto {
    current_phase: TimerPhase,
    phase_started_at: Option<Timestamp>,
    cycles_completed: i64,
    total_work_time: i64,
    total_rest_time: i64,
    work_duration: i64,
    rest_duration: i64,
    is_infinite: bool,
}

impl From<TimerSession> for TimerStateDto {
    fn from(timer: TimerSession) -> Self {
        TimerStateDto {
            current_phase: timer.current_phase,
            phase_started_at: timer.phase_started_at,
            cycles_completed: timer.cycles_completed,
            total_work_time: timer.total_work_time,
            total_rest_time: timer.total_rest_time,
            work_duration: timer.work_duration,
            rest_duration: timer.rest_duration,
            is_infinite: timer.is_infinite,
        }
    }
}

#[derive(Serialize)]
pub struct StatsBody {
    stats: StatsDto,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsDto {
    total_work_time: i64,
    total_rest_time: i64,
    total_time: i64,
    cycles_completed: i64,
    work_percentage: f64,
    current_phase: TimerPhase,
    events: Vec<TimerEventDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimerEventDto {
    event_type: TimerEventType,
    from_phase: Option<TimerPhase>,
    to_phase: Option<TimerPhase>,
    duration: i64,
    timestamp: Timestamp,
}

impl From<TimerEvent> for TimerEventDto {
    fn from(event: TimerEvent) -> Self {
        TimerEventDto {
            event_type: event.event_type,
            from_phase: event.from_phase,
            to_phase: event.to_phase,
            duration: event.duration,
            timestamp: event.created_at,
        }
    }
}

pub async fn start(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
    Json(request): Json<TimerConfigRequest>,
) -> Result<Json<TimerBody>, ServiceError> {
    let timer = timer::start(
        &state.db,
        user.user_id,
        question_set_id,
        request.into(),
        Timestamp::now(),
    )?;
    Ok(Json(TimerBody {
        timer: timer.into(),
    }))
}

pub async fn pause(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<TimerBody>, ServiceError> {
    let timer = timer::pause(&state.db, user.user_id, question_set_id, Timestamp::now())?;
    Ok(Json(TimerBody {
        timer: timer.into(),
    }))
}

pub async fn advance(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<TimerBody>, ServiceError> {
    let timer = timer::advance(&state.db, user.user_id, question_set_id, Timestamp::now())?;
    Ok(Json(TimerBody {
        timer: timer.into(),
    }))
}

pub async fn stop(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<TimerBody>, ServiceError> {
    let timer = timer::stop(&state.db, user.user_id, question_set_id, Timestamp::now())?;
    Ok(Json(TimerBody {
        timer: timer.into(),
    }))
}

pub async fn state(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<OptionalTimerBody>, ServiceError> {
    let timer = timer::state(&state.db, user.user_id, question_set_id)?;
    Ok(Json(OptionalTimerBody {
        timer: timer.map(TimerStateDto::from),
    }))
}

pub async fn stats(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
) -> Result<Json<StatsBody>, ServiceError> {
    let stats = timer::stats(&state.db, user.user_id, question_set_id, Timestamp::now())?;
    Ok(Json(StatsBody {
        stats: StatsDto {
            total_work_time: stats.total_work_time,
            total_rest_time: stats.total_rest_time,
            total_time: stats.total_time,
            cycles_completed: stats.cycles_completed,
            work_percentage: stats.work_percentage,
            current_phase: stats.current_phase,
            events: stats.events.into_iter().map(TimerEventDto::from).collect(),
        },
    }))
}

pub async fn config(
    State(state): State<ServerState>,
    user: AuthedUser,
    Path(question_set_id): Path<i64>,
    Json(request): Json<TimerConfigRequest>,
) -> Result<Json<TimerBody>, ServiceError> {
    let timer = timer::update_config(&state.db, user.user_id, question_set_id, request.into())?;
    Ok(Json(TimerBody {
        timer: timer.into(),
    }))
}
