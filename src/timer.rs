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

//! Pomodoro timer state machine: work/rest/paused/completed phases with
//! banked-time accounting and an append-only audit log. Attached to a deck
//! session by id only; timer writes never touch deck progress.

use crate::db::Database;
use crate::db::InsertTimer;
use crate::db::InsertTimerEvent;
use crate::error::ServiceError;
use crate::error::ServiceResult;
use crate::types::phase::TimerEventType;
use crate::types::phase::TimerPhase;
use crate::types::session::StudySession;
use crate::types::timer::TimerConfig;
use crate::types::timer::TimerEvent;
use crate::types::timer::TimerSession;
use crate::types::timestamp::Timestamp;

/// Partial configuration from the start/config endpoints; missing fields
/// keep their defaults (on start) or current values (on config update).
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigPatch {
    pub work_duration: Option<i64>,
    pub rest_duration: Option<i64>,
    pub is_infinite: Option<bool>,
}

/// Aggregate accounting for the stats endpoint. Includes the live elapsed
/// time of the running phase, which is derived, never stored.
pub struct TimerStats {
    pub total_work_time: i64,
    pub total_rest_time: i64,
    pub total_time: i64,
    pub cycles_completed: i64,
    pub work_percentage: f64,
    pub current_phase: TimerPhase,
    pub events: Vec<TimerEvent>,
}

/// Start a timer for the deck session, or resume the active one. A paused
/// timer returns to its interrupted phase with the banked time carried
/// over; a running timer is returned unchanged.
pub fn start(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    patch: ConfigPatch,
    now: Timestamp,
) -> ServiceResult<TimerSession> {
    let deck_session = require_deck_session(db, user_id, question_set_id)?;
    if let Some(timer) = db.find_active_timer(deck_session.id)? {
        return resume(db, timer, now);
    }
    let config = apply_patch(TimerConfig::default(), patch)?;
    let (timer, created) = db.insert_timer(&InsertTimer {
        deck_session_id: deck_session.id,
        user_id,
        work_duration: config.work_duration,
        rest_duration: config.rest_duration,
        is_infinite: config.is_infinite,
        started_at: now,
    })?;
    if !created {
        // A concurrent start won the race; its row is the active timer.
        return resume(db, timer, now);
    }
    log::debug!("Started timer {} for session {}", timer.id, deck_session.id);
    Ok(timer)
}

/// Return a running timer unchanged; bring a paused one back to its
/// interrupted phase with the banked time carried over.
fn resume(db: &Database, mut timer: TimerSession, now: Timestamp) -> ServiceResult<TimerSession> {
    if timer.current_phase != TimerPhase::Paused {
        return Ok(timer);
    }
    let resumed_phase = timer.previous_phase.unwrap_or(TimerPhase::Work);
    timer.current_phase = resumed_phase;
    // Backdate the phase start so the banked seconds carry over. The
    // whole backdated span is re-banked when the phase ends, so the
    // pause's deposit is withdrawn here to keep the invariant:
    // totals + live elapsed of the running phase = wall-clock active
    // time.
    timer.phase_started_at = Some(now.minus_seconds(timer.elapsed_in_phase));
    match resumed_phase {
        TimerPhase::Work => timer.total_work_time -= timer.elapsed_in_phase,
        TimerPhase::Rest => timer.total_rest_time -= timer.elapsed_in_phase,
        _ => {}
    }
    timer.previous_phase = None;
    timer.elapsed_in_phase = 0;
    let event = InsertTimerEvent {
        timer_session_id: timer.id,
        event_type: TimerEventType::Resume,
        from_phase: Some(TimerPhase::Paused),
        to_phase: Some(resumed_phase),
        duration: 0,
        created_at: now,
    };
    db.update_timer(&timer, &[event])?;
    Ok(timer)
}

/// Pause a running timer, banking the elapsed seconds of the current
/// phase so resume can continue it.
pub fn pause(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    now: Timestamp,
) -> ServiceResult<TimerSession> {
    let mut timer = require_active_timer(db, user_id, question_set_id)?;
    let phase = require_running(&timer)?;
    let elapsed = bank_elapsed(&mut timer, now);
    timer.previous_phase = Some(phase);
    timer.elapsed_in_phase = elapsed;
    timer.current_phase = TimerPhase::Paused;
    timer.phase_started_at = None;
    let event = InsertTimerEvent {
        timer_session_id: timer.id,
        event_type: TimerEventType::Pause,
        from_phase: Some(phase),
        to_phase: Some(TimerPhase::Paused),
        duration: elapsed,
        created_at: now,
    };
    db.update_timer(&timer, &[event])?;
    Ok(timer)
}

/// Flip work to rest or rest to work. A cycle closes on the rest-to-work
/// flip, and only there.
pub fn advance(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    now: Timestamp,
) -> ServiceResult<TimerSession> {
    let mut timer = require_active_timer(db, user_id, question_set_id)?;
    let phase = require_running(&timer)?;
    let elapsed = bank_elapsed(&mut timer, now);
    let next_phase = match phase {
        TimerPhase::Work => TimerPhase::Rest,
        _ => TimerPhase::Work,
    };
    timer.current_phase = next_phase;
    timer.phase_started_at = Some(now);
    let mut events = vec![InsertTimerEvent {
        timer_session_id: timer.id,
        event_type: TimerEventType::PhaseChange,
        from_phase: Some(phase),
        to_phase: Some(next_phase),
        duration: elapsed,
        created_at: now,
    }];
    if phase == TimerPhase::Rest {
        timer.cycles_completed += 1;
        events.push(InsertTimerEvent {
            timer_session_id: timer.id,
            event_type: TimerEventType::CycleComplete,
            from_phase: Some(phase),
            to_phase: Some(next_phase),
            duration: 0,
            created_at: now,
        });
    }
    db.update_timer(&timer, &events)?;
    Ok(timer)
}

/// Finish the timer run. A later `start` creates a new run; completed runs
/// accumulate per deck session.
pub fn stop(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    now: Timestamp,
) -> ServiceResult<TimerSession> {
    let mut timer = require_active_timer(db, user_id, question_set_id)?;
    let from_phase = timer.current_phase;
    // A paused timer already banked its elapsed time.
    let elapsed = if from_phase.is_running() {
        bank_elapsed(&mut timer, now)
    } else {
        0
    };
    timer.current_phase = TimerPhase::Completed;
    timer.previous_phase = None;
    timer.phase_started_at = None;
    timer.completed_at = Some(now);
    let event = InsertTimerEvent {
        timer_session_id: timer.id,
        event_type: TimerEventType::Stop,
        from_phase: Some(from_phase),
        to_phase: Some(TimerPhase::Completed),
        duration: elapsed,
        created_at: now,
    };
    db.update_timer(&timer, &[event])?;
    log::debug!("Stopped timer {}", timer.id);
    Ok(timer)
}

/// The active timer for the deck session, if any. No timer is the idle
/// state, not an error.
pub fn state(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
) -> ServiceResult<Option<TimerSession>> {
    let deck_session = require_deck_session(db, user_id, question_set_id)?;
    Ok(db.find_active_timer(deck_session.id)?)
}

/// Accounting for the active timer, including the live elapsed time of a
/// running phase.
pub fn stats(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    now: Timestamp,
) -> ServiceResult<TimerStats> {
    let timer = require_active_timer(db, user_id, question_set_id)?;
    let mut total_work_time = timer.total_work_time;
    let mut total_rest_time = timer.total_rest_time;
    match (timer.current_phase, timer.phase_started_at) {
        (TimerPhase::Work, Some(started)) => {
            total_work_time += now.seconds_since(started).max(0);
        }
        (TimerPhase::Rest, Some(started)) => {
            total_rest_time += now.seconds_since(started).max(0);
        }
        _ => {}
    }
    let total_time = total_work_time + total_rest_time;
    let work_percentage = if total_time > 0 {
        total_work_time as f64 / total_time as f64 * 100.0
    } else {
        0.0
    };
    let events = db.list_timer_events(timer.id)?;
    Ok(TimerStats {
        total_work_time,
        total_rest_time,
        total_time,
        cycles_completed: timer.cycles_completed,
        work_percentage,
        current_phase: timer.current_phase,
        events,
    })
}

/// Update the active timer's configuration. Does not touch phase state or
/// accounting.
pub fn update_config(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    patch: ConfigPatch,
) -> ServiceResult<TimerSession> {
    let mut timer = require_active_timer(db, user_id, question_set_id)?;
    let config = apply_patch(
        TimerConfig {
            work_duration: timer.work_duration,
            rest_duration: timer.rest_duration,
            is_infinite: timer.is_infinite,
        },
        patch,
    )?;
    timer.work_duration = config.work_duration;
    timer.rest_duration = config.rest_duration;
    timer.is_infinite = config.is_infinite;
    db.update_timer(&timer, &[])?;
    Ok(timer)
}

/// Add the running phase's elapsed seconds to the matching total. Returns
/// the elapsed seconds.
fn bank_elapsed(timer: &mut TimerSession, now: Timestamp) -> i64 {
    let elapsed = match timer.phase_started_at {
        Some(started) => now.seconds_since(started).max(0),
        None => 0,
    };
    match timer.current_phase {
        TimerPhase::Work => timer.total_work_time += elapsed,
        TimerPhase::Rest => timer.total_rest_time += elapsed,
        _ => {}
    }
    elapsed
}

fn apply_patch(base: TimerConfig, patch: ConfigPatch) -> ServiceResult<TimerConfig> {
    let config = TimerConfig {
        work_duration: patch.work_duration.unwrap_or(base.work_duration),
        rest_duration: patch.rest_duration.unwrap_or(base.rest_duration),
        is_infinite: patch.is_infinite.unwrap_or(base.is_infinite),
    };
    if config.work_duration < 1 {
        return Err(ServiceError::Validation(format!(
            "work duration must be at least 1 second, got {}",
            config.work_duration
        )));
    }
    if config.rest_duration < 1 {
        return Err(ServiceError::Validation(format!(
            "rest duration must be at least 1 second, got {}",
            config.rest_duration
        )));
    }
    Ok(config)
}

fn require_running(timer: &TimerSession) -> ServiceResult<TimerPhase> {
    if !timer.current_phase.is_running() {
        return Err(ServiceError::Validation(format!(
            "timer is {}, not running",
            timer.current_phase.as_str()
        )));
    }
    Ok(timer.current_phase)
}

fn require_deck_session(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
) -> ServiceResult<StudySession> {
    if !db.question_set_exists(user_id, question_set_id)? {
        return Err(ServiceError::NotFound(format!(
            "question set {question_set_id} does not exist"
        )));
    }
    db.find_active_session(user_id, question_set_id)?
        .ok_or(ServiceError::NoActiveSession)
}

fn require_active_timer(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
) -> ServiceResult<TimerSession> {
    let deck_session = require_deck_session(db, user_id, question_set_id)?;
    db.find_active_timer(deck_session.id)?
        .ok_or(ServiceError::NoActiveTimer)
}
