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

use crate::types::phase::TimerEventType;
use crate::types::phase::TimerPhase;
use crate::types::timestamp::Timestamp;

/// Default work phase length: 25 minutes.
pub const DEFAULT_WORK_DURATION: i64 = 1500;

/// Default rest phase length: 5 minutes.
pub const DEFAULT_REST_DURATION: i64 = 300;

/// One Pomodoro run attached to a deck session. The deck session is a
/// read-only reference; the timer's lifecycle never drives deck progress.
#[derive(Clone, Debug)]
pub struct TimerSession {
    pub id: i64,
    pub deck_session_id: i64,
    pub user_id: i64,
    pub work_duration: i64,
    pub rest_duration: i64,
    pub is_infinite: bool,
    pub total_work_time: i64,
    pub total_rest_time: i64,
    pub cycles_completed: i64,
    pub current_phase: TimerPhase,
    /// Set only while paused: the phase to return to on resume.
    pub previous_phase: Option<TimerPhase>,
    /// Seconds banked in the interrupted phase while paused.
    pub elapsed_in_phase: i64,
    /// None while paused or completed.
    pub phase_started_at: Option<Timestamp>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Work/rest configuration for a timer run.
#[derive(Clone, Copy, Debug)]
pub struct TimerConfig {
    pub work_duration: i64,
    pub rest_duration: i64,
    pub is_infinite: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_duration: DEFAULT_WORK_DURATION,
            rest_duration: DEFAULT_REST_DURATION,
            is_infinite: false,
        }
    }
}

/// Immutable audit row, one per timer transition.
#[derive(Clone, Debug)]
pub struct TimerEvent {
    pub id: i64,
    pub timer_session_id: i64,
    pub event_type: TimerEventType,
    pub from_phase: Option<TimerPhase>,
    pub to_phase: Option<TimerPhase>,
    /// Seconds spent in the phase being left.
    pub duration: i64,
    pub created_at: Timestamp,
}
