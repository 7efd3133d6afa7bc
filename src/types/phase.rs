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

use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;

/// The timer's current activity state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Work,
    Rest,
    Paused,
    Completed,
}

impl TimerPhase {
    pub fn as_str(&self) -> &str {
        match self {
            TimerPhase::Work => "work",
            TimerPhase::Rest => "rest",
            TimerPhase::Paused => "paused",
            TimerPhase::Completed => "completed",
        }
    }

    /// Whether the phase accumulates wall-clock time.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::Work | TimerPhase::Rest)
    }
}

impl TryFrom<String> for TimerPhase {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "work" => Ok(TimerPhase::Work),
            "rest" => Ok(TimerPhase::Rest),
            "paused" => Ok(TimerPhase::Paused),
            "completed" => Ok(TimerPhase::Completed),
            _ => fail(format!("Invalid timer phase: {}", value)),
        }
    }
}

impl ToSql for TimerPhase {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TimerPhase {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        TimerPhase::try_from(string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One entry in the timer audit log.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEventType {
    Start,
    Pause,
    Resume,
    PhaseChange,
    CycleComplete,
    Stop,
}

impl TimerEventType {
    fn as_str(&self) -> &str {
        match self {
            TimerEventType::Start => "start",
            TimerEventType::Pause => "pause",
            TimerEventType::Resume => "resume",
            TimerEventType::PhaseChange => "phase_change",
            TimerEventType::CycleComplete => "cycle_complete",
            TimerEventType::Stop => "stop",
        }
    }
}

impl TryFrom<String> for TimerEventType {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "start" => Ok(TimerEventType::Start),
            "pause" => Ok(TimerEventType::Pause),
            "resume" => Ok(TimerEventType::Resume),
            "phase_change" => Ok(TimerEventType::PhaseChange),
            "cycle_complete" => Ok(TimerEventType::CycleComplete),
            "stop" => Ok(TimerEventType::Stop),
            _ => fail(format!("Invalid timer event type: {}", value)),
        }
    }
}

impl ToSql for TimerEventType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TimerEventType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        TimerEventType::try_from(string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
