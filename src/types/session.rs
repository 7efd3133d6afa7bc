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

use crate::types::mode::StudyMode;
use crate::types::timestamp::Timestamp;

/// One deck-study attempt. At most one row per (user, question set) has
/// `completed_at = None`; that row is the active session.
#[derive(Clone, Debug)]
pub struct StudySession {
    pub id: i64,
    pub user_id: i64,
    pub question_set_id: i64,
    pub mode: StudyMode,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}
