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

use serde::Serialize;

/// Snapshot of session progress, returned alongside each question and by
/// the status endpoint. Consumed by the statistics layer, not here.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Number of questions in the set.
    pub total: usize,
    /// Questions with at least one answer this session.
    pub answered: usize,
    /// Questions with effective rating 5.
    pub mastered: usize,
    /// Sum of effective ratings.
    pub points: i64,
    /// 5 x total.
    pub max_points: i64,
}
