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

use std::collections::HashMap;

use crate::types::timestamp::Timestamp;

/// One answer submission event. A question may be answered several times in
/// a session; recency decides which rating counts.
#[derive(Clone, Debug)]
pub struct SessionAnswer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    pub user_rating: i64,
    pub answered_at: Timestamp,
}

/// The append-only answer history of one session, in submission order.
#[derive(Clone, Debug)]
pub struct AnswerLog {
    answers: Vec<SessionAnswer>,
}

impl AnswerLog {
    /// Build a log from rows already sorted in submission order.
    pub fn new(answers: Vec<SessionAnswer>) -> Self {
        Self { answers }
    }

    pub fn empty() -> Self {
        Self {
            answers: Vec::new(),
        }
    }

    /// The most recent rating per question. Later submissions overwrite
    /// earlier ones.
    pub fn effective_ratings(&self) -> HashMap<i64, i64> {
        let mut ratings = HashMap::new();
        for answer in &self.answers {
            ratings.insert(answer.question_id, answer.user_rating);
        }
        ratings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: i64, question_id: i64, rating: i64) -> SessionAnswer {
        SessionAnswer {
            id,
            session_id: 1,
            question_id,
            user_rating: rating,
            answered_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_recency_wins() {
        let log = AnswerLog::new(vec![answer(1, 10, 2), answer(2, 11, 4), answer(3, 10, 5)]);
        let ratings = log.effective_ratings();
        assert_eq!(ratings.get(&10), Some(&5));
        assert_eq!(ratings.get(&11), Some(&4));
        assert_eq!(ratings.get(&12), None);
    }
}
