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

use rand::Rng;

use crate::types::answer::AnswerLog;
use crate::types::mode::StudyMode;
use crate::types::progress::Progress;
use crate::types::question::Question;

/// A rating of 5 means the question is mastered.
pub const MAX_RATING: i64 = 5;

pub const MIN_RATING: i64 = 1;

/// The selector's verdict: the next question to show, or session
/// completion.
#[derive(Clone, Debug)]
pub struct Selection {
    /// None iff the session is complete.
    pub question: Option<Question>,
    /// 1-based position in the session: questions answered so far, plus
    /// one.
    pub question_number: usize,
    /// The effective rating of the chosen question, if it was answered
    /// before.
    pub previous_rating: Option<i64>,
    pub session_complete: bool,
    pub progress: Progress,
}

/// Map an effective rating to a selection weight. Unrated questions are
/// more urgent than any rated one; mastered questions leave the pool.
pub fn weight(effective_rating: Option<i64>) -> i64 {
    match effective_rating {
        None => MAX_RATING + 1,
        Some(rating) if rating >= MAX_RATING => 0,
        Some(rating) => MAX_RATING + 1 - rating,
    }
}

/// Pick the next question for a session, or report completion.
///
/// The eligible pool is every question with weight > 0. `shuffle` draws
/// from the pool with probability proportional to weight; `front-to-end`
/// takes the maximum-weight question, breaking ties by ascending question
/// id. An empty pool (including an empty question set) means the session
/// is complete.
pub fn select_next(questions: &[Question], answers: &AnswerLog, mode: StudyMode) -> Selection {
    let ratings = answers.effective_ratings();
    let progress = compute_progress(questions, &ratings);
    let eligible: Vec<(&Question, i64)> = questions
        .iter()
        .map(|q| (q, weight(ratings.get(&q.id).copied())))
        .filter(|(_, w)| *w > 0)
        .collect();
    if eligible.is_empty() {
        return Selection {
            question: None,
            question_number: progress.answered,
            previous_rating: None,
            session_complete: true,
            progress,
        };
    }
    let chosen = match mode {
        StudyMode::FrontToEnd => pick_deterministic(&eligible),
        StudyMode::Shuffle => pick_weighted(&eligible, rand::thread_rng().r#gen::<f64>()),
    };
    Selection {
        previous_rating: ratings.get(&chosen.id).copied(),
        question_number: progress.answered + 1,
        question: Some(chosen.clone()),
        session_complete: false,
        progress,
    }
}

/// Maximum weight wins; ties go to the lowest question id. Since unrated
/// questions carry the top weight, this serves unseen questions in
/// creation order first, then re-queues answered questions weakest-first.
fn pick_deterministic<'a>(eligible: &[(&'a Question, i64)]) -> &'a Question {
    let mut best = eligible[0];
    for entry in &eligible[1..] {
        if entry.1 > best.1 {
            best = *entry;
        }
    }
    best.0
}

/// Weighted draw given a uniform roll in [0, 1). Deterministic in the
/// roll, so tests can probe the distribution boundaries directly.
fn pick_weighted<'a>(eligible: &[(&'a Question, i64)], roll: f64) -> &'a Question {
    let total: i64 = eligible.iter().map(|(_, w)| w).sum();
    let mut target = roll * total as f64;
    for (question, w) in eligible {
        target -= *w as f64;
        if target < 0.0 {
            return question;
        }
    }
    // roll was at the very top of the range.
    eligible[eligible.len() - 1].0
}

fn compute_progress(questions: &[Question], ratings: &HashMap<i64, i64>) -> Progress {
    let total = questions.len();
    let mut answered = 0;
    let mut mastered = 0;
    let mut points = 0;
    for question in questions {
        if let Some(rating) = ratings.get(&question.id) {
            answered += 1;
            points += rating;
            if *rating >= MAX_RATING {
                mastered += 1;
            }
        }
    }
    Progress {
        total,
        answered,
        mastered,
        points,
        max_points: MAX_RATING * total as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::answer::SessionAnswer;
    use crate::types::timestamp::Timestamp;

    fn question(id: i64) -> Question {
        Question {
            id,
            question_set_id: 1,
            text: format!("question {id}"),
            answer: None,
            difficulty: 3,
        }
    }

    fn log(entries: &[(i64, i64)]) -> AnswerLog {
        let answers = entries
            .iter()
            .enumerate()
            .map(|(i, (question_id, rating))| SessionAnswer {
                id: i as i64 + 1,
                session_id: 1,
                question_id: *question_id,
                user_rating: *rating,
                answered_at: Timestamp::now(),
            })
            .collect();
        AnswerLog::new(answers)
    }

    #[test]
    fn test_weight_is_monotone_in_rating() {
        assert!(weight(None) >= weight(Some(1)));
        for rating in MIN_RATING..MAX_RATING {
            assert!(weight(Some(rating)) >= weight(Some(rating + 1)));
        }
        assert!(weight(Some(4)) > weight(Some(5)));
        assert_eq!(weight(Some(5)), 0);
    }

    #[test]
    fn test_empty_set_is_immediately_complete() {
        let selection = select_next(&[], &AnswerLog::empty(), StudyMode::FrontToEnd);
        assert!(selection.session_complete);
        assert!(selection.question.is_none());
        assert_eq!(selection.progress.total, 0);
        assert_eq!(selection.progress.points, 0);
    }

    #[test]
    fn test_front_to_end_walks_in_creation_order() {
        let questions = vec![question(1), question(2), question(3)];
        let selection = select_next(&questions, &AnswerLog::empty(), StudyMode::FrontToEnd);
        assert_eq!(selection.question.unwrap().id, 1);
        assert_eq!(selection.question_number, 1);
        assert!(selection.previous_rating.is_none());

        // Master the first question; the second is next.
        let selection = select_next(&questions, &log(&[(1, 5)]), StudyMode::FrontToEnd);
        assert_eq!(selection.question.unwrap().id, 2);
        assert_eq!(selection.question_number, 2);
    }

    #[test]
    fn test_mastered_questions_are_excluded() {
        let questions = vec![question(1), question(2), question(3)];
        // Only question 2 is unmastered.
        let answers = log(&[(1, 5), (2, 2), (3, 5)]);
        for _ in 0..50 {
            let selection = select_next(&questions, &answers, StudyMode::Shuffle);
            assert_eq!(selection.question.unwrap().id, 2);
        }
    }

    #[test]
    fn test_all_mastered_completes_the_session() {
        let questions = vec![question(1), question(2)];
        let answers = log(&[(1, 5), (2, 5)]);
        let selection = select_next(&questions, &answers, StudyMode::FrontToEnd);
        assert!(selection.session_complete);
        assert!(selection.question.is_none());
        assert_eq!(selection.progress.mastered, 2);
        assert_eq!(selection.progress.points, 10);
        assert_eq!(selection.progress.max_points, 10);
    }

    #[test]
    fn test_not_complete_while_any_question_is_unmastered() {
        let questions = vec![question(1), question(2)];
        let answers = log(&[(1, 5), (2, 4)]);
        let selection = select_next(&questions, &answers, StudyMode::FrontToEnd);
        assert!(!selection.session_complete);
        assert_eq!(selection.question.unwrap().id, 2);
    }

    #[test]
    fn test_unrated_is_served_before_low_rated() {
        let questions = vec![question(1), question(2)];
        // Question 1 was answered badly; question 2 is unseen and still
        // comes first.
        let answers = log(&[(1, 1)]);
        let selection = select_next(&questions, &answers, StudyMode::FrontToEnd);
        assert_eq!(selection.question.unwrap().id, 2);
    }

    #[test]
    fn test_front_to_end_requeues_weakest_first() {
        let questions = vec![question(1), question(2), question(3)];
        let answers = log(&[(1, 4), (2, 2), (3, 3)]);
        let selection = select_next(&questions, &answers, StudyMode::FrontToEnd);
        assert_eq!(selection.question.unwrap().id, 2);
        assert_eq!(selection.previous_rating, Some(2));
    }

    #[test]
    fn test_recency_overrides_earlier_rating() {
        let questions = vec![question(1), question(2)];
        // Question 1 was rated 2, then 5: it is now mastered.
        let answers = log(&[(1, 2), (2, 3), (1, 5)]);
        let selection = select_next(&questions, &answers, StudyMode::FrontToEnd);
        assert_eq!(selection.question.unwrap().id, 2);
        assert_eq!(selection.progress.mastered, 1);
        assert_eq!(selection.progress.points, 8);
    }

    #[test]
    fn test_weighted_draw_boundaries() {
        // Pool = {2 (weight 4), 3 (weight 3)}, per rating A=5, B=2, C=3.
        let questions = vec![question(1), question(2), question(3)];
        let answers = log(&[(1, 5), (2, 2), (3, 3)]);
        let ratings = answers.effective_ratings();
        let eligible: Vec<(&Question, i64)> = questions
            .iter()
            .map(|q| (q, weight(ratings.get(&q.id).copied())))
            .filter(|(_, w)| *w > 0)
            .collect();
        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].1, 4);
        assert_eq!(eligible[1].1, 3);
        // Total weight 7: rolls below 4/7 pick question 2, above pick 3.
        assert_eq!(pick_weighted(&eligible, 0.0).id, 2);
        assert_eq!(pick_weighted(&eligible, 4.0 / 7.0 - 0.001).id, 2);
        assert_eq!(pick_weighted(&eligible, 4.0 / 7.0 + 0.001).id, 3);
        assert_eq!(pick_weighted(&eligible, 0.999).id, 3);
    }

    #[test]
    fn test_weighted_draw_distribution() {
        // Rate A=5, B=2, C=3: over many trials B should win roughly 4/7.
        let questions = vec![question(1), question(2), question(3)];
        let answers = log(&[(1, 5), (2, 2), (3, 3)]);
        let trials = 10_000;
        let mut b_count = 0;
        for _ in 0..trials {
            let selection = select_next(&questions, &answers, StudyMode::Shuffle);
            if selection.question.unwrap().id == 2 {
                b_count += 1;
            }
        }
        let share = b_count as f64 / trials as f64;
        assert!(share > 0.52 && share < 0.62, "share was {share}");
    }

    #[test]
    fn test_progress_snapshot() {
        let questions = vec![question(1), question(2), question(3), question(4)];
        let answers = log(&[(1, 5), (2, 3)]);
        let selection = select_next(&questions, &answers, StudyMode::FrontToEnd);
        let progress = selection.progress;
        assert_eq!(progress.total, 4);
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.mastered, 1);
        assert_eq!(progress.points, 8);
        assert_eq!(progress.max_points, 20);
    }
}
