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

//! Study session lifecycle: none -> active -> completed, plus `reset`
//! which destroys the row and returns to none. All operations uphold the
//! single active session rule.

use crate::db::Database;
use crate::error::ServiceError;
use crate::error::ServiceResult;
use crate::selector::MAX_RATING;
use crate::selector::MIN_RATING;
use crate::selector::Selection;
use crate::selector::select_next;
use crate::types::answer::AnswerLog;
use crate::types::mode::StudyMode;
use crate::types::progress::Progress;
use crate::types::session::StudySession;
use crate::types::timestamp::Timestamp;

/// The session returned by start/restart/reset, with whether an existing
/// active session was resumed rather than created.
pub struct StartOutcome {
    pub session: StudySession,
    pub is_resumed: bool,
}

/// What the status endpoint reports. A missing session is the idle state,
/// not an error.
pub struct SessionStatus {
    pub has_active_session: bool,
    pub progress: Progress,
    pub session_complete: bool,
}

/// Resume the active session for (user, set), or start a new one with the
/// given mode. Resuming never overwrites the session's mode.
pub fn start_or_resume(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    mode: StudyMode,
    now: Timestamp,
) -> ServiceResult<StartOutcome> {
    require_question_set(db, user_id, question_set_id)?;
    let (session, created) =
        db.find_or_create_active_session(user_id, question_set_id, mode, now)?;
    if created {
        log::debug!("Started session {} for set {question_set_id}", session.id);
    }
    Ok(StartOutcome {
        session,
        is_resumed: !created,
    })
}

/// Ask the selector for the next question of the active session.
pub fn next_question(db: &Database, user_id: i64, question_set_id: i64) -> ServiceResult<Selection> {
    let session = require_active_session(db, user_id, question_set_id)?;
    let questions = db.list_questions(question_set_id)?;
    let answers = AnswerLog::new(db.list_answers(session.id)?);
    Ok(select_next(&questions, &answers, session.mode))
}

/// Append an answer to the active session's log.
pub fn submit_answer(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    question_id: i64,
    rating: i64,
    now: Timestamp,
) -> ServiceResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ServiceError::Validation(format!(
            "confidence rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    let session = require_active_session(db, user_id, question_set_id)?;
    let question = db
        .get_question(question_id)?
        .filter(|q| q.question_set_id == question_set_id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "question {question_id} does not belong to set {question_set_id}"
            ))
        })?;
    db.insert_answer(session.id, question.id, rating, now)?;
    Ok(())
}

/// Report whether a session is active and how far along it is.
pub fn status(db: &Database, user_id: i64, question_set_id: i64) -> ServiceResult<SessionStatus> {
    require_question_set(db, user_id, question_set_id)?;
    match db.find_active_session(user_id, question_set_id)? {
        Some(session) => {
            let questions = db.list_questions(question_set_id)?;
            let answers = AnswerLog::new(db.list_answers(session.id)?);
            let selection = select_next(&questions, &answers, session.mode);
            Ok(SessionStatus {
                has_active_session: true,
                progress: selection.progress,
                session_complete: selection.session_complete,
            })
        }
        None => {
            let questions = db.list_questions(question_set_id)?;
            let selection = select_next(&questions, &AnswerLog::empty(), StudyMode::FrontToEnd);
            Ok(SessionStatus {
                has_active_session: false,
                progress: selection.progress,
                session_complete: false,
            })
        }
    }
}

/// Mark the active session completed. A no-op when none is active.
pub fn complete(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    now: Timestamp,
) -> ServiceResult<()> {
    require_question_set(db, user_id, question_set_id)?;
    if let Some(session) = db.find_active_session(user_id, question_set_id)? {
        db.complete_session(session.id, now)?;
        log::debug!("Completed session {}", session.id);
    }
    Ok(())
}

/// Complete the active session (if any) and start a fresh one. The prior
/// session's answers are retained for history.
pub fn restart(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    mode: StudyMode,
    now: Timestamp,
) -> ServiceResult<StartOutcome> {
    require_question_set(db, user_id, question_set_id)?;
    if let Some(session) = db.find_active_session(user_id, question_set_id)? {
        db.complete_session(session.id, now)?;
    }
    let (session, _) = db.find_or_create_active_session(user_id, question_set_id, mode, now)?;
    Ok(StartOutcome {
        session,
        is_resumed: false,
    })
}

/// Hard-delete the current session and everything hanging off it (answers,
/// timer sessions, timer events), then start a fresh one. Unlike `restart`,
/// history is destroyed.
pub fn reset(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
    mode: Option<StudyMode>,
    now: Timestamp,
) -> ServiceResult<StartOutcome> {
    require_question_set(db, user_id, question_set_id)?;
    let previous = db.find_latest_session(user_id, question_set_id)?;
    let mode = mode
        .or(previous.as_ref().map(|s| s.mode))
        .unwrap_or(StudyMode::FrontToEnd);
    if let Some(session) = previous {
        db.delete_session(session.id)?;
        log::debug!("Reset destroyed session {}", session.id);
    }
    let (session, _) = db.find_or_create_active_session(user_id, question_set_id, mode, now)?;
    Ok(StartOutcome {
        session,
        is_resumed: false,
    })
}

fn require_question_set(db: &Database, user_id: i64, question_set_id: i64) -> ServiceResult<()> {
    if !db.question_set_exists(user_id, question_set_id)? {
        return Err(ServiceError::NotFound(format!(
            "question set {question_set_id} does not exist"
        )));
    }
    Ok(())
}

fn require_active_session(
    db: &Database,
    user_id: i64,
    question_set_id: i64,
) -> ServiceResult<StudySession> {
    require_question_set(db, user_id, question_set_id)?;
    db.find_active_session(user_id, question_set_id)?
        .ok_or(ServiceError::NoActiveSession)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fallible;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Database,
        user_id: i64,
        set_id: i64,
        questions: Vec<i64>,
    }

    fn fixture() -> Fallible<Fixture> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.sqlite3");
        let db = Database::new(path.to_str().unwrap())?;
        let user_id = db.create_user("alice", "tok")?;
        let set_id = db.create_question_set(user_id, "capitals")?;
        let questions = vec![
            db.create_question(set_id, "Capital of France?", Some("Paris"), 2)?,
            db.create_question(set_id, "Capital of Japan?", Some("Tokyo"), 2)?,
            db.create_question(set_id, "Capital of Peru?", Some("Lima"), 4)?,
        ];
        Ok(Fixture {
            _dir: dir,
            db,
            user_id,
            set_id,
            questions,
        })
    }

    #[test]
    fn test_start_then_resume() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        let first = start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::Shuffle, now).unwrap();
        assert!(!first.is_resumed);
        let second =
            start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();
        assert!(second.is_resumed);
        assert_eq!(first.session.id, second.session.id);
        assert_eq!(second.session.mode, StudyMode::Shuffle);
        Ok(())
    }

    #[test]
    fn test_next_question_requires_active_session() -> Fallible<()> {
        let f = fixture()?;
        let result = next_question(&f.db, f.user_id, f.set_id);
        assert!(matches!(result, Err(ServiceError::NoActiveSession)));
        Ok(())
    }

    #[test]
    fn test_unknown_question_set_is_not_found() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        let result = start_or_resume(&f.db, f.user_id, 9999, StudyMode::Shuffle, now);
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_front_to_end_walkthrough() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();

        let selection = next_question(&f.db, f.user_id, f.set_id).unwrap();
        assert_eq!(selection.question.unwrap().id, f.questions[0]);
        assert_eq!(selection.question_number, 1);

        submit_answer(&f.db, f.user_id, f.set_id, f.questions[0], 5, now).unwrap();
        let selection = next_question(&f.db, f.user_id, f.set_id).unwrap();
        assert_eq!(selection.question.unwrap().id, f.questions[1]);
        assert_eq!(selection.question_number, 2);
        Ok(())
    }

    #[test]
    fn test_mastering_everything_completes() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();
        // Rate everything 5, in reverse order for variety.
        for question_id in f.questions.iter().rev() {
            let selection = next_question(&f.db, f.user_id, f.set_id).unwrap();
            assert!(!selection.session_complete);
            submit_answer(&f.db, f.user_id, f.set_id, *question_id, 5, now).unwrap();
        }
        let selection = next_question(&f.db, f.user_id, f.set_id).unwrap();
        assert!(selection.session_complete);
        assert!(selection.question.is_none());
        Ok(())
    }

    #[test]
    fn test_submit_answer_validates_rating() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();
        for rating in [0, 6, -1] {
            let result = submit_answer(&f.db, f.user_id, f.set_id, f.questions[0], rating, now);
            assert!(matches!(result, Err(ServiceError::Validation(_))));
        }
        Ok(())
    }

    #[test]
    fn test_submit_answer_rejects_foreign_question() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        let other_set = f.db.create_question_set(f.user_id, "rivers")?;
        let other_question = f
            .db
            .create_question(other_set, "Longest river?", Some("Nile"), 3)?;
        start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();
        let result = submit_answer(&f.db, f.user_id, f.set_id, other_question, 3, now);
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_complete_is_idempotent() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();
        complete(&f.db, f.user_id, f.set_id, now).unwrap();
        // No active session left; completing again is still fine.
        complete(&f.db, f.user_id, f.set_id, now).unwrap();
        assert!(f.db.find_active_session(f.user_id, f.set_id)?.is_none());
        Ok(())
    }

    #[test]
    fn test_restart_retains_history() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        let first = start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now)
            .unwrap()
            .session;
        submit_answer(&f.db, f.user_id, f.set_id, f.questions[0], 4, now).unwrap();

        let second = restart(&f.db, f.user_id, f.set_id, StudyMode::Shuffle, now)
            .unwrap()
            .session;
        assert_ne!(first.id, second.id);
        assert_eq!(second.mode, StudyMode::Shuffle);
        // Old answers remain queryable by the old session id; the new
        // session starts empty.
        let answers = f.db.list_answers(first.id)?;
        assert_eq!(answers.len(), 1);
        assert!(answers[0].id > 0);
        assert_eq!(answers[0].session_id, first.id);
        assert_eq!(answers[0].question_id, f.questions[0]);
        assert_eq!(answers[0].user_rating, 4);
        assert_eq!(answers[0].answered_at, now);
        assert!(f.db.list_answers(second.id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_reset_destroys_history() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        let first = start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::Shuffle, now)
            .unwrap()
            .session;
        submit_answer(&f.db, f.user_id, f.set_id, f.questions[0], 2, now).unwrap();

        let second = reset(&f.db, f.user_id, f.set_id, None, now).unwrap().session;
        assert_ne!(first.id, second.id);
        // Mode defaults to the destroyed session's mode.
        assert_eq!(second.mode, StudyMode::Shuffle);
        assert!(f.db.list_answers(first.id)?.is_empty());
        assert!(f.db.list_answers(second.id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_status_without_session_is_idle() -> Fallible<()> {
        let f = fixture()?;
        let s = status(&f.db, f.user_id, f.set_id).unwrap();
        assert!(!s.has_active_session);
        assert!(!s.session_complete);
        assert_eq!(s.progress.total, 3);
        assert_eq!(s.progress.answered, 0);
        Ok(())
    }

    #[test]
    fn test_status_tracks_progress() -> Fallible<()> {
        let f = fixture()?;
        let now = Timestamp::now();
        start_or_resume(&f.db, f.user_id, f.set_id, StudyMode::FrontToEnd, now).unwrap();
        submit_answer(&f.db, f.user_id, f.set_id, f.questions[0], 5, now).unwrap();
        submit_answer(&f.db, f.user_id, f.set_id, f.questions[1], 3, now).unwrap();
        let s = status(&f.db, f.user_id, f.set_id).unwrap();
        assert!(s.has_active_session);
        assert!(!s.session_complete);
        assert_eq!(s.progress.answered, 2);
        assert_eq!(s.progress.mastered, 1);
        assert_eq!(s.progress.points, 8);
        Ok(())
    }
}
