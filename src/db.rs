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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;

use crate::error::Fallible;
use crate::types::answer::SessionAnswer;
use crate::types::mode::StudyMode;
use crate::types::phase::TimerEventType;
use crate::types::phase::TimerPhase;
use crate::types::question::Question;
use crate::types::session::StudySession;
use crate::types::timer::TimerEvent;
use crate::types::timer::TimerSession;
use crate::types::timestamp::Timestamp;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

pub struct User {
    pub user_id: i64,
    pub name: String,
}

/// Fields of a new timer row. The remaining columns start at their zero
/// values.
pub struct InsertTimer {
    pub deck_session_id: i64,
    pub user_id: i64,
    pub work_duration: i64,
    pub rest_duration: i64,
    pub is_infinite: bool,
    pub started_at: Timestamp,
}

/// Fields of a new timer event row.
pub struct InsertTimerEvent {
    pub timer_session_id: i64,
    pub event_type: TimerEventType,
    pub from_phase: Option<TimerPhase>,
    pub to_phase: Option<TimerPhase>,
    pub duration: i64,
    pub created_at: Timestamp,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    pub fn create_user(&self, name: &str, api_token: &str) -> Fallible<i64> {
        let conn = self.acquire();
        let sql = "insert into users (name, api_token) values (?, ?) returning user_id;";
        let user_id: i64 = conn.query_row(sql, (name, api_token), |row| row.get(0))?;
        Ok(user_id)
    }

    pub fn find_user_by_token(&self, api_token: &str) -> Fallible<Option<User>> {
        let conn = self.acquire();
        let sql = "select user_id, name from users where api_token = ?;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([api_token])?;
        if let Some(row) = rows.next()? {
            Ok(Some(User {
                user_id: row.get(0)?,
                name: row.get(1)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn find_user_by_name(&self, name: &str) -> Fallible<Option<User>> {
        let conn = self.acquire();
        let sql = "select user_id, name from users where name = ?;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            Ok(Some(User {
                user_id: row.get(0)?,
                name: row.get(1)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn create_question_set(&self, user_id: i64, name: &str) -> Fallible<i64> {
        let conn = self.acquire();
        let sql = "insert into question_sets (user_id, name) values (?, ?) returning question_set_id;";
        let set_id: i64 = conn.query_row(sql, (user_id, name), |row| row.get(0))?;
        Ok(set_id)
    }

    pub fn question_set_exists(&self, user_id: i64, question_set_id: i64) -> Fallible<bool> {
        let conn = self.acquire();
        let sql = "select count(*) from question_sets where question_set_id = ? and user_id = ?;";
        let count: i64 = conn.query_row(sql, (question_set_id, user_id), |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn create_question(
        &self,
        question_set_id: i64,
        text: &str,
        answer: Option<&str>,
        difficulty: i64,
    ) -> Fallible<i64> {
        let conn = self.acquire();
        let sql = "insert into questions (question_set_id, question, answer, difficulty) values (?, ?, ?, ?) returning question_id;";
        let question_id: i64 =
            conn.query_row(sql, (question_set_id, text, answer, difficulty), |row| {
                row.get(0)
            })?;
        Ok(question_id)
    }

    /// All questions of a set, in creation order.
    pub fn list_questions(&self, question_set_id: i64) -> Fallible<Vec<Question>> {
        let conn = self.acquire();
        let sql = "select question_id, question_set_id, question, answer, difficulty from questions where question_set_id = ? order by question_id;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([question_set_id])?;
        let mut questions = Vec::new();
        while let Some(row) = rows.next()? {
            questions.push(read_question(row)?);
        }
        Ok(questions)
    }

    pub fn get_question(&self, question_id: i64) -> Fallible<Option<Question>> {
        let conn = self.acquire();
        let sql = "select question_id, question_set_id, question, answer, difficulty from questions where question_id = ?;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([question_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(read_question(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn find_active_session(
        &self,
        user_id: i64,
        question_set_id: i64,
    ) -> Fallible<Option<StudySession>> {
        let conn = self.acquire();
        let sql = "select session_id, user_id, question_set_id, mode, started_at, completed_at from study_sessions where user_id = ? and question_set_id = ? and completed_at is null;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query((user_id, question_set_id))?;
        if let Some(row) = rows.next()? {
            Ok(Some(read_session(row)?))
        } else {
            Ok(None)
        }
    }

    /// The session most recently started for this (user, set), active or
    /// not.
    pub fn find_latest_session(
        &self,
        user_id: i64,
        question_set_id: i64,
    ) -> Fallible<Option<StudySession>> {
        let conn = self.acquire();
        let sql = "select session_id, user_id, question_set_id, mode, started_at, completed_at from study_sessions where user_id = ? and question_set_id = ? order by session_id desc limit 1;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query((user_id, question_set_id))?;
        if let Some(row) = rows.next()? {
            Ok(Some(read_session(row)?))
        } else {
            Ok(None)
        }
    }

    /// Find the active session for (user, set), or create one with the
    /// given mode. Returns the session and whether it was created.
    ///
    /// A partial unique index guards against concurrent duplicate calls: if
    /// the insert loses the race, the winner's row is returned instead.
    pub fn find_or_create_active_session(
        &self,
        user_id: i64,
        question_set_id: i64,
        mode: StudyMode,
        started_at: Timestamp,
    ) -> Fallible<(StudySession, bool)> {
        if let Some(session) = self.find_active_session(user_id, question_set_id)? {
            return Ok((session, false));
        }
        let insert = {
            let conn = self.acquire();
            let sql = "insert into study_sessions (user_id, question_set_id, mode, started_at) values (?, ?, ?, ?) returning session_id;";
            conn.query_row(sql, (user_id, question_set_id, mode, started_at), |row| {
                row.get::<_, i64>(0)
            })
        };
        match insert {
            Ok(session_id) => Ok((
                StudySession {
                    id: session_id,
                    user_id,
                    question_set_id,
                    mode,
                    started_at,
                    completed_at: None,
                },
                true,
            )),
            Err(err) if is_unique_violation(&err) => {
                // Lost the race against a concurrent start. Observe the
                // winner's row.
                log::debug!("Concurrent session start for set {question_set_id}, resuming winner");
                match self.find_active_session(user_id, question_set_id)? {
                    Some(session) => Ok((session, false)),
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn complete_session(&self, session_id: i64, completed_at: Timestamp) -> Fallible<()> {
        let conn = self.acquire();
        let sql = "update study_sessions set completed_at = ? where session_id = ? and completed_at is null;";
        conn.execute(sql, (completed_at, session_id))?;
        Ok(())
    }

    /// Hard-delete a session, cascading its answers, timer sessions, and
    /// timer events.
    pub fn delete_session(&self, session_id: i64) -> Fallible<()> {
        let conn = self.acquire();
        let sql = "delete from study_sessions where session_id = ?;";
        conn.execute(sql, [session_id])?;
        Ok(())
    }

    pub fn insert_answer(
        &self,
        session_id: i64,
        question_id: i64,
        user_rating: i64,
        answered_at: Timestamp,
    ) -> Fallible<i64> {
        let conn = self.acquire();
        let sql = "insert into session_answers (session_id, question_id, user_rating, answered_at) values (?, ?, ?, ?) returning answer_id;";
        let answer_id: i64 = conn.query_row(
            sql,
            (session_id, question_id, user_rating, answered_at),
            |row| row.get(0),
        )?;
        Ok(answer_id)
    }

    /// A session's answers in submission order.
    pub fn list_answers(&self, session_id: i64) -> Fallible<Vec<SessionAnswer>> {
        let conn = self.acquire();
        let sql = "select answer_id, session_id, question_id, user_rating, answered_at from session_answers where session_id = ? order by answer_id;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([session_id])?;
        let mut answers = Vec::new();
        while let Some(row) = rows.next()? {
            answers.push(SessionAnswer {
                id: row.get(0)?,
                session_id: row.get(1)?,
                question_id: row.get(2)?,
                user_rating: row.get(3)?,
                answered_at: row.get(4)?,
            });
        }
        Ok(answers)
    }

    pub fn find_active_timer(&self, deck_session_id: i64) -> Fallible<Option<TimerSession>> {
        let conn = self.acquire();
        let sql = "select timer_session_id, deck_session_id, user_id, work_duration, rest_duration, is_infinite, total_work_time, total_rest_time, cycles_completed, current_phase, previous_phase, elapsed_in_phase, phase_started_at, started_at, completed_at from timer_sessions where deck_session_id = ? and completed_at is null;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([deck_session_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(read_timer(row)?))
        } else {
            Ok(None)
        }
    }

    /// Insert a fresh timer row in the `work` phase, together with its
    /// `start` event, in one transaction. Timer writes never touch deck
    /// tables. Returns the row and whether it was created.
    ///
    /// A partial unique index guards against concurrent duplicate calls: if
    /// the insert loses the race, the winner's row is returned instead.
    pub fn insert_timer(&self, timer: &InsertTimer) -> Fallible<(TimerSession, bool)> {
        let race = {
            let mut conn = self.acquire();
            let tx = conn.transaction()?;
            let sql = "insert into timer_sessions (deck_session_id, user_id, work_duration, rest_duration, is_infinite, current_phase, phase_started_at, started_at) values (?, ?, ?, ?, ?, ?, ?, ?) returning timer_session_id;";
            let insert = tx.query_row(
                sql,
                (
                    timer.deck_session_id,
                    timer.user_id,
                    timer.work_duration,
                    timer.rest_duration,
                    timer.is_infinite,
                    TimerPhase::Work,
                    timer.started_at,
                    timer.started_at,
                ),
                |row| row.get::<_, i64>(0),
            );
            match insert {
                Ok(timer_session_id) => {
                    insert_timer_event(
                        &tx,
                        &InsertTimerEvent {
                            timer_session_id,
                            event_type: TimerEventType::Start,
                            from_phase: None,
                            to_phase: Some(TimerPhase::Work),
                            duration: 0,
                            created_at: timer.started_at,
                        },
                    )?;
                    tx.commit()?;
                    return Ok((
                        TimerSession {
                            id: timer_session_id,
                            deck_session_id: timer.deck_session_id,
                            user_id: timer.user_id,
                            work_duration: timer.work_duration,
                            rest_duration: timer.rest_duration,
                            is_infinite: timer.is_infinite,
                            total_work_time: 0,
                            total_rest_time: 0,
                            cycles_completed: 0,
                            current_phase: TimerPhase::Work,
                            previous_phase: None,
                            elapsed_in_phase: 0,
                            phase_started_at: Some(timer.started_at),
                            started_at: timer.started_at,
                            completed_at: None,
                        },
                        true,
                    ));
                }
                Err(err) if is_unique_violation(&err) => err,
                Err(err) => return Err(err.into()),
            }
        };
        // Lost the race against a concurrent start. Observe the winner's
        // row.
        log::debug!(
            "Concurrent timer start for session {}, resuming winner",
            timer.deck_session_id
        );
        match self.find_active_timer(timer.deck_session_id)? {
            Some(winner) => Ok((winner, false)),
            None => Err(race.into()),
        }
    }

    /// Write back a timer row's mutable columns and append the transition's
    /// audit events, in one transaction.
    pub fn update_timer(&self, timer: &TimerSession, events: &[InsertTimerEvent]) -> Fallible<()> {
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        let sql = "update timer_sessions set work_duration = ?, rest_duration = ?, is_infinite = ?, total_work_time = ?, total_rest_time = ?, cycles_completed = ?, current_phase = ?, previous_phase = ?, elapsed_in_phase = ?, phase_started_at = ?, completed_at = ? where timer_session_id = ?;";
        tx.execute(
            sql,
            (
                timer.work_duration,
                timer.rest_duration,
                timer.is_infinite,
                timer.total_work_time,
                timer.total_rest_time,
                timer.cycles_completed,
                timer.current_phase,
                timer.previous_phase,
                timer.elapsed_in_phase,
                timer.phase_started_at,
                timer.completed_at,
                timer.id,
            ),
        )?;
        for event in events {
            insert_timer_event(&tx, event)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// A timer's audit log in emission order.
    pub fn list_timer_events(&self, timer_session_id: i64) -> Fallible<Vec<TimerEvent>> {
        let conn = self.acquire();
        let sql = "select timer_event_id, timer_session_id, event_type, from_phase, to_phase, duration, created_at from timer_events where timer_session_id = ? order by timer_event_id;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([timer_session_id])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(TimerEvent {
                id: row.get(0)?,
                timer_session_id: row.get(1)?,
                event_type: row.get(2)?,
                from_phase: row.get(3)?,
                to_phase: row.get(4)?,
                duration: row.get(5)?,
                created_at: row.get(6)?,
            });
        }
        Ok(events)
    }

    fn acquire(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

fn read_question(row: &rusqlite::Row) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        question_set_id: row.get(1)?,
        text: row.get(2)?,
        answer: row.get(3)?,
        difficulty: row.get(4)?,
    })
}

fn read_session(row: &rusqlite::Row) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        question_set_id: row.get(2)?,
        mode: row.get(3)?,
        started_at: row.get(4)?,
        completed_at: row.get(5)?,
    })
}

fn read_timer(row: &rusqlite::Row) -> rusqlite::Result<TimerSession> {
    Ok(TimerSession {
        id: row.get(0)?,
        deck_session_id: row.get(1)?,
        user_id: row.get(2)?,
        work_duration: row.get(3)?,
        rest_duration: row.get(4)?,
        is_infinite: row.get(5)?,
        total_work_time: row.get(6)?,
        total_rest_time: row.get(7)?,
        cycles_completed: row.get(8)?,
        current_phase: row.get(9)?,
        previous_phase: row.get(10)?,
        elapsed_in_phase: row.get(11)?,
        phase_started_at: row.get(12)?,
        started_at: row.get(13)?,
        completed_at: row.get(14)?,
    })
}

fn insert_timer_event(tx: &Transaction, event: &InsertTimerEvent) -> Fallible<i64> {
    let sql = "insert into timer_events (timer_session_id, event_type, from_phase, to_phase, duration, created_at) values (?, ?, ?, ?, ?, ?) returning timer_event_id;";
    let event_id: i64 = tx.query_row(
        sql,
        (
            event.timer_session_id,
            event.event_type,
            event.from_phase,
            event.to_phase,
            event.duration,
            event.created_at,
        ),
        |row| row.get(0),
    )?;
    Ok(event_id)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
        }
        _ => false,
    }
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["users"], |row| row.get(0))?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fallible;

    fn test_db() -> Fallible<(tempfile::TempDir, Database)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.sqlite3");
        let db = Database::new(path.to_str().unwrap())?;
        Ok((dir, db))
    }

    #[test]
    fn test_schema_bootstrap_is_idempotent() -> Fallible<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.sqlite3");
        let path = path.to_str().unwrap();
        Database::new(path)?;
        Database::new(path)?;
        Ok(())
    }

    #[test]
    fn test_user_token_lookup() -> Fallible<()> {
        let (_dir, db) = test_db()?;
        let user_id = db.create_user("alice", "tok-alice")?;
        let found = db.find_user_by_token("tok-alice")?.unwrap();
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.name, "alice");
        assert!(db.find_user_by_token("tok-bob")?.is_none());
        Ok(())
    }

    #[test]
    fn test_single_active_session_index() -> Fallible<()> {
        let (_dir, db) = test_db()?;
        let user_id = db.create_user("alice", "tok")?;
        let set_id = db.create_question_set(user_id, "geography")?;
        let now = Timestamp::now();
        let (first, created) =
            db.find_or_create_active_session(user_id, set_id, StudyMode::Shuffle, now)?;
        assert!(created);
        let (second, created) =
            db.find_or_create_active_session(user_id, set_id, StudyMode::FrontToEnd, now)?;
        assert!(!created);
        assert_eq!(first.id, second.id);
        // The mode of the existing session is not overwritten.
        assert_eq!(second.mode, StudyMode::Shuffle);
        assert_eq!(second.user_id, user_id);
        assert!(second.completed_at.is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_timer_insert_returns_winner() -> Fallible<()> {
        let (_dir, db) = test_db()?;
        let user_id = db.create_user("alice", "tok")?;
        let set_id = db.create_question_set(user_id, "geography")?;
        let now = Timestamp::now();
        let (session, _) =
            db.find_or_create_active_session(user_id, set_id, StudyMode::FrontToEnd, now)?;
        let insert = InsertTimer {
            deck_session_id: session.id,
            user_id,
            work_duration: 1500,
            rest_duration: 300,
            is_infinite: false,
            started_at: now,
        };
        let (first, created) = db.insert_timer(&insert)?;
        assert!(created);
        // The unique index rejects the duplicate; the winner's row is
        // returned instead of the constraint error.
        let (second, created) = db.insert_timer(&insert)?;
        assert!(!created);
        assert_eq!(first.id, second.id);
        // Only the winner's start event was written.
        let events = db.list_timer_events(first.id)?;
        assert_eq!(events.len(), 1);
        assert!(events[0].id > 0);
        assert_eq!(events[0].timer_session_id, first.id);
        Ok(())
    }

    #[test]
    fn test_delete_session_cascades() -> Fallible<()> {
        let (_dir, db) = test_db()?;
        let user_id = db.create_user("alice", "tok")?;
        let set_id = db.create_question_set(user_id, "geography")?;
        let q = db.create_question(set_id, "Capital of France?", Some("Paris"), 2)?;
        let now = Timestamp::now();
        let (session, _) =
            db.find_or_create_active_session(user_id, set_id, StudyMode::FrontToEnd, now)?;
        db.insert_answer(session.id, q, 3, now)?;
        let (timer, _) = db.insert_timer(&InsertTimer {
            deck_session_id: session.id,
            user_id,
            work_duration: 1500,
            rest_duration: 300,
            is_infinite: false,
            started_at: now,
        })?;
        db.delete_session(session.id)?;
        assert!(db.list_answers(session.id)?.is_empty());
        assert!(db.find_active_timer(session.id)?.is_none());
        assert!(db.list_timer_events(timer.id)?.is_empty());
        Ok(())
    }
}
