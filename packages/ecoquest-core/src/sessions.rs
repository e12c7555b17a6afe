//! # Game Sessions
//!
//! One record per play of a mini-game. A session moves out of ACTIVE
//! exactly once; completing it with a positive score is a point award.
//! A session tied to a started challenge also advances that challenge by
//! one step in the same transaction.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::ledger::{self, AwardSource, PointScope};
use crate::service::{generate_id, EcoService};
use crate::status::{GameType, SessionStatus};
use crate::storage::GameSessionRecord;

fn load_session(conn: &Connection, session_id: &str) -> Result<GameSessionRecord> {
    conn.query_row(
        &format!("SELECT {} FROM game_sessions WHERE id = ?", GameSessionRecord::COLUMNS),
        params![session_id],
        GameSessionRecord::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
}

/// Fetch a session owned by `user_id` that may still move to `next`.
fn load_transitionable(
    conn: &Connection,
    user_id: &str,
    session_id: &str,
    next: SessionStatus,
) -> Result<GameSessionRecord> {
    let session = load_session(conn, session_id)?;
    if session.user_id != user_id {
        return Err(Error::NotOwner("game session"));
    }
    if !session.status.can_transition_to(next) {
        return Err(Error::AlreadyFinished);
    }
    Ok(session)
}

impl EcoService {
    /// Begin a new play.
    pub fn start_session(
        &self,
        user_id: &str,
        game_type: GameType,
        challenge_id: Option<&str>,
    ) -> Result<GameSessionRecord> {
        let now = crate::time::now_timestamp();
        let id = generate_id();
        self.db().write(|tx| {
            crate::profiles::load_profile(tx, user_id)?;
            if let Some(challenge_id) = challenge_id {
                crate::challenges::load_challenge(tx, challenge_id)?;
            }
            tx.execute(
                "INSERT INTO game_sessions (id, user_id, game_type, challenge_id, status, score, started_at)
                 VALUES (?, ?, ?, ?, ?, 0, ?)",
                params![id, user_id, game_type, challenge_id, SessionStatus::Active, now],
            )?;
            tracing::debug!(user_id = user_id, session_id = id.as_str(), game = %game_type, "Game session started");
            load_session(tx, &id)
        })
    }

    /// Get a session by id.
    pub fn get_session(&self, session_id: &str) -> Result<GameSessionRecord> {
        self.db().read(|conn| load_session(conn, session_id))
    }

    /// Finish a session with a score.
    ///
    /// A positive score is credited once, on this transition. Scores above
    /// the configured maximum are rejected.
    pub fn complete_session(
        &self,
        user_id: &str,
        session_id: &str,
        score: i64,
    ) -> Result<GameSessionRecord> {
        let max_score = self.rules().max_session_score;
        if !(0..=max_score).contains(&score) {
            return Err(Error::InvalidArgument(format!(
                "score must be within 0..={}, got {}",
                max_score, score
            )));
        }

        let now = crate::time::now_timestamp();
        let (session, challenge_completed) = self.db().write(|tx| {
            let session = load_transitionable(tx, user_id, session_id, SessionStatus::Completed)?;

            let updated = tx.execute(
                "UPDATE game_sessions SET status = ?, score = ?, ended_at = ?
                 WHERE id = ? AND status = ?",
                params![
                    SessionStatus::Completed,
                    score,
                    now,
                    session_id,
                    SessionStatus::Active
                ],
            )?;
            if updated == 0 {
                return Err(Error::AlreadyFinished);
            }

            if score > 0 {
                ledger::award_points(
                    tx,
                    user_id,
                    score,
                    PointScope::global(),
                    AwardSource::GameSession(session_id),
                    now,
                )?;
                ledger::touch_streak(tx, user_id, now)?;
            }
            tracing::info!(user_id = user_id, session_id = session_id, score = score, "Game session completed");

            let mut challenge_completed = false;
            if let Some(challenge_id) = session.challenge_id.as_deref() {
                match crate::challenges::advance_progress(tx, user_id, challenge_id, 1, now) {
                    Ok(outcome) => challenge_completed = outcome.completed_now,
                    Err(Error::ChallengeNotStarted) => {
                        tracing::debug!(
                            user_id = user_id,
                            challenge_id = challenge_id,
                            "Linked challenge not started; progress unchanged"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            Ok((load_session(tx, session_id)?, challenge_completed))
        })?;

        if score > 0 || challenge_completed {
            self.refresh_badges(user_id);
        }
        Ok(session)
    }

    /// Give up on a session. No points.
    pub fn abandon_session(&self, user_id: &str, session_id: &str) -> Result<GameSessionRecord> {
        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            load_transitionable(tx, user_id, session_id, SessionStatus::Abandoned)?;
            tx.execute(
                "UPDATE game_sessions SET status = ?, ended_at = ? WHERE id = ? AND status = ?",
                params![SessionStatus::Abandoned, now, session_id, SessionStatus::Active],
            )?;
            tracing::debug!(user_id = user_id, session_id = session_id, "Game session abandoned");
            load_session(tx, session_id)
        })
    }
}
