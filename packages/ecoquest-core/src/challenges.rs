//! # Challenge Progress
//!
//! Per-user progress on catalog challenges.
//!
//! ```text
//!   start ──► IN_PROGRESS ──advance──► progress = min(progress + n, max)
//!                                          │
//!                                          └── == max ──► COMPLETED (once)
//!                                                           ├── award challenge.points
//!                                                           ├── ACTIVE sessions → COMPLETED
//!                                                           └── streak
//! ```
//!
//! The completion step is guarded by the status column, so calling
//! `advance` again after completion never re-awards points.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::ledger::{self, AwardSource, PointScope};
use crate::service::EcoService;
use crate::status::{ChallengeStatus, SessionStatus};
use crate::storage::{ChallengeProgressRecord, ChallengeRecord};

/// Result of an `advance` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub progress: ChallengeProgressRecord,
    pub max_progress: i64,
    /// Points granted by this call (0 unless it completed the challenge)
    pub points_awarded: i64,
    pub completed_now: bool,
}

pub(crate) fn load_challenge(conn: &Connection, challenge_id: &str) -> Result<ChallengeRecord> {
    conn.query_row(
        &format!("SELECT {} FROM challenges WHERE id = ?", ChallengeRecord::COLUMNS),
        params![challenge_id],
        ChallengeRecord::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::ChallengeNotFound(challenge_id.to_string()))
}

fn load_progress(
    conn: &Connection,
    user_id: &str,
    challenge_id: &str,
) -> Result<Option<ChallengeProgressRecord>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM challenge_progress WHERE user_id = ? AND challenge_id = ?",
                ChallengeProgressRecord::COLUMNS
            ),
            params![user_id, challenge_id],
            ChallengeProgressRecord::from_row,
        )
        .optional()?)
}

/// Apply an advance inside `tx`. Completion pays out exactly once.
pub(crate) fn advance_progress(
    tx: &Connection,
    user_id: &str,
    challenge_id: &str,
    increment: i64,
    now: i64,
) -> Result<AdvanceOutcome> {
    let challenge = load_challenge(tx, challenge_id)?;
    let current = load_progress(tx, user_id, challenge_id)?
        .ok_or(Error::ChallengeNotStarted)?;

    if current.status == ChallengeStatus::Completed {
        return Ok(AdvanceOutcome {
            progress: current,
            max_progress: challenge.max_progress,
            points_awarded: 0,
            completed_now: false,
        });
    }

    tx.execute(
        "UPDATE challenge_progress SET progress = MIN(progress + ?1, ?2)
         WHERE user_id = ?3 AND challenge_id = ?4 AND status = ?5",
        params![
            increment,
            challenge.max_progress,
            user_id,
            challenge_id,
            ChallengeStatus::InProgress
        ],
    )?;
    let mut progress = load_progress(tx, user_id, challenge_id)?
        .ok_or_else(|| Error::Internal("progress row vanished".into()))?;

    let mut points_awarded = 0;
    let mut completed_now = false;
    if progress.progress >= challenge.max_progress {
        if !progress.status.can_transition_to(ChallengeStatus::Completed) {
            return Err(Error::InvalidTransition {
                entity: "challenge progress",
                from: progress.status.to_string(),
                to: ChallengeStatus::Completed.to_string(),
            });
        }
        tx.execute(
            "UPDATE challenge_progress SET status = ?, completed_at = ?
             WHERE user_id = ? AND challenge_id = ?",
            params![ChallengeStatus::Completed, now, user_id, challenge_id],
        )?;
        ledger::award_points(
            tx,
            user_id,
            challenge.points,
            PointScope::global(),
            AwardSource::Challenge(challenge_id),
            now,
        )?;
        let sessions = tx.execute(
            "UPDATE game_sessions SET status = ?, ended_at = ?
             WHERE user_id = ? AND challenge_id = ? AND status = ?",
            params![
                SessionStatus::Completed,
                now,
                user_id,
                challenge_id,
                SessionStatus::Active
            ],
        )?;
        ledger::touch_streak(tx, user_id, now)?;

        tracing::info!(
            user_id = user_id,
            challenge_id = challenge_id,
            points = challenge.points,
            sessions_closed = sessions,
            "Challenge completed"
        );
        progress.status = ChallengeStatus::Completed;
        progress.completed_at = Some(now);
        points_awarded = challenge.points;
        completed_now = true;
    }

    Ok(AdvanceOutcome {
        progress,
        max_progress: challenge.max_progress,
        points_awarded,
        completed_now,
    })
}

impl EcoService {
    /// List the challenge catalog.
    pub fn list_challenges(&self, active_only: bool) -> Result<Vec<ChallengeRecord>> {
        self.db().read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM challenges WHERE is_active = 1 OR ?1 = 0 ORDER BY points, title",
                ChallengeRecord::COLUMNS
            ))?;
            let rows = stmt.query_map(params![active_only], ChallengeRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Get one challenge.
    pub fn get_challenge(&self, challenge_id: &str) -> Result<ChallengeRecord> {
        self.db().read(|conn| load_challenge(conn, challenge_id))
    }

    /// All progress records for a user.
    pub fn list_progress(&self, user_id: &str) -> Result<Vec<ChallengeProgressRecord>> {
        self.db().read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM challenge_progress WHERE user_id = ? ORDER BY started_at, id",
                ChallengeProgressRecord::COLUMNS
            ))?;
            let rows = stmt.query_map(params![user_id], ChallengeProgressRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Start a challenge.
    ///
    /// Creates the progress record if absent. Starting again returns the
    /// existing record untouched: progress and `started_at` are kept.
    pub fn start_challenge(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<ChallengeProgressRecord> {
        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            crate::profiles::load_profile(tx, user_id)?;
            let challenge = load_challenge(tx, challenge_id)?;

            if let Some(existing) = load_progress(tx, user_id, challenge_id)? {
                return Ok(existing);
            }
            if !challenge.is_active {
                return Err(Error::InvalidArgument(format!(
                    "challenge {} is not active",
                    challenge_id
                )));
            }

            debug_assert!(ChallengeStatus::NotStarted.can_transition_to(ChallengeStatus::InProgress));
            tx.execute(
                "INSERT INTO challenge_progress (user_id, challenge_id, status, progress, started_at)
                 VALUES (?, ?, ?, 0, ?)
                 ON CONFLICT(user_id, challenge_id) DO NOTHING",
                params![user_id, challenge_id, ChallengeStatus::InProgress, now],
            )?;
            tracing::info!(user_id = user_id, challenge_id = challenge_id, "Challenge started");

            load_progress(tx, user_id, challenge_id)?
                .ok_or_else(|| Error::Internal("progress row missing after insert".into()))
        })
    }

    /// Advance progress on a started challenge.
    pub fn advance_challenge(
        &self,
        user_id: &str,
        challenge_id: &str,
        increment: i64,
    ) -> Result<AdvanceOutcome> {
        if increment < 1 {
            return Err(Error::InvalidArgument(format!(
                "increment must be at least 1, got {}",
                increment
            )));
        }

        let now = crate::time::now_timestamp();
        let outcome = self
            .db()
            .write(|tx| advance_progress(tx, user_id, challenge_id, increment, now))?;

        if outcome.completed_now {
            self.refresh_badges(user_id);
        }
        Ok(outcome)
    }
}
