//! # Points Ledger
//!
//! The only code path that changes point totals. Every function takes the
//! caller's open transaction; nothing here commits.
//!
//! ```text
//!  award_points(tx, user, amount, scope, source)
//!     │
//!     ├── profiles.total_points            += amount
//!     ├── leaderboard_entries(user, '', global)        upsert += amount
//!     ├── [community] communities.total_points          += amount
//!     ├── [community] leaderboard_entries(user, c, global) upsert += amount
//!     └── point_events                     append
//! ```
//!
//! All increments are `col = col + ?` so concurrent writers can never lose
//! an update, and leaderboard rows are created by `INSERT .. ON CONFLICT`
//! rather than check-then-insert. The profile and community increments are
//! guarded against passing `i64::MAX`; leaderboard rows are per-user
//! subsets of the profile total and cannot pass it either.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::status::Period;

/// Where an award is attributed. The global scope is always included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointScope<'a> {
    /// Also credit this community
    pub community_id: Option<&'a str>,
}

impl<'a> PointScope<'a> {
    /// Global only.
    pub fn global() -> Self {
        Self { community_id: None }
    }

    /// Global plus the given community (if any).
    pub fn community(community_id: Option<&'a str>) -> Self {
        Self { community_id }
    }
}

/// What caused an award; stored on the journal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardSource<'a> {
    /// A completed challenge
    Challenge(&'a str),
    /// A completed game session
    GameSession(&'a str),
    /// An approved eco-action
    Action(&'a str),
    /// A completed daily task
    Task(&'a str),
}

impl AwardSource<'_> {
    fn kind(&self) -> &'static str {
        match self {
            AwardSource::Challenge(_) => "challenge",
            AwardSource::GameSession(_) => "game_session",
            AwardSource::Action(_) => "action",
            AwardSource::Task(_) => "task",
        }
    }

    fn id(&self) -> &str {
        match self {
            AwardSource::Challenge(id)
            | AwardSource::GameSession(id)
            | AwardSource::Action(id)
            | AwardSource::Task(id) => id,
        }
    }
}

fn row_exists(tx: &Connection, table: &str, id: &str) -> Result<bool> {
    Ok(tx.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", table),
        params![id],
        |row| row.get(0),
    )?)
}

fn counter_overflow(what: &str, id: &str, amount: i64) -> Error {
    Error::InvalidArgument(format!(
        "awarding {} points would overflow the total of {} {}",
        amount, what, id
    ))
}

/// Apply a point award inside `tx`.
///
/// Zero is a no-op. A missing user or community returns `NotFound`, and a
/// total that would pass `i64::MAX` returns `InvalidArgument`, leaving it
/// to the caller's transaction to roll back anything already written.
pub fn award_points(
    tx: &Connection,
    user_id: &str,
    amount: i64,
    scope: PointScope<'_>,
    source: AwardSource<'_>,
    now: i64,
) -> Result<()> {
    if amount < 0 {
        return Err(Error::InvalidArgument(format!(
            "points must be non-negative, got {}",
            amount
        )));
    }
    if amount == 0 {
        return Ok(());
    }

    let updated = tx.execute(
        "UPDATE profiles SET total_points = total_points + ?1, updated_at = ?2
         WHERE id = ?3 AND total_points <= ?4 - ?1",
        params![amount, now, user_id, i64::MAX],
    )?;
    if updated == 0 {
        return Err(if row_exists(tx, "profiles", user_id)? {
            counter_overflow("profile", user_id, amount)
        } else {
            Error::ProfileNotFound(user_id.to_string())
        });
    }
    upsert_entry(tx, user_id, "", Period::Global, amount, now)?;

    if let Some(community_id) = scope.community_id {
        let updated = tx.execute(
            "UPDATE communities SET total_points = total_points + ?1
             WHERE id = ?2 AND total_points <= ?3 - ?1",
            params![amount, community_id, i64::MAX],
        )?;
        if updated == 0 {
            return Err(if row_exists(tx, "communities", community_id)? {
                counter_overflow("community", community_id, amount)
            } else {
                Error::CommunityNotFound(community_id.to_string())
            });
        }
        upsert_entry(tx, user_id, community_id, Period::Global, amount, now)?;
    }

    tx.execute(
        "INSERT INTO point_events (user_id, community_id, amount, source, source_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            scope.community_id,
            amount,
            source.kind(),
            source.id(),
            now
        ],
    )?;

    tracing::info!(
        user_id = user_id,
        amount = amount,
        community_id = scope.community_id.unwrap_or(""),
        source = source.kind(),
        source_id = source.id(),
        "Points awarded"
    );
    Ok(())
}

fn upsert_entry(
    tx: &Connection,
    user_id: &str,
    community_id: &str,
    period: Period,
    amount: i64,
    now: i64,
) -> Result<()> {
    tx.execute(
        "INSERT INTO leaderboard_entries (user_id, community_id, period, points, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(user_id, community_id, period)
         DO UPDATE SET points = points + excluded.points, updated_at = excluded.updated_at",
        params![user_id, community_id, period, amount, now],
    )?;
    Ok(())
}

/// Sum of every journaled award for a user.
pub fn journal_total(conn: &Connection, user_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM point_events WHERE user_id = ?",
        params![user_id],
        |row| row.get(0),
    )?)
}

/// Record qualifying activity for the streak counters.
///
/// Same UTC day: unchanged. The day after the last activity: +1. Any
/// larger gap (or first activity): reset to 1.
pub fn touch_streak(tx: &Connection, user_id: &str, now: i64) -> Result<i64> {
    let today = crate::time::day_number(now);
    let row: Option<(i64, Option<i64>)> = tx
        .query_row(
            "SELECT current_streak, last_active_day FROM profiles WHERE id = ?",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (current, last_day) = row.ok_or_else(|| Error::ProfileNotFound(user_id.to_string()))?;

    let next = match last_day {
        Some(day) if day == today => return Ok(current),
        Some(day) if day + 1 == today => current + 1,
        _ => 1,
    };

    tx.execute(
        "UPDATE profiles
         SET current_streak = ?1,
             longest_streak = MAX(longest_streak, ?1),
             last_active_day = ?2,
             updated_at = ?3
         WHERE id = ?4",
        params![next, today, now, user_id],
    )?;
    tracing::debug!(user_id = user_id, streak = next, "Streak updated");
    Ok(next)
}
