//! # Leaderboard Query
//!
//! Two read paths:
//!
//! - period modes (`global`, `weekly`, `monthly`) read `leaderboard_entries`
//!   for one (period, scope), ties in insertion order;
//! - `all_time` reads `profiles.total_points` directly, so it is never
//!   behind the periodic rollup.
//!
//! The caller's rank is reported only when they appear in the window.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};
use crate::error::{Error, Result};
use crate::service::EcoService;
use crate::status::Period;

/// Which ranking to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardMode {
    /// Aggregate rows for one period
    Period(Period),
    /// Live profile totals
    AllTime,
}

impl Default for LeaderboardMode {
    fn default() -> Self {
        LeaderboardMode::Period(Period::Global)
    }
}

impl FromStr for LeaderboardMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all_time" => Ok(LeaderboardMode::AllTime),
            other => Ok(LeaderboardMode::Period(other.parse()?)),
        }
    }
}

impl fmt::Display for LeaderboardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardMode::Period(period) => fmt::Display::fmt(period, f),
            LeaderboardMode::AllTime => f.write_str("all_time"),
        }
    }
}

impl Serialize for LeaderboardMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One ranked row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// 1-based
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub points: i64,
}

/// A leaderboard page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    pub mode: LeaderboardMode,
    pub community_id: Option<String>,
    pub entries: Vec<RankedEntry>,
    /// The caller's rank if they are inside `entries`
    pub my_rank: Option<u32>,
}

fn resolve_limit(limit: Option<u32>) -> Result<u32> {
    let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    if limit == 0 || limit > MAX_LEADERBOARD_LIMIT {
        return Err(Error::InvalidArgument(format!(
            "limit must be within 1..={}, got {}",
            MAX_LEADERBOARD_LIMIT, limit
        )));
    }
    Ok(limit)
}

fn query_ranked(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<RankedEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok(RankedEntry {
            rank: 0,
            user_id: row.get(0)?,
            display_name: row.get(1)?,
            avatar_url: row.get(2)?,
            points: row.get(3)?,
        })
    })?;
    let mut entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    Ok(entries)
}

impl EcoService {
    /// Read a ranked leaderboard page.
    ///
    /// `all_time` with a community reads that community's global rows,
    /// since profile totals are not split by community.
    pub fn get_leaderboard(
        &self,
        caller_id: Option<&str>,
        mode: LeaderboardMode,
        community_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<LeaderboardView> {
        let limit = resolve_limit(limit)?;
        let entries = self.db().read(|conn| {
            if let Some(community_id) = community_id {
                crate::communities::load_community(conn, community_id)?;
            }
            match (mode, community_id) {
                (LeaderboardMode::AllTime, None) => query_ranked(
                    conn,
                    "SELECT id, display_name, avatar_url, total_points FROM profiles
                     ORDER BY total_points DESC, rowid
                     LIMIT ?",
                    params![limit],
                ),
                (LeaderboardMode::AllTime, Some(community_id)) => {
                    period_entries(conn, Period::Global, community_id, limit)
                }
                (LeaderboardMode::Period(period), scope) => {
                    period_entries(conn, period, scope.unwrap_or(""), limit)
                }
            }
        })?;

        let my_rank = caller_id.and_then(|caller| {
            entries
                .iter()
                .find(|entry| entry.user_id == caller)
                .map(|entry| entry.rank)
        });

        Ok(LeaderboardView {
            mode,
            community_id: community_id.map(str::to_string),
            entries,
            my_rank,
        })
    }
}

fn period_entries(
    conn: &Connection,
    period: Period,
    scope: &str,
    limit: u32,
) -> Result<Vec<RankedEntry>> {
    query_ranked(
        conn,
        "SELECT e.user_id, p.display_name, p.avatar_url, e.points
         FROM leaderboard_entries e
         JOIN profiles p ON p.id = e.user_id
         WHERE e.period = ? AND e.community_id = ? AND e.points > 0
         ORDER BY e.points DESC, e.id
         LIMIT ?",
        params![period, scope, limit],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("all_time".parse::<LeaderboardMode>().unwrap(), LeaderboardMode::AllTime);
        assert_eq!(
            "weekly".parse::<LeaderboardMode>().unwrap(),
            LeaderboardMode::Period(Period::Weekly)
        );
        assert!("yearly".parse::<LeaderboardMode>().is_err());
        assert_eq!(LeaderboardMode::default().to_string(), "global");
    }

    #[test]
    fn test_global_ranking_and_my_rank() {
        let service = service();
        for (id, points) in [("a", 30), ("b", 50), ("c", 10)] {
            user(&service, id);
            grant_points(&service, id, points);
        }

        let view = service
            .get_leaderboard(Some("a"), LeaderboardMode::default(), None, None)
            .unwrap();
        let order: Vec<(&str, u32)> = view
            .entries
            .iter()
            .map(|e| (e.user_id.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("b", 1), ("a", 2), ("c", 3)]);
        assert_eq!(view.my_rank, Some(2));
        assert_eq!(view.entries[0].display_name, "User b");

        let top1 = service
            .get_leaderboard(Some("a"), LeaderboardMode::default(), None, Some(1))
            .unwrap();
        assert_eq!(top1.entries.len(), 1);
        assert_eq!(top1.my_rank, None);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let service = service();
        for id in ["first", "second"] {
            user(&service, id);
        }
        grant_points(&service, "second", 20);
        grant_points(&service, "first", 20);

        let period = service
            .get_leaderboard(None, LeaderboardMode::default(), None, None)
            .unwrap();
        assert_eq!(period.entries[0].user_id, "second");

        let all_time = service
            .get_leaderboard(None, LeaderboardMode::AllTime, None, None)
            .unwrap();
        assert_eq!(all_time.entries[0].user_id, "first");
    }

    #[test]
    fn test_all_time_includes_users_without_entries() {
        let service = service();
        user(&service, "fresh");
        let view = service
            .get_leaderboard(Some("fresh"), LeaderboardMode::AllTime, None, None)
            .unwrap();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].points, 0);
        assert_eq!(view.my_rank, Some(1));

        let period = service
            .get_leaderboard(Some("fresh"), LeaderboardMode::default(), None, None)
            .unwrap();
        assert!(period.entries.is_empty());
        assert_eq!(period.my_rank, None);
    }

    #[test]
    fn test_limit_bounds() {
        let service = service();
        assert!(matches!(
            service.get_leaderboard(None, LeaderboardMode::AllTime, None, Some(0)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            service.get_leaderboard(None, LeaderboardMode::AllTime, None, Some(101)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(service
            .get_leaderboard(None, LeaderboardMode::AllTime, None, Some(100))
            .is_ok());
        assert!(matches!(
            service.get_leaderboard(None, LeaderboardMode::AllTime, Some("missing"), None),
            Err(Error::CommunityNotFound(_))
        ));
    }
}
