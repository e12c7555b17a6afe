//! # Period Rollup
//!
//! Weekly and monthly leaderboard rows are derived data: each run replaces
//! them with sums over the `point_events` journal for the current ISO week
//! and calendar month. Rows are inserted in order of each user's earliest
//! award in the window, which keeps tie order stable.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::service::EcoService;
use crate::status::Period;

/// Row counts written by one rollup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupSummary {
    pub weekly_rows: usize,
    pub monthly_rows: usize,
}

fn rebuild_period(tx: &Connection, period: Period, since: i64, now: i64) -> Result<usize> {
    tx.execute(
        "DELETE FROM leaderboard_entries WHERE period = ?",
        params![period],
    )?;

    let global = tx.execute(
        "INSERT INTO leaderboard_entries (user_id, community_id, period, points, created_at, updated_at)
         SELECT user_id, '', ?1, SUM(amount), ?3, ?3
         FROM point_events
         WHERE created_at >= ?2
         GROUP BY user_id
         ORDER BY MIN(id)",
        params![period, since, now],
    )?;

    let community = tx.execute(
        "INSERT INTO leaderboard_entries (user_id, community_id, period, points, created_at, updated_at)
         SELECT user_id, community_id, ?1, SUM(amount), ?3, ?3
         FROM point_events
         WHERE created_at >= ?2 AND community_id IS NOT NULL AND community_id != ''
         GROUP BY user_id, community_id
         ORDER BY MIN(id)",
        params![period, since, now],
    )?;

    Ok(global + community)
}

impl EcoService {
    /// Recompute the weekly and monthly leaderboards as of `now`.
    pub fn rollup_periods(&self, now: i64) -> Result<RollupSummary> {
        let summary = self.db().write(|tx| {
            Ok(RollupSummary {
                weekly_rows: rebuild_period(tx, Period::Weekly, crate::time::week_start(now), now)?,
                monthly_rows: rebuild_period(tx, Period::Monthly, crate::time::month_start(now), now)?,
            })
        })?;
        tracing::info!(
            weekly_rows = summary.weekly_rows,
            monthly_rows = summary.monthly_rows,
            "Leaderboard periods rolled up"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::LeaderboardMode;
    use crate::service::test_support::*;

    const FRIDAY_NOON: i64 = 1_792_152_000;

    fn journal(service: &EcoService, user_id: &str, community: Option<&str>, amount: i64, at: i64) {
        service
            .db()
            .write(|tx| {
                tx.execute(
                    "INSERT INTO point_events (user_id, community_id, amount, source, source_id, created_at)
                     VALUES (?, ?, ?, 'task', 'fixture', ?)",
                    params![user_id, community, amount, at],
                )?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_rollup_windows() {
        let service = service();
        user(&service, "a");
        user(&service, "b");

        let week = crate::time::week_start(FRIDAY_NOON);
        let month = crate::time::month_start(FRIDAY_NOON);
        journal(&service, "a", None, 10, FRIDAY_NOON - 3600);
        journal(&service, "b", None, 40, week - 1);
        journal(&service, "a", None, 5, month - 1);

        let summary = service.rollup_periods(FRIDAY_NOON).unwrap();
        assert_eq!(summary.weekly_rows, 1);
        assert_eq!(summary.monthly_rows, 2);

        let weekly = service
            .get_leaderboard(None, LeaderboardMode::Period(Period::Weekly), None, None)
            .unwrap();
        assert_eq!(weekly.entries.len(), 1);
        assert_eq!(weekly.entries[0].user_id, "a");
        assert_eq!(weekly.entries[0].points, 10);

        let monthly = service
            .get_leaderboard(None, LeaderboardMode::Period(Period::Monthly), None, None)
            .unwrap();
        let points: Vec<(&str, i64)> = monthly
            .entries
            .iter()
            .map(|e| (e.user_id.as_str(), e.points))
            .collect();
        assert_eq!(points, vec![("b", 40), ("a", 10)]);
    }

    #[test]
    fn test_rollup_is_repeatable() {
        let service = service();
        user(&service, "a");
        journal(&service, "a", None, 7, FRIDAY_NOON);
        service.rollup_periods(FRIDAY_NOON).unwrap();
        service.rollup_periods(FRIDAY_NOON).unwrap();

        let weekly = service
            .get_leaderboard(None, LeaderboardMode::Period(Period::Weekly), None, None)
            .unwrap();
        assert_eq!(weekly.entries.len(), 1);
        assert_eq!(weekly.entries[0].points, 7);
    }

    #[test]
    fn test_rollup_leaves_global_rows() {
        let service = service();
        user(&service, "a");
        grant_points(&service, "a", 12);
        service.rollup_periods(crate::time::now_timestamp()).unwrap();

        let global = service
            .get_leaderboard(None, LeaderboardMode::default(), None, None)
            .unwrap();
        assert_eq!(global.entries[0].points, 12);
    }

    #[test]
    fn test_rollup_community_scope() {
        let service = service();
        user(&service, "a");
        user(&service, "b");
        service
            .db()
            .write(|tx| {
                tx.execute(
                    "INSERT INTO communities (id, name, join_code, created_at)
                     VALUES ('c1', 'River Keepers', 'RIVER234', 0)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let month = crate::time::month_start(FRIDAY_NOON);
        let week = crate::time::week_start(FRIDAY_NOON);
        journal(&service, "a", Some("c1"), 25, FRIDAY_NOON - 60);
        journal(&service, "a", None, 5, FRIDAY_NOON - 30);
        journal(&service, "b", Some("c1"), 30, week - 1);
        journal(&service, "b", Some("c1"), 99, month - 1);

        let summary = service.rollup_periods(FRIDAY_NOON).unwrap();
        // weekly: global a; community a
        assert_eq!(summary.weekly_rows, 2);
        // monthly: global a, b; community a, b
        assert_eq!(summary.monthly_rows, 4);

        let rows = |period: Period, community: Option<&str>| -> Vec<(String, i64)> {
            service
                .get_leaderboard(None, LeaderboardMode::Period(period), community, None)
                .unwrap()
                .entries
                .into_iter()
                .map(|e| (e.user_id, e.points))
                .collect()
        };

        assert_eq!(rows(Period::Weekly, Some("c1")), vec![("a".to_string(), 25)]);
        assert_eq!(
            rows(Period::Monthly, Some("c1")),
            vec![("b".to_string(), 30), ("a".to_string(), 25)]
        );
        // The community award counts once in the global row, next to the
        // unscoped award.
        assert_eq!(rows(Period::Weekly, None), vec![("a".to_string(), 30)]);
        assert_eq!(
            rows(Period::Monthly, None),
            vec![("a".to_string(), 30), ("b".to_string(), 30)]
        );
    }
}
