//! # Badges
//!
//! Badges are catalog rows with a closed condition key. Evaluation is a
//! pure function of a user's aggregate stats; granting is `INSERT OR
//! IGNORE` on `(user_id, badge_id)`, so re-running never duplicates.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::service::EcoService;
use crate::status::text_enum;

/// What a badge is awarded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCondition {
    FirstAction,
    FiveActions,
    FirstApprovedAction,
    TenApprovedActions,
    FirstChallenge,
    FiveChallenges,
    #[serde(rename = "points_100")]
    Points100,
    #[serde(rename = "points_500")]
    Points500,
    #[serde(rename = "points_1000")]
    Points1000,
    CommunityMember,
    CommunityFounder,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
    #[serde(rename = "streak_30")]
    Streak30,
}

text_enum!(BadgeCondition {
    FirstAction => "first_action",
    FiveActions => "five_actions",
    FirstApprovedAction => "first_approved_action",
    TenApprovedActions => "ten_approved_actions",
    FirstChallenge => "first_challenge",
    FiveChallenges => "five_challenges",
    Points100 => "points_100",
    Points500 => "points_500",
    Points1000 => "points_1000",
    CommunityMember => "community_member",
    CommunityFounder => "community_founder",
    Streak3 => "streak_3",
    Streak7 => "streak_7",
    Streak30 => "streak_30",
});

impl BadgeCondition {
    /// Whether `stats` satisfy this condition.
    pub fn is_met(&self, stats: &UserStats) -> bool {
        match self {
            BadgeCondition::FirstAction => stats.actions_submitted >= 1,
            BadgeCondition::FiveActions => stats.actions_submitted >= 5,
            BadgeCondition::FirstApprovedAction => stats.actions_approved >= 1,
            BadgeCondition::TenApprovedActions => stats.actions_approved >= 10,
            BadgeCondition::FirstChallenge => stats.challenges_completed >= 1,
            BadgeCondition::FiveChallenges => stats.challenges_completed >= 5,
            BadgeCondition::Points100 => stats.total_points >= 100,
            BadgeCondition::Points500 => stats.total_points >= 500,
            BadgeCondition::Points1000 => stats.total_points >= 1000,
            BadgeCondition::CommunityMember => stats.communities_joined >= 1,
            BadgeCondition::CommunityFounder => stats.communities_created >= 1,
            BadgeCondition::Streak3 => stats.longest_streak >= 3,
            BadgeCondition::Streak7 => stats.longest_streak >= 7,
            BadgeCondition::Streak30 => stats.longest_streak >= 30,
        }
    }
}

/// A catalog badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: BadgeCondition,
}

impl BadgeRecord {
    const COLUMNS: &'static str = "id, name, description, condition";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            condition: row.get(3)?,
        })
    }
}

/// A catalog badge with the caller's earned state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: BadgeCondition,
    pub earned: bool,
    pub earned_at: Option<i64>,
}

/// Aggregates the badge conditions are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_points: i64,
    pub actions_submitted: i64,
    /// AI_APPROVED or APPROVED
    pub actions_approved: i64,
    pub challenges_completed: i64,
    /// Active memberships
    pub communities_joined: i64,
    /// Communities founded through an approved request
    pub communities_created: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
}

/// Catalog badges whose condition `stats` meet and that are not earned yet.
pub fn evaluate<'a>(
    stats: &UserStats,
    catalog: &'a [BadgeRecord],
    earned: &HashSet<String>,
) -> Vec<&'a BadgeRecord> {
    catalog
        .iter()
        .filter(|badge| !earned.contains(&badge.id) && badge.condition.is_met(stats))
        .collect()
}

pub(crate) fn load_stats(conn: &Connection, user_id: &str) -> Result<UserStats> {
    let profile = crate::profiles::load_profile(conn, user_id)?;
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM actions WHERE user_id = ?1),
            (SELECT COUNT(*) FROM actions WHERE user_id = ?1 AND status IN ('AI_APPROVED', 'APPROVED')),
            (SELECT COUNT(*) FROM challenge_progress WHERE user_id = ?1 AND status = 'COMPLETED'),
            (SELECT COUNT(*) FROM community_members WHERE user_id = ?1 AND active = 1),
            (SELECT COUNT(*) FROM communities WHERE creator_id = ?1)",
        params![user_id],
        |row| {
            Ok(UserStats {
                total_points: profile.total_points,
                actions_submitted: row.get(0)?,
                actions_approved: row.get(1)?,
                challenges_completed: row.get(2)?,
                communities_joined: row.get(3)?,
                communities_created: row.get(4)?,
                current_streak: profile.current_streak,
                longest_streak: profile.longest_streak,
            })
        },
    )?;
    Ok(stats)
}

fn load_catalog(conn: &Connection) -> Result<Vec<BadgeRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM badges ORDER BY rowid", BadgeRecord::COLUMNS))?;
    let rows = stmt.query_map([], BadgeRecord::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn load_earned(conn: &Connection, user_id: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT badge_id FROM user_badges WHERE user_id = ?")?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<HashSet<String>>>()?)
}

/// Insert a grant; true when it was not held before.
fn insert_grant(conn: &Connection, user_id: &str, badge_id: &str, now: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at) VALUES (?, ?, ?)",
        params![user_id, badge_id, now],
    )?;
    Ok(inserted == 1)
}

impl EcoService {
    /// Evaluate every catalog badge for a user and grant the newly met ones.
    ///
    /// Returns only the badges granted by this call.
    pub fn check_and_award(&self, user_id: &str) -> Result<Vec<BadgeRecord>> {
        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            let stats = load_stats(tx, user_id)?;
            let catalog = load_catalog(tx)?;
            let earned = load_earned(tx, user_id)?;

            let mut granted = Vec::new();
            for badge in evaluate(&stats, &catalog, &earned) {
                if insert_grant(tx, user_id, &badge.id, now)? {
                    tracing::info!(user_id = user_id, badge_id = badge.id.as_str(), "Badge earned");
                    granted.push(badge.clone());
                }
            }
            Ok(granted)
        })
    }

    /// Best-effort badge evaluation after a committed mutation.
    ///
    /// A failure here never undoes the mutation that triggered it.
    pub(crate) fn refresh_badges(&self, user_id: &str) {
        if let Err(e) = self.check_and_award(user_id) {
            tracing::warn!(user_id = user_id, error = %e, "Badge evaluation failed");
        }
    }

    /// The whole catalog with the user's earned flags.
    pub fn list_badges(&self, user_id: &str) -> Result<Vec<BadgeStatus>> {
        self.db().read(|conn| {
            crate::profiles::load_profile(conn, user_id)?;
            let mut stmt = conn.prepare(
                "SELECT b.id, b.name, b.description, b.condition, ub.earned_at
                 FROM badges b
                 LEFT JOIN user_badges ub ON ub.badge_id = b.id AND ub.user_id = ?
                 ORDER BY b.rowid",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                let earned_at: Option<i64> = row.get(4)?;
                Ok(BadgeStatus {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    condition: row.get(3)?,
                    earned: earned_at.is_some(),
                    earned_at,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Aggregate stats for a user.
    pub fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        self.db().read(|conn| load_stats(conn, user_id))
    }

    /// Grant a badge by hand (admin only). Returns false if already held.
    pub fn grant_badge(&self, admin_id: &str, user_id: &str, badge_id: &str) -> Result<bool> {
        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            crate::profiles::require_admin(tx, admin_id)?;
            crate::profiles::load_profile(tx, user_id)?;
            let exists = tx
                .query_row("SELECT 1 FROM badges WHERE id = ?", params![badge_id], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Err(Error::BadgeNotFound(badge_id.to_string()));
            }
            let granted = insert_grant(tx, user_id, badge_id, now)?;
            tracing::info!(
                admin_id = admin_id,
                user_id = user_id,
                badge_id = badge_id,
                granted = granted,
                "Badge granted manually"
            );
            Ok(granted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;

    fn badge(id: &str, condition: BadgeCondition) -> BadgeRecord {
        BadgeRecord {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            condition,
        }
    }

    #[test]
    fn test_evaluate_is_pure_and_skips_earned() {
        let catalog = vec![
            badge("p100", BadgeCondition::Points100),
            badge("p500", BadgeCondition::Points500),
            badge("s3", BadgeCondition::Streak3),
        ];
        let stats = UserStats {
            total_points: 150,
            longest_streak: 3,
            ..Default::default()
        };

        let mut earned = HashSet::new();
        let ids: Vec<&str> = evaluate(&stats, &catalog, &earned).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["p100", "s3"]);

        earned.insert("p100".to_string());
        let ids: Vec<&str> = evaluate(&stats, &catalog, &earned).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["s3"]);
    }

    #[test]
    fn test_condition_text_roundtrip() {
        let parsed: BadgeCondition = "points_1000".parse().unwrap();
        assert_eq!(parsed, BadgeCondition::Points1000);
        assert_eq!(
            serde_json::to_string(&BadgeCondition::Streak30).unwrap(),
            "\"streak_30\""
        );
        assert!("points_2".parse::<BadgeCondition>().is_err());
    }

    #[test]
    fn test_check_twice_grants_nothing_new() {
        let service = service();
        user(&service, "u1");
        grant_points(&service, "u1", 120);

        let first = service.check_and_award("u1").unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].condition, BadgeCondition::Points100);

        assert!(service.check_and_award("u1").unwrap().is_empty());
        let earned = service
            .list_badges("u1")
            .unwrap()
            .into_iter()
            .filter(|b| b.earned)
            .count();
        assert_eq!(earned, 1);
    }

    #[test]
    fn test_list_badges_covers_catalog() {
        let service = service();
        user(&service, "u1");
        let badges = service.list_badges("u1").unwrap();
        assert_eq!(badges.len(), 14);
        assert!(badges.iter().all(|b| !b.earned && b.earned_at.is_none()));
    }

    #[test]
    fn test_manual_grant() {
        let service = service();
        user(&service, "u1");
        admin(&service, "boss");
        assert!(service.grant_badge("boss", "u1", "badge-streak-30").unwrap());
        assert!(!service.grant_badge("boss", "u1", "badge-streak-30").unwrap());
        assert!(matches!(
            service.grant_badge("boss", "u1", "badge-nope"),
            Err(Error::BadgeNotFound(_))
        ));
        assert!(matches!(
            service.grant_badge("u1", "u1", "badge-streak-3"),
            Err(Error::AdminRequired)
        ));
    }

    #[test]
    fn test_stats_count_activity() {
        let service = service();
        user(&service, "u1");
        grant_points(&service, "u1", 40);
        let stats = service.user_stats("u1").unwrap();
        assert_eq!(stats.total_points, 40);
        assert_eq!(stats.actions_submitted, 0);
        assert!(matches!(
            service.user_stats("ghost"),
            Err(Error::ProfileNotFound(_))
        ));
    }
}
