//! Row types returned by the storage layer.
//!
//! Each record carries the column list it is read with (`COLUMNS`) and a
//! `from_row` mapper so queries across modules stay in sync with the struct.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::status::{
    ActionStatus, ChallengeStatus, Difficulty, GameType, MemberRole, Period, ProfileRole,
    RequestStatus, SessionStatus,
};

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub total_points: i64,
    pub role: ProfileRole,
    pub is_admin: bool,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_active_day: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProfileRecord {
    pub(crate) const COLUMNS: &'static str = "id, display_name, avatar_url, total_points, role, is_admin, current_streak, longest_streak, last_active_day, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            display_name: row.get(1)?,
            avatar_url: row.get(2)?,
            total_points: row.get(3)?,
            role: row.get(4)?,
            is_admin: row.get(5)?,
            current_streak: row.get(6)?,
            longest_streak: row.get(7)?,
            last_active_day: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

/// A catalog challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub points: i64,
    pub max_progress: i64,
    pub is_active: bool,
}

impl ChallengeRecord {
    pub(crate) const COLUMNS: &'static str =
        "id, title, description, category, difficulty, points, max_progress, is_active";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            difficulty: row.get(4)?,
            points: row.get(5)?,
            max_progress: row.get(6)?,
            is_active: row.get(7)?,
        })
    }
}

/// A user's progress on one challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeProgressRecord {
    pub user_id: String,
    pub challenge_id: String,
    pub status: ChallengeStatus,
    pub progress: i64,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

impl ChallengeProgressRecord {
    pub(crate) const COLUMNS: &'static str =
        "user_id, challenge_id, status, progress, started_at, completed_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            challenge_id: row.get(1)?,
            status: row.get(2)?,
            progress: row.get(3)?,
            started_at: row.get(4)?,
            completed_at: row.get(5)?,
        })
    }
}

/// One play of a mini-game or challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSessionRecord {
    pub id: String,
    pub user_id: String,
    pub game_type: GameType,
    pub challenge_id: Option<String>,
    pub status: SessionStatus,
    pub score: i64,
    pub started_at: i64,
    pub ended_at: Option<i64>,
}

impl GameSessionRecord {
    pub(crate) const COLUMNS: &'static str =
        "id, user_id, game_type, challenge_id, status, score, started_at, ended_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            game_type: row.get(2)?,
            challenge_id: row.get(3)?,
            status: row.get(4)?,
            score: row.get(5)?,
            started_at: row.get(6)?,
            ended_at: row.get(7)?,
        })
    }
}

/// An eco-action submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: String,
    pub user_id: String,
    pub community_id: Option<String>,
    pub category: String,
    pub description: Option<String>,
    pub before_image_url: String,
    pub after_image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ActionStatus,
    pub ai_confidence: f64,
    pub points_awarded: i64,
    pub admin_note: Option<String>,
    pub created_at: i64,
    pub reviewed_at: Option<i64>,
}

impl ActionRecord {
    pub(crate) const COLUMNS: &'static str = "id, user_id, community_id, category, description, before_image_url, after_image_url, latitude, longitude, status, ai_confidence, points_awarded, admin_note, created_at, reviewed_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            community_id: row.get(2)?,
            category: row.get(3)?,
            description: row.get(4)?,
            before_image_url: row.get(5)?,
            after_image_url: row.get(6)?,
            latitude: row.get(7)?,
            longitude: row.get(8)?,
            status: row.get(9)?,
            ai_confidence: row.get(10)?,
            points_awarded: row.get(11)?,
            admin_note: row.get(12)?,
            created_at: row.get(13)?,
            reviewed_at: row.get(14)?,
        })
    }
}

/// A community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub join_code: String,
    pub status: RequestStatus,
    pub total_points: i64,
    pub creator_id: Option<String>,
    pub created_at: i64,
}

impl CommunityRecord {
    pub(crate) const COLUMNS: &'static str =
        "id, name, description, join_code, status, total_points, creator_id, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            join_code: row.get(3)?,
            status: row.get(4)?,
            total_points: row.get(5)?,
            creator_id: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// A community creation ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRequestRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub admin_note: Option<String>,
    pub created_at: i64,
    pub reviewed_at: Option<i64>,
}

impl CommunityRequestRecord {
    pub(crate) const COLUMNS: &'static str =
        "id, user_id, name, description, status, admin_note, created_at, reviewed_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            status: row.get(4)?,
            admin_note: row.get(5)?,
            created_at: row.get(6)?,
            reviewed_at: row.get(7)?,
        })
    }
}

/// A (user, community) membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMemberRecord {
    pub community_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub active: bool,
    pub joined_at: i64,
    pub left_at: Option<i64>,
}

impl CommunityMemberRecord {
    pub(crate) const COLUMNS: &'static str =
        "community_id, user_id, role, active, joined_at, left_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            community_id: row.get(0)?,
            user_id: row.get(1)?,
            role: row.get(2)?,
            active: row.get(3)?,
            joined_at: row.get(4)?,
            left_at: row.get(5)?,
        })
    }
}

/// A leaderboard aggregate row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryRecord {
    pub user_id: String,
    /// `None` for the global scope
    pub community_id: Option<String>,
    pub period: Period,
    pub points: i64,
}

impl LeaderboardEntryRecord {
    pub(crate) const COLUMNS: &'static str = "user_id, community_id, period, points";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let community_id: String = row.get(1)?;
        Ok(Self {
            user_id: row.get(0)?,
            community_id: (!community_id.is_empty()).then_some(community_id),
            period: row.get(2)?,
            points: row.get(3)?,
        })
    }
}
