//! # Profiles & Authorization
//!
//! Profiles are created and updated by the identity provider's webhook
//! (`sync_profile`) and removed with `delete_profile`, which cascades to
//! every owned record. `is_admin` is the single authorization predicate
//! used by every privileged operation.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::badges::UserStats;
use crate::error::{Error, Result};
use crate::service::EcoService;
use crate::storage::{CommunityMemberRecord, LeaderboardEntryRecord, ProfileRecord};

/// Everything the home screen shows about the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub profile: ProfileRecord,
    pub stats: UserStats,
    pub memberships: Vec<CommunityMemberRecord>,
    pub badges_earned: usize,
    /// The caller's leaderboard rows, global scope first
    pub standings: Vec<LeaderboardEntryRecord>,
}

/// The one authorization predicate for privileged operations.
pub fn is_admin(profile: &ProfileRecord) -> bool {
    profile.is_admin
}

/// Load a profile or fail with `ProfileNotFound`.
pub(crate) fn load_profile(conn: &Connection, user_id: &str) -> Result<ProfileRecord> {
    conn.query_row(
        &format!("SELECT {} FROM profiles WHERE id = ?", ProfileRecord::COLUMNS),
        params![user_id],
        ProfileRecord::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::ProfileNotFound(user_id.to_string()))
}

/// Load the caller's profile and fail with `AdminRequired` unless it
/// passes [`is_admin`].
pub(crate) fn require_admin(conn: &Connection, user_id: &str) -> Result<ProfileRecord> {
    let profile = load_profile(conn, user_id)?;
    if !is_admin(&profile) {
        tracing::warn!(user_id = user_id, "Admin operation refused");
        return Err(Error::AdminRequired);
    }
    Ok(profile)
}

impl EcoService {
    /// Create or update a profile from the identity provider.
    ///
    /// Points, role and streaks are never touched by a sync.
    pub fn sync_profile(
        &self,
        user_id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<ProfileRecord> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidArgument("user id is required".into()));
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(Error::InvalidArgument("display name is required".into()));
        }

        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            tx.execute(
                "INSERT INTO profiles (id, display_name, avatar_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    avatar_url = excluded.avatar_url,
                    updated_at = excluded.updated_at",
                params![user_id, display_name, avatar_url, now],
            )?;
            tracing::info!(user_id = user_id, "Profile synced");
            load_profile(tx, user_id)
        })
    }

    /// Get a profile by id.
    pub fn get_profile(&self, user_id: &str) -> Result<ProfileRecord> {
        self.db().read(|conn| load_profile(conn, user_id))
    }

    /// Delete a profile and everything it owns.
    pub fn delete_profile(&self, user_id: &str) -> Result<()> {
        self.db().write(|tx| {
            let deleted = tx.execute("DELETE FROM profiles WHERE id = ?", params![user_id])?;
            if deleted == 0 {
                return Err(Error::ProfileNotFound(user_id.to_string()));
            }
            tracing::info!(user_id = user_id, "Profile deleted");
            Ok(())
        })
    }

    /// Set or clear the admin flag (operator configuration).
    pub fn set_admin(&self, user_id: &str, admin: bool) -> Result<ProfileRecord> {
        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            let updated = tx.execute(
                "UPDATE profiles SET is_admin = ?, updated_at = ? WHERE id = ?",
                params![admin, now, user_id],
            )?;
            if updated == 0 {
                return Err(Error::ProfileNotFound(user_id.to_string()));
            }
            tracing::info!(user_id = user_id, admin = admin, "Admin flag changed");
            load_profile(tx, user_id)
        })
    }

    /// Profile, aggregate stats, leaderboard rows and active memberships.
    pub fn profile_summary(&self, user_id: &str) -> Result<ProfileSummary> {
        let (profile, stats, badges_earned, standings) = self.db().read(|conn| {
            let profile = load_profile(conn, user_id)?;
            let stats = crate::badges::load_stats(conn, user_id)?;
            let badges_earned: i64 = conn.query_row(
                "SELECT COUNT(*) FROM user_badges WHERE user_id = ?",
                params![user_id],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM leaderboard_entries
                 WHERE user_id = ? AND points > 0
                 ORDER BY community_id, period",
                LeaderboardEntryRecord::COLUMNS
            ))?;
            let standings = stmt
                .query_map(params![user_id], LeaderboardEntryRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((profile, stats, badges_earned as usize, standings))
        })?;
        Ok(ProfileSummary {
            profile,
            stats,
            memberships: self.list_memberships(user_id)?,
            badges_earned,
            standings,
        })
    }

    /// Check that `user_id` is an administrator.
    pub fn ensure_admin(&self, user_id: &str) -> Result<ProfileRecord> {
        self.db().read(|conn| require_admin(conn, user_id))
    }
}
