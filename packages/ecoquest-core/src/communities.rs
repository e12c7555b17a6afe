//! # Communities
//!
//! Creation goes through a moderated request:
//!
//! ```text
//! request_community ──► community_requests (PENDING)
//!                              │ review (admin)
//!              ┌───────────────┴───────────────┐
//!          APPROVED                         REJECTED
//!  + communities row (join code)
//!  + community_members (LEADER)
//!  + profiles.role = community_leader
//! ```
//!
//! The three approval writes share one transaction. Leaving a community
//! deactivates the membership row; joining again reactivates it.

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::service::{generate_id, EcoService};
use crate::status::{MemberRole, ProfileRole, RequestStatus, ReviewDecision};
use crate::storage::{CommunityMemberRecord, CommunityRecord, CommunityRequestRecord};

/// Join code length.
const JOIN_CODE_LEN: usize = 8;

const JOIN_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Outcome of reviewing a community request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReview {
    pub request: CommunityRequestRecord,
    /// The new community, on approval
    pub community: Option<CommunityRecord>,
}

/// Generate a random join code (8 chars, no look-alike characters).
fn generate_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_CHARS[rng.gen_range(0..JOIN_CODE_CHARS.len())] as char)
        .collect()
}

/// A join code that is not in use yet.
fn unused_join_code(conn: &Connection) -> Result<String> {
    loop {
        let code = generate_join_code();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM communities WHERE join_code = ?)",
            params![code],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(code);
        }
    }
}

pub(crate) fn load_community(conn: &Connection, community_id: &str) -> Result<CommunityRecord> {
    conn.query_row(
        &format!("SELECT {} FROM communities WHERE id = ?", CommunityRecord::COLUMNS),
        params![community_id],
        CommunityRecord::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::CommunityNotFound(community_id.to_string()))
}

fn load_request(conn: &Connection, request_id: &str) -> Result<CommunityRequestRecord> {
    conn.query_row(
        &format!(
            "SELECT {} FROM community_requests WHERE id = ?",
            CommunityRequestRecord::COLUMNS
        ),
        params![request_id],
        CommunityRequestRecord::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::RequestNotFound(request_id.to_string()))
}

fn load_membership(
    conn: &Connection,
    community_id: &str,
    user_id: &str,
) -> Result<Option<CommunityMemberRecord>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM community_members WHERE community_id = ? AND user_id = ?",
                CommunityMemberRecord::COLUMNS
            ),
            params![community_id, user_id],
            CommunityMemberRecord::from_row,
        )
        .optional()?)
}

/// Fail with `NotMember` unless the user is an active member.
pub(crate) fn require_active_member(conn: &Connection, community_id: &str, user_id: &str) -> Result<()> {
    match load_membership(conn, community_id, user_id)? {
        Some(member) if member.active => Ok(()),
        _ => Err(Error::NotMember),
    }
}

/// Does `name` collide with a community or another open request?
fn name_in_use(conn: &Connection, name: &str, exclude_request: Option<&str>) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM communities WHERE name = ?1 COLLATE NOCASE)
             OR EXISTS(SELECT 1 FROM community_requests
                       WHERE status = 'PENDING' AND name = ?1 COLLATE NOCASE
                         AND id IS NOT ?2)",
        params![name, exclude_request],
        |row| row.get(0),
    )?)
}

impl EcoService {
    /// Ask for a new community. Requires the configured point threshold.
    pub fn request_community(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<CommunityRequestRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument("community name is required".into()));
        }
        let required = self.rules().community_threshold;

        let now = crate::time::now_timestamp();
        let id = generate_id();
        self.db().write(|tx| {
            let profile = crate::profiles::load_profile(tx, user_id)?;
            if profile.total_points < required {
                return Err(Error::InsufficientPoints {
                    current: profile.total_points,
                    required,
                });
            }

            let pending: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM community_requests WHERE user_id = ? AND status = 'PENDING')",
                params![user_id],
                |row| row.get(0),
            )?;
            if pending {
                return Err(Error::RequestPending);
            }
            if name_in_use(tx, name, None)? {
                return Err(Error::NameTaken(name.to_string()));
            }

            tx.execute(
                "INSERT INTO community_requests (id, user_id, name, description, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![id, user_id, name, description, RequestStatus::Pending, now],
            )?;
            tracing::info!(user_id = user_id, request_id = id.as_str(), name = name, "Community requested");
            load_request(tx, &id)
        })
    }

    /// Approve or reject a pending community request (admin only).
    ///
    /// Approval creates the community, its LEADER membership and the
    /// requester's role change together or not at all.
    pub fn review_community_request(
        &self,
        admin_id: &str,
        request_id: &str,
        decision: ReviewDecision,
        note: Option<&str>,
    ) -> Result<RequestReview> {
        let now = crate::time::now_timestamp();
        let review = self.db().write(|tx| {
            crate::profiles::require_admin(tx, admin_id)?;
            let request = load_request(tx, request_id)?;
            let next = RequestStatus::from(decision);
            if !request.status.can_transition_to(next) {
                return Err(Error::AlreadyReviewed("community request"));
            }

            let updated = tx.execute(
                "UPDATE community_requests SET status = ?, admin_note = ?, reviewed_at = ?
                 WHERE id = ? AND status = ?",
                params![next, note, now, request_id, RequestStatus::Pending],
            )?;
            if updated == 0 {
                return Err(Error::AlreadyReviewed("community request"));
            }

            let community = match decision {
                ReviewDecision::Rejected => None,
                ReviewDecision::Approved => {
                    if name_in_use(tx, &request.name, Some(request_id))? {
                        return Err(Error::NameTaken(request.name.clone()));
                    }
                    let community_id = generate_id();
                    let join_code = unused_join_code(tx)?;
                    tx.execute(
                        "INSERT INTO communities (id, name, description, join_code, status, total_points, creator_id, created_at)
                         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
                        params![
                            community_id,
                            request.name,
                            request.description,
                            join_code,
                            RequestStatus::Approved,
                            request.user_id,
                            now
                        ],
                    )?;
                    tx.execute(
                        "INSERT INTO community_members (community_id, user_id, role, active, joined_at)
                         VALUES (?, ?, ?, 1, ?)",
                        params![community_id, request.user_id, MemberRole::Leader, now],
                    )?;
                    tx.execute(
                        "UPDATE profiles SET role = ?, updated_at = ? WHERE id = ?",
                        params![ProfileRole::CommunityLeader, now, request.user_id],
                    )?;
                    Some(load_community(tx, &community_id)?)
                }
            };

            tracing::info!(
                admin_id = admin_id,
                request_id = request_id,
                decision = %decision,
                community_id = community.as_ref().map(|c| c.id.as_str()).unwrap_or(""),
                "Community request reviewed"
            );
            Ok(RequestReview {
                request: load_request(tx, request_id)?,
                community,
            })
        })?;

        self.refresh_badges(&review.request.user_id);
        Ok(review)
    }

    /// Join a community by its join code (case-insensitive).
    pub fn join_community(&self, user_id: &str, join_code: &str) -> Result<CommunityMemberRecord> {
        let join_code = join_code.trim().to_ascii_uppercase();
        if join_code.is_empty() {
            return Err(Error::InvalidArgument("join code is required".into()));
        }

        let now = crate::time::now_timestamp();
        let member = self.db().write(|tx| {
            crate::profiles::load_profile(tx, user_id)?;
            let community_id: String = tx
                .query_row(
                    "SELECT id FROM communities WHERE join_code = ? AND status = ?",
                    params![join_code, RequestStatus::Approved],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(Error::JoinCodeNotFound)?;

            match load_membership(tx, &community_id, user_id)? {
                Some(existing) if existing.active => return Err(Error::AlreadyMember),
                Some(_) => {
                    tx.execute(
                        "UPDATE community_members SET active = 1, joined_at = ?, left_at = NULL
                         WHERE community_id = ? AND user_id = ?",
                        params![now, community_id, user_id],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO community_members (community_id, user_id, role, active, joined_at)
                         VALUES (?, ?, ?, 1, ?)",
                        params![community_id, user_id, MemberRole::Member, now],
                    )?;
                }
            }

            tracing::info!(user_id = user_id, community_id = community_id.as_str(), "Joined community");
            load_membership(tx, &community_id, user_id)?.ok_or(Error::NotMember)
        })?;

        self.refresh_badges(user_id);
        Ok(member)
    }

    /// Leave a community. Earned community points stay with the community.
    pub fn leave_community(&self, user_id: &str, community_id: &str) -> Result<CommunityMemberRecord> {
        let now = crate::time::now_timestamp();
        self.db().write(|tx| {
            let updated = tx.execute(
                "UPDATE community_members SET active = 0, left_at = ?
                 WHERE community_id = ? AND user_id = ? AND active = 1",
                params![now, community_id, user_id],
            )?;
            if updated == 0 {
                return Err(Error::NotMember);
            }
            tracing::info!(user_id = user_id, community_id = community_id, "Left community");
            load_membership(tx, community_id, user_id)?.ok_or(Error::NotMember)
        })
    }

    /// Every approved community, highest total first.
    pub fn list_communities(&self) -> Result<Vec<CommunityRecord>> {
        self.db().read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM communities WHERE status = ? ORDER BY total_points DESC, name",
                CommunityRecord::COLUMNS
            ))?;
            let rows = stmt.query_map(params![RequestStatus::Approved], CommunityRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Get a community by id.
    pub fn get_community(&self, community_id: &str) -> Result<CommunityRecord> {
        self.db().read(|conn| load_community(conn, community_id))
    }

    /// Active members of a community, leader first.
    pub fn list_members(&self, community_id: &str) -> Result<Vec<CommunityMemberRecord>> {
        self.db().read(|conn| {
            load_community(conn, community_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM community_members
                 WHERE community_id = ? AND active = 1
                 ORDER BY CASE role WHEN 'LEADER' THEN 0 ELSE 1 END, joined_at, rowid",
                CommunityMemberRecord::COLUMNS
            ))?;
            let rows = stmt.query_map(params![community_id], CommunityMemberRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Communities the user is an active member of.
    pub fn list_memberships(&self, user_id: &str) -> Result<Vec<CommunityMemberRecord>> {
        self.db().read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM community_members WHERE user_id = ? AND active = 1 ORDER BY joined_at",
                CommunityMemberRecord::COLUMNS
            ))?;
            let rows = stmt.query_map(params![user_id], CommunityMemberRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// The moderation queue (admin only), oldest first.
    pub fn list_pending_requests(&self, admin_id: &str) -> Result<Vec<CommunityRequestRecord>> {
        self.db().read(|conn| {
            crate::profiles::require_admin(conn, admin_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM community_requests WHERE status = 'PENDING' ORDER BY created_at, rowid",
                CommunityRequestRecord::COLUMNS
            ))?;
            let rows = stmt.query_map([], CommunityRequestRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// A user's own requests, newest first.
    pub fn my_requests(&self, user_id: &str) -> Result<Vec<CommunityRequestRecord>> {
        self.db().read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM community_requests WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
                CommunityRequestRecord::COLUMNS
            ))?;
            let rows = stmt.query_map(params![user_id], CommunityRequestRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;

    fn eligible(service: &EcoService, id: &str) {
        user(service, id);
        grant_points(service, id, 500);
    }

    fn approved_community(service: &EcoService, leader: &str, name: &str) -> CommunityRecord {
        let request = service.request_community(leader, name, None).unwrap();
        service
            .review_community_request("boss", &request.id, ReviewDecision::Approved, None)
            .unwrap()
            .community
            .unwrap()
    }

    #[test]
    fn test_threshold_boundary() {
        let service = service();
        user(&service, "u1");
        grant_points(&service, "u1", 499);
        match service.request_community("u1", "Green Team", None) {
            Err(Error::InsufficientPoints { current, required }) => {
                assert_eq!(current, 499);
                assert_eq!(required, 500);
            }
            other => panic!("expected InsufficientPoints, got {:?}", other),
        }

        grant_points(&service, "u1", 1);
        let request = service.request_community("u1", "Green Team", None).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[test]
    fn test_one_pending_request_and_unique_names() {
        let service = service();
        eligible(&service, "u1");
        eligible(&service, "u2");
        service.request_community("u1", "Green Team", None).unwrap();
        assert!(matches!(
            service.request_community("u1", "Other Team", None),
            Err(Error::RequestPending)
        ));
        assert!(matches!(
            service.request_community("u2", "green team", None),
            Err(Error::NameTaken(_))
        ));
        assert!(matches!(
            service.request_community("u2", "   ", None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_approval_creates_community_leader_and_role() {
        let service = service();
        admin(&service, "boss");
        eligible(&service, "u1");
        let community = approved_community(&service, "u1", "Green Team");

        assert_eq!(community.join_code.len(), JOIN_CODE_LEN);
        assert_eq!(community.creator_id.as_deref(), Some("u1"));
        assert_eq!(community.status, RequestStatus::Approved);

        let members = service.list_members(&community.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, MemberRole::Leader);
        assert_eq!(
            service.get_profile("u1").unwrap().role,
            ProfileRole::CommunityLeader
        );

        let mine = service.my_requests("u1").unwrap();
        assert_eq!(mine[0].status, RequestStatus::Approved);
        assert!(mine[0].reviewed_at.is_some());
    }

    #[test]
    fn test_review_twice_conflicts() {
        let service = service();
        admin(&service, "boss");
        eligible(&service, "u1");
        let request = service.request_community("u1", "Green Team", None).unwrap();
        service
            .review_community_request("boss", &request.id, ReviewDecision::Rejected, Some("dup"))
            .unwrap();
        assert!(matches!(
            service.review_community_request("boss", &request.id, ReviewDecision::Approved, None),
            Err(Error::AlreadyReviewed(_))
        ));
        assert!(service.list_communities().unwrap().is_empty());
        assert_eq!(service.get_profile("u1").unwrap().role, ProfileRole::Member);
    }

    #[test]
    fn test_review_requires_admin() {
        let service = service();
        eligible(&service, "u1");
        let request = service.request_community("u1", "Green Team", None).unwrap();
        assert!(matches!(
            service.review_community_request("u1", &request.id, ReviewDecision::Approved, None),
            Err(Error::AdminRequired)
        ));
        assert!(matches!(service.list_pending_requests("u1"), Err(Error::AdminRequired)));
    }

    #[test]
    fn test_failed_approval_writes_nothing() {
        let service = service();
        admin(&service, "boss");
        eligible(&service, "u1");
        let request = service.request_community("u1", "Green Team", None).unwrap();

        service
            .db()
            .write(|tx| {
                tx.execute_batch(
                    "CREATE TRIGGER fail_role BEFORE UPDATE OF role ON profiles
                     BEGIN SELECT RAISE(ABORT, 'forced'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        assert!(service
            .review_community_request("boss", &request.id, ReviewDecision::Approved, None)
            .is_err());

        assert!(service.list_communities().unwrap().is_empty());
        let members: i64 = service
            .db()
            .read(|c| Ok(c.query_row("SELECT COUNT(*) FROM community_members", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(members, 0);
        assert_eq!(service.get_profile("u1").unwrap().role, ProfileRole::Member);
        assert_eq!(service.my_requests("u1").unwrap()[0].status, RequestStatus::Pending);
    }

    #[test]
    fn test_join_leave_rejoin() {
        let service = service();
        admin(&service, "boss");
        eligible(&service, "leader");
        user(&service, "u2");
        let community = approved_community(&service, "leader", "Green Team");

        let member = service
            .join_community("u2", &community.join_code.to_lowercase())
            .unwrap();
        assert_eq!(member.role, MemberRole::Member);
        assert!(matches!(
            service.join_community("u2", &community.join_code),
            Err(Error::AlreadyMember)
        ));

        let left = service.leave_community("u2", &community.id).unwrap();
        assert!(!left.active);
        assert!(left.left_at.is_some());
        assert!(matches!(
            service.leave_community("u2", &community.id),
            Err(Error::NotMember)
        ));
        assert_eq!(service.list_members(&community.id).unwrap().len(), 1);

        let back = service.join_community("u2", &community.join_code).unwrap();
        assert!(back.active);
        assert!(back.left_at.is_none());
        assert_eq!(service.list_members(&community.id).unwrap().len(), 2);
        assert_eq!(service.list_memberships("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_join_code() {
        let service = service();
        user(&service, "u1");
        assert!(matches!(
            service.join_community("u1", "NOPE1234"),
            Err(Error::JoinCodeNotFound)
        ));
        assert!(matches!(
            service.get_community("missing"),
            Err(Error::CommunityNotFound(_))
        ));
    }

    #[test]
    fn test_community_actions_credit_the_community() {
        let service = service();
        admin(&service, "boss");
        eligible(&service, "leader");
        let community = approved_community(&service, "leader", "Green Team");

        let action = service
            .submit_action(
                "leader",
                crate::actions::ActionSubmission {
                    category: "cleanup".into(),
                    before_image_url: "b".into(),
                    after_image_url: "a".into(),
                    community_id: Some(community.id.clone()),
                    ai_confidence: Some(0.9),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(action.community_id.as_deref(), Some(community.id.as_str()));
        assert_eq!(service.get_community(&community.id).unwrap().total_points, 25);
        assert_eq!(service.get_profile("leader").unwrap().total_points, 525);
    }

    #[test]
    fn test_join_code_alphabet() {
        for _ in 0..50 {
            let code = generate_join_code();
            assert_eq!(code.len(), JOIN_CODE_LEN);
            assert!(code.bytes().all(|b| JOIN_CODE_CHARS.contains(&b)));
        }
    }
}
