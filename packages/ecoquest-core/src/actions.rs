//! # Eco-Action Review Pipeline
//!
//! ```text
//!              submit(confidence)
//!                     │
//!        ┌────────────┴─────────────┐
//!   confidence >= threshold    confidence < threshold
//!        │                          │
//!   AI_APPROVED (+points)        PENDING (0 points)
//!                                   │ review (admin)
//!                          ┌────────┴────────┐
//!                       APPROVED (+points)  REJECTED
//! ```
//!
//! Only PENDING actions can be reviewed; AI_APPROVED is final. Both the
//! submit and review writes are conditioned on the stored status, so an
//! action pays out at most once.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ledger::{self, AwardSource, PointScope};
use crate::service::{generate_id, EcoService};
use crate::status::{ActionStatus, ReviewDecision};
use crate::storage::ActionRecord;

/// A new eco-action as uploaded by the client.
///
/// Image URLs point at external storage; the confidence comes from the
/// external scoring model and is computed before this call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSubmission {
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub before_image_url: String,
    pub after_image_url: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub community_id: Option<String>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
}

impl ActionSubmission {
    fn validate(&self) -> Result<f64> {
        for (field, value) in [
            ("category", &self.category),
            ("beforeImageUrl", &self.before_image_url),
            ("afterImageUrl", &self.after_image_url),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidArgument(format!("{} is required", field)));
            }
        }

        let confidence = self.ai_confidence.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidArgument(format!(
                "aiConfidence must be within [0, 1], got {}",
                confidence
            )));
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Error::InvalidArgument(format!("invalid latitude {}", lat)));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(Error::InvalidArgument(format!("invalid longitude {}", lon)));
            }
        }
        Ok(confidence)
    }
}

fn load_action(conn: &Connection, action_id: &str) -> Result<ActionRecord> {
    conn.query_row(
        &format!("SELECT {} FROM actions WHERE id = ?", ActionRecord::COLUMNS),
        params![action_id],
        ActionRecord::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::ActionNotFound(action_id.to_string()))
}

fn query_actions(conn: &Connection, filter: &str, arg: &str) -> Result<Vec<ActionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM actions WHERE {} = ? ORDER BY created_at, rowid",
        ActionRecord::COLUMNS,
        filter
    ))?;
    let rows = stmt.query_map(params![arg], ActionRecord::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

impl EcoService {
    /// Submit an eco-action; auto-approves when the confidence clears the
    /// threshold.
    pub fn submit_action(&self, user_id: &str, submission: ActionSubmission) -> Result<ActionRecord> {
        let confidence = submission.validate()?;
        let rules = self.rules();
        let auto_approved = confidence >= rules.ai_approval_threshold;
        let (status, points) = if auto_approved {
            (ActionStatus::AiApproved, rules.action_points)
        } else {
            (ActionStatus::Pending, 0)
        };

        let now = crate::time::now_timestamp();
        let id = generate_id();
        let action = self.db().write(|tx| {
            crate::profiles::load_profile(tx, user_id)?;
            let community_id = submission.community_id.as_deref();
            if let Some(community_id) = community_id {
                crate::communities::require_active_member(tx, community_id, user_id)?;
            }

            tx.execute(
                "INSERT INTO actions (id, user_id, community_id, category, description, before_image_url,
                    after_image_url, latitude, longitude, status, ai_confidence, points_awarded, created_at, reviewed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    id,
                    user_id,
                    community_id,
                    submission.category.trim(),
                    submission.description,
                    submission.before_image_url,
                    submission.after_image_url,
                    submission.latitude,
                    submission.longitude,
                    status,
                    confidence,
                    points,
                    now,
                    auto_approved.then_some(now),
                ],
            )?;

            if auto_approved {
                ledger::award_points(
                    tx,
                    user_id,
                    points,
                    PointScope::community(community_id),
                    AwardSource::Action(&id),
                    now,
                )?;
                ledger::touch_streak(tx, user_id, now)?;
            }

            tracing::info!(
                user_id = user_id,
                action_id = id.as_str(),
                confidence = confidence,
                status = %status,
                "Eco-action submitted"
            );
            load_action(tx, &id)
        })?;

        self.refresh_badges(user_id);
        Ok(action)
    }

    /// Record an administrator's decision on a PENDING action.
    ///
    /// `points` defaults to the configured action reward and is ignored on
    /// rejection. Anything already decided (including AI_APPROVED) is a
    /// conflict and leaves every counter unchanged.
    pub fn review_action(
        &self,
        admin_id: &str,
        action_id: &str,
        decision: ReviewDecision,
        points: Option<i64>,
        note: Option<&str>,
    ) -> Result<ActionRecord> {
        let award = match decision {
            ReviewDecision::Approved => points.unwrap_or(self.rules().action_points),
            ReviewDecision::Rejected => 0,
        };
        if award < 0 {
            return Err(Error::InvalidArgument(format!(
                "points must be non-negative, got {}",
                award
            )));
        }

        let now = crate::time::now_timestamp();
        let action = self.db().write(|tx| {
            crate::profiles::require_admin(tx, admin_id)?;
            let action = load_action(tx, action_id)?;
            let next = ActionStatus::from(decision);
            if !action.status.can_transition_to(next) {
                return Err(Error::AlreadyReviewed("action"));
            }

            let updated = tx.execute(
                "UPDATE actions SET status = ?, points_awarded = ?, admin_note = ?, reviewed_at = ?
                 WHERE id = ? AND status = ?",
                params![next, award, note, now, action_id, ActionStatus::Pending],
            )?;
            if updated == 0 {
                return Err(Error::AlreadyReviewed("action"));
            }

            if next.is_accepted() {
                ledger::award_points(
                    tx,
                    &action.user_id,
                    award,
                    PointScope::community(action.community_id.as_deref()),
                    AwardSource::Action(action_id),
                    now,
                )?;
            }

            tracing::info!(
                admin_id = admin_id,
                action_id = action_id,
                decision = %decision,
                points = award,
                "Eco-action reviewed"
            );
            load_action(tx, action_id)
        })?;

        self.refresh_badges(&action.user_id);
        Ok(action)
    }

    /// Actions submitted by a user, oldest first.
    pub fn list_actions_for_user(&self, user_id: &str) -> Result<Vec<ActionRecord>> {
        self.db().read(|conn| query_actions(conn, "user_id", user_id))
    }

    /// The manual review queue (admin only).
    pub fn list_pending_actions(&self, admin_id: &str) -> Result<Vec<ActionRecord>> {
        self.db().read(|conn| {
            crate::profiles::require_admin(conn, admin_id)?;
            query_actions(conn, "status", ActionStatus::Pending.as_str())
        })
    }

    /// Get one action.
    pub fn get_action(&self, action_id: &str) -> Result<ActionRecord> {
        self.db().read(|conn| load_action(conn, action_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;

    fn submission(confidence: f64) -> ActionSubmission {
        ActionSubmission {
            category: "recycling".into(),
            before_image_url: "https://img/before.jpg".into(),
            after_image_url: "https://img/after.jpg".into(),
            ai_confidence: Some(confidence),
            ..Default::default()
        }
    }

    #[test]
    fn test_high_confidence_auto_approves() {
        let service = service();
        user(&service, "u1");
        let action = service.submit_action("u1", submission(0.8)).unwrap();
        assert_eq!(action.status, ActionStatus::AiApproved);
        assert_eq!(action.points_awarded, 25);
        assert!(action.reviewed_at.is_some());
        assert_eq!(service.get_profile("u1").unwrap().total_points, 25);
    }

    #[test]
    fn test_low_confidence_stays_pending() {
        let service = service();
        user(&service, "u1");
        let action = service.submit_action("u1", submission(0.79)).unwrap();
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.points_awarded, 0);
        assert_eq!(service.get_profile("u1").unwrap().total_points, 0);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let service = service();
        user(&service, "u1");
        let mut bad = submission(0.5);
        bad.after_image_url = String::new();
        assert!(matches!(
            service.submit_action("u1", bad),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            service.submit_action("u1", submission(1.5)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(service.list_actions_for_user("u1").unwrap().is_empty());
    }

    #[test]
    fn test_manual_approval_awards_once() {
        let service = service();
        user(&service, "u1");
        admin(&service, "boss");
        let action = service.submit_action("u1", submission(0.2)).unwrap();

        let reviewed = service
            .review_action("boss", &action.id, ReviewDecision::Approved, Some(40), Some("nice"))
            .unwrap();
        assert_eq!(reviewed.status, ActionStatus::Approved);
        assert_eq!(reviewed.points_awarded, 40);
        assert_eq!(reviewed.admin_note.as_deref(), Some("nice"));
        assert_eq!(service.get_profile("u1").unwrap().total_points, 40);

        assert!(matches!(
            service.review_action("boss", &action.id, ReviewDecision::Approved, None, None),
            Err(Error::AlreadyReviewed(_))
        ));
        assert_eq!(service.get_profile("u1").unwrap().total_points, 40);
    }

    #[test]
    fn test_rejection_awards_nothing() {
        let service = service();
        user(&service, "u1");
        admin(&service, "boss");
        let action = service.submit_action("u1", submission(0.1)).unwrap();
        let reviewed = service
            .review_action("boss", &action.id, ReviewDecision::Rejected, Some(99), None)
            .unwrap();
        assert_eq!(reviewed.status, ActionStatus::Rejected);
        assert_eq!(reviewed.points_awarded, 0);
        assert!(reviewed.reviewed_at.is_some());
        assert_eq!(service.get_profile("u1").unwrap().total_points, 0);
    }

    #[test]
    fn test_ai_approved_cannot_be_reviewed_again() {
        let service = service();
        user(&service, "u1");
        admin(&service, "boss");
        let action = service.submit_action("u1", submission(0.95)).unwrap();
        assert!(matches!(
            service.review_action("boss", &action.id, ReviewDecision::Approved, None, None),
            Err(Error::AlreadyReviewed(_))
        ));
        assert_eq!(service.get_profile("u1").unwrap().total_points, 25);
    }

    #[test]
    fn test_review_requires_admin_and_existing_action() {
        let service = service();
        user(&service, "u1");
        admin(&service, "boss");
        let action = service.submit_action("u1", submission(0.1)).unwrap();
        assert!(matches!(
            service.review_action("u1", &action.id, ReviewDecision::Approved, None, None),
            Err(Error::AdminRequired)
        ));
        assert!(matches!(
            service.review_action("boss", "missing", ReviewDecision::Approved, None, None),
            Err(Error::ActionNotFound(_))
        ));
        assert!(matches!(
            service.review_action("boss", &action.id, ReviewDecision::Approved, Some(-1), None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(service.list_pending_actions("u1"), Err(Error::AdminRequired)));
        assert_eq!(service.list_pending_actions("boss").unwrap().len(), 1);
    }

    #[test]
    fn test_community_action_requires_membership() {
        let service = service();
        user(&service, "u1");
        let mut sub = submission(0.9);
        sub.community_id = Some("no-such-community".into());
        assert!(matches!(service.submit_action("u1", sub), Err(Error::NotMember)));
    }

    #[test]
    fn test_submission_grants_action_badges() {
        let service = service();
        user(&service, "u1");
        service.submit_action("u1", submission(0.9)).unwrap();
        let earned: Vec<String> = service
            .list_badges("u1")
            .unwrap()
            .into_iter()
            .filter(|b| b.earned)
            .map(|b| b.id)
            .collect();
        assert!(earned.contains(&"badge-first-action".to_string()));
        assert!(earned.contains(&"badge-first-approved".to_string()));
    }
}
