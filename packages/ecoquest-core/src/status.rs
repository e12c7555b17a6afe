//! # Status Enums
//!
//! Closed variants for every status column, with the allowed transitions
//! spelled out per entity. Stores check `can_transition_to` before writing
//! a new status, so an illegal move is rejected before any mutation.
//!
//! ```text
//! ChallengeStatus   NOT_STARTED ──► IN_PROGRESS ──► COMPLETED
//! SessionStatus     ACTIVE ──► COMPLETED | ABANDONED
//! ActionStatus      PENDING ──► AI_APPROVED | APPROVED | REJECTED
//! RequestStatus     PENDING ──► APPROVED | REJECTED
//! ```

use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display`, `FromStr` and the rusqlite conversions
/// for a fieldless enum stored as TEXT.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The stored/serialized representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::Error::InvalidArgument(format!(
                        "unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl ::rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> ::rusqlite::Result<::rusqlite::types::ToSqlOutput<'_>> {
                Ok(::rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl ::rusqlite::types::FromSql for $name {
            fn column_result(
                value: ::rusqlite::types::ValueRef<'_>,
            ) -> ::rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse()
                    .map_err(|e: $crate::error::Error| ::rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub(crate) use text_enum;

// ============================================================================
// PROFILE & MEMBERSHIP
// ============================================================================

/// Profile role. The admin flag is stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    /// Default role
    Member,
    /// Promoted when a community request is approved
    CommunityLeader,
}

text_enum!(ProfileRole {
    Member => "member",
    CommunityLeader => "community_leader",
});

/// Role inside a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    /// Regular member
    Member,
    /// Community founder
    Leader,
}

text_enum!(MemberRole {
    Member => "MEMBER",
    Leader => "LEADER",
});

// ============================================================================
// CHALLENGES & GAMES
// ============================================================================

/// Challenge difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    /// Easy
    Easy,
    /// Medium
    Medium,
    /// Hard
    Hard,
}

text_enum!(Difficulty {
    Easy => "EASY",
    Medium => "MEDIUM",
    Hard => "HARD",
});

/// Per-user challenge progress status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    /// No record yet
    NotStarted,
    /// Started, progress below the maximum
    InProgress,
    /// Progress reached the maximum; points were awarded
    Completed,
}

text_enum!(ChallengeStatus {
    NotStarted => "NOT_STARTED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
});

impl ChallengeStatus {
    /// Forward-only transitions.
    pub fn can_transition_to(self, next: ChallengeStatus) -> bool {
        matches!(
            (self, next),
            (ChallengeStatus::NotStarted, ChallengeStatus::InProgress)
                | (ChallengeStatus::InProgress, ChallengeStatus::Completed)
        )
    }
}

/// Kind of mini-game a session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    /// Drag-and-drop waste sorting
    WasteSorting,
    /// Multiple-choice quiz
    Quiz,
    /// Household carbon calculator
    CarbonCalculator,
    /// A play-through of a catalog challenge
    Challenge,
}

text_enum!(GameType {
    WasteSorting => "waste_sorting",
    Quiz => "quiz",
    CarbonCalculator => "carbon_calculator",
    Challenge => "challenge",
});

/// Game session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Being played
    Active,
    /// Finished; score > 0 was awarded once
    Completed,
    /// Given up
    Abandoned,
}

text_enum!(SessionStatus {
    Active => "ACTIVE",
    Completed => "COMPLETED",
    Abandoned => "ABANDONED",
});

impl SessionStatus {
    /// Only active sessions may change.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        self == SessionStatus::Active && next != SessionStatus::Active
    }
}

// ============================================================================
// REVIEWS
// ============================================================================

/// Eco-action review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    /// Awaiting manual review
    Pending,
    /// Accepted by the automatic pre-screen
    AiApproved,
    /// Accepted by an administrator
    Approved,
    /// Refused by an administrator
    Rejected,
}

text_enum!(ActionStatus {
    Pending => "PENDING",
    AiApproved => "AI_APPROVED",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl ActionStatus {
    /// Every decision leaves PENDING; nothing leaves a decided state.
    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        self == ActionStatus::Pending && next != ActionStatus::Pending
    }

    /// Whether points were (or will be) granted for this status.
    pub fn is_accepted(self) -> bool {
        matches!(self, ActionStatus::AiApproved | ActionStatus::Approved)
    }
}

/// Moderation status shared by community requests and communities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Awaiting an admin decision
    Pending,
    /// Approved
    Approved,
    /// Rejected
    Rejected,
}

text_enum!(RequestStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl RequestStatus {
    /// PENDING is the only reviewable state.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == RequestStatus::Pending && next != RequestStatus::Pending
    }
}

/// An administrator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    /// Accept
    Approved,
    /// Refuse
    Rejected,
}

text_enum!(ReviewDecision {
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl From<ReviewDecision> for ActionStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ActionStatus::Approved,
            ReviewDecision::Rejected => ActionStatus::Rejected,
        }
    }
}

impl From<ReviewDecision> for RequestStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => RequestStatus::Approved,
            ReviewDecision::Rejected => RequestStatus::Rejected,
        }
    }
}

// ============================================================================
// LEADERBOARD
// ============================================================================

/// Leaderboard aggregation window stored on `leaderboard_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Running total, updated on every award
    Global,
    /// Current ISO week, rebuilt by the rollup
    Weekly,
    /// Current calendar month, rebuilt by the rollup
    Monthly,
}

text_enum!(Period {
    Global => "global",
    Weekly => "weekly",
    Monthly => "monthly",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_transitions_are_forward_only() {
        use ChallengeStatus::*;
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(NotStarted));
        assert!(!Completed.can_transition_to(Completed));
    }

    #[test]
    fn test_action_transitions() {
        use ActionStatus::*;
        assert!(Pending.can_transition_to(AiApproved));
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!AiApproved.can_transition_to(Approved));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(AiApproved.is_accepted());
        assert!(Approved.is_accepted());
        assert!(!Rejected.is_accepted());
    }

    #[test]
    fn test_session_transitions() {
        use SessionStatus::*;
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Abandoned));
        assert!(!Completed.can_transition_to(Abandoned));
        assert!(!Abandoned.can_transition_to(Completed));
    }

    #[test]
    fn test_text_round_trip_and_unknown_value() {
        assert_eq!("AI_APPROVED".parse::<ActionStatus>().unwrap(), ActionStatus::AiApproved);
        assert_eq!(Period::Monthly.to_string(), "monthly");
        assert!("approved".parse::<ActionStatus>().is_err());
    }

    #[test]
    fn test_serde_matches_stored_text() {
        let json = serde_json::to_string(&ChallengeStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let json = serde_json::to_string(&ProfileRole::CommunityLeader).unwrap();
        assert_eq!(json, "\"community_leader\"");
        let json = serde_json::to_string(&GameType::CarbonCalculator).unwrap();
        assert_eq!(json, format!("\"{}\"", GameType::CarbonCalculator.as_str()));
    }
}
