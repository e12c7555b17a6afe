//! # EcoQuest Core
//!
//! Points and progression ledger for the EcoQuest eco-education game:
//! challenges, mini-game sessions, photo-verified eco-actions, communities,
//! badges, daily tasks and leaderboards, all backed by one SQLite database.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ECOQUEST CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐            │
//! │  │ Challenges │ │  Sessions  │ │  Actions   │ │   Tasks    │            │
//! │  │ start      │ │ complete   │ │ submit     │ │ complete   │            │
//! │  │ advance    │ │ abandon    │ │ review     │ │ (daily)    │            │
//! │  └─────┬──────┘ └─────┬──────┘ └─────┬──────┘ └─────┬──────┘            │
//! │        └──────────────┴──────┬───────┴──────────────┘                   │
//! │                              ▼                                          │
//! │                   ┌────────────────────┐        ┌──────────────┐        │
//! │                   │  Ledger            │        │ Communities  │        │
//! │                   │  award_points      │◄───────│ request      │        │
//! │                   │  touch_streak      │        │ review, join │        │
//! │                   └─────────┬──────────┘        └──────────────┘        │
//! │                             ▼                                           │
//! │  ┌────────────┐   ┌────────────────────┐   ┌──────────────────┐         │
//! │  │  Badges    │   │  Storage (SQLite)  │   │  Leaderboard     │         │
//! │  │  evaluate  │──►│  one tx per op     │◄──│  query + rollup  │         │
//! │  └────────────┘   └────────────────────┘   └──────────────────┘         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation that changes points runs inside a single database
//! transaction and commits or rolls back as a whole. Badge evaluation runs
//! after the commit of the operation that triggered it.
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types and their categories
//! - [`storage`] - SQLite schema, records and transaction helpers
//! - [`ledger`] - The point award and streak primitives
//! - [`service`] - [`EcoService`], the entry point for every operation

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod actions;
pub mod badges;
pub mod challenges;
pub mod communities;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod ledger;
pub mod profiles;
pub mod rollup;
pub mod service;
pub mod sessions;
pub mod status;
pub mod storage;
pub mod tasks;
/// UTC time helpers.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use actions::ActionSubmission;
pub use badges::{BadgeCondition, BadgeRecord, BadgeStatus, UserStats};
pub use challenges::AdvanceOutcome;
pub use communities::RequestReview;
pub use config::RulesConfig;
pub use error::{Error, ErrorKind, Result};
pub use leaderboard::{LeaderboardMode, LeaderboardView, RankedEntry};
pub use profiles::ProfileSummary;
pub use rollup::RollupSummary;
pub use service::EcoService;
pub use status::{
    ActionStatus, ChallengeStatus, Difficulty, GameType, MemberRole, Period, ProfileRole,
    RequestStatus, ReviewDecision, SessionStatus,
};
pub use storage::{Database, DatabaseConfig};
pub use tasks::{TaskCompletion, TaskStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
