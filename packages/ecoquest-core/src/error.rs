//! # Error Handling
//!
//! Error types for EcoQuest Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                     ErrorKind                       │
//! │  │                                                                      │
//! │  ├── Access Errors (100-199)                                           │
//! │  │   ├── Unauthenticated         ──►  Unauthorized                     │
//! │  │   ├── AdminRequired           ──►  Forbidden                        │
//! │  │   ├── NotOwner                ──►  Forbidden                        │
//! │  │   └── NotMember               ──►  Forbidden                        │
//! │  │                                                                      │
//! │  ├── Lookup Errors (200-299)                                           │
//! │  │   ├── ProfileNotFound, ChallengeNotFound, SessionNotFound ...       │
//! │  │   └── JoinCodeNotFound        ──►  NotFound                         │
//! │  │                                                                      │
//! │  ├── Argument Errors (300-399)                                         │
//! │  │   ├── InvalidArgument         ──►  InvalidArgument                  │
//! │  │   ├── ChallengeNotStarted     ──►  InvalidArgument                  │
//! │  │   └── InvalidTransition       ──►  InvalidArgument                  │
//! │  │                                                                      │
//! │  ├── Conflict Errors (400-499)                                         │
//! │  │   ├── AlreadyReviewed, RequestPending, NameTaken                    │
//! │  │   └── AlreadyMember, AlreadyFinished, TaskAlreadyCompleted          │
//! │  │                                                                      │
//! │  ├── Eligibility Errors (500-599)                                      │
//! │  │   └── InsufficientPoints      ──►  InsufficientEligibility          │
//! │  │                                                                      │
//! │  └── Internal Errors (900-999)                                         │
//! │      ├── DatabaseError, SerializationError                             │
//! │      └── Internal                ──►  Internal                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every ledger-touching operation either commits or returns one of these
//! with the transaction rolled back, so an error always means "no counters
//! changed".

use thiserror::Error;

/// Result type alias for EcoQuest Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No valid caller identity
    Unauthorized,
    /// Authenticated but lacking admin or ownership rights
    Forbidden,
    /// Referenced entity is absent
    NotFound,
    /// Malformed or missing input
    InvalidArgument,
    /// Duplicate or already-decided state
    Conflict,
    /// Points threshold not met
    InsufficientEligibility,
    /// Storage or other unexpected failure
    Internal,
}

/// Main error type for EcoQuest Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Access Errors (100-199)
    // ========================================================================

    /// No caller identity was supplied
    #[error("Authentication required.")]
    Unauthenticated,

    /// The caller is not an administrator
    #[error("Administrator privileges are required.")]
    AdminRequired,

    /// The caller does not own the referenced record
    #[error("This {0} belongs to another user.")]
    NotOwner(&'static str),

    /// Caller is not an active member of the community
    #[error("Not a member of this community.")]
    NotMember,

    // ========================================================================
    // Lookup Errors (200-299)
    // ========================================================================

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Challenge not found
    #[error("Challenge not found: {0}")]
    ChallengeNotFound(String),

    /// Game session not found
    #[error("Game session not found: {0}")]
    SessionNotFound(String),

    /// Eco-action not found
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// Community not found
    #[error("Community not found: {0}")]
    CommunityNotFound(String),

    /// Community request not found
    #[error("Community request not found: {0}")]
    RequestNotFound(String),

    /// No community uses this join code
    #[error("Invalid join code.")]
    JoinCodeNotFound,

    /// Badge not found
    #[error("Badge not found: {0}")]
    BadgeNotFound(String),

    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // ========================================================================
    // Argument Errors (300-399)
    // ========================================================================

    /// Missing or malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `advance` called before `start`
    #[error("Challenge has not been started.")]
    ChallengeNotStarted,

    /// A status change not allowed by the transition table
    #[error("Invalid status transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        /// Entity kind ("action", "challenge progress", ...)
        entity: &'static str,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    // ========================================================================
    // Conflict Errors (400-499)
    // ========================================================================

    /// Action or community request was already decided
    #[error("This {0} has already been reviewed.")]
    AlreadyReviewed(&'static str),

    /// The user already has a pending community request
    #[error("You already have a pending community request.")]
    RequestPending,

    /// Community name collides with an existing community or pending request
    #[error("Community name is already taken: {0}")]
    NameTaken(String),

    /// Already an active member of the community
    #[error("Already a member of this community.")]
    AlreadyMember,

    /// Game session is no longer active
    #[error("Game session has already finished.")]
    AlreadyFinished,

    /// Task was already completed today
    #[error("Task already completed today.")]
    TaskAlreadyCompleted,

    // ========================================================================
    // Eligibility Errors (500-599)
    // ========================================================================

    /// Not enough points to perform the operation
    #[error("Insufficient points: have {current}, need {required}.")]
    InsufficientPoints {
        /// The caller's current total
        current: i64,
        /// The threshold
        required: i64,
    },

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// - 100-199: Access
    /// - 200-299: Lookup
    /// - 300-399: Arguments
    /// - 400-499: Conflicts
    /// - 500-599: Eligibility
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Access (100-199)
            Error::Unauthenticated => 100,
            Error::AdminRequired => 101,
            Error::NotOwner(_) => 102,
            Error::NotMember => 103,

            // Lookup (200-299)
            Error::ProfileNotFound(_) => 200,
            Error::ChallengeNotFound(_) => 201,
            Error::SessionNotFound(_) => 202,
            Error::ActionNotFound(_) => 203,
            Error::CommunityNotFound(_) => 204,
            Error::RequestNotFound(_) => 205,
            Error::JoinCodeNotFound => 206,
            Error::BadgeNotFound(_) => 207,
            Error::TaskNotFound(_) => 208,

            // Arguments (300-399)
            Error::InvalidArgument(_) => 300,
            Error::ChallengeNotStarted => 301,
            Error::InvalidTransition { .. } => 302,

            // Conflicts (400-499)
            Error::AlreadyReviewed(_) => 400,
            Error::RequestPending => 401,
            Error::NameTaken(_) => 402,
            Error::AlreadyMember => 403,
            Error::AlreadyFinished => 404,
            Error::TaskAlreadyCompleted => 405,

            // Eligibility (500-599)
            Error::InsufficientPoints { .. } => 500,

            // Internal (900-999)
            Error::DatabaseError(_) => 900,
            Error::SerializationError(_) => 901,
            Error::Internal(_) => 902,
        }
    }

    /// Classify this error into the taxonomy the API surfaces.
    pub fn kind(&self) -> ErrorKind {
        match self.code() {
            100 => ErrorKind::Unauthorized,
            101..=199 => ErrorKind::Forbidden,
            200..=299 => ErrorKind::NotFound,
            300..=399 => ErrorKind::InvalidArgument,
            400..=499 => ErrorKind::Conflict,
            500..=599 => ErrorKind::InsufficientEligibility,
            _ => ErrorKind::Internal,
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
