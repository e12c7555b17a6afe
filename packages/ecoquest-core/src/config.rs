//! Game rules configuration.

/// Points required before a user may request a new community.
pub const DEFAULT_COMMUNITY_THRESHOLD: i64 = 500;

/// Minimum AI confidence for automatic eco-action approval.
pub const DEFAULT_AI_APPROVAL_THRESHOLD: f64 = 0.8;

/// Points for an approved eco-action (auto or manual default).
pub const DEFAULT_ACTION_POINTS: i64 = 25;

/// Highest score a single game session may report.
pub const DEFAULT_MAX_SESSION_SCORE: i64 = 1000;

/// Default leaderboard page size.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Largest leaderboard page a caller may ask for.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Tunable rule constants shared by the service operations.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub community_threshold: i64,
    pub ai_approval_threshold: f64,
    pub action_points: i64,
    /// Upper bound on a client-reported session score
    pub max_session_score: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            community_threshold: DEFAULT_COMMUNITY_THRESHOLD,
            ai_approval_threshold: DEFAULT_AI_APPROVAL_THRESHOLD,
            action_points: DEFAULT_ACTION_POINTS,
            max_session_score: DEFAULT_MAX_SESSION_SCORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = RulesConfig::default();
        assert_eq!(rules.community_threshold, 500);
        assert_eq!(rules.ai_approval_threshold, 0.8);
        assert_eq!(rules.action_points, 25);
        assert_eq!(rules.max_session_score, 1000);
    }
}
