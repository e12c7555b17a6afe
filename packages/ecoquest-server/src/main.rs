//! EcoQuest Server
//!
//! HTTP front for the EcoQuest ledger. It provides:
//!
//! 1. **Progression**: challenges, mini-game sessions and daily tasks, each
//!    paying points into the ledger exactly once.
//!
//! 2. **Eco-actions**: photo-verified submissions, auto-approved above the
//!    confidence threshold and otherwise queued for admin review.
//!
//! 3. **Communities**: moderated creation requests, join codes, membership
//!    and community-scoped leaderboards.
//!
//! Caller identity comes from the `x-user-id` header set by the identity
//! provider in front of this service.

mod api;
mod auth;
mod state;

use std::time::Duration;

use clap::Parser;
use ecoquest_core::{Database, DatabaseConfig, EcoService, RulesConfig};

use state::{AppState, ServerConfig};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ecoquest-server", version, about = "EcoQuest points and progression server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "ECOQUEST_PORT")]
    port: u16,

    /// SQLite database file. In-memory when omitted.
    #[arg(long, env = "ECOQUEST_DATABASE")]
    database: Option<String>,

    /// User ids granted administrator rights (comma-separated)
    #[arg(long, env = "ECOQUEST_ADMIN_IDS", value_delimiter = ',')]
    admin_ids: Vec<String>,

    /// Points required to request a community
    #[arg(long, default_value_t = ecoquest_core::config::DEFAULT_COMMUNITY_THRESHOLD, env = "ECOQUEST_COMMUNITY_THRESHOLD")]
    community_threshold: i64,

    /// Minimum AI confidence for automatic eco-action approval
    #[arg(long, default_value_t = ecoquest_core::config::DEFAULT_AI_APPROVAL_THRESHOLD, env = "ECOQUEST_AI_APPROVAL_THRESHOLD")]
    ai_approval_threshold: f64,

    /// Points for an approved eco-action
    #[arg(long, default_value_t = ecoquest_core::config::DEFAULT_ACTION_POINTS, env = "ECOQUEST_ACTION_POINTS")]
    action_points: i64,

    /// Highest score a game session may report
    #[arg(long, default_value_t = ecoquest_core::config::DEFAULT_MAX_SESSION_SCORE, env = "ECOQUEST_MAX_SESSION_SCORE")]
    max_session_score: i64,

    /// Weekly/monthly leaderboard rollup interval in seconds
    #[arg(long, default_value_t = 300, env = "ECOQUEST_ROLLUP_INTERVAL_SECS")]
    rollup_interval_secs: u64,

    /// Insert the default challenge, badge and task catalog on startup
    #[arg(long, default_value_t = true, env = "ECOQUEST_SEED_CATALOG", action = clap::ArgAction::Set)]
    seed_catalog: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "ECOQUEST_JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn rules(&self) -> RulesConfig {
        RulesConfig {
            community_threshold: self.community_threshold,
            ai_approval_threshold: self.ai_approval_threshold,
            action_points: self.action_points,
            max_session_score: self.max_session_score,
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            admin_ids: self
                .admin_ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            rollup_interval_secs: self.rollup_interval_secs,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecoquest_server=info,ecoquest_core=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let db_config = DatabaseConfig {
        path: args.database.clone(),
        seed_catalog: args.seed_catalog,
    };
    let db = match Database::from_config(&db_config) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };
    if db_config.path.is_none() {
        tracing::warn!("No database path configured; data lives in memory only");
    }

    let state = AppState::new(EcoService::new(db, args.rules()), args.server_config());
    match state.apply_admin_ids() {
        Ok(promoted) => tracing::info!(
            configured = state.config.admin_ids.len(),
            promoted = promoted,
            "Admin ids applied"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to apply admin ids"),
    }

    // Spawn periodic leaderboard rollup
    let rollup_state = state.clone();
    let rollup_interval = state.config.rollup_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(rollup_interval));
        loop {
            interval.tick().await;
            let now = ecoquest_core::time::now_timestamp();
            if let Err(e) = rollup_state.run(move |service| service.rollup_periods(now)).await {
                tracing::warn!(error = %e.message, "Leaderboard rollup failed");
            }
        }
    });

    let app = api::router(state.clone());

    let addr = format!("0.0.0.0:{}", state.config.port);
    tracing::info!("EcoQuest server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["ecoquest-server"]);
        assert_eq!(args.port, 8080);
        assert!(args.database.is_none());
        assert!(args.seed_catalog);
        let rules = args.rules();
        assert_eq!(rules.community_threshold, 500);
        assert_eq!(rules.action_points, 25);
        assert_eq!(rules.ai_approval_threshold, 0.8);
        assert_eq!(rules.max_session_score, 1000);
    }

    #[test]
    fn test_admin_ids_are_split_and_trimmed() {
        let args = Args::parse_from(["ecoquest-server", "--admin-ids", "alice, bob,,"]);
        let config = args.server_config();
        assert_eq!(config.admin_ids.len(), 2);
        assert!(config.admin_ids.contains("alice"));
        assert!(config.admin_ids.contains("bob"));
    }

    #[test]
    fn test_seed_catalog_can_be_disabled() {
        let args = Args::parse_from(["ecoquest-server", "--seed-catalog", "false"]);
        assert!(!args.seed_catalog);
    }
}
