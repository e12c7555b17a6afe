//! # EcoQuest Service
//!
//! Core service struct. The operations live in the per-domain modules as
//! `impl EcoService` blocks.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::RulesConfig;
use crate::storage::Database;

/// The main service. Every ledger operation hangs off it.
///
/// Cheap to clone; clones share the database handle.
#[derive(Clone)]
pub struct EcoService {
    db: Arc<Database>,
    rules: Arc<RulesConfig>,
}

impl EcoService {
    /// Create a service backed by the given database and rules.
    pub fn new(db: Database, rules: RulesConfig) -> Self {
        Self {
            db: Arc::new(db),
            rules: Arc::new(rules),
        }
    }

    /// Get a reference to the underlying database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The active rule set.
    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }
}

/// Generate a random record id.
pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
