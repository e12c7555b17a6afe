//! # Storage Module
//!
//! SQLite persistence for the ledger.
//!
//! - [`Database`] owns the connection and hands out transactions.
//! - [`schema`] holds the table definitions and the seeded catalog.
//! - [`records`] holds the row types shared by every service module.

mod database;
pub mod records;
pub mod schema;

pub use database::{Database, DatabaseConfig};
pub use records::*;
