mod database;
mod unit;

pub use database::Database;
pub use unit::{Reconcile, UnitOfWork, UnitSummary};

// Bumping this drops and recreates every table on next start
pub const SCHEMA_VERSION: &str = "1";
