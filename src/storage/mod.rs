mod repository;

pub use repository::*;

/// SQL migration for initial schema (books and entries)
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for invoices
pub const MIGRATION_002_INVOICES: &str = include_str!("migrations/002_invoices.sql");
