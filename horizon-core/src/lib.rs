//! Core library for Horizon.
//!
//! This crate provides the domain models and database operations for Horizon,
//! independent of any transport layer.
//!
//! # Usage
//!
//! ```no_run
//! use horizon_core::db::Database;
//! use horizon_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let goals = db.list_goals(uuid::Uuid::new_v4(), &GoalFilter::default())?;
//! # Ok::<(), horizon_core::CoreError>(())
//! ```

pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::CoreError;
