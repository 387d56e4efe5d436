//! Offline Push/Pull/Legs workout tracking.
//!
//! The [`Database`] handle owns the SQLite connection. Domain operations are
//! free functions in the modules below taking `&Database` for reads and
//! `&mut Database` for writes.

pub mod analysis;
pub mod catalog;
pub mod error;
pub mod export;
pub mod history;
pub mod migrations;
pub mod models;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod store;
pub mod templates;
pub mod watch;
pub mod workouts;

pub use error::{Error, Result};
pub use settings::Settings;
pub use store::Database;
