//! # scribe-store
//!
//! Local on-disk storage for settings that must stay on this machine and are
//! never sent through the backend's config path (the MCP launch settings).
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every stored value.

pub mod database;
pub mod migrations;
pub mod models;
pub mod settings;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
