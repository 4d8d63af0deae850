//! Domain types and constants shared by every Scribe crate.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::*;
