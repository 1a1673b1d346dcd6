//! In-memory session tallies for batch verification runs.
//!
//! A session lives only for the duration of one run. Nothing is persisted.

mod error;
mod store;
mod types;

pub use error::SessionError;
pub use store::SessionRegistry;
pub use types::*;
