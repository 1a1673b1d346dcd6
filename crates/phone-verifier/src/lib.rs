//! Phone-number existence verification.
//!
//! `HttpVerifier` performs exactly one attempt per call and reports either a
//! terminal `Presence` or a `VerifyError`; retry policy belongs to the caller.

mod client;
mod error;
mod types;

pub use client::{HttpVerifier, PhoneLookup};
pub use error::VerifyError;
pub use types::*;
