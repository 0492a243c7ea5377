//! Triage Common - Shared types and schemas for the triage agent.
//!
//! Every record that crosses a file or service boundary lives here so the
//! daemon and its test doubles agree on one wire contract.

pub mod error;
pub mod types;
pub mod wire;

pub use error::*;
pub use types::*;
pub use wire::*;
