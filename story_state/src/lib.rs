//! # Story State
//!
//! The "Story Bible" crate - holds every piece of state a serialized narrative
//! accumulates: narrative lines, story units, tensions between lines, thematic
//! questions and the dramatic structure.
//! This crate is the single source of truth for narrative state and does not
//! contain any scoring, rule or pipeline logic.

mod de;
pub mod error;
pub mod lines;
pub mod mechanics;
pub mod project;
pub mod structure;
pub mod units;

pub use error::*;
pub use lines::*;
pub use mechanics::*;
pub use project::*;
pub use structure::*;
pub use units::*;
