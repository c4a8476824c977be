//! # Narrative Engine
//!
//! The computational core that sits on top of `story_state`. It scores lines,
//! fires advisory rules, grades the story against evaluator profiles and runs
//! the agent pipeline that turns one cycle of external generation back into
//! state.
//!
//! ## Core Components
//!
//! - **scoring**: urgency, importance and global tension
//! - **rules**: mechanical and structural rule registry producing ranked alerts
//! - **criteria**: weighted evaluator profiles and their heuristics
//! - **evaluation**: pre/post evaluation snapshots and project statistics
//! - **pipeline**: SELECT, BRIEF(role) and APPLY over a single project
//!
//! ## Design Philosophy
//!
//! - **Computation, not generation**: the engine never writes prose; agents
//!   report *that* something happened and the engine decides how the numbers move
//! - **Explicit context**: every call takes the project it works on; nothing is
//!   cached between cycles
//! - **Advisory output**: alerts and criterion scores describe problems, they
//!   never fail an operation

pub mod config;
pub mod criteria;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod rules;
pub mod scoring;

pub use config::*;
pub use criteria::*;
pub use error::*;
pub use evaluation::*;
pub use pipeline::*;
pub use rules::*;
pub use scoring::*;
