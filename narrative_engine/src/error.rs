//! Error types for the engine.
//!
//! Narrative problems are never errors: they surface as alerts and criterion
//! scores. The types here cover malformed input and misuse of the pipeline.

use std::path::PathBuf;

use story_state::StateError;
use thiserror::Error;

use crate::pipeline::Role;
use crate::rules::RuleId;

/// A single rule failed to evaluate. The registry isolates these.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rule {rule} failed: {reason}")]
    Evaluation { rule: RuleId, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("The {role} brief needs {input}")]
    MissingInput { role: Role, input: &'static str },

    /// The project gained units since the run was selected.
    #[error("Run was selected at cycle {run_cycle} but the project is at cycle {project_cycle}")]
    StaleRun { run_cycle: i64, project_cycle: i64 },

    #[error("Could not read {role} output: {source}")]
    InvalidOutput {
        role: Role,
        source: serde_json::Error,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    Parse { message: String },
}

/// Umbrella error for callers driving the whole engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

pub type EngineResult<T> = Result<T, EngineError>;
