//! Shared deterministic types for the digest pipeline.
//!
//! These types define stable contracts between components and the persisted
//! run log. Serialized names must stay stable across releases.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Token counters reported by the generation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Terminal status of a run, as recorded in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run started but has not reached a terminal state yet.
    Unknown,
    Success,
    /// A digest already exists for the computed period; nothing was generated.
    SkippedExists,
    /// The post-review document failed header validation.
    FailedValidation,
    /// Any other error escaped the pipeline.
    FailedException,
    FailedNoApiKey,
}

impl RunStatus {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            RunStatus::FailedValidation | RunStatus::FailedException | RunStatus::FailedNoApiKey
        )
    }
}

/// Last pipeline phase a run reached. Failure is recorded in [`RunStatus`],
/// so a failed run keeps the phase it failed after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    PeriodComputed,
    /// A digest for the period already existed; the run stopped here.
    SkippedExisting,
    Generated,
    PreValidated,
    Reviewed,
    PostValidated,
    ImageSelected,
    Saved,
    Done,
}
