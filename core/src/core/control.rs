// src/core/control.rs

//! Signals for controlling pipeline flow and the outcome of a pipeline run.

/// Signal from a handler indicating whether the pipeline should continue or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Continue with the remaining handlers and steps.
  Continue,
  /// Halt the pipeline. No further handlers or steps run.
  Stop,
}

/// Outcome of a full pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step that was not skipped ran to completion.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}

/// A failed advisory step. The run carried on past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryFailure {
  pub step_name: String,
  pub message: String,
}

/// Result of a run together with the advisory failures collected along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub result: PipelineResult,
  pub advisory_failures: Vec<AdvisoryFailure>,
}

impl RunReport {
  pub(crate) fn new(result: PipelineResult, advisory_failures: Vec<AdvisoryFailure>) -> Self {
    Self {
      result,
      advisory_failures,
    }
  }

  /// True when the run completed and no advisory step failed.
  pub fn is_clean(&self) -> bool {
    self.result == PipelineResult::Completed && self.advisory_failures.is_empty()
  }

  /// Looks up the failure recorded for `step_name`, if any.
  pub fn failure_for(&self, step_name: &str) -> Option<&AdvisoryFailure> {
    self.advisory_failures.iter().find(|f| f.step_name == step_name)
  }
}
