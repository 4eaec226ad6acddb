// src/core/step.rs

//! Definition of a single pipeline step.

use super::ContextData;
use std::sync::Arc;

/// Predicate evaluated before a step runs. Returning `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// How the pipeline treats a step's handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
  /// Must have at least one handler; handler errors abort the run.
  Required,
  /// May have no handlers; handler errors still abort the run.
  Optional,
  /// May have no handlers; handler errors are recorded and the run continues.
  Advisory,
}

impl StepMode {
  pub fn allows_missing_handlers(self) -> bool {
    !matches!(self, StepMode::Required)
  }
}

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub mode: StepMode,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("mode", &self.mode)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
