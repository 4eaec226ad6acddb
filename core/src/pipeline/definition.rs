// src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural operations.

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef, StepMode};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered set of named steps over the context data `TData`.
///
/// `Err` is the error type returned by handlers and by `run`. It must be
/// constructible from [`FlowError`] so configuration problems found at run
/// time (a required step without handlers) can be reported through it.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, mode, skip_if)` tuples.
  pub fn new(step_defs: &[(&str, StepMode, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, mode, skip_cond_opt)| StepDef {
        name: (*name).to_string(),
        mode: *mode,
        skip_if: skip_cond_opt.clone(),
      })
      .collect();

    Self {
      name: std::any::type_name::<TData>().to_string(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Sets the name used in logs and spans. Defaults to the context type name.
  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn step(&self, step_name: &str) -> Option<&StepDef<TData>> {
    self.steps.iter().find(|s| s.name == step_name)
  }

  /// Panics when the step is unknown. Step names are fixed at definition time,
  /// so a miss here is a wiring bug.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: step '{}' not found in '{}'.", step_name, self.name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: step '{}' already exists in '{}'.", step_name, self.name);
    }
  }

  fn position_of(&self, step_name: &str) -> Result<usize, FlowError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  pub fn insert_before_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    mode: StepMode,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self.position_of(existing_step_name)?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx, StepDef { name, mode, skip_if });
    Ok(())
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    mode: StepMode,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self.position_of(existing_step_name)?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef { name, mode, skip_if });
    Ok(())
  }

  /// Removes a step with its handlers. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }

  pub fn set_mode(&mut self, step_name: &str, mode: StepMode) -> Result<(), FlowError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].mode = mode;
    Ok(())
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> Result<(), FlowError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
