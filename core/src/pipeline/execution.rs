// src/pipeline/execution.rs

//! `Pipeline::run` and `Pipeline::run_with_report`.

use crate::core::context_data::ContextData;
use crate::core::control::{AdvisoryFailure, PipelineControl, PipelineResult, RunReport};
use crate::core::handler::Handler;
use crate::core::step::StepMode;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, Instrument, Level};

/// What happened to a single step.
enum StepOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data` and returns how the run ended.
  ///
  /// Advisory step failures are logged and otherwise ignored; use
  /// [`Pipeline::run_with_report`] to inspect them.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    self.run_with_report(ctx_data).await.map(|report| report.result)
  }

  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run_with_report(&self, ctx_data: ContextData<TData>) -> Result<RunReport, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut advisory_failures = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = tracing::info_span!(
        "pipeline_step",
        step_name = step_name,
        step_index = step_idx,
        mode = ?step_def.mode
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          step_span.in_scope(|| event!(Level::DEBUG, "Step skipped by its skip condition."));
          continue;
        }
      }

      if self.handler_count(step_name) == 0 {
        if step_def.mode.allows_missing_handlers() {
          step_span.in_scope(|| event!(Level::DEBUG, "Step has no handlers, skipping."));
          continue;
        }
        step_span.in_scope(|| event!(Level::ERROR, "Required step has no handlers."));
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let outcome = self.run_step(step_name, &ctx_data).instrument(step_span.clone()).await;

      match outcome {
        StepOutcome::Continue => {}
        StepOutcome::Stop => {
          step_span.in_scope(|| event!(Level::INFO, "Pipeline stopped by a handler."));
          return Ok(RunReport::new(PipelineResult::Stopped, advisory_failures));
        }
        StepOutcome::Failed(err) if step_def.mode == StepMode::Advisory => {
          step_span.in_scope(|| event!(Level::WARN, error = %err, "Advisory step failed; continuing."));
          advisory_failures.push(AdvisoryFailure {
            step_name: step_def.name.clone(),
            message: err.to_string(),
          });
        }
        StepOutcome::Failed(err) => {
          step_span.in_scope(|| event!(Level::ERROR, error = %err, "Step failed."));
          return Err(err);
        }
      }
    }

    event!(Level::DEBUG, advisory_failures = advisory_failures.len(), "Pipeline execution completed.");
    Ok(RunReport::new(PipelineResult::Completed, advisory_failures))
  }

  async fn run_step(&self, step_name: &str, ctx_data: &ContextData<TData>) -> StepOutcome<Err> {
    for (phase, table) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      if let Some(handlers) = table.get(step_name) {
        match Self::run_handlers(phase, handlers, ctx_data).await {
          StepOutcome::Continue => {}
          other => return other,
        }
      }
    }
    StepOutcome::Continue
  }

  async fn run_handlers(
    phase: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> StepOutcome<Err> {
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      event!(Level::TRACE, phase, handler_index = handler_idx, "Executing handler.");
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return StepOutcome::Stop,
        Err(e) => return StepOutcome::Failed(e),
      }
    }
    StepOutcome::Continue
  }
}
