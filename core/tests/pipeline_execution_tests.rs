// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use storefront_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, StepMode};

#[tokio::test]
#[serial]
async fn runs_steps_in_declared_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", StepMode::Required, None),
    ("step2", StepMode::Required, None),
    ("step3", StepMode::Required, None),
  ]);

  pipeline.on_step("step1", create_simple_handler("step1", " S1"));
  pipeline.on_step("step2", create_simple_handler("step2", " S2"));
  pipeline.on_step("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn stop_control_halts_remaining_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("stepA", StepMode::Required, None),
    ("stopStep", StepMode::Required, None),
    ("stepC", StepMode::Required, None),
  ]);

  pipeline.on_step("stepA", create_simple_handler("stepA", "A"));
  pipeline.on_step("stopStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<PipelineControl, FlowError>(PipelineControl::Stop)
    })
  });
  pipeline.on_step("stepC", create_simple_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn required_step_error_aborts_run() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", StepMode::Required, None),
    ("bad_step", StepMode::Required, None),
    ("another_step", StepMode::Required, None),
  ]);

  pipeline.on_step("good_step", create_simple_handler("good_step", "Good"));
  pipeline.on_step("bad_step", create_failing_handler("bad_step", "declined"));
  pipeline.on_step("another_step", create_simple_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Handler("declined".to_string())));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn advisory_step_failure_is_recorded_and_run_continues() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("commit", StepMode::Required, None),
    ("forward", StepMode::Advisory, None),
    ("respond", StepMode::Required, None),
  ]);

  pipeline.on_step("commit", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().committed = true;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  pipeline.on_step("forward", create_failing_handler("forward", "upstream timed out"));
  pipeline.on_step("respond", create_simple_handler("respond", "ok"));

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run_with_report(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Completed);
  assert!(!report.is_clean());
  let failure = report.failure_for("forward").expect("advisory failure recorded");
  assert!(failure.message.contains("upstream timed out"));

  let guard = ctx.read();
  assert!(guard.committed);
  assert_eq!(guard.steps_executed, vec!["forward", "respond"]);
}

#[tokio::test]
#[serial]
async fn advisory_failure_skips_rest_of_that_step_only() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("forward", StepMode::Advisory, None)]);
  pipeline.on_step("forward", create_failing_handler("forward", "boom"));
  pipeline.after_step("forward", create_simple_handler("forward_after", "never"));

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run_with_report(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Completed);
  assert_eq!(report.advisory_failures.len(), 1);
  assert_eq!(ctx.read().message, "");
}

#[tokio::test]
#[serial]
async fn skip_condition_bypasses_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", StepMode::Required, None),
    (
      "step_to_skip",
      StepMode::Required,
      Some(Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0)),
    ),
    ("step3", StepMode::Required, None),
  ]);

  pipeline.on_step("step1", create_simple_handler("step1", " S1"));
  pipeline.on_step("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED"));
  pipeline.on_step("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().message, " S1 S3");
}

#[tokio::test]
#[serial]
async fn before_on_after_run_in_phase_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("only", StepMode::Required, None)]);
  pipeline.after_step("only", create_simple_handler("after", "c"));
  pipeline.on_step("only", create_simple_handler("on", "b"));
  pipeline.before_step("only", create_simple_handler("before", "a"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "abc");
}

#[tokio::test]
#[serial]
async fn optional_and_advisory_steps_may_lack_handlers() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("optional_step", StepMode::Optional, None),
    ("advisory_step", StepMode::Advisory, None),
  ]);

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run_with_report(ctx).await.unwrap();
  assert!(report.is_clean());
}

#[tokio::test]
#[serial]
async fn inserted_steps_run_at_their_position() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("first", StepMode::Required, None),
    ("last", StepMode::Required, None),
  ]);
  pipeline
    .insert_after_step("first", "middle", StepMode::Required, None)
    .unwrap();
  pipeline.on_step("first", create_simple_handler("first", "1"));
  pipeline.on_step("middle", create_simple_handler("middle", "2"));
  pipeline.on_step("last", create_simple_handler("last", "3"));

  assert_eq!(pipeline.step_names(), vec!["first", "middle", "last"]);
  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "123");

  pipeline.remove_step("middle");
  assert_eq!(pipeline.step_names(), vec!["first", "last"]);
  assert!(pipeline.insert_before_step("missing", "x", StepMode::Optional, None).is_err());
}
