// tests/error_handling_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_flow::{ContextData, FlowError, Pipeline, PipelineControl, StepMode};

#[tokio::test]
#[serial]
async fn required_step_without_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("missing", StepMode::Required, None)]);
  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn pipeline_can_use_flow_error_directly() {
  setup_tracing();
  let mut failing = Pipeline::<TestContext, FlowError>::new(&[("fail_task", StepMode::Required, None)]);
  failing.on_step("fail_task", |_ctx| {
    Box::pin(async move { Err::<PipelineControl, _>(FlowError::Internal("intentional".to_string())) })
  });

  match failing.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "intentional"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn advisory_step_does_not_mask_later_required_failure() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("advisory", StepMode::Advisory, None),
    ("required", StepMode::Required, None),
  ]);
  pipeline.on_step("advisory", create_failing_handler("advisory", "soft"));
  pipeline.on_step("required", create_failing_handler("required", "hard"));

  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  assert_eq!(result, Err(TestError::Handler("hard".to_string())));
}

#[test]
fn anyhow_wrapping_a_flow_error_unwraps_to_it() {
  let wrapped = anyhow::Error::new(FlowError::Internal("inner".to_string()));
  match FlowError::from(wrapped) {
    FlowError::Internal(s) => assert_eq!(s, "inner"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }

  let foreign = anyhow::anyhow!("socket closed");
  assert!(matches!(FlowError::from(foreign), FlowError::HandlerError { .. }));
}
