// tests/registry_tests.rs
mod common;

use common::*;
use storefront_flow::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult, StepMode};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct PlaceContext {
  val: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SettleContext {
  num: i32,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut place = Pipeline::<PlaceContext, TestError>::new(&[("place", StepMode::Required, None)]).named("place");
  place.on_step("place", |ctx: ContextData<PlaceContext>| {
    Box::pin(async move {
      ctx.write().val = "placed".to_string();
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  flows.register_pipeline(place);

  let mut settle = Pipeline::<SettleContext, TestError>::new(&[("settle", StepMode::Required, None)]).named("settle");
  settle.on_step("settle", |ctx: ContextData<SettleContext>| {
    Box::pin(async move {
      ctx.write().num = 100;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  flows.register_pipeline(settle);

  assert!(flows.is_registered::<PlaceContext>());
  assert_eq!(flows.pipeline_names(), vec!["place".to_string(), "settle".to_string()]);

  let place_ctx = ContextData::new(PlaceContext::default());
  assert_eq!(flows.run(place_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(place_ctx.read().val, "placed");

  let settle_ctx = ContextData::new(SettleContext::default());
  assert_eq!(flows.run(settle_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(settle_ctx.read().num, 100);
}

#[tokio::test]
async fn unregistered_context_type_is_an_error() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  #[derive(Clone, Debug, Default)]
  struct UnregisteredContext;

  let result = flows.run(ContextData::new(UnregisteredContext)).await;
  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("PipelineNotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected PipelineNotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn registry_reports_advisory_failures() {
  setup_tracing();
  let flows = Flows::<TestError>::new();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("commit", StepMode::Required, None),
    ("forward", StepMode::Advisory, None),
  ]);
  pipeline.on_step("commit", create_simple_handler("commit", "c"));
  pipeline.on_step("forward", create_failing_handler("forward", "offline"));
  flows.register_pipeline(pipeline);

  let report = flows
    .run_with_report(ContextData::new(TestContext::default()))
    .await
    .unwrap();
  assert_eq!(report.result, PipelineResult::Completed);
  assert_eq!(report.advisory_failures[0].step_name, "forward");
}
