// tests/context_management_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_flow::{ContextData, FlowError, Pipeline, PipelineControl, StepMode};

#[tokio::test]
#[serial]
async fn context_changes_are_visible_to_later_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("set", StepMode::Required, None),
    ("read_and_extend", StepMode::Required, None),
  ]);

  pipeline.on_step("set", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter = 10;
      guard.message = "set".to_string();
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  pipeline.on_step("read_and_extend", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      assert_eq!(guard.counter, 10);
      guard.counter += 5;
      guard.message.push_str("+extended");
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let snapshot = ctx.snapshot();
  assert_eq!(snapshot.counter, 15);
  assert_eq!(snapshot.message, "set+extended");
}

#[tokio::test]
#[serial]
async fn clones_share_the_same_data() {
  setup_tracing();
  let original = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned = original.clone();

  original.update(|c| c.counter = 5);
  assert_eq!(cloned.read().counter, 5);

  cloned.write().counter = 10;
  assert_eq!(*original.map_read(|c| &c.counter), 10);
}

#[tokio::test]
#[serial]
async fn handler_may_await_between_lock_scopes() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("io", StepMode::Required, None)]);
  pipeline.on_step("io", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let before = { ctx.read().counter };
      tokio::time::sleep(std::time::Duration::from_millis(5)).await;
      ctx.write().counter = before + 1;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().counter, 1);
}
