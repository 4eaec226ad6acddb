// src/registry.rs

//! `Flows<E>`: pipelines keyed by their context data type.
//!
//! A pipeline over `ContextData<T>` is registered once at start-up and later
//! found again from the context type alone.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineResult, RunReport};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must hold the `ContextData<TData>` the wrapped pipeline runs on.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<RunReport, AppErr>;

  fn pipeline_name(&self) -> &str;
}

struct TypedRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedRunner<AppErr> for TypedRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<RunReport, AppErr> {
    let ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, expected_type, "Context object type mismatch.");
        return Err(AppErr::from(FlowError::TypeMismatch {
          step_name: "registry_dispatch".to_string(),
          expected_type: expected_type.to_string(),
        }));
      }
    };
    self.pipeline.run_with_report(ctx_data).await.map_err(AppErr::from)
  }

  fn pipeline_name(&self) -> &str {
    self.pipeline.name()
  }
}

/// Registry of pipelines. `AppErr` is what `run` returns; it must absorb both
/// the pipelines' handler errors and framework errors.
pub struct Flows<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  registry: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Default for Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for its context type, replacing any earlier one.
  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(Level::DEBUG, pipeline = %pipeline.name(), "Registering pipeline.");
    let runner = TypedRunner::<TData, HandlerErr, AppErr> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    };
    self.registry.write().insert(TypeId::of::<TData>(), Arc::new(runner));
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.registry.read().contains_key(&TypeId::of::<TData>())
  }

  /// Names of the registered pipelines, sorted.
  pub fn pipeline_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .registry
      .read()
      .values()
      .map(|runner| runner.pipeline_name().to_string())
      .collect();
    names.sort();
    names
  }

  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    self.run_with_report(ctx_data).await.map(|report| report.result)
  }

  #[instrument(name = "Flows::run", skip_all, fields(context_type = %std::any::type_name::<TData>()))]
  pub async fn run_with_report<TData>(&self, ctx_data: ContextData<TData>) -> Result<RunReport, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self
      .registry
      .read()
      .get(&TypeId::of::<TData>())
      .cloned()
      .ok_or_else(|| {
        let context_type = std::any::type_name::<TData>();
        event!(Level::ERROR, context_type, "No pipeline registered.");
        AppErr::from(FlowError::PipelineNotRegistered {
          context_type: context_type.to_string(),
        })
      })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}
