// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Framework-level failures. Application error types used with [`crate::Pipeline`]
/// and [`crate::Flows`] must implement `From<FlowError>`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  PipelineNotRegistered { context_type: String },

  #[error("Context type mismatch at '{step_name}' (expected {expected_type})")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(other) => FlowError::HandlerError { source: other },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
