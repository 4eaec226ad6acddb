// src/lib.rs

//! storefront-flow: asynchronous named-step pipelines.
//!
//! A pipeline is an ordered list of named steps run against a shared
//! [`ContextData`]. Each step carries a [`StepMode`]:
//!  - `Required` steps must have a handler, and their errors abort the run.
//!  - `Optional` steps may be left without handlers.
//!  - `Advisory` steps run like required ones, but a failing handler is logged
//!    and recorded in the [`RunReport`] instead of failing the run.
//!
//! Advisory steps model work that happens after a committed write and must not
//! undo it, e.g. forwarding a stored order to a third party.
//!
//! Pipelines are registered in a [`Flows`] registry keyed by their context
//! type, so callers only need to build a context and call `run`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{AdvisoryFailure, PipelineControl, PipelineResult, RunReport};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef, StepMode};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flows;
