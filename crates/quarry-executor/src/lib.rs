//! Quarry executors.
//!
//! Turns validated patterns into executable work:
//!
//! - **match**: each property compiles to [`EquivalentFragmentSet`]s, which
//!   [`TraversalPlan::compile`] deduplicates and orders by estimated cost;
//! - **insert**: each property compiles to [`Writer`]s, which
//!   [`InsertPlan::new`] schedules by dependency and [`WriteExecutor`] runs
//!   against a [`GraphStore`];
//! - **reasoning**: each conjunct becomes a [`quarry_reasoner::ReasonerQuery`].
//!
//! [`QueryCompiler`] ties the three together. [`MemoryStore`] is an
//! in-memory [`GraphStore`] used by tests and embedders.

pub mod compiler;
pub mod config;
pub mod error;
pub mod fragment;
pub mod plan;
pub mod property;
pub mod store;
pub mod write_executor;
pub mod writer;

pub use compiler::{CompileContext, CompiledConjunction, QueryCompiler};
pub use config::CompilerConfig;
pub use error::{CompileError, WriteError};
pub use fragment::{EquivalentFragmentSet, Fragment};
pub use plan::TraversalPlan;
pub use property::PropertyExecutor;
pub use store::{GraphStore, LabelId, LabelInterner, MemoryStore};
pub use write_executor::{InsertPlan, WriteExecutor};
pub use writer::{ConceptBuilder, WriteAction, Writer};
