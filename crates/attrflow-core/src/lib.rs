#![forbid(unsafe_code)]

//! Core: demand-driven, memoizing attribute dependency graphs.
//!
//! An owner type declares its attributes once in a [`Schema`]: independent
//! attributes hold plain values, derived attributes name their dependencies
//! and a compute method. Each instance keeps its values in an [`Attributes`]
//! map and gets [`Dataflow::get`] and [`Dataflow::set`] for free. Reads
//! recompute only what a write has invalidated; writes that do not change a
//! value invalidate nothing.

pub mod attributes;
pub mod config;
pub mod engine;
pub mod error;
pub mod schema;
pub mod slot;

pub use attributes::Attributes;
pub use config::{EdgeDiscovery, EngineConfig, ParseConfigError, Validation};
pub use engine::Dataflow;
pub use error::{DataflowError, Result};
pub use schema::{AttrDecl, AttrKind, ComputeFn, Schema, SchemaBuilder};
pub use slot::{AttrId, SlotState, SlotValue};
