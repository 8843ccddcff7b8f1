#![forbid(unsafe_code)]

//! attrflow public facade crate.
//!
//! Owners embed an [`Attributes`](prelude::Attributes) map, implement
//! [`Dataflow`](prelude::Dataflow), and read and write attributes by name.
//! Everything needed for that lives in [`prelude`].

pub use attrflow_core as core;

pub mod prelude {
    pub use attrflow_core::{
        AttrDecl, AttrId, Attributes, Dataflow, DataflowError, EdgeDiscovery, EngineConfig,
        Result, Schema, SchemaBuilder, Validation,
    };
}
