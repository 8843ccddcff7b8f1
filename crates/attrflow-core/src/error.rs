//! Error taxonomy for attribute resolution and schema assembly.
//!
//! Every variant describes a structural defect in a declared graph or in a
//! compute method. Nothing here is transient, so the engine never retries.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataflowError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataflowError {
    /// A declared dependency is not an attribute of the owner.
    #[error("attribute '{dependency}' is a dependency of '{attr}' but is not declared")]
    MissingDependency { attr: String, dependency: String },

    /// A derived attribute names a compute method the owner does not provide.
    #[error("attribute '{attr}' cannot find compute method '{method}'")]
    MissingCompute { attr: String, method: String },

    /// A derived dependency was still invalid once its own resolution finished.
    #[error("attribute '{attr}' requires '{dependency}' but it has no value")]
    DependencyUpdate { attr: String, dependency: String },

    /// The compute method returned without writing the attribute.
    #[error("attribute '{attr}' calling '{method}' did not result in an updated value")]
    StaleCompute { attr: String, method: String },

    #[error("unknown attribute: {name}")]
    UnknownAttribute { name: String },

    #[error("attribute declared twice: {name}")]
    DuplicateAttribute { name: String },

    /// Independent attributes must start with a concrete value.
    #[error("independent attribute '{attr}' has no initial value")]
    MissingInitialValue { attr: String },

    /// The dependency declarations contain a cycle.
    ///
    /// At assembly time `path` lists every attribute that could not be
    /// ordered; during resolution it is the chain of attributes being
    /// resolved, ending with the one that closed the loop.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },
}

impl DataflowError {
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownAttribute { name: name.into() }
    }

    /// Name of the attribute the error is about, when there is one.
    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        match self {
            Self::MissingDependency { attr, .. }
            | Self::MissingCompute { attr, .. }
            | Self::DependencyUpdate { attr, .. }
            | Self::StaleCompute { attr, .. }
            | Self::MissingInitialValue { attr } => Some(attr),
            Self::UnknownAttribute { name } | Self::DuplicateAttribute { name } => Some(name),
            Self::CycleDetected { path } => path.first().map(String::as_str),
        }
    }
}
