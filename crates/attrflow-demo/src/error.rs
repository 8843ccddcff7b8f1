use attrflow_core::DataflowError;
use thiserror::Error;

use crate::expr::ExprError;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("dataflow error: {0}")]
    Dataflow(#[from] DataflowError),

    #[error("expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("attribute '{attr}' holds {found}, expected {expected}")]
    WrongType {
        attr: String,
        found: &'static str,
        expected: &'static str,
    },

    #[error("attribute '{attr}' has not been computed yet")]
    NotComputed { attr: &'static str },

    #[error("attribute '{attr}' evaluates to {got}, expected {expected}")]
    Mismatch {
        attr: String,
        got: i64,
        expected: i64,
    },
}

impl DemoError {
    /// Process exit code: 2 for a wrong result, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Mismatch { .. } => 2,
            _ => 1,
        }
    }
}
