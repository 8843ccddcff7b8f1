#![forbid(unsafe_code)]

//! Walkthrough of attrflow on a seven-attribute expression program.
//!
//! [`ExprProgram`] declares its attributes with the engine and is driven
//! through a fixed [`Scenario`]; [`NaiveProgram`] is the same program with
//! plain fields and full updates, kept alongside for comparison. Every
//! derived value is a string expression, so [`expr::evaluate`] can check it
//! against the closed form for the current inputs.

pub mod cli;
pub mod error;
pub mod expr;
pub mod naive;
pub mod program;
pub mod report;
pub mod scenario;

pub use cli::{Cli, run, run_from_env};
pub use error::{DemoError, Result};
pub use naive::NaiveProgram;
pub use program::{ExprProgram, Value, expected_a7, expected_value};
pub use report::{Report, Step};
pub use scenario::Scenario;
