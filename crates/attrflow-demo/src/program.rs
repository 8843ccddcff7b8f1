//! The seven-attribute expression program.
//!
//! `a1` and `a6` are integers set from outside. `a2`..`a5` and `a7` are
//! strings spelling out, fully parenthesised, how their value follows from
//! `a1` and `a6`:
//!
//! ```text
//! a2 = (a1+2)
//! a3 = (a2+3)
//! a4 = (a1*a2+4)
//! a5 = (a1+a2+a3*a6+5)
//! a7 = (a4*a5+7)
//! ```
//!
//! Evaluating the `a7` string must give the same number as evaluating the
//! closed form with the current `a1` and `a6` substituted. If any step reads
//! a stale dependency the two disagree.

use std::fmt;
use std::sync::Arc;

use attrflow_core::{Attributes, Dataflow, DataflowError, EngineConfig, Schema};

use crate::error::{DemoError, Result};
use crate::expr::{ExprError, evaluate};

pub const A1_INITIAL: i64 = 1;
pub const A6_INITIAL: i64 = 6;

const A7_FORM: &str = "((a1*(a1+2)+4)*(a1+(a1+2)+((a1+2)+3)*a6+5)+7)";

/// Closed forms of every derived attribute in terms of `a1` and `a6`.
const CLOSED_FORMS: [(&str, &str); 5] = [
    ("a2", "(a1+2)"),
    ("a3", "((a1+2)+3)"),
    ("a4", "(a1*(a1+2)+4)"),
    ("a5", "(a1+(a1+2)+((a1+2)+3)*a6+5)"),
    ("a7", A7_FORM),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "an integer",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Expected number for a derived attribute given the independent inputs.
pub fn expected_value(attr: &str, a1: i64, a6: i64) -> Result<i64> {
    let (_, form) = CLOSED_FORMS
        .iter()
        .find(|(name, _)| *name == attr)
        .ok_or_else(|| DataflowError::unknown(attr))?;
    Ok(evaluate(&substitute(form, a1, a6))?)
}

pub fn expected_a7(a1: i64, a6: i64) -> std::result::Result<i64, ExprError> {
    evaluate(&substitute(A7_FORM, a1, a6))
}

fn substitute(form: &str, a1: i64, a6: i64) -> String {
    form.replace("a6", &a6.to_string())
        .replace("a1", &a1.to_string())
}

#[derive(Debug)]
pub struct ExprProgram {
    attrs: Attributes<ExprProgram>,
    log: Vec<&'static str>,
}

impl Dataflow for ExprProgram {
    type Value = Value;

    fn attributes(&self) -> &Attributes<Self> {
        &self.attrs
    }

    fn attributes_mut(&mut self) -> &mut Attributes<Self> {
        &mut self.attrs
    }
}

impl ExprProgram {
    pub fn schema(config: EngineConfig) -> attrflow_core::Result<Schema<Self>> {
        Schema::<Self>::builder()
            .config(config)
            .independent("a1", Value::Int(A1_INITIAL))
            .derived("a2", ["a1"], "update_a2")
            .derived("a3", ["a2"], "update_a3")
            .derived("a4", ["a1", "a2"], "update_a4")
            .derived("a5", ["a1", "a2", "a3", "a6"], "update_a5")
            .independent("a6", Value::Int(A6_INITIAL))
            .derived("a7", ["a4", "a5"], "update_a7")
            .method("update_a2", Self::update_a2)
            .method("update_a3", Self::update_a3)
            .method("update_a4", Self::update_a4)
            .method("update_a5", Self::update_a5)
            .method("update_a7", Self::update_a7)
            .build()
    }

    pub fn new(config: EngineConfig) -> attrflow_core::Result<Self> {
        Ok(Self::with_schema(Arc::new(Self::schema(config)?)))
    }

    /// Instance over an already built schema.
    #[must_use]
    pub fn with_schema(schema: Arc<Schema<Self>>) -> Self {
        Self {
            attrs: Attributes::new(schema),
            log: Vec::new(),
        }
    }

    fn record(&mut self, attr: &'static str, value: String) -> attrflow_core::Result<()> {
        tracing::debug!(message = "demo.update", attr, value = %value);
        self.log.push(attr);
        self.set(attr, Value::Text(value)).map(drop)
    }

    fn update_a2(&mut self) -> attrflow_core::Result<()> {
        let a2 = format!("({}+2)", self.get("a1")?);
        self.record("a2", a2)
    }

    fn update_a3(&mut self) -> attrflow_core::Result<()> {
        let a3 = format!("({}+3)", self.get("a2")?);
        self.record("a3", a3)
    }

    fn update_a4(&mut self) -> attrflow_core::Result<()> {
        let a4 = format!("({}*{}+4)", self.get("a1")?, self.get("a2")?);
        self.record("a4", a4)
    }

    fn update_a5(&mut self) -> attrflow_core::Result<()> {
        let a5 = format!(
            "({}+{}+{}*{}+5)",
            self.get("a1")?,
            self.get("a2")?,
            self.get("a3")?,
            self.get("a6")?
        );
        self.record("a5", a5)
    }

    fn update_a7(&mut self) -> attrflow_core::Result<()> {
        let a7 = format!("({}*{}+7)", self.get("a4")?, self.get("a5")?);
        self.record("a7", a7)
    }

    pub fn int(&mut self, attr: &str) -> Result<i64> {
        match self.get(attr)? {
            Value::Int(n) => Ok(n),
            other => Err(DemoError::WrongType {
                attr: attr.to_string(),
                found: other.type_name(),
                expected: "an integer",
            }),
        }
    }

    pub fn text(&mut self, attr: &str) -> Result<String> {
        match self.get(attr)? {
            Value::Text(s) => Ok(s),
            other => Err(DemoError::WrongType {
                attr: attr.to_string(),
                found: other.type_name(),
                expected: "text",
            }),
        }
    }

    pub fn a1(&mut self) -> Result<i64> {
        self.int("a1")
    }

    pub fn a6(&mut self) -> Result<i64> {
        self.int("a6")
    }

    pub fn a4(&mut self) -> Result<String> {
        self.text("a4")
    }

    pub fn a7(&mut self) -> Result<String> {
        self.text("a7")
    }

    /// Returns whether the value changed.
    pub fn set_a1(&mut self, a1: i64) -> Result<bool> {
        Ok(self.set("a1", Value::Int(a1))?)
    }

    pub fn set_a6(&mut self, a6: i64) -> Result<bool> {
        Ok(self.set("a6", Value::Int(a6))?)
    }

    /// Compute methods that ran since the last call, in order.
    pub fn take_log(&mut self) -> Vec<&'static str> {
        std::mem::take(&mut self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrflow_core::EdgeDiscovery;

    fn program() -> ExprProgram {
        ExprProgram::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn initial_a7_matches_closed_form() {
        let mut p = program();
        let a7 = p.a7().unwrap();
        assert_eq!(a7, "((1*(1+2)+4)*(1+(1+2)+((1+2)+3)*6+5)+7)");
        assert_eq!(evaluate(&a7).unwrap(), 322);
        assert_eq!(expected_a7(1, 6).unwrap(), 322);
        assert_eq!(p.take_log(), ["a2", "a4", "a3", "a5", "a7"]);
    }

    #[test]
    fn a6_change_touches_a5_and_a7_only() {
        for edges in [EdgeDiscovery::Eager, EdgeDiscovery::Lazy] {
            let mut p = ExprProgram::new(EngineConfig::new().with_edge_discovery(edges)).unwrap();
            p.a7().unwrap();
            p.take_log();

            assert!(p.set_a6(4).unwrap());
            let a7 = p.a7().unwrap();
            assert_eq!(evaluate(&a7).unwrap(), 238);
            assert_eq!(p.take_log(), ["a5", "a7"]);
        }
    }

    #[test]
    fn a1_change_recomputes_lazily_by_demand() {
        let mut p = program();
        p.a7().unwrap();
        p.set_a6(4).unwrap();
        p.a7().unwrap();
        p.take_log();

        p.set_a1(9).unwrap();
        assert_eq!(p.a4().unwrap(), "(9*(9+2)+4)");
        assert_eq!(p.take_log(), ["a2", "a4"]);
        assert_eq!(evaluate(&p.a7().unwrap()).unwrap(), 8350);
        assert_eq!(p.take_log(), ["a3", "a5", "a7"]);
        assert_eq!(expected_a7(9, 4).unwrap(), 8350);
    }

    #[test]
    fn equal_write_keeps_cache() {
        let mut p = program();
        p.a7().unwrap();
        p.take_log();
        assert!(!p.set_a6(6).unwrap());
        p.a7().unwrap();
        assert!(p.take_log().is_empty());
    }

    #[test]
    fn typed_accessors_check_kind() {
        let mut p = program();
        assert_eq!(p.a1().unwrap(), 1);
        assert_eq!(p.a6().unwrap(), 6);
        assert!(matches!(
            p.int("a2"),
            Err(DemoError::WrongType { found: "text", .. })
        ));
        assert!(matches!(
            p.text("a1"),
            Err(DemoError::WrongType {
                found: "an integer",
                ..
            })
        ));
    }

    #[test]
    fn closed_forms() {
        assert_eq!(expected_value("a2", 1, 6).unwrap(), 3);
        assert_eq!(expected_value("a5", 1, 6).unwrap(), 45);
        assert_eq!(expected_value("a4", -3, 0).unwrap(), 7);
        assert!(matches!(
            expected_value("a6", 1, 6),
            Err(DemoError::Dataflow(DataflowError::UnknownAttribute { .. }))
        ));
    }

    #[test]
    fn negative_inputs_still_agree() {
        let mut p = program();
        p.set_a1(-5).unwrap();
        p.set_a6(-2).unwrap();
        let got = evaluate(&p.a7().unwrap()).unwrap();
        assert_eq!(got, expected_a7(-5, -2).unwrap());
    }
}
