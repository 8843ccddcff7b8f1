//! Scenario results, as JSON or as a plain text walkthrough.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{DemoError, Result};

/// One action in a scenario and what it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub action: String,
    /// Attribute read back after the action, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<i64>,
    /// Compute methods that ran during the action, in order.
    pub recomputed: Vec<String>,
}

impl Step {
    #[must_use]
    pub fn action(action: impl Into<String>, recomputed: Vec<&'static str>) -> Self {
        Self {
            action: action.into(),
            attr: None,
            value: None,
            evaluated: None,
            expected: None,
            recomputed: recomputed.into_iter().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn with_readback(mut self, attr: &str, value: String, evaluated: i64, expected: i64) -> Self {
        self.attr = Some(attr.to_string());
        self.value = Some(value);
        self.evaluated = Some(evaluated);
        self.expected = Some(expected);
        self
    }

    /// `false` when the read-back value disagrees with its closed form.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        match (self.evaluated, self.expected) {
            (Some(got), Some(expected)) => got == expected,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub edge_discovery: String,
    pub a1: i64,
    pub a6: i64,
    pub engine: Vec<Step>,
    pub naive: Vec<Step>,
}

fn count(steps: &[Step]) -> usize {
    steps.iter().map(|s| s.recomputed.len()).sum()
}

impl Report {
    #[must_use]
    pub fn engine_computations(&self) -> usize {
        count(&self.engine)
    }

    #[must_use]
    pub fn naive_computations(&self) -> usize {
        count(&self.naive)
    }

    /// Fails on the first engine step whose value is wrong. Stale naive
    /// values are the point of the comparison and are not checked.
    pub fn check(&self) -> Result<()> {
        match self.engine.iter().find(|s| !s.is_correct()) {
            None => Ok(()),
            Some(step) => Err(DemoError::Mismatch {
                attr: step.attr.clone().unwrap_or_default(),
                got: step.evaluated.unwrap_or_default(),
                expected: step.expected.unwrap_or_default(),
            }),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "dependency-tracked program ({} edges)",
            self.edge_discovery
        );
        render_steps(&mut out, &self.engine);
        let _ = writeln!(out, "\nnaive program (full updates only)");
        render_steps(&mut out, &self.naive);
        let _ = writeln!(
            out,
            "\ncompute calls: {} tracked, {} naive",
            self.engine_computations(),
            self.naive_computations()
        );
        out
    }
}

fn render_steps(out: &mut String, steps: &[Step]) {
    for step in steps {
        let ran = if step.recomputed.is_empty() {
            "-".to_string()
        } else {
            step.recomputed.join(" ")
        };
        let _ = writeln!(out, "  {:<16} computed: {ran}", step.action);
        if let (Some(attr), Some(value), Some(got), Some(expected)) =
            (&step.attr, &step.value, step.evaluated, step.expected)
        {
            let verdict = if got == expected { "ok" } else { "STALE" };
            let _ = writeln!(
                out,
                "  {:<16} {attr} = {value} = {got} (expected {expected}, {verdict})",
                ""
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report {
            edge_discovery: "eager".into(),
            a1: 9,
            a6: 4,
            engine: vec![
                Step::action("get a7", vec!["a2", "a7"]).with_readback("a7", "(x)".into(), 322, 322),
                Step::action("set a6 = 4", Vec::new()),
            ],
            naive: vec![
                Step::action("set a6 = 4", Vec::new()).with_readback("a7", "(x)".into(), 322, 238),
            ],
        }
    }

    #[test]
    fn counts_and_check() {
        let report = sample();
        assert_eq!(report.engine_computations(), 2);
        assert_eq!(report.naive_computations(), 0);
        assert!(report.check().is_ok());
        assert!(!report.naive[0].is_correct());
    }

    #[test]
    fn wrong_engine_value_fails_check() {
        let mut report = sample();
        report.engine[0].evaluated = Some(1);
        let err = report.check().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "attribute 'a7' evaluates to 1, expected 322");
    }

    #[test]
    fn json_omits_empty_readback() {
        let json = sample().to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["engine"][0]["evaluated"], 322);
        assert!(parsed["engine"][1].get("value").is_none());
        assert_eq!(parsed["engine"][1]["recomputed"], serde_json::json!([]));
    }

    #[test]
    fn render_marks_stale_values() {
        let text = sample().render();
        assert!(text.contains("(eager edges)"));
        assert!(text.contains("computed: a2 a7"));
        assert!(text.contains("STALE"));
        assert!(text.contains("compute calls: 2 tracked, 0 naive"));
    }
}
