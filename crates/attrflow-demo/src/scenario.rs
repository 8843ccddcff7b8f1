//! The walkthrough: read `a7`, change `a6`, read `a7`, change `a1`, read
//! `a4`, read `a7`, and the naive program's attempt at the same.

use attrflow_core::{EdgeDiscovery, EngineConfig};

use crate::error::Result;
use crate::expr::evaluate;
use crate::naive::NaiveProgram;
use crate::program::{ExprProgram, expected_value};
use crate::report::{Report, Step};

/// Values written during the walkthrough and how edges are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub a1: i64,
    pub a6: i64,
    pub edges: EdgeDiscovery,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            a1: 9,
            a6: 4,
            edges: EdgeDiscovery::default(),
        }
    }
}

impl Scenario {
    pub fn run(&self) -> Result<Report> {
        let engine = self.run_engine()?;
        let naive = self.run_naive()?;
        Ok(Report {
            edge_discovery: self.edges.to_string(),
            a1: self.a1,
            a6: self.a6,
            engine,
            naive,
        })
    }

    fn run_engine(&self) -> Result<Vec<Step>> {
        let mut program = ExprProgram::new(EngineConfig::new().with_edge_discovery(self.edges))?;
        let mut steps = Vec::with_capacity(6);

        steps.push(read(&mut program, "get a7", "a7")?);

        program.set_a6(self.a6)?;
        steps.push(Step::action(format!("set a6 = {}", self.a6), program.take_log()));
        steps.push(read(&mut program, "get a7", "a7")?);

        program.set_a1(self.a1)?;
        steps.push(Step::action(format!("set a1 = {}", self.a1), program.take_log()));
        steps.push(read(&mut program, "get a4", "a4")?);
        steps.push(read(&mut program, "get a7", "a7")?);

        for step in &steps {
            tracing::info!(
                message = "demo.step",
                program = "tracked",
                action = %step.action,
                recomputed = step.recomputed.len(),
                correct = step.is_correct()
            );
        }
        Ok(steps)
    }

    fn run_naive(&self) -> Result<Vec<Step>> {
        let mut naive = NaiveProgram::new();
        let mut steps = Vec::with_capacity(4);

        naive.full_update()?;
        steps.push(naive_a7(&mut naive, "full_update")?);

        naive.a6 = self.a6;
        steps.push(naive_a7(&mut naive, format!("set a6 = {}", self.a6))?);

        naive.update_a7()?;
        steps.push(naive_a7(&mut naive, "update_a7")?);

        naive.full_update()?;
        steps.push(naive_a7(&mut naive, "full_update")?);

        for step in &steps {
            tracing::info!(
                message = "demo.step",
                program = "naive",
                action = %step.action,
                recomputed = step.recomputed.len(),
                correct = step.is_correct()
            );
        }
        Ok(steps)
    }
}

/// Read `attr` and compare its evaluation with the closed form for the
/// current inputs. The log covers both the read and the input lookups.
fn read(program: &mut ExprProgram, action: &str, attr: &str) -> Result<Step> {
    let value = program.text(attr)?;
    let evaluated = evaluate(&value)?;
    let expected = expected_value(attr, program.a1()?, program.a6()?)?;
    Ok(Step::action(action, program.take_log()).with_readback(attr, value, evaluated, expected))
}

fn naive_a7(naive: &mut NaiveProgram, action: impl Into<String>) -> Result<Step> {
    let value = naive.a7()?.to_string();
    let evaluated = evaluate(&value)?;
    let expected = expected_value("a7", naive.a1, naive.a6)?;
    Ok(Step::action(action, naive.take_log()).with_readback("a7", value, evaluated, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recomputed(step: &Step) -> Vec<&str> {
        step.recomputed.iter().map(String::as_str).collect()
    }

    #[test]
    fn default_walkthrough() {
        let report = Scenario::default().run().unwrap();
        report.check().unwrap();

        let values: Vec<Option<i64>> = report.engine.iter().map(|s| s.evaluated).collect();
        assert_eq!(
            values,
            [Some(322), None, Some(238), None, Some(103), Some(8350)]
        );
        assert_eq!(recomputed(&report.engine[0]), ["a2", "a4", "a3", "a5", "a7"]);
        assert!(report.engine[1].recomputed.is_empty());
        assert_eq!(recomputed(&report.engine[2]), ["a5", "a7"]);
        assert_eq!(recomputed(&report.engine[4]), ["a2", "a4"]);
        assert_eq!(recomputed(&report.engine[5]), ["a3", "a5", "a7"]);
        assert_eq!(report.engine_computations(), 12);
    }

    #[test]
    fn naive_walkthrough_goes_stale_until_full_update() {
        let report = Scenario::default().run().unwrap();
        let verdicts: Vec<bool> = report.naive.iter().map(Step::is_correct).collect();
        assert_eq!(verdicts, [true, false, false, true]);
        assert_eq!(report.naive[2].evaluated, Some(322));
        assert_eq!(report.naive[3].evaluated, Some(238));
        assert_eq!(report.naive_computations(), 11);
    }

    #[test]
    fn lazy_edges_give_the_same_walkthrough() {
        let eager = Scenario::default().run().unwrap();
        let lazy = Scenario {
            edges: EdgeDiscovery::Lazy,
            ..Scenario::default()
        }
        .run()
        .unwrap();
        assert_eq!(lazy.engine, eager.engine);
        assert_eq!(lazy.edge_discovery, "lazy");
    }

    #[test]
    fn unchanged_inputs_recompute_nothing() {
        let report = Scenario {
            a1: 1,
            a6: 6,
            edges: EdgeDiscovery::Eager,
        }
        .run()
        .unwrap();
        assert!(report.engine[2].recomputed.is_empty());
        assert!(report.engine[5].recomputed.is_empty());
        assert_eq!(report.engine_computations(), 5);
    }
}
