//! The same program with plain fields and no dependency tracking.
//!
//! Writes to `a1` or `a6` leave every derived field as it was. Only a full
//! update, which recomputes all five derived fields whether they need it or
//! not, is guaranteed to bring `a7` up to date.

use crate::error::{DemoError, Result};
use crate::program::{A1_INITIAL, A6_INITIAL};

#[derive(Debug, Clone)]
pub struct NaiveProgram {
    pub a1: i64,
    pub a6: i64,
    a2: Option<String>,
    a3: Option<String>,
    a4: Option<String>,
    a5: Option<String>,
    a7: Option<String>,
    log: Vec<&'static str>,
}

impl Default for NaiveProgram {
    fn default() -> Self {
        Self {
            a1: A1_INITIAL,
            a6: A6_INITIAL,
            a2: None,
            a3: None,
            a4: None,
            a5: None,
            a7: None,
            log: Vec::new(),
        }
    }
}

fn computed<'a>(field: &'a Option<String>, attr: &'static str) -> Result<&'a str> {
    field.as_deref().ok_or(DemoError::NotComputed { attr })
}

impl NaiveProgram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every derived field in dependency order.
    pub fn full_update(&mut self) -> Result<()> {
        self.update_a2();
        self.update_a3()?;
        self.update_a4()?;
        self.update_a5()?;
        self.update_a7()
    }

    pub fn update_a2(&mut self) {
        self.log.push("a2");
        self.a2 = Some(format!("({}+2)", self.a1));
    }

    pub fn update_a3(&mut self) -> Result<()> {
        let a3 = format!("({}+3)", computed(&self.a2, "a2")?);
        self.log.push("a3");
        self.a3 = Some(a3);
        Ok(())
    }

    pub fn update_a4(&mut self) -> Result<()> {
        let a4 = format!("({}*{}+4)", self.a1, computed(&self.a2, "a2")?);
        self.log.push("a4");
        self.a4 = Some(a4);
        Ok(())
    }

    pub fn update_a5(&mut self) -> Result<()> {
        let a5 = format!(
            "({}+{}+{}*{}+5)",
            self.a1,
            computed(&self.a2, "a2")?,
            computed(&self.a3, "a3")?,
            self.a6
        );
        self.log.push("a5");
        self.a5 = Some(a5);
        Ok(())
    }

    /// Rebuild `a7` from whatever `a4` and `a5` currently hold.
    pub fn update_a7(&mut self) -> Result<()> {
        let a7 = format!(
            "({}*{}+7)",
            computed(&self.a4, "a4")?,
            computed(&self.a5, "a5")?
        );
        self.log.push("a7");
        self.a7 = Some(a7);
        Ok(())
    }

    pub fn a7(&self) -> Result<&str> {
        computed(&self.a7, "a7")
    }

    pub fn take_log(&mut self) -> Vec<&'static str> {
        std::mem::take(&mut self.log)
    }
}
