//! Rule engine: holds one loaded [`RuleProgram`] and evaluates it against
//! named inputs.

use log::{debug, warn};

use crate::condition::Bindings;
use crate::error::{Error, Result};
use crate::rules::{Conclusion, RuleProgram};

/// First-match rule evaluator.
///
/// ```
/// use minni_logic::condition::Bindings;
/// use minni_logic::engine::RuleEngine;
///
/// let mut engine = RuleEngine::new();
/// engine.load_rules("IF (temp > 37.5) THEN Diagnosis=Fever\nIF (temp <= 37.5) THEN Diagnosis=Healthy")?;
///
/// let result = engine.evaluate(&Bindings::new().with("temp", 38.2))?;
/// assert_eq!(result.map(|c| c.to_string()), Some("Diagnosis=Fever".to_string()));
/// # Ok::<(), minni_logic::error::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct RuleEngine {
    program: Option<RuleProgram>,
    disposed: bool,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            warn!("RuleEngine used after dispose");
            return Err(Error::Disposed { component: "RuleEngine" });
        }
        Ok(())
    }

    /// Parses `text` and replaces the loaded program. On failure the
    /// previously loaded program stays in place.
    pub fn load_rules(&mut self, text: &str) -> Result<()> {
        self.ensure_live()?;
        let program = RuleProgram::parse(text)?;
        debug!("loaded {} rules", program.len());
        self.program = Some(program);
        Ok(())
    }

    /// Conclusion of the first rule whose conditions all hold, or `None`
    /// when no rule matches or nothing is loaded.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Option<&Conclusion>> {
        self.ensure_live()?;
        let Some(program) = &self.program else {
            return Ok(None);
        };
        let result = program.evaluate(bindings);
        debug!(
            "evaluate({} inputs) -> {}",
            bindings.len(),
            result.map_or_else(|| "no match".to_string(), |c| c.to_string())
        );
        Ok(result)
    }

    /// The loaded program, if any.
    pub fn rules(&self) -> Result<Option<&RuleProgram>> {
        self.ensure_live()?;
        Ok(self.program.as_ref())
    }

    pub fn num_rules(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.program.as_ref().map_or(0, |p| p.len()))
    }

    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!("disposing rule engine");
        }
        self.program = None;
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
