//! Text-level solver interface.
//!
//! [`Solver`] is the shape hosts program against when they only have formula
//! strings: check a formula, then fetch the model of the last check. It also
//! accepts string-keyed parameters so limits can be configured from plain
//! settings.
//!
//! | Key          | Value                        | Effect                           |
//! |--------------|------------------------------|----------------------------------|
//! | `max_nodes`  | integer, or `0`/`none`       | [`SolverConfig::max_nodes`]      |
//! | `timeout_ms` | milliseconds, or `0`/`none`  | [`SolverConfig::timeout`]        |

use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::sat::{Assignment, SatSolver, SolverConfig, SolverStatus};

pub trait Solver {
    /// Parses and checks `formula`, remembering the model.
    fn check(&mut self, formula: &str) -> Result<SolverStatus>;

    /// Model of the last satisfiable check; empty otherwise.
    fn model(&self) -> &Assignment;

    /// Forgets the last model.
    fn reset(&mut self);

    fn set_param(&mut self, key: &str, value: &str) -> Result<()>;
}

/// [`SatSolver`] with a remembered model, implementing [`Solver`].
#[derive(Debug, Default)]
pub struct DpllSolver {
    inner: SatSolver,
    model: Assignment,
}

impl DpllSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            inner: SatSolver::new(config),
            model: Assignment::new(),
        }
    }

    pub fn inner(&self) -> &SatSolver {
        &self.inner
    }

    pub fn dispose(&mut self) {
        self.model.clear();
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

fn parse_limit(key: &str, value: &str) -> Result<Option<u64>> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match trimmed.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(Error::InvalidParam {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl Solver for DpllSolver {
    fn check(&mut self, formula: &str) -> Result<SolverStatus> {
        self.model.clear();
        let result = self.inner.check_str(formula)?;
        self.model = result.model;
        Ok(result.status)
    }

    fn model(&self) -> &Assignment {
        &self.model
    }

    fn reset(&mut self) {
        self.model.clear();
    }

    fn set_param(&mut self, key: &str, value: &str) -> Result<()> {
        if self.inner.is_disposed() {
            return Err(Error::Disposed { component: "SatSolver" });
        }
        debug!("set_param({} = {})", key, value);

        let mut config = self.inner.config().clone();
        match key {
            "max_nodes" => config.max_nodes = parse_limit(key, value)?,
            "timeout_ms" => config.timeout = parse_limit(key, value)?.map(Duration::from_millis),
            _ => {
                return Err(Error::InvalidParam {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
        }
        self.inner.set_config(config)
    }
}
