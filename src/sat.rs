//! Backtracking satisfiability search over propositional formulas.
//!
//! The search works directly on the formula tree (no CNF conversion):
//!
//! 1. Evaluate the formula under the current partial assignment with
//!    three-valued logic. `false` prunes the branch; `true` ends it (the
//!    remaining variables are completed with `false`).
//! 2. Otherwise propagate forced literals: walk down from the root with the
//!    value the root must take, collecting variables whose value is implied
//!    (e.g. both sides of a required-true `&`). Contradicting requirements are
//!    a conflict.
//! 3. Otherwise branch on the first unassigned variable in first-seen order,
//!    `false` before `true`.
//!
//! The branching order is fixed by the formula text, so the same formula
//! always produces the same model. The loop is iterative with an explicit
//! decision stack, and a [`SolverConfig`] budget (node count, deadline) is
//! checked before every step.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use num_bigint::BigUint;

use crate::ast::{Idx, Node};
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::types::VarId;

/// Boolean values by variable name.
///
/// Used both for models returned by the solver and for assumptions passed in.
pub type Assignment = BTreeMap<String, bool>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SolverStatus {
    Satisfiable,
    Unsatisfiable,
    /// The node budget ran out before the search finished.
    Unknown,
    /// The deadline passed before the search finished.
    Timeout,
}

impl SolverStatus {
    pub fn is_sat(self) -> bool {
        self == SolverStatus::Satisfiable
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SatResult {
    pub status: SolverStatus,
    /// One entry per formula variable when satisfiable, empty otherwise.
    pub model: Assignment,
}

impl SatResult {
    pub fn is_satisfiable(&self) -> bool {
        self.status.is_sat()
    }
}

/// Search limits. The default is unbounded, in which case every check ends in
/// [`SolverStatus::Satisfiable`] or [`SolverStatus::Unsatisfiable`].
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SolverConfig {
    /// Maximum number of search nodes visited per call.
    pub max_nodes: Option<u64>,
    /// Maximum wall-clock time per call.
    pub timeout: Option<Duration>,
}

/// Counters for the most recent call.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SolverStats {
    pub nodes: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Interrupt {
    NodeLimit,
    Deadline,
}

impl From<Interrupt> for SolverStatus {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::NodeLimit => SolverStatus::Unknown,
            Interrupt::Deadline => SolverStatus::Timeout,
        }
    }
}

struct Budget {
    max_nodes: Option<u64>,
    deadline: Option<Instant>,
}

impl Budget {
    fn new(config: &SolverConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            deadline: config.timeout.map(|t| Instant::now() + t),
        }
    }

    fn check(&self, nodes: u64) -> std::result::Result<(), Interrupt> {
        if self.max_nodes.is_some_and(|max| nodes > max) {
            return Err(Interrupt::NodeLimit);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Interrupt::Deadline);
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
struct Decision {
    var: VarId,
    value: bool,
    trail_len: usize,
}

/// What the search does after reaching an assignment that satisfies the formula.
enum OnModel {
    Stop,
    Continue,
}

struct Search<'a> {
    formula: &'a Formula,
    assignment: Vec<Option<bool>>,
    trail: Vec<VarId>,
    values: Vec<Option<bool>>,
    budget: Budget,
    stats: SolverStats,
}

impl<'a> Search<'a> {
    fn new(formula: &'a Formula, config: &SolverConfig) -> Self {
        Self {
            formula,
            assignment: vec![None; formula.num_vars()],
            trail: Vec::new(),
            values: Vec::with_capacity(formula.arena().len()),
            budget: Budget::new(config),
            stats: SolverStats::default(),
        }
    }

    fn assign(&mut self, var: VarId, value: bool) {
        self.assignment[var.index()] = Some(value);
        self.trail.push(var);
    }

    fn undo_to(&mut self, trail_len: usize) {
        while self.trail.len() > trail_len {
            if let Some(var) = self.trail.pop() {
                self.assignment[var.index()] = None;
            }
        }
    }

    fn next_unassigned(&self) -> Option<VarId> {
        self.assignment
            .iter()
            .position(|v| v.is_none())
            .map(|i| VarId::new(i as u32))
    }

    fn num_unassigned(&self) -> usize {
        self.assignment.iter().filter(|v| v.is_none()).count()
    }

    /// Collects the literals implied by node `idx` having value `want`.
    ///
    /// Reads node values from the last evaluation. Returns `false` on conflict.
    /// Walks with an explicit stack, left operands first.
    fn require(&self, idx: Idx, want: bool, forced: &mut Vec<(VarId, bool)>) -> bool {
        let mut stack = vec![(idx, want)];
        while let Some((idx, want)) = stack.pop() {
            if let Some(value) = self.values[idx.index()] {
                if value != want {
                    return false;
                }
                continue;
            }
            match self.formula.arena().get(idx) {
                Node::Var(var) => match forced.iter().find(|(v, _)| *v == var) {
                    Some(&(_, value)) if value != want => return false,
                    Some(_) => {}
                    None => forced.push((var, want)),
                },
                Node::Not(a) => stack.push((a, !want)),
                Node::And(a, b) if want => stack.extend([(b, true), (a, true)]),
                Node::Or(a, b) if !want => stack.extend([(b, false), (a, false)]),
                Node::And(a, b) => match (self.values[a.index()], self.values[b.index()]) {
                    (Some(true), _) => stack.push((b, false)),
                    (_, Some(true)) => stack.push((a, false)),
                    _ => {}
                },
                Node::Or(a, b) => match (self.values[a.index()], self.values[b.index()]) {
                    (Some(false), _) => stack.push((b, true)),
                    (_, Some(false)) => stack.push((a, true)),
                    _ => {}
                },
            }
        }
        true
    }

    /// Evaluates the formula, assigning forced literals until the value is
    /// known or nothing more is implied.
    fn propagate(&mut self) -> Option<bool> {
        let mut forced = Vec::new();
        loop {
            let value = self.formula.arena().eval_into(&self.assignment, &mut self.values);
            if value.is_some() {
                return value;
            }

            forced.clear();
            if !self.require(self.formula.arena().root(), true, &mut forced) {
                trace!("propagate: conflicting requirements");
                return Some(false);
            }
            if forced.is_empty() {
                return None;
            }

            for &(var, value) in forced.iter() {
                trace!("propagate: {} = {}", self.formula.name(var), value);
                self.assign(var, value);
            }
            self.stats.propagations += forced.len() as u64;
        }
    }

    /// Runs the search, calling `on_model` for every satisfying branch.
    ///
    /// Returns `Ok(true)` if `on_model` stopped the search, `Ok(false)` once
    /// the search space is exhausted.
    fn run<F>(&mut self, mut on_model: F) -> std::result::Result<bool, Interrupt>
    where
        F: FnMut(&Self) -> OnModel,
    {
        let mut decisions: Vec<Decision> = Vec::new();

        loop {
            self.stats.nodes += 1;
            self.budget.check(self.stats.nodes)?;

            let backtrack = match self.propagate() {
                Some(true) => match on_model(self) {
                    OnModel::Stop => return Ok(true),
                    OnModel::Continue => true,
                },
                Some(false) => {
                    self.stats.conflicts += 1;
                    true
                }
                None => false,
            };

            if !backtrack {
                // An undetermined formula always has an unassigned variable.
                if let Some(var) = self.next_unassigned() {
                    trace!("decide: {} = false", self.formula.name(var));
                    self.stats.decisions += 1;
                    decisions.push(Decision {
                        var,
                        value: false,
                        trail_len: self.trail.len(),
                    });
                    self.assign(var, false);
                    continue;
                }
            }

            loop {
                let Some(decision) = decisions.pop() else {
                    return Ok(false);
                };
                self.undo_to(decision.trail_len);
                if !decision.value {
                    trace!("decide: {} = true", self.formula.name(decision.var));
                    decisions.push(Decision { value: true, ..decision });
                    self.assign(decision.var, true);
                    break;
                }
            }
        }
    }

    fn model(&self) -> Assignment {
        self.formula
            .names()
            .iter()
            .zip(&self.assignment)
            .map(|(name, value)| (name.clone(), value.unwrap_or(false)))
            .collect()
    }
}

/// A DPLL-style solver for [`Formula`]s.
///
/// The solver keeps no state between calls apart from its configuration and
/// the statistics of the last call.
///
/// ```
/// use minni_logic::sat::{SatSolver, SolverStatus};
///
/// let mut solver = SatSolver::default();
/// let result = solver.check_str("A | B & !A").unwrap();
/// assert_eq!(result.status, SolverStatus::Satisfiable);
/// assert_eq!(result.model["A"], false);
/// assert_eq!(result.model["B"], true);
///
/// let result = solver.check_str("A & !A").unwrap();
/// assert!(!result.is_satisfiable());
/// assert!(result.model.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SatSolver {
    config: SolverConfig,
    stats: SolverStats,
    disposed: bool,
}

impl SatSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            stats: SolverStats::default(),
            disposed: false,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) -> Result<()> {
        self.ensure_live()?;
        self.config = config;
        Ok(())
    }

    /// Statistics of the most recent check or count.
    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            warn!("SatSolver used after dispose");
            return Err(Error::Disposed { component: "SatSolver" });
        }
        Ok(())
    }

    pub fn check(&mut self, formula: &Formula) -> Result<SatResult> {
        self.check_assuming(formula, &Assignment::new())
    }

    /// Parses `text` and checks it.
    pub fn check_str(&mut self, text: &str) -> Result<SatResult> {
        self.ensure_live()?;
        let formula = Formula::parse(text)?;
        self.check(&formula)
    }

    /// Checks `formula` with some variables fixed in advance.
    ///
    /// Assumptions on names that do not occur in the formula are ignored.
    /// The returned model includes the assumed values.
    pub fn check_assuming(&mut self, formula: &Formula, assumptions: &Assignment) -> Result<SatResult> {
        self.ensure_live()?;
        debug!("check(formula = {}, assumptions = {:?})", formula, assumptions);

        let mut search = Search::new(formula, &self.config);
        for (name, &value) in assumptions {
            if let Some(var) = formula.var_id(name) {
                search.assign(var, value);
            }
        }

        let outcome = search.run(|_| OnModel::Stop);
        self.stats = search.stats;

        let result = match outcome {
            Ok(true) => SatResult {
                status: SolverStatus::Satisfiable,
                model: search.model(),
            },
            Ok(false) => SatResult {
                status: SolverStatus::Unsatisfiable,
                model: Assignment::new(),
            },
            Err(interrupt) => {
                debug!("check: interrupted by {:?} after {} nodes", interrupt, self.stats.nodes);
                SatResult {
                    status: interrupt.into(),
                    model: Assignment::new(),
                }
            }
        };

        debug!("check: {:?} with {:?}", result.status, self.stats);
        Ok(result)
    }

    /// Counts the assignments to the formula's variables that satisfy it.
    ///
    /// Returns `None` if the search budget runs out first.
    pub fn count_models(&mut self, formula: &Formula) -> Result<Option<BigUint>> {
        self.ensure_live()?;
        debug!("count_models(formula = {})", formula);

        let mut count = BigUint::ZERO;
        let mut search = Search::new(formula, &self.config);
        let outcome = search.run(|s| {
            count += BigUint::from(1u8) << s.num_unassigned();
            OnModel::Continue
        });
        self.stats = search.stats;

        match outcome {
            Ok(_) => {
                debug!("count_models: {} with {:?}", count, self.stats);
                Ok(Some(count))
            }
            Err(interrupt) => {
                debug!("count_models: interrupted by {:?}", interrupt);
                Ok(None)
            }
        }
    }

    /// Releases the solver. Safe to call more than once; every later call
    /// fails with [`Error::Disposed`].
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!("dispose SatSolver");
        }
        self.stats = SolverStats::default();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
