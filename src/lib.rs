//! # minni-logic: on-device symbolic reasoning
//!
//! **`minni-logic`** is a small, dependency-light reasoning core for devices that need
//! explainable decisions without a network round-trip. It bundles three independent engines:
//!
//! - a **propositional SAT solver** over formulas written as text (`A | B & !A`),
//! - a **rule engine** for ordered `IF (...) & (...) THEN Name=Value` programs, such as
//!   decision trees exported from a training pipeline,
//! - a **knowledge graph** of `(subject, predicate, object)` facts with an optional
//!   interned (quantized) encoding.
//!
//! ## Key Features
//!
//! - **Deterministic**: the solver branches in first-seen variable order, `false` first, so the
//!   same formula always yields the same model.
//! - **Bounded**: [`SolverConfig`][crate::sat::SolverConfig] limits the search by node count or
//!   wall-clock deadline, reporting `Unknown`/`Timeout` instead of running away.
//! - **Typed errors**: malformed input is a [`ParseError`][crate::error::ParseError] with a
//!   position or line number; use after [`dispose`][crate::engine::RuleEngine::dispose] is
//!   [`Error::Disposed`][crate::error::Error::Disposed].
//! - **Single-owner engines**: each instance owns its state and is driven by one worker at a
//!   time. There is no global state.
//!
//! ## Basic Usage
//!
//! ```rust
//! use minni_logic::condition::Bindings;
//! use minni_logic::engine::RuleEngine;
//! use minni_logic::graph::KnowledgeGraph;
//! use minni_logic::sat::{SatSolver, SolverStatus};
//!
//! // 1. Satisfiability
//! let mut solver = SatSolver::default();
//! let result = solver.check_str("A | B & !A")?;
//! assert_eq!(result.status, SolverStatus::Satisfiable);
//! assert_eq!(result.model["A"], false);
//! assert_eq!(result.model["B"], true);
//!
//! // 2. Rules
//! let mut engine = RuleEngine::new();
//! engine.load_rules("IF (temp > 37.5) THEN Diagnosis=Fever\nIF (temp <= 37.5) THEN Diagnosis=Healthy")?;
//! let conclusion = engine.evaluate(&Bindings::new().with("temp", 36.6))?;
//! assert_eq!(conclusion.map(|c| c.value()), Some("Healthy"));
//!
//! // 3. Facts
//! let mut graph = KnowledgeGraph::quantized();
//! graph.add_fact("alice", "knows", "bob")?;
//! assert_eq!(graph.fact_count()?, 1);
//! # Ok::<(), minni_logic::error::Error>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`formula`]** and **[`ast`]**: parsing formulas into trees and flat arenas.
//! - **[`sat`]**: the DPLL search, model counting and solver budgets.
//! - **[`solver`]**: the string-level [`Solver`][crate::solver::Solver] interface.
//! - **[`rules`]** and **[`condition`]**: rule-program parsing and comparisons.
//! - **[`engine`]**: first-match rule evaluation.
//! - **[`graph`]** and **[`symbol`]**: the fact store and its interning tables.

pub mod ast;
pub mod condition;
pub mod engine;
pub mod error;
pub mod formula;
pub mod graph;
pub mod rules;
pub mod sat;
pub mod solver;
pub mod symbol;
pub mod types;

pub use error::{Error, ParseError, Result};
