//! End-to-end tests for the three reasoning engines.
//!
//! Tests cover formula solving, rule programs, the fact store and disposal.

use minni_logic::condition::Bindings;
use minni_logic::engine::RuleEngine;
use minni_logic::formula::Formula;
use minni_logic::graph::KnowledgeGraph;
use minni_logic::sat::{Assignment, SatSolver, SolverConfig, SolverStatus};
use minni_logic::solver::{DpllSolver, Solver};
use minni_logic::{Error, ParseError};
use num_bigint::BigUint;

const DIAGNOSIS: &str = "IF (temp > 37.5) THEN Diagnosis=Fever\nIF (temp <= 37.5) THEN Diagnosis=Healthy";

// ─── SAT Tests ─────────────────────────────────────────────────────────────────

#[test]
fn sat_precedence() {
    let mut solver = SatSolver::default();
    let result = solver.check_str("A | B & !A").unwrap();
    assert!(result.is_satisfiable());
    let a = result.model["A"];
    let b = result.model["B"];
    assert!(a || (b && !a));
    assert_eq!((a, b), (false, true));
}

#[test]
fn sat_contradiction_has_empty_model() {
    let mut solver = SatSolver::default();
    let result = solver.check_str("A & !A").unwrap();
    assert_eq!(result.status, SolverStatus::Unsatisfiable);
    assert!(result.model.is_empty());
}

#[test]
fn sat_is_deterministic() {
    let formulas = [
        "(a | b | c) & (!a | !b) & (!b | !c) & (!a | !c)",
        "x1 & (x2 | !x3) & (!x1 | x3)",
        "!(p & q) | r",
    ];
    for text in formulas {
        let mut first = SatSolver::default();
        let mut second = SatSolver::default();
        let expected = first.check_str(text).unwrap();
        for _ in 0..3 {
            assert_eq!(second.check_str(text).unwrap(), expected, "{}", text);
        }
    }
}

#[test]
fn sat_models_satisfy() {
    let formulas = [
        "(a | b) & (!a | c) & (!c | !b)",
        "!(!(x))",
        "(p | q) & (p | !q) & (!p | q)",
        "a & (b | (c & !d)) & !b",
    ];
    let mut solver = SatSolver::default();
    for text in formulas {
        let formula = Formula::parse(text).unwrap();
        let result = solver.check(&formula).unwrap();
        assert!(result.is_satisfiable(), "{}", text);
        assert_eq!(result.model.len(), formula.num_vars());
        assert!(formula.expr().eval(&|name| result.model.get(name).copied()), "{}", text);
    }
}

#[test]
fn sat_assumptions_and_counting() {
    let formula = Formula::parse("a | b").unwrap();
    let mut solver = SatSolver::default();

    let assumptions = Assignment::from([("a".to_string(), false)]);
    let result = solver.check_assuming(&formula, &assumptions).unwrap();
    assert_eq!(result.model.get("b"), Some(&true));

    assert_eq!(solver.count_models(&formula).unwrap(), Some(BigUint::from(3u32)));
}

#[test]
fn sat_budget() {
    let mut solver = SatSolver::new(SolverConfig {
        max_nodes: Some(1),
        timeout: None,
    });
    let result = solver.check_str("(a | b) & (!a | b) & (a | !b) & (c | d)").unwrap();
    assert_eq!(result.status, SolverStatus::Unknown);
    assert!(result.model.is_empty());
}

#[test]
fn solver_interface() {
    let mut solver = DpllSolver::default();
    assert_eq!(solver.check("rain & !umbrella").unwrap(), SolverStatus::Satisfiable);
    assert_eq!(solver.model().get("umbrella"), Some(&false));
    solver.reset();
    assert!(solver.model().is_empty());
}

#[test]
fn malformed_formula() {
    let mut solver = SatSolver::default();
    assert_eq!(solver.check_str(""), Err(Error::Parse(ParseError::Empty)));
    assert!(matches!(solver.check_str("A & (B | C"), Err(Error::Parse(ParseError::UnclosedParen { .. }))));
    // The solver stays usable.
    assert!(solver.check_str("A").unwrap().is_satisfiable());
}

#[test]
fn deeply_nested_formulas_are_rejected() {
    let chain: Vec<String> = (0..100_000).map(|i| format!("x{}", i)).collect();
    let inputs = [
        format!("{}a{}", "(".repeat(100_000), ")".repeat(100_000)),
        format!("{}a", "!".repeat(100_000)),
        chain.join(" & "),
    ];
    let mut solver = SatSolver::default();
    for text in &inputs {
        assert!(
            matches!(solver.check_str(text), Err(Error::Parse(ParseError::TooDeep { .. }))),
            "{}...",
            &text[..16]
        );
    }
    assert!(solver.check_str("a & !b").unwrap().is_satisfiable());
}

// ─── Rule Engine Tests ─────────────────────────────────────────────────────────

#[test]
fn rules_first_match_wins() {
    let mut engine = RuleEngine::new();
    engine.load_rules(DIAGNOSIS).unwrap();

    let fever = engine.evaluate(&Bindings::new().with("temp", 38.0)).unwrap();
    assert_eq!(fever.map(|c| c.to_string()), Some("Diagnosis=Fever".to_string()));

    let healthy = engine.evaluate(&Bindings::new().with("temp", 37.0)).unwrap();
    assert_eq!(healthy.map(|c| c.to_string()), Some("Diagnosis=Healthy".to_string()));
}

#[test]
fn rules_missing_variable() {
    let mut engine = RuleEngine::new();
    engine.load_rules(DIAGNOSIS).unwrap();
    assert_eq!(engine.evaluate(&Bindings::new()).unwrap(), None);
}

#[test]
fn rules_malformed_load_keeps_program() {
    let mut engine = RuleEngine::new();
    engine.load_rules(DIAGNOSIS).unwrap();
    assert!(engine.load_rules("IF (x >) THEN y=1").is_err());

    let fever = engine.evaluate(&Bindings::new().with("temp", 38.0)).unwrap();
    assert_eq!(fever.map(|c| c.value()), Some("Fever"));
}

#[test]
fn rules_idempotent() {
    let mut engine = RuleEngine::new();
    engine.load_rules(DIAGNOSIS).unwrap();
    let inputs = Bindings::new().with("temp", 40.1);
    let first = engine.evaluate(&inputs).unwrap().cloned();
    let second = engine.evaluate(&inputs).unwrap().cloned();
    assert_eq!(first, second);
}

// ─── Knowledge Graph Tests ─────────────────────────────────────────────────────

#[test]
fn graph_counts_duplicates() {
    for mut graph in [KnowledgeGraph::plain(), KnowledgeGraph::quantized()] {
        graph.clear().unwrap();
        for _ in 0..7 {
            graph.add_fact("door", "state", "open").unwrap();
        }
        graph.add_fact("door", "state", "closed").unwrap();
        assert_eq!(graph.fact_count().unwrap(), 8);
        graph.clear().unwrap();
        assert_eq!(graph.fact_count().unwrap(), 0);
    }
}

#[test]
fn graph_modes_agree() {
    let mut plain = KnowledgeGraph::plain();
    let mut quantized = KnowledgeGraph::quantized();
    let facts = [
        ("kitchen", "adjacent_to", "hall"),
        ("hall", "adjacent_to", "office"),
        ("sensor_1", "located_in", "kitchen"),
        ("kitchen", "adjacent_to", "hall"),
        ("", "", ""),
    ];
    for (s, p, o) in facts {
        plain.add_fact(s, p, o).unwrap();
        quantized.add_fact(s, p, o).unwrap();
    }
    assert_eq!(plain.fact_count().unwrap(), quantized.fact_count().unwrap());
    assert_eq!(plain.facts().unwrap(), quantized.facts().unwrap());
    assert_eq!(plain.entity_count().unwrap(), quantized.entity_count().unwrap());
    assert_eq!(
        plain.objects("kitchen", "adjacent_to").unwrap(),
        quantized.objects("kitchen", "adjacent_to").unwrap()
    );
}

// ─── Ownership Tests ───────────────────────────────────────────────────────────

fn assert_send<T: Send>() {}

#[test]
fn engines_are_send() {
    assert_send::<SatSolver>();
    assert_send::<DpllSolver>();
    assert_send::<RuleEngine>();
    assert_send::<KnowledgeGraph>();
}

#[test]
fn engines_move_to_worker_threads() {
    let mut engine = RuleEngine::new();
    engine.load_rules(DIAGNOSIS).unwrap();
    let mut graph = KnowledgeGraph::quantized();
    graph.add_fact("alice", "knows", "bob").unwrap();

    let handle = std::thread::spawn(move || {
        let fever = engine.evaluate(&Bindings::new().with("temp", 39.0)).unwrap().cloned();
        (fever, graph.fact_count().unwrap())
    });
    let (fever, count) = handle.join().unwrap();
    assert_eq!(fever.map(|c| c.to_string()), Some("Diagnosis=Fever".to_string()));
    assert_eq!(count, 1);
}

// ─── Disposal Tests ────────────────────────────────────────────────────────────

#[test]
fn disposed_engines_reject_calls() {
    let mut solver = SatSolver::default();
    solver.dispose();
    assert!(matches!(solver.check_str("a"), Err(Error::Disposed { .. })));

    let mut engine = RuleEngine::new();
    engine.dispose();
    assert!(matches!(engine.load_rules(DIAGNOSIS), Err(Error::Disposed { .. })));

    let mut graph = KnowledgeGraph::quantized();
    graph.dispose();
    assert!(matches!(graph.fact_count(), Err(Error::Disposed { .. })));
}
