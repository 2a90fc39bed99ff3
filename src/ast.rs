//! Propositional formula trees.
//!
//! Formulas come in two shapes:
//!
//! - [`Expr`] is the boxed tree produced by the parser. It is what callers
//!   build, print and compare.
//! - [`ExprArena`] is the same tree flattened into a vector, parents before
//!   children, with variable names replaced by [`VarId`]s. The solver evaluates
//!   it bottom-up many times per search, so it avoids pointer chasing and name
//!   lookups.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::types::VarId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Var(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(value: Self) -> Self {
        Expr::Not(Box::new(value))
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Variable names in first-seen order, each listed once.
    pub fn variables(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, seen: &mut Vec<&'a str>) {
            match expr {
                Expr::Var(name) => {
                    if !seen.contains(&name.as_str()) {
                        seen.push(name);
                    }
                }
                Expr::Not(a) => walk(a, seen),
                Expr::And(a, b) | Expr::Or(a, b) => {
                    walk(a, seen);
                    walk(b, seen);
                }
            }
        }

        let mut seen = Vec::new();
        walk(self, &mut seen);
        seen
    }

    /// Evaluates the formula under a total assignment.
    ///
    /// Variables missing from `value_of` evaluate to `false`.
    pub fn eval(&self, value_of: &dyn Fn(&str) -> Option<bool>) -> bool {
        match self {
            Expr::Var(name) => value_of(name).unwrap_or(false),
            Expr::Not(a) => !a.eval(value_of),
            Expr::And(a, b) => a.eval(value_of) && b.eval(value_of),
            Expr::Or(a, b) => a.eval(value_of) || b.eval(value_of),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(..) => 1,
            Expr::And(..) => 2,
            Expr::Not(..) => 3,
            Expr::Var(..) => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Prints with the fewest parentheses that preserve the tree shape.
/// Binary operators are left-associative, so a right operand of the same
/// operator keeps its parentheses.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Not(a) => {
                write!(f, "!")?;
                a.fmt_operand(f, 3)
            }
            Expr::And(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, " & ")?;
                b.fmt_operand(f, 3)
            }
            Expr::Or(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " | ")?;
                b.fmt_operand(f, 2)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Idx(usize);

impl Idx {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One arena node; children are indices into the same arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Node<I = Idx> {
    Var(VarId),
    Not(I),
    And(I, I),
    Or(I, I),
}

impl<A> Node<A> {
    #[inline(always)]
    pub fn fmap<B, F>(self, mut f: F) -> Node<B>
    where
        F: FnMut(A) -> B,
    {
        match self {
            Node::Var(v) => Node::Var(v),
            Node::Not(a) => Node::Not(f(a)),
            Node::And(a, b) => Node::And(f(a), f(b)),
            Node::Or(a, b) => Node::Or(f(a), f(b)),
        }
    }

    #[inline(always)]
    pub fn fmap_ref<B, F>(&self, mut f: F) -> Node<B>
    where
        F: FnMut(&A) -> B,
    {
        match self {
            Node::Var(v) => Node::Var(*v),
            Node::Not(a) => Node::Not(f(a)),
            Node::And(a, b) => Node::And(f(a), f(b)),
            Node::Or(a, b) => Node::Or(f(a), f(b)),
        }
    }
}

// See: https://recursion.wtf/posts/rust_schemes/
#[derive(Debug, Clone)]
pub struct ExprArena {
    /// Topologically sorted nodes, by construction: the root is at 0 and every
    /// child has a larger index than its parent.
    nodes: Vec<Node>,
}

impl ExprArena {
    pub fn root(&self) -> Idx {
        Idx(0)
    }

    pub fn get(&self, idx: Idx) -> Node {
        self.nodes[idx.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn expand_nodes<R, F>(seed: R, expand: F) -> Self
    where
        R: Clone,
        F: Fn(R) -> Node<R>,
    {
        let mut frontier: VecDeque<R> = VecDeque::from([seed]);
        let mut nodes: Vec<Node> = vec![];

        while let Some(seed) = frontier.pop_front() {
            let node = expand(seed);
            let node = node.fmap(|e| {
                frontier.push_back(e);
                Idx(nodes.len() + frontier.len())
            });
            nodes.push(node);
        }

        Self { nodes }
    }

    /// Flattens `expr`, numbering variables through `vars`.
    ///
    /// Every variable of `expr` must be present in `vars`; callers build the
    /// map from [`Expr::variables`].
    pub fn from_expr(expr: &Expr, vars: &HashMap<&str, VarId>) -> Self {
        Self::expand_nodes(expr, |seed| match seed {
            Expr::Var(name) => Node::Var(vars[name.as_str()]),
            Expr::Not(a) => Node::Not(a.as_ref()),
            Expr::And(a, b) => Node::And(a.as_ref(), b.as_ref()),
            Expr::Or(a, b) => Node::Or(a.as_ref(), b.as_ref()),
        })
    }

    /// Three-valued bottom-up evaluation under a partial assignment.
    ///
    /// On return `values[i]` holds the value of node `i`: `Some(b)` when every
    /// completion of `assignment` gives the node value `b`, `None` otherwise.
    /// `values` is reused between calls to avoid reallocating during search.
    pub fn eval_into(&self, assignment: &[Option<bool>], values: &mut Vec<Option<bool>>) -> Option<bool> {
        values.clear();
        values.resize(self.nodes.len(), None);

        for (i, node) in self.nodes.iter().enumerate().rev() {
            let node = node.fmap_ref(|idx| values[idx.0]);
            values[i] = match node {
                Node::Var(v) => assignment[v.index()],
                Node::Not(a) => a.map(|a| !a),
                Node::And(a, b) => tri_and(a, b),
                Node::Or(a, b) => tri_or(a, b),
            };
        }

        values.first().copied().flatten()
    }

    pub fn eval_partial(&self, assignment: &[Option<bool>]) -> Option<bool> {
        let mut values = Vec::with_capacity(self.nodes.len());
        self.eval_into(assignment, &mut values)
    }
}

fn tri_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn tri_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn arena(expr: &Expr) -> (ExprArena, Vec<String>) {
        let names = expr.variables();
        let vars: HashMap<&str, VarId> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, VarId::new(i as u32)))
            .collect();
        let owned = names.iter().map(|s| s.to_string()).collect();
        (ExprArena::from_expr(expr, &vars), owned)
    }

    #[test]
    fn test_variables_first_seen() {
        let e = Expr::or(
            Expr::var("B"),
            Expr::and(Expr::var("A"), Expr::not(Expr::var("B"))),
        );
        assert_eq!(e.variables(), vec!["B", "A"]);
    }

    #[test]
    fn test_arena_topological() {
        let e = Expr::and(
            Expr::var("x"),
            Expr::or(Expr::var("y"), Expr::not(Expr::var("x"))),
        );
        let (arena, names) = arena(&e);
        println!("arena = {:?}", arena);
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(arena.len(), 6);
        for i in 0..arena.len() {
            let node = arena.get(Idx(i));
            node.fmap_ref(|child| assert!(child.index() > i, "child of {} at {}", i, child.index()));
        }
    }

    #[test]
    fn test_eval_partial() {
        // x & (y | !x)
        let e = Expr::and(
            Expr::var("x"),
            Expr::or(Expr::var("y"), Expr::not(Expr::var("x"))),
        );
        let (arena, _) = arena(&e);

        assert_eq!(arena.eval_partial(&[None, None]), None);
        assert_eq!(arena.eval_partial(&[Some(false), None]), Some(false));
        assert_eq!(arena.eval_partial(&[Some(true), None]), None);
        assert_eq!(arena.eval_partial(&[Some(true), Some(true)]), Some(true));
        assert_eq!(arena.eval_partial(&[Some(true), Some(false)]), Some(false));
    }

    #[test]
    fn test_eval_total() {
        let e = Expr::or(Expr::var("a"), Expr::not(Expr::var("b")));
        assert!(e.eval(&|_| Some(false)));
        assert!(!e.eval(&|name| Some(name == "b")));
        assert!(e.eval(&|_| None));
    }

    #[test]
    fn test_display_minimal_parens() {
        let e = Expr::or(
            Expr::var("A"),
            Expr::and(Expr::var("B"), Expr::not(Expr::var("A"))),
        );
        assert_eq!(e.to_string(), "A | B & !A");

        let e = Expr::and(Expr::or(Expr::var("A"), Expr::var("B")), Expr::var("C"));
        assert_eq!(e.to_string(), "(A | B) & C");

        let e = Expr::not(Expr::and(Expr::var("A"), Expr::var("B")));
        assert_eq!(e.to_string(), "!(A & B)");

        let e = Expr::and(Expr::var("A"), Expr::and(Expr::var("B"), Expr::var("C")));
        assert_eq!(e.to_string(), "A & (B & C)");
    }
}
