//! Propositional formula parser.
//!
//! # Syntax
//!
//! ```text
//! or      := and ('|' and)*
//! and     := unary ('&' unary)*
//! unary   := '!' unary | primary
//! primary := IDENT | '(' or ')'
//! IDENT   := [A-Za-z0-9_]+
//! ```
//!
//! `!` binds tighter than `&`, which binds tighter than `|`. Binary operators
//! are left-associative. Whitespace between tokens is ignored.
//!
//! Input nested deeper than [`MAX_NESTING`] parentheses and negations, or
//! producing a tree deeper than [`MAX_DEPTH`], is rejected with
//! [`ParseError::TooDeep`].
//!
//! ```
//! use minni_logic::ast::Expr;
//! use minni_logic::formula::Formula;
//!
//! let f = Formula::parse("A | B & !A").unwrap();
//! assert_eq!(
//!     f.expr(),
//!     &Expr::or(Expr::var("A"), Expr::and(Expr::var("B"), Expr::not(Expr::var("A")))),
//! );
//! assert_eq!(f.names(), &["A", "B"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::ast::{Expr, ExprArena};
use crate::error::ParseError;
use crate::types::VarId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Not => write!(f, "'!'"),
            TokenKind::And => write!(f, "'&'"),
            TokenKind::Or => write!(f, "'|'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '!' => TokenKind::Not,
            '&' => TokenKind::And,
            '|' => TokenKind::Or,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            c if is_ident_char(c) => {
                let mut end = offset;
                while let Some(&(i, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(text[offset..end].to_string()),
                    offset,
                });
                continue;
            }
            found => return Err(ParseError::UnexpectedChar { position: offset, found }),
        };
        chars.next();
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

/// Maximum depth of a parsed formula tree. A chain `a & b & c` is as deep as
/// it is long, since binary operators nest to the left.
pub const MAX_DEPTH: usize = 1_000;

/// Maximum number of open parentheses and negations at any point.
pub const MAX_NESTING: usize = 256;

/// An expression and the depth of its tree.
type Parsed = (Expr, usize);

fn checked_depth(depth: usize, position: usize) -> Result<usize, ParseError> {
    match depth > MAX_DEPTH {
        true => Err(ParseError::TooDeep { position }),
        false => Ok(depth),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<usize> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                let offset = token.offset;
                self.pos += 1;
                Some(offset)
            }
            _ => None,
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.nesting += 1;
        match self.nesting > MAX_NESTING {
            true => Err(ParseError::TooDeep { position }),
            false => Ok(()),
        }
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn parse_or(&mut self) -> Result<Parsed, ParseError> {
        let (mut lhs, mut depth) = self.parse_and()?;
        while let Some(offset) = self.eat(&TokenKind::Or) {
            let (rhs, rhs_depth) = self.parse_operand(offset, '|', Self::parse_and)?;
            depth = checked_depth(depth.max(rhs_depth) + 1, offset)?;
            lhs = Expr::or(lhs, rhs);
        }
        Ok((lhs, depth))
    }

    fn parse_and(&mut self) -> Result<Parsed, ParseError> {
        let (mut lhs, mut depth) = self.parse_unary()?;
        while let Some(offset) = self.eat(&TokenKind::And) {
            let (rhs, rhs_depth) = self.parse_operand(offset, '&', Self::parse_unary)?;
            depth = checked_depth(depth.max(rhs_depth) + 1, offset)?;
            lhs = Expr::and(lhs, rhs);
        }
        Ok((lhs, depth))
    }

    fn parse_unary(&mut self) -> Result<Parsed, ParseError> {
        if let Some(offset) = self.eat(&TokenKind::Not) {
            self.enter(offset)?;
            let (inner, depth) = self.parse_operand(offset, '!', Self::parse_unary)?;
            self.leave();
            return Ok((Expr::not(inner), checked_depth(depth + 1, offset)?));
        }
        self.parse_primary()
    }

    /// Parses the operand following `operator`, reporting a missing operand
    /// instead of a generic error when the input ends or another operator or
    /// a closing parenthesis follows.
    fn parse_operand(
        &mut self,
        offset: usize,
        operator: char,
        parse: fn(&mut Self) -> Result<Parsed, ParseError>,
    ) -> Result<Parsed, ParseError> {
        match self.peek().map(|t| &t.kind) {
            None | Some(TokenKind::And | TokenKind::Or | TokenKind::RParen) => Err(ParseError::MissingOperand {
                position: offset,
                operator,
            }),
            _ => parse(self),
        }
    }

    fn parse_primary(&mut self) -> Result<Parsed, ParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::UnexpectedEnd { expected: "operand" });
        };
        match token.kind {
            TokenKind::Ident(name) => {
                self.pos += 1;
                Ok((Expr::Var(name), 1))
            }
            TokenKind::LParen => {
                self.pos += 1;
                self.enter(token.offset)?;
                let inner = self.parse_operand(token.offset, '(', Self::parse_or).map_err(|e| match e {
                    ParseError::MissingOperand { operator: '(', .. } if self.peek().is_none() => {
                        ParseError::UnclosedParen { position: token.offset }
                    }
                    ParseError::MissingOperand { operator: '(', position } => ParseError::UnexpectedToken {
                        position: self.peek().map_or(position, |t| t.offset),
                        found: self.peek().map_or_else(String::new, |t| t.kind.to_string()),
                    },
                    e => e,
                })?;
                if self.eat(&TokenKind::RParen).is_none() {
                    return Err(match self.peek() {
                        None => ParseError::UnclosedParen { position: token.offset },
                        Some(t) => ParseError::UnexpectedToken {
                            position: t.offset,
                            found: t.kind.to_string(),
                        },
                    });
                }
                self.leave();
                Ok(inner)
            }
            TokenKind::And => Err(ParseError::MissingOperand {
                position: token.offset,
                operator: '&',
            }),
            TokenKind::Or => Err(ParseError::MissingOperand {
                position: token.offset,
                operator: '|',
            }),
            TokenKind::RParen => Err(ParseError::UnmatchedParen { position: token.offset }),
            TokenKind::Not => unreachable!("'!' is consumed by parse_unary"),
        }
    }
}

/// Parses formula text into a boxed expression tree.
pub fn parse_expr(text: &str) -> Result<Expr, ParseError> {
    debug!("parse_expr(text = {:?})", text);

    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let (expr, depth) = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        return Err(match token.kind {
            TokenKind::RParen => ParseError::UnmatchedParen { position: token.offset },
            ref kind => ParseError::UnexpectedToken {
                position: token.offset,
                found: kind.to_string(),
            },
        });
    }

    debug!("parse_expr: depth {}", depth);
    Ok(expr)
}

impl FromStr for Expr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expr(s)
    }
}

/// A parsed formula, ready for solving.
///
/// Holds the expression tree, the variable names in first-seen order (a
/// variable's position is its [`VarId`]) and the flattened arena the solver
/// evaluates. Immutable once built; a solver only ever borrows it.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: Expr,
    names: Vec<String>,
    arena: ExprArena,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_expr(text).map(Self::from_expr)
    }

    pub fn from_expr(expr: Expr) -> Self {
        let names: Vec<String> = expr.variables().into_iter().map(str::to_string).collect();
        let vars: HashMap<&str, VarId> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), VarId::new(i as u32)))
            .collect();
        let arena = ExprArena::from_expr(&expr, &vars);
        debug!("from_expr: {} variables, {} nodes", names.len(), arena.len());
        Self { expr, names, arena }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    /// Variable names, indexed by [`VarId`].
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.names[var.index()]
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.names.iter().position(|n| n == name).map(|i| VarId::new(i as u32))
    }
}

impl FromStr for Formula {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}
