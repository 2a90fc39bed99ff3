//! Rule programs: ordered IF/THEN rules over named numeric inputs.
//!
//! # Syntax
//!
//! One rule per line, blank lines ignored:
//!
//! ```text
//! IF (var cmp literal) [& (var cmp literal)]* THEN Name=Value
//! ```
//!
//! `cmp` is one of `<=`, `>=`, `==`, `!=`, `<`, `>`. A literal is a decimal
//! number (optionally signed, with optional exponent) or a quoted string
//! (`'admin'`, `"admin"`), which supports only `==` and `!=`. Variable names
//! are taken verbatim up to the comparator, so names exported by
//! decision-tree tooling such as `petal width (cm)` work as-is.
//!
//! Parsing is all-or-nothing: the first malformed line fails the whole
//! program with its 1-based line number.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::condition::{Bindings, Comparator, Condition, Value};
use crate::error::ParseError;

/// The `Name=Value` a rule concludes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conclusion {
    name: String,
    value: String,
}

impl Conclusion {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub conditions: Vec<Condition>,
    pub conclusion: Conclusion,
}

impl Rule {
    /// True when every condition holds, checked left to right and stopping at
    /// the first one that does not.
    pub fn matches(&self, bindings: &Bindings) -> bool {
        self.conditions.iter().all(|c| c.evaluate(bindings))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF ")?;
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{}", condition)?;
        }
        write!(f, " THEN {}", self.conclusion)
    }
}

/// An ordered list of rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleProgram {
    rules: Vec<Rule>,
}

impl RuleProgram {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut rules = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let rule = parse_rule(line).map_err(|reason| ParseError::InvalidRule { line: i + 1, reason })?;
            rules.push(rule);
        }

        if rules.is_empty() {
            return Err(ParseError::EmptyProgram);
        }

        debug!("parsed rule program with {} rules", rules.len());
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The conclusion of the first rule matching `bindings`.
    pub fn evaluate(&self, bindings: &Bindings) -> Option<&Conclusion> {
        self.rules.iter().find(|rule| rule.matches(bindings)).map(|rule| &rule.conclusion)
    }
}

impl FromStr for RuleProgram {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleProgram::parse(s)
    }
}

impl fmt::Display for RuleProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

fn parse_rule(line: &str) -> Result<Rule, String> {
    let rest = line.trim();
    let mut rest = rest.strip_prefix("IF").ok_or("expected 'IF'")?.trim_start();

    let mut conditions = Vec::new();
    loop {
        if !rest.starts_with('(') {
            return Err(match conditions.is_empty() {
                true => "expected '(' after 'IF'".to_string(),
                false => "expected '(' after '&'".to_string(),
            });
        }
        let close = matching_paren(rest).ok_or("unclosed '(' in condition")?;
        conditions.push(parse_condition(&rest[1..close])?);
        rest = rest[close + 1..].trim_start();

        match rest.strip_prefix('&') {
            Some(next) => rest = next.trim_start(),
            None => break,
        }
    }

    let conclusion = rest.strip_prefix("THEN").ok_or_else(|| match rest.is_empty() {
        true => "missing 'THEN'".to_string(),
        false => format!("expected '&' or 'THEN', found {:?}", rest),
    })?;
    let (name, value) = conclusion.split_once('=').ok_or("conclusion must be Name=Value")?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() {
        return Err("conclusion is missing a name".to_string());
    }
    if value.is_empty() {
        return Err("conclusion is missing a value".to_string());
    }

    Ok(Rule {
        conditions,
        conclusion: Conclusion::new(name, value),
    })
}

/// Byte index of the `)` closing the `(` at the start of `text`.
/// Parentheses inside quoted strings are not counted.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_comparator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!')
}

fn parse_condition(text: &str) -> Result<Condition, String> {
    let start = text
        .find(is_comparator_char)
        .ok_or_else(|| format!("no comparator in condition ({})", text.trim()))?;
    let comparator = Comparator::ALL
        .into_iter()
        .find(|c| text[start..].starts_with(c.symbol()))
        .ok_or_else(|| format!("unknown comparator in condition ({})", text.trim()))?;

    let variable = text[..start].trim();
    if variable.is_empty() {
        return Err(format!("condition ({}) is missing a variable", text.trim()));
    }

    let literal = text[start + comparator.symbol().len()..].trim();
    if literal.is_empty() {
        return Err(format!("condition ({}) is missing a threshold", text.trim()));
    }

    let threshold = parse_literal(literal)?;
    if matches!(threshold, Value::Text(_)) && !matches!(comparator, Comparator::Eq | Comparator::Ne) {
        return Err(format!("string threshold {} only supports '==' and '!='", literal));
    }

    Ok(Condition::new(variable, comparator, threshold))
}

fn parse_literal(literal: &str) -> Result<Value, String> {
    for quote in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(quote) && literal.ends_with(quote) {
            return Ok(Value::Text(literal[1..literal.len() - 1].to_string()));
        }
    }

    let looks_numeric = literal
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && literal.chars().any(|c| c.is_ascii_digit());
    match literal.parse::<f64>() {
        Ok(n) if looks_numeric && n.is_finite() => Ok(Value::Number(n)),
        _ => Err(format!("invalid number {:?}", literal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    const DIAGNOSIS: &str = "IF (temp > 37.5) THEN Diagnosis=Fever\nIF (temp <= 37.5) THEN Diagnosis=Healthy";

    #[test]
    fn test_parse_single_condition() {
        let program = RuleProgram::parse(DIAGNOSIS).unwrap();
        assert_eq!(program.len(), 2);
        let rule = &program.rules()[0];
        assert_eq!(rule.conditions, vec![Condition::new("temp", Comparator::Gt, 37.5)]);
        assert_eq!(rule.conclusion, Conclusion::new("Diagnosis", "Fever"));
    }

    #[test]
    fn test_parse_conjunction() {
        let program = RuleProgram::parse("IF (ap1_dist <= 5.0) & (ap2_dist <= 5.0) THEN Context=Home_LivingRoom").unwrap();
        let rule = &program.rules()[0];
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.conditions[1].variable, "ap2_dist");
        assert_eq!(rule.conclusion.to_string(), "Context=Home_LivingRoom");
    }

    #[test]
    fn test_parse_literals() {
        let program = RuleProgram::parse(
            "IF (a == -1) & (b != +2.5) & (c < 1e3) & (d >= .5) & (role == 'admin') & (x != \"y\") THEN r=1",
        )
        .unwrap();
        let thresholds: Vec<Value> = program.rules()[0].conditions.iter().map(|c| c.threshold.clone()).collect();
        assert_eq!(
            thresholds,
            vec![
                Value::Number(-1.0),
                Value::Number(2.5),
                Value::Number(1000.0),
                Value::Number(0.5),
                Value::Text("admin".to_string()),
                Value::Text("y".to_string()),
            ]
        );
    }

    #[test]
    fn test_variable_with_spaces_and_parens() {
        let program = RuleProgram::parse("IF (petal width (cm) <= 0.80) THEN Class=0").unwrap();
        assert_eq!(program.rules()[0].conditions[0].variable, "petal width (cm)");
    }

    #[test]
    fn test_blank_lines_and_indentation() {
        let text = "\n   IF (x > 1) THEN a=1\n\n\t\n  IF (x <= 1) THEN a=0  \n";
        let program = RuleProgram::parse(text).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.rules()[1].conclusion.value(), "0");
    }

    #[test]
    fn test_malformed_lines() {
        let cases = [
            ("IF (x >) THEN y=1", 1),
            ("IF (x > 1) THEN y=1\nIF x > 1 THEN y=2", 2),
            ("IF (x > 1)", 1),
            ("IF (x > 1) THEN y", 1),
            ("IF (x > 1) THEN =1", 1),
            ("IF (x > 1) THEN y=", 1),
            ("WHEN (x > 1) THEN y=1", 1),
            ("IF (x = 1) THEN y=1", 1),
            ("IF (> 1) THEN y=1", 1),
            ("IF (x > abc) THEN y=1", 1),
            ("IF (x > inf) THEN y=1", 1),
            ("IF (x > 1 THEN y=1", 1),
            ("IF (x > 1) & THEN y=1", 1),
            ("IF (x > 1) | (y > 2) THEN z=1", 1),
            ("IF (role < 'admin') THEN z=1", 1),
            ("IF THEN y=1", 1),
            ("IF (x) THEN y=1", 1),
            ("\n\nIF (x > 1) THEN y=1\nnonsense", 4),
        ];
        for (text, line) in cases {
            match RuleProgram::parse(text) {
                Err(ParseError::InvalidRule { line: l, reason }) => {
                    println!("{:?} -> line {}: {}", text, l, reason);
                    assert_eq!(l, line, "{:?}", text);
                }
                other => panic!("{:?} parsed as {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(RuleProgram::parse(""), Err(ParseError::EmptyProgram));
        assert_eq!(RuleProgram::parse("\n  \n"), Err(ParseError::EmptyProgram));
    }

    #[test]
    fn test_first_match_wins() {
        let program = RuleProgram::parse("IF (x > 0) THEN r=first\nIF (x > 0) THEN r=second").unwrap();
        let bindings = Bindings::new().with("x", 1.0);
        assert_eq!(program.evaluate(&bindings).map(|c| c.value()), Some("first"));
    }

    #[test]
    fn test_display_round_trip_with_apostrophe() {
        let program = RuleProgram::parse("IF (msg == \"it's\") & (tag != 'a\"b') THEN reply=ok").unwrap();
        assert_eq!(program.rules()[0].conditions[0].threshold, Value::Text("it's".to_string()));
        assert_eq!(RuleProgram::parse(&program.to_string()).unwrap(), program);
    }

    #[test]
    fn test_display_round_trip() {
        let text = "IF (temp > 37.5) & (cough == 1) THEN Diagnosis=Flu\nIF (role != 'guest') THEN allow=true\n";
        let program = RuleProgram::parse(text).unwrap();
        assert_eq!(program.to_string(), text);
        assert_eq!(RuleProgram::parse(&program.to_string()).unwrap(), program);
    }
}
