//! Single comparisons of a named input against a threshold.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Absolute tolerance used by numeric `==` and `!=`.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    /// All comparators, two-character symbols first so that a scan for the
    /// first matching symbol never stops at a prefix (`<` of `<=`).
    pub const ALL: [Comparator; 6] = [
        Comparator::Le,
        Comparator::Ge,
        Comparator::Eq,
        Comparator::Ne,
        Comparator::Lt,
        Comparator::Gt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    pub fn compare_numbers(self, input: f64, threshold: f64) -> bool {
        match self {
            Comparator::Lt => input < threshold,
            Comparator::Le => input <= threshold,
            Comparator::Gt => input > threshold,
            Comparator::Ge => input >= threshold,
            Comparator::Eq => (input - threshold).abs() < EPSILON,
            Comparator::Ne => (input - threshold).abs() > EPSILON,
        }
    }

    /// Strings only support equality; ordering comparators never match.
    pub fn compare_text(self, input: &str, threshold: &str) -> bool {
        match self {
            Comparator::Eq => input == threshold,
            Comparator::Ne => input != threshold,
            _ => false,
        }
    }
}

impl FromStr for Comparator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::ALL.into_iter().find(|c| c.symbol() == s).ok_or(())
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A rule input or threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) if s.contains('\'') => write!(f, "\"{}\"", s),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Named inputs for rule evaluation.
///
/// ```
/// use minni_logic::condition::{Bindings, Value};
///
/// let inputs: Bindings = [("ap1_dist", 1.2), ("ap2_dist", 4.0)].into_iter().collect();
/// assert_eq!(inputs.get("ap1_dist"), Some(&Value::Number(1.2)));
/// assert_eq!(inputs.get("ap3_dist"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Builder-style [`insert`][Self::insert].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Bindings
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}

impl From<HashMap<String, f64>> for Bindings {
    fn from(map: HashMap<String, f64>) -> Self {
        map.into_iter().collect()
    }
}

/// `variable comparator threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub variable: String,
    pub comparator: Comparator,
    pub threshold: Value,
}

impl Condition {
    pub fn new(variable: impl Into<String>, comparator: Comparator, threshold: impl Into<Value>) -> Self {
        Self {
            variable: variable.into(),
            comparator,
            threshold: threshold.into(),
        }
    }

    /// Compares one input value against the threshold.
    /// Mismatched kinds (text input, numeric threshold or the reverse) are false.
    pub fn test(&self, input: &Value) -> bool {
        match (input, &self.threshold) {
            (Value::Number(x), Value::Number(t)) => self.comparator.compare_numbers(*x, *t),
            (Value::Text(x), Value::Text(t)) => self.comparator.compare_text(x, t),
            _ => false,
        }
    }

    /// Evaluates against `bindings`. A missing variable is false, not an error.
    pub fn evaluate(&self, bindings: &Bindings) -> bool {
        bindings.get(&self.variable).is_some_and(|input| self.test(input))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.variable, self.comparator, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_comparator_symbols() {
        for c in Comparator::ALL {
            assert_eq!(c.symbol().parse::<Comparator>(), Ok(c));
        }
        assert!("=".parse::<Comparator>().is_err());
        assert!("=>".parse::<Comparator>().is_err());
    }

    #[test]
    fn test_numeric_comparisons() {
        let cases = [
            (Comparator::Lt, 1.0, 2.0, true),
            (Comparator::Lt, 2.0, 2.0, false),
            (Comparator::Le, 2.0, 2.0, true),
            (Comparator::Gt, 2.5, 2.0, true),
            (Comparator::Ge, 2.0, 2.0, true),
            (Comparator::Ge, 1.9, 2.0, false),
            (Comparator::Eq, 0.1 + 0.2, 0.3, true),
            (Comparator::Ne, 0.1 + 0.2, 0.3, false),
            (Comparator::Ne, 1.0, 0.0, true),
            (Comparator::Eq, -5.0, -5.0, true),
        ];
        for (c, input, threshold, expected) in cases {
            assert_eq!(c.compare_numbers(input, threshold), expected, "{} {} {}", input, c, threshold);
        }
    }

    #[test]
    fn test_nan_never_matches() {
        for c in Comparator::ALL {
            assert!(!c.compare_numbers(f64::NAN, 1.0), "{}", c);
        }
    }

    #[test]
    fn test_text_comparisons() {
        assert!(Comparator::Eq.compare_text("admin", "admin"));
        assert!(Comparator::Ne.compare_text("guest", "admin"));
        assert!(!Comparator::Lt.compare_text("a", "b"));
        assert!(!Comparator::Ge.compare_text("b", "a"));
    }

    #[test]
    fn test_condition_missing_variable() {
        let cond = Condition::new("temp", Comparator::Gt, 37.5);
        assert!(!cond.evaluate(&Bindings::new()));
        assert!(!cond.evaluate(&Bindings::new().with("pulse", 80.0)));
        assert!(cond.evaluate(&Bindings::new().with("temp", 38.0)));
    }

    #[test]
    fn test_condition_kind_mismatch() {
        let numeric = Condition::new("role", Comparator::Eq, 1.0);
        assert!(!numeric.evaluate(&Bindings::new().with("role", "1")));
        let text = Condition::new("role", Comparator::Eq, "admin");
        assert!(!text.evaluate(&Bindings::new().with("role", 1.0)));
        assert!(text.evaluate(&Bindings::new().with("role", "admin")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Condition::new("x", Comparator::Le, 0.8).to_string(), "(x <= 0.8)");
        assert_eq!(Condition::new("role", Comparator::Ne, "guest").to_string(), "(role != 'guest')");
        assert_eq!(Condition::new("msg", Comparator::Eq, "it's").to_string(), "(msg == \"it's\")");
    }

    #[test]
    fn test_bindings_from_map() {
        let map: HashMap<String, f64> = HashMap::from([("a".to_string(), 1.0), ("b".to_string(), -2.0)]);
        let bindings = Bindings::from(map);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.get("b"), Some(&Value::Number(-2.0)));
    }
}
