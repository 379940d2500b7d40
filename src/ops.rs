//! Numeric, array and functional helpers built on `get`/`set`.
//!
//! Each mutating helper reads the current value, computes the new one and
//! writes it back through [`Store::set`], so it flushes exactly once.

use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};
use crate::store::{json_type_name, validate_key, Backend, Store};

/// Largest integer an `f64` represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Arithmetic operator accepted by [`Store::math`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl MathOp {
    /// Apply with IEEE 754 semantics. Division by zero yields infinity or
    /// NaN, and `%` keeps the sign of the dividend.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            MathOp::Add => lhs + rhs,
            MathOp::Subtract => lhs - rhs,
            MathOp::Multiply => lhs * rhs,
            MathOp::Divide => lhs / rhs,
            MathOp::Remainder => lhs % rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Subtract => "-",
            MathOp::Multiply => "*",
            MathOp::Divide => "/",
            MathOp::Remainder => "%",
        }
    }
}

impl FromStr for MathOp {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(MathOp::Add),
            "-" => Ok(MathOp::Subtract),
            "*" => Ok(MathOp::Multiply),
            "/" => Ok(MathOp::Divide),
            "%" => Ok(MathOp::Remainder),
            other => Err(StoreError::Validation(format!(
                "invalid operator {other:?}, expected one of + - * / %"
            ))),
        }
    }
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Strict equality used by `pull`, `find` and `find_by`.
///
/// Primitives compare by value (numbers numerically). Arrays and objects
/// compare by identity, and a caller-supplied value is never the stored one,
/// so composites never match.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}

/// Encode an arithmetic result as a JSON value.
///
/// Integral results in the safe integer range become JSON integers.
/// Infinity and NaN have no JSON form and become `null`.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> StoreError {
    StoreError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: json_type_name(found),
    }
}

fn validate_operand(operand: f64) -> Result<()> {
    if operand.is_nan() {
        return Err(StoreError::Validation(
            "operand must be a number, got NaN".to_string(),
        ));
    }
    Ok(())
}

impl<B: Backend> Store<B> {
    /// Numeric value of `key`, including infinity or NaN left by an earlier
    /// arithmetic call (those read back as `null` through [`Store::get`]).
    ///
    /// Returns `None` if the key does not exist.
    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        if let Some(n) = self.non_finite(key) {
            return Ok(Some(n));
        }
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(mismatch(key, "number", other)),
        }
    }

    /// Elements of the array at `key`, or an empty slice if the key is
    /// absent or does not hold an array.
    fn array(&self, key: &str) -> Result<&[Value]> {
        match self.get(key)? {
            Some(Value::Array(items)) => Ok(items.as_slice()),
            _ => Ok(&[]),
        }
    }

    fn apply(&mut self, key: &str, op: MathOp, operand: f64) -> Result<f64> {
        validate_key(key)?;
        validate_operand(operand)?;
        let result = op.apply(self.number(key)?.unwrap_or(0.0), operand);
        self.set(key, number_value(result))?;
        if !result.is_finite() {
            self.mark_non_finite(key, result);
        }
        Ok(result)
    }

    /// Add `delta` to the number at `key` (0 if absent). Returns the result.
    pub fn add(&mut self, key: &str, delta: f64) -> Result<f64> {
        self.apply(key, MathOp::Add, delta)
    }

    /// Subtract `delta` from the number at `key` (0 if absent).
    pub fn subtract(&mut self, key: &str, delta: f64) -> Result<f64> {
        self.apply(key, MathOp::Subtract, delta)
    }

    /// Apply `operator` (`+ - * / %`) to the number at `key` and `operand`.
    ///
    /// Never fails on division by zero: `5 / 0` returns infinity and keeps it
    /// for later arithmetic. The backing file holds `null` in its place.
    pub fn math(&mut self, key: &str, operator: &str, operand: f64) -> Result<f64> {
        validate_key(key)?;
        let op = operator.parse::<MathOp>()?;
        self.apply(key, op, operand)
    }

    /// Append `value` to the array at `key`, creating it if absent.
    /// Returns the new array.
    pub fn push(&mut self, key: &str, value: impl Into<Value>) -> Result<Vec<Value>> {
        let mut items = match self.get(key)? {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => return Err(mismatch(key, "array", other)),
        };
        items.push(value.into());
        self.set(key, Value::Array(items.clone()))?;
        Ok(items)
    }

    /// Remove every element strictly equal to `value` from the array at
    /// `key` and return what is left.
    ///
    /// An absent key is a no-op returning an empty array.
    pub fn pull(&mut self, key: &str, value: &Value) -> Result<Vec<Value>> {
        let kept: Vec<Value> = match self.get(key)? {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|item| !strict_eq(item, value))
                .cloned()
                .collect(),
            Some(other) => return Err(mismatch(key, "array", other)),
        };
        self.set(key, Value::Array(kept.clone()))?;
        Ok(kept)
    }

    /// Elements of the array at `key` strictly equal to `value`.
    pub fn find(&self, key: &str, value: &Value) -> Result<Vec<Value>> {
        Ok(self
            .array(key)?
            .iter()
            .filter(|item| strict_eq(item, value))
            .cloned()
            .collect())
    }

    /// Object elements of the array at `key` whose `property` is strictly
    /// equal to `value`.
    pub fn find_by(&self, key: &str, property: &str, value: &Value) -> Result<Vec<Value>> {
        Ok(self
            .array(key)?
            .iter()
            .filter(|item| {
                item.as_object()
                    .and_then(|obj| obj.get(property))
                    .is_some_and(|field| strict_eq(field, value))
            })
            .cloned()
            .collect())
    }

    /// Transform each element of the array at `key`. Not persisted.
    pub fn map<T, F>(&self, key: &str, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Value, usize) -> T,
    {
        Ok(self
            .array(key)?
            .iter()
            .enumerate()
            .map(|(index, item)| f(item, index))
            .collect())
    }

    /// Elements of the array at `key` for which `f` returns true.
    pub fn filter<F>(&self, key: &str, mut f: F) -> Result<Vec<Value>>
    where
        F: FnMut(&Value, usize) -> bool,
    {
        Ok(self
            .array(key)?
            .iter()
            .enumerate()
            .filter(|&(index, item)| f(item, index))
            .map(|(_, item)| item.clone())
            .collect())
    }

    /// Fold the array at `key`, starting from `initial`.
    ///
    /// Returns `initial` untouched if the key is absent or not an array.
    pub fn reduce<A, F>(&self, key: &str, mut f: F, initial: A) -> Result<A>
    where
        F: FnMut(A, &Value, usize) -> A,
    {
        Ok(self
            .array(key)?
            .iter()
            .enumerate()
            .fold(initial, |acc, (index, item)| f(acc, item, index)))
    }

    /// Call `f` on each element of the array at `key`.
    pub fn for_each<F>(&self, key: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value, usize),
    {
        for (index, item) in self.array(key)?.iter().enumerate() {
            f(item, index);
        }
        Ok(())
    }
}
