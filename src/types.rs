//! Core types used throughout the pathstore library.

use std::fmt;

use serde::Deserialize;

/// Identifies one stored matrix: a test code paired with a result category code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub test_code: String,
    pub result_category: i32,
}

impl EntityKey {
    pub fn new(test_code: impl Into<String>, result_category: i32) -> Self {
        Self {
            test_code: test_code.into(),
            result_category,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.test_code, self.result_category)
    }
}

/// Numeric type of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    Integer,
    Float,
}

/// A single matrix cell value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn is_zero(&self) -> bool {
        match *self {
            Value::Int(v) => v == 0,
            Value::Float(v) => v == 0.0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
        }
    }

    /// Returns the integer value, or None for a float cell.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::Float(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Matrix dimensions: practices (rows) by dates (columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_ordering() {
        let mut keys = vec![
            EntityKey::new("TSH", 0),
            EntityKey::new("FBC", 1),
            EntityKey::new("FBC", -1),
        ];
        keys.sort();
        assert_eq!(keys[0], EntityKey::new("FBC", -1));
        assert_eq!(keys[1], EntityKey::new("FBC", 1));
        assert_eq!(keys[2], EntityKey::new("TSH", 0));
    }

    #[test]
    fn test_value_zero() {
        assert!(Value::Int(0).is_zero());
        assert!(Value::Float(0.0).is_zero());
        assert!(!Value::Float(0.5).is_zero());
        assert_eq!(Value::Int(3).as_f64(), 3.0);
        assert_eq!(Value::Float(1.5).as_i64(), None);
    }

    #[test]
    fn test_shape_contains() {
        let shape = Shape::new(4, 3);
        assert_eq!(shape.cells(), 12);
        assert!(shape.contains(3, 2));
        assert!(!shape.contains(4, 0));
        assert!(!shape.contains(0, 3));
    }
}
