// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dynamic claim values.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// Scalar claim value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
}

/// Value extracted for a single claim.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExtractedValue {
    #[default]
    Null,
    Scalar(Scalar),
    List(Vec<ExtractedValue>),
    Object(BTreeMap<String, ExtractedValue>),
}

impl ExtractedValue {
    pub fn string(s: impl Into<String>) -> Self {
        ExtractedValue::Scalar(Scalar::String(s.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExtractedValue::Null)
    }

    /// JSON form of the value. Object keys come out sorted.
    pub fn to_json(&self) -> Value {
        match self {
            ExtractedValue::Null => Value::Null,
            ExtractedValue::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            ExtractedValue::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            ExtractedValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            ExtractedValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ExtractedValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for ExtractedValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ExtractedValue::Null,
            Value::Bool(b) => ExtractedValue::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => ExtractedValue::Scalar(Scalar::Number(n.clone())),
            Value::String(s) => ExtractedValue::Scalar(Scalar::String(s.clone())),
            Value::Array(items) => ExtractedValue::List(items.iter().map(Self::from).collect()),
            Value::Object(fields) => ExtractedValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for ExtractedValue {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

impl From<&str> for ExtractedValue {
    fn from(s: &str) -> Self {
        ExtractedValue::string(s)
    }
}

impl From<String> for ExtractedValue {
    fn from(s: String) -> Self {
        ExtractedValue::string(s)
    }
}

impl From<bool> for ExtractedValue {
    fn from(b: bool) -> Self {
        ExtractedValue::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ExtractedValue {
    fn from(n: i64) -> Self {
        ExtractedValue::Scalar(Scalar::Number(n.into()))
    }
}

impl<T: Into<ExtractedValue>> From<Vec<T>> for ExtractedValue {
    fn from(items: Vec<T>) -> Self {
        ExtractedValue::List(items.into_iter().map(Into::into).collect())
    }
}
