// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim path parsing.
//!
//! A claim path is a dot-separated list of field names over the user entity,
//! e.g. `m.lm[*].id`. Each segment may carry one or more selectors:
//!
//! | Selector | Meaning |
//! |----------|---------|
//! | `[]`, `[*]` | every element of the array |
//! | `[N]` | element `N` of the array |
//! | `[?(@.attr OP literal)]` | elements whose `attr` compares true |
//! | `[?(@.attr)]` | elements where `attr` is present and not null |
//!
//! A parsed path yields both a [`SelectionTree`] fragment (what to ask the
//! GraphQL endpoint for) and the list of steps used to pull the value back
//! out of the response.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::error::ClaimsConfigError;
use super::tree::{Selection, SelectionTree};

/// Top-level field that is always fetched as a whole.
pub const METADATA_FIELD: &str = "metadata";

/// Comparison operator inside a filter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Filter selector, `[?(@.attr OP literal)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attr: String,
    pub predicate: Option<(CompareOp, Value)>,
}

impl Filter {
    /// Whether an array element passes the filter.
    pub fn matches(&self, element: &Value) -> bool {
        let Some(actual) = element.as_object().and_then(|o| o.get(&self.attr)) else {
            return false;
        };

        let Some((op, expected)) = &self.predicate else {
            return !actual.is_null();
        };

        match op {
            CompareOp::Eq => json_eq(actual, expected),
            CompareOp::Ne => !json_eq(actual, expected),
            CompareOp::Lt => json_cmp(actual, expected) == Some(Ordering::Less),
            CompareOp::Le => matches!(
                json_cmp(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => json_cmp(actual, expected) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(
                json_cmp(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Array selector attached to a path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All,
    Index(usize),
    Filter(Filter),
}

/// One dot-separated segment of a claim path.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub selectors: Vec<Selector>,
}

/// A parsed claim path.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimPath {
    segments: Vec<Segment>,
}

impl ClaimPath {
    /// Parse a path. `claim` is only used for error reporting.
    pub fn parse(claim: &str, raw: &str) -> Result<Self, ClaimsConfigError> {
        let parts = split_segments(raw).map_err(|r| ClaimsConfigError::invalid_path(claim, r))?;

        let segments = parts
            .iter()
            .map(|part| parse_segment(part))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|r| ClaimsConfigError::invalid_path(claim, r))?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Selection tree fragment needed to fetch this path.
    ///
    /// Built right to left: the last segment is a leaf, or an empty nested
    /// placeholder when it carries a selector. A path rooted at `metadata`
    /// selects the whole field regardless of the remaining segments. Filter
    /// attributes are selected alongside the filtered field.
    pub fn selection(&self) -> SelectionTree {
        let rooted_at_metadata = self
            .segments
            .first()
            .is_some_and(|first| first.name == METADATA_FIELD);
        if rooted_at_metadata {
            return SelectionTree::single(METADATA_FIELD, Selection::Opaque);
        }

        let mut child: Option<SelectionTree> = None;
        for segment in self.segments.iter().rev() {
            let filter_attrs = filter_attrs(segment);

            let selection = match child.take() {
                None if segment.selectors.is_empty() => Selection::Leaf,
                None => Selection::Nested(with_leaves(SelectionTree::new(), &filter_attrs)),
                Some(tree) => Selection::Nested(with_leaves(tree, &filter_attrs)),
            };

            child = Some(SelectionTree::single(segment.name.clone(), selection));
        }

        child.unwrap_or_default()
    }
}

fn filter_attrs(segment: &Segment) -> Vec<&str> {
    segment
        .selectors
        .iter()
        .filter_map(|sel| match sel {
            Selector::Filter(filter) => Some(filter.attr.as_str()),
            _ => None,
        })
        .collect()
}

fn with_leaves(tree: SelectionTree, attrs: &[&str]) -> SelectionTree {
    attrs.iter().fold(tree, |acc, attr| {
        // Adding a leaf to a tree never conflicts: a leaf is refined by
        // whatever is already there.
        let leaf = SelectionTree::single(*attr, Selection::Leaf);
        match acc.clone().merge(leaf) {
            Ok(merged) => merged,
            Err(_) => acc,
        }
    })
}

/// Split on dots that are not inside brackets or quotes.
fn split_segments(path: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in path.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }

        match ch {
            '\'' | '"' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(ch);
            }
            '.' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err("unterminated string literal".to_string());
    }
    if depth != 0 {
        return Err("unbalanced '['".to_string());
    }
    parts.push(current);

    if parts.iter().any(|p| p.is_empty()) {
        return Err("empty path segment".to_string());
    }

    Ok(parts)
}

fn parse_segment(part: &str) -> Result<Segment, String> {
    let name_end = part.find('[').unwrap_or(part.len());
    let name = &part[..name_end];
    if !is_graphql_name(name) {
        return Err(format!("'{name}' is not a valid field name"));
    }

    let mut selectors = Vec::new();
    let mut rest = &part[name_end..];
    while !rest.is_empty() {
        let close = matching_bracket(rest).ok_or_else(|| format!("malformed selector in '{part}'"))?;
        selectors.push(parse_selector(&rest[1..close])?);
        rest = &rest[close + 1..];
    }

    Ok(Segment {
        name: name.to_string(),
        selectors,
    })
}

/// Index of the `]` closing the `[` at the start of `s`.
fn matching_bracket(s: &str) -> Option<usize> {
    if !s.starts_with('[') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '[' => depth += 1,
            ']' => {
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

fn parse_selector(inner: &str) -> Result<Selector, String> {
    let inner = inner.trim();
    if inner.is_empty() || inner == "*" {
        return Ok(Selector::All);
    }

    if inner.bytes().all(|b| b.is_ascii_digit()) {
        return inner
            .parse()
            .map(Selector::Index)
            .map_err(|_| format!("index '{inner}' is out of range"));
    }

    if let Some(expr) = inner.strip_prefix("?(").and_then(|e| e.strip_suffix(')')) {
        return parse_filter(expr.trim()).map(Selector::Filter);
    }

    Err(format!("unsupported selector '[{inner}]'"))
}

fn parse_filter(expr: &str) -> Result<Filter, String> {
    let body = expr
        .strip_prefix("@.")
        .ok_or_else(|| format!("filter '{expr}' must start with '@.'"))?;

    let attr_end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let attr = &body[..attr_end];
    if !is_graphql_name(attr) {
        return Err(format!("'{attr}' is not a valid filter attribute"));
    }

    let rest = body[attr_end..].trim();
    if rest.is_empty() {
        return Ok(Filter {
            attr: attr.to_string(),
            predicate: None,
        });
    }

    let (op, literal) = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ]
    .iter()
    .find_map(|(token, op)| rest.strip_prefix(*token).map(|lit| (*op, lit.trim())))
    .ok_or_else(|| format!("unsupported filter operator in '{expr}'"))?;

    Ok(Filter {
        attr: attr.to_string(),
        predicate: Some((op, parse_literal(literal)?)),
    })
}

fn parse_literal(literal: &str) -> Result<Value, String> {
    for quote in ['\'', '"'] {
        if let Some(s) = literal
            .strip_prefix(quote)
            .and_then(|l| l.strip_suffix(quote))
        {
            return Ok(Value::String(s.to_string()));
        }
    }

    match literal {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }

    literal
        .parse::<Number>()
        .map(Value::Number)
        .map_err(|_| format!("invalid filter literal '{literal}'"))
}

/// GraphQL `Name`: `[_A-Za-z][_0-9A-Za-z]*`.
fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
