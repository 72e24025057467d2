// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Evaluation of claim paths against a fetched entity.

use serde_json::Value;

use super::path::{ClaimPath, Selector};
use super::value::ExtractedValue;

/// All values matched by `path` within `entity`.
pub fn find_matches<'a>(path: &ClaimPath, entity: &'a Value) -> Vec<&'a Value> {
    let mut current = vec![entity];

    for segment in path.segments() {
        current = current
            .into_iter()
            .filter_map(|value| value.as_object()?.get(&segment.name))
            .collect();

        for selector in &segment.selectors {
            current = current
                .into_iter()
                .filter_map(Value::as_array)
                .flat_map(|items| select(selector, items))
                .collect();
        }

        if current.is_empty() {
            break;
        }
    }

    current
}

fn select<'a>(selector: &Selector, items: &'a [Value]) -> Vec<&'a Value> {
    match selector {
        Selector::All => items.iter().collect(),
        Selector::Index(i) => items.get(*i).into_iter().collect(),
        Selector::Filter(filter) => items.iter().filter(|item| filter.matches(item)).collect(),
    }
}

/// Extract the value of a claim.
///
/// One match yields that value, several yield a list, and none yields
/// `Null`. A miss is never an error.
pub fn extract(path: &ClaimPath, entity: &Value) -> ExtractedValue {
    let mut matches = find_matches(path, entity);
    match matches.len() {
        0 => ExtractedValue::Null,
        1 => ExtractedValue::from(matches.remove(0)),
        _ => ExtractedValue::List(matches.into_iter().map(ExtractedValue::from).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity() -> Value {
        json!({
            "m": {
                "k": "v",
                "l": ["a", "b", "c"],
                "lm": [{"id": 1}, {"id": 2}, {"id": 3}]
            },
            "metadata": {"m1": 1},
            "roles": [
                {"role": "admin", "org": "acme"},
                {"role": "user", "org": "globex"},
                {"role": "admin", "org": "initech"}
            ]
        })
    }

    fn run(raw: &str) -> ExtractedValue {
        extract(&ClaimPath::parse("test", raw).unwrap(), &entity())
    }

    #[test]
    fn scalar_path() {
        assert_eq!(run("m.k"), ExtractedValue::from("v"));
    }

    #[test]
    fn wildcard_paths() {
        assert_eq!(run("m.l[]"), ExtractedValue::from(vec!["a", "b", "c"]));
        assert_eq!(run("m.l[*]"), ExtractedValue::from(vec!["a", "b", "c"]));
        assert_eq!(run("m.lm[*].id"), ExtractedValue::from(vec![1i64, 2, 3]));
    }

    #[test]
    fn index_path() {
        assert_eq!(run("m.l[2]"), ExtractedValue::from("c"));
        assert_eq!(run("m.l[7]"), ExtractedValue::Null);
    }

    #[test]
    fn metadata_is_traversed_when_extracting() {
        assert_eq!(run("metadata.m1"), ExtractedValue::from(1i64));
    }

    #[test]
    fn filter_path() {
        assert_eq!(
            run("roles[?(@.role == 'admin')].org"),
            ExtractedValue::from(vec!["acme", "initech"])
        );
        assert_eq!(
            run("roles[?(@.role != 'admin')].org"),
            ExtractedValue::from("globex")
        );
    }

    #[test]
    fn misses_yield_null() {
        assert_eq!(run("nonexistent.nonexistent"), ExtractedValue::Null);
        assert_eq!(run("m.k.deeper"), ExtractedValue::Null);
        assert_eq!(run("m.k[*]"), ExtractedValue::Null);
    }

    #[test]
    fn whole_object_is_extracted() {
        assert_eq!(run("metadata"), ExtractedValue::from(json!({"m1": 1})));
    }
}
