// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GraphQL selection trees built from claim paths.
//!
//! Every claim path compiles into a small fragment; fragments from all
//! configured claims are merged into one tree which is rendered into the
//! selection set of the claims query. Keys are kept in a `BTreeMap` so that
//! rendering is deterministic.

use std::collections::BTreeMap;

use super::error::ClaimsConfigError;

/// Selection for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Scalar field, selected by name only.
    Leaf,
    /// Field selected as an opaque blob (e.g. `metadata`); never traversed.
    Opaque,
    /// Field with a nested selection set. An empty set is a placeholder for
    /// array-typed fields and renders like a leaf.
    Nested(SelectionTree),
}

/// A mapping from field name to its selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTree {
    fields: BTreeMap<String, Selection>,
}

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree with a single field.
    pub fn single(name: impl Into<String>, selection: Selection) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), selection);
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Selection> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge two trees.
    ///
    /// Leaves are refined by nested selections, opaque fields absorb leaves,
    /// and nested selections merge recursively. An opaque field meeting a
    /// non-empty nested selection is a conflict. The operation is
    /// commutative and associative, so the order in which claims are folded
    /// in never changes the result.
    pub fn merge(self, other: SelectionTree) -> Result<SelectionTree, ClaimsConfigError> {
        merge_at(self, other, "")
    }

    /// Render as a GraphQL selection set, e.g. `{m{k l }metadata }`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push('{');
        for (name, selection) in &self.fields {
            match selection {
                Selection::Nested(tree) if !tree.is_empty() => {
                    out.push_str(name);
                    tree.render_into(out);
                }
                _ => {
                    out.push_str(name);
                    out.push(' ');
                }
            }
        }
        out.push('}');
    }
}

fn merge_at(
    left: SelectionTree,
    right: SelectionTree,
    prefix: &str,
) -> Result<SelectionTree, ClaimsConfigError> {
    let mut fields = left.fields;

    for (name, incoming) in right.fields {
        let location = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        let merged = match fields.remove(&name) {
            None => incoming,
            Some(existing) => merge_selection(existing, incoming, &location)?,
        };
        fields.insert(name, merged);
    }

    Ok(SelectionTree { fields })
}

fn merge_selection(
    left: Selection,
    right: Selection,
    location: &str,
) -> Result<Selection, ClaimsConfigError> {
    use Selection::*;

    match (left, right) {
        (Leaf, Leaf) => Ok(Leaf),
        (Leaf, Nested(tree)) | (Nested(tree), Leaf) => Ok(Nested(tree)),
        (Nested(a), Nested(b)) => Ok(Nested(merge_at(a, b, location)?)),
        (Opaque, Leaf) | (Leaf, Opaque) | (Opaque, Opaque) => Ok(Opaque),
        (Opaque, Nested(tree)) | (Nested(tree), Opaque) if tree.is_empty() => Ok(Opaque),
        (Opaque, Nested(_)) | (Nested(_), Opaque) => Err(ClaimsConfigError::MergeConflict {
            location: location.to_string(),
        }),
    }
}
