//! Ordered binding store used by the query builder.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::clause::{MetaNode, TaxonomyNode, WhereClause};
use crate::grammar::Relation;

/// Value held under one binding name.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Wheres(Vec<WhereClause>),
    Metas(Vec<MetaNode>),
    Taxonomies(Vec<TaxonomyNode>),
    /// Relation per nesting level.
    Relations(BTreeMap<usize, Relation>),
}

impl Binding {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Binding::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_relations(&self) -> Option<&BTreeMap<usize, Relation>> {
        match self {
            Binding::Relations(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Value(value)
    }
}

/// Insertion-ordered map of bindings.
///
/// Rebinding a key replaces its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    entries: Vec<(String, Binding)>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the binding under `key`.
    pub fn bind(&mut self, key: impl Into<String>, binding: impl Into<Binding>) {
        let key = key.into();
        let binding = binding.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].1 = binding,
            None => self.entries.push((key, binding)),
        }
    }

    /// Append to the list stored under `key`, creating it when absent.
    ///
    /// Lists of the same kind are extended. A plain value is pushed as one
    /// element of a JSON array, wrapping an existing scalar first. Mismatched
    /// kinds replace the old binding.
    pub fn append(&mut self, key: impl Into<String>, binding: impl Into<Binding>) {
        let key = key.into();
        let binding = binding.into();
        let Some(idx) = self.position(&key) else {
            let binding = match binding {
                Binding::Value(v) => Binding::Value(Value::Array(vec![v])),
                other => other,
            };
            self.entries.push((key, binding));
            return;
        };

        let slot = &mut self.entries[idx].1;
        match (slot, binding) {
            (Binding::Wheres(list), Binding::Wheres(more)) => list.extend(more),
            (Binding::Metas(list), Binding::Metas(more)) => list.extend(more),
            (Binding::Taxonomies(list), Binding::Taxonomies(more)) => list.extend(more),
            (Binding::Value(Value::Array(list)), Binding::Value(v)) => list.push(v),
            (Binding::Value(existing), Binding::Value(v)) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, v]);
            }
            (slot, other) => *slot = other,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Binding> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, b)| b)
    }

    pub fn has(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Every binding in insertion order.
    pub fn all(&self) -> &[(String, Binding)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_keeps_insertion_slot() {
        let mut c = Container::new();
        c.bind("post_type", json!("post"));
        c.bind("limit", json!(5));
        c.bind("post_type", json!("page"));

        let keys: Vec<_> = c.all().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["post_type", "limit"]);
        assert_eq!(c.get("post_type"), Some(&Binding::Value(json!("page"))));
    }

    #[test]
    fn test_get_absent() {
        let c = Container::new();
        assert!(c.get("missing").is_none());
        assert!(!c.has("missing"));
    }

    #[test]
    fn test_append_extends_clause_lists() {
        let mut c = Container::new();
        let clause = |v: i64| WhereClause {
            column: "foo".into(),
            operator: "=",
            value: json!(v),
        };
        c.append("wheres", Binding::Wheres(vec![clause(1)]));
        c.append("wheres", Binding::Wheres(vec![clause(2)]));

        match c.get("wheres") {
            Some(Binding::Wheres(list)) => assert_eq!(list.len(), 2),
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_append_scalars_builds_array() {
        let mut c = Container::new();
        c.append("tags", json!("a"));
        c.append("tags", json!("b"));
        assert_eq!(c.get("tags"), Some(&Binding::Value(json!(["a", "b"]))));

        c.bind("single", json!(1));
        c.append("single", json!(2));
        assert_eq!(c.get("single"), Some(&Binding::Value(json!([1, 2]))));
    }

    #[test]
    fn test_append_array_value_is_one_element() {
        let mut c = Container::new();
        c.append("ids", json!([1, 2]));
        c.append("ids", json!([3]));
        assert_eq!(c.get("ids"), Some(&Binding::Value(json!([[1, 2], [3]]))));
    }
}
