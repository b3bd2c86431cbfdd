//! The compiled argument map handed to formatters.
//!
//! [`Arguments`] keeps insertion order and serializes to the backend's wire
//! shape. Compound arguments (`meta_query`, `tax_query`) are [`ClauseList`]s,
//! which serialize as a map of numeric keys followed by an optional
//! `relation` entry:
//!
//! ```json
//! { "0": { "key": "size", "value": "M", "compare": "=", "type": "CHAR" },
//!   "relation": "OR" }
//! ```

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::grammar::Relation;

/// One compiled argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    Clauses(ClauseList),
}

impl Argument {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Argument::Value(v) => Some(v),
            Argument::Clauses(_) => None,
        }
    }

    pub fn as_clauses(&self) -> Option<&ClauseList> {
        match self {
            Argument::Clauses(list) => Some(list),
            Argument::Value(_) => None,
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<ClauseList> for Argument {
    fn from(list: ClauseList) -> Self {
        Argument::Clauses(list)
    }
}

impl Serialize for Argument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Argument::Value(v) => v.serialize(serializer),
            Argument::Clauses(list) => list.serialize(serializer),
        }
    }
}

/// A list of compiled clauses plus the relation between them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClauseList {
    pub clauses: Vec<ClauseEntry>,
    pub relation: Option<Relation>,
}

impl ClauseList {
    pub fn new(clauses: Vec<ClauseEntry>, relation: Option<Relation>) -> Self {
        Self { clauses, relation }
    }

    /// Number of entries, counting the relation marker.
    pub fn len(&self) -> usize {
        self.clauses.len() + usize::from(self.relation.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn relation(&self) -> Option<Relation> {
        self.relation
    }

    pub fn get(&self, index: usize) -> Option<&ClauseEntry> {
        self.clauses.get(index)
    }
}

impl Serialize for ClauseList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (index, clause) in self.clauses.iter().enumerate() {
            map.serialize_entry(&index.to_string(), clause)?;
        }
        if let Some(relation) = &self.relation {
            map.serialize_entry("relation", relation)?;
        }
        map.end()
    }
}

/// One member of a compound argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseEntry {
    Meta {
        key: String,
        value: Value,
        compare: &'static str,
        kind: &'static str,
    },
    Taxonomy {
        taxonomy: String,
        field: &'static str,
        terms: Value,
        include_children: bool,
        operator: &'static str,
    },
    Group(ClauseList),
}

impl Serialize for ClauseEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClauseEntry::Meta {
                key,
                value,
                compare,
                kind,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("key", key)?;
                map.serialize_entry("value", value)?;
                map.serialize_entry("compare", compare)?;
                map.serialize_entry("type", kind)?;
                map.end()
            }
            ClauseEntry::Taxonomy {
                taxonomy,
                field,
                terms,
                include_children,
                operator,
            } => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("taxonomy", taxonomy)?;
                map.serialize_entry("field", field)?;
                map.serialize_entry("terms", terms)?;
                map.serialize_entry("include_children", include_children)?;
                map.serialize_entry("operator", operator)?;
                map.end()
            }
            ClauseEntry::Group(list) => list.serialize(serializer),
        }
    }
}

/// Insertion-ordered argument map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, argument: impl Into<Argument>) {
        let name = name.into();
        let argument = argument.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = argument,
            None => self.entries.push((name, argument)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Argument> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Shortcut for a scalar argument.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Argument::as_value)
    }

    /// Shortcut for a compound argument.
    pub fn clauses(&self, name: &str) -> Option<&ClauseList> {
        self.get(name).and_then(Argument::as_clauses)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The wire shape as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Arguments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, argument) in &self.entries {
            map.serialize_entry(name, argument)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(key: &str, value: Value) -> ClauseEntry {
        ClauseEntry::Meta {
            key: key.to_string(),
            value,
            compare: "=",
            kind: "CHAR",
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut args = Arguments::new();
        args.insert("post_type", json!("any"));
        args.insert("posts_per_page", json!(-1));
        args.insert("post_type", json!("post"));

        let keys: Vec<_> = args.keys().collect();
        assert_eq!(keys, vec!["post_type", "posts_per_page"]);
        assert_eq!(args.value("post_type"), Some(&json!("post")));
    }

    #[test]
    fn test_clause_list_len_counts_relation() {
        let list = ClauseList::new(
            vec![meta("a", json!(1)), meta("b", json!(2))],
            Some(Relation::Or),
        );
        assert_eq!(list.len(), 3);
        assert_eq!(list.relation(), Some(Relation::Or));
    }

    #[test]
    fn test_wire_shape() {
        let nested = ClauseList::new(vec![meta("size", json!("M"))], Some(Relation::Or));
        let list = ClauseList::new(
            vec![ClauseEntry::Group(nested), meta("color", json!("red"))],
            Some(Relation::And),
        );
        let mut args = Arguments::new();
        args.insert("meta_query", list);

        assert_eq!(
            args.to_json(),
            json!({
                "meta_query": {
                    "0": {
                        "0": { "key": "size", "value": "M", "compare": "=", "type": "CHAR" },
                        "relation": "OR"
                    },
                    "1": { "key": "color", "value": "red", "compare": "=", "type": "CHAR" },
                    "relation": "AND"
                }
            })
        );
    }

    #[test]
    fn test_taxonomy_entry_shape() {
        let entry = ClauseEntry::Taxonomy {
            taxonomy: "size".into(),
            field: "name",
            terms: json!(37),
            include_children: true,
            operator: "IN",
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "taxonomy": "size",
                "field": "name",
                "terms": 37,
                "include_children": true,
                "operator": "IN"
            })
        );
    }
}
