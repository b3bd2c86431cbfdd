//! Clause builders for plain, meta and taxonomy filters.
//!
//! Every builder takes raw positional arguments, applies the arity shortcut,
//! checks the operator against the [`Grammar`](crate::grammar::Grammar) and
//! normalizes the remaining fields. Meta and taxonomy builders additionally
//! resolve nested sub-queries into [`ClauseGroup`] trees.
//!
//! Operator correction is permissive: an unknown operator in a meta or
//! taxonomy clause is taken to be the value, and the operator falls back to the
//! clause kind's default. This keeps `("size", "M")` working as a shortcut, but
//! it also turns a typo such as `("size", "=<", 3)` into `size = "=<"`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::grammar::{Grammar, Relation};

pub mod meta;
pub mod taxonomy;
pub mod where_clause;

pub use meta::{MetaArgs, MetaClause, MetaInput, MetaNode, NestedMeta, WhereMeta};
pub use taxonomy::{
    NestedTaxonomy, TaxonomyArgs, TaxonomyClause, TaxonomyInput, TaxonomyNode, WhereTaxonomy,
};
pub use where_clause::{WhereArgs, WhereClause, WhereClauseBuilder, WhereInput};

/// Nesting level of clauses added directly on the query builder.
pub const TOP_LEVEL: usize = 1;

/// One resolved nesting level: its members and the relation between them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseGroup<N> {
    pub nodes: Vec<N>,
    pub relation: Relation,
    pub level: usize,
}

/// Output of a meta or taxonomy build: the clause list plus the relations
/// captured per nesting level.
#[derive(Debug, Clone, PartialEq)]
pub struct Built<N> {
    pub nodes: Vec<N>,
    pub relations: BTreeMap<usize, Relation>,
}

impl<N> Default for Built<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            relations: BTreeMap::new(),
        }
    }
}

impl<N> Built<N> {
    /// Record a relation for `level`. The first relation set for a level wins.
    pub(crate) fn relate(&mut self, level: usize, relation: Relation) {
        self.relations.entry(level).or_insert(relation);
    }
}

/// Apply the arity shortcut, returning `(operator, value)`.
///
/// A missing or null value means the operator position holds the value.
/// A missing operator with a present value takes the default operator.
pub(crate) fn split_shortcut(
    operator: Option<Value>,
    value: Option<Value>,
    default: &'static str,
) -> (Value, Value) {
    match value {
        None | Some(Value::Null) => (
            Value::String(default.to_string()),
            operator.unwrap_or(Value::Null),
        ),
        Some(value) => match operator {
            None | Some(Value::Null) => (Value::String(default.to_string()), value),
            Some(operator) => (operator, value),
        },
    }
}

pub(crate) fn operator_token(operator: &Value) -> Option<&str> {
    operator.as_str()
}

/// Resolve an optional relation string, defaulting unknown values to AND.
pub(crate) fn resolve_relation(grammar: &Grammar, relation: Option<&str>) -> Option<Relation> {
    relation.map(|r| grammar.relation(r).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shortcut_moves_operator_into_value() {
        let (op, value) = split_shortcut(Some(json!("bar")), None, "=");
        assert_eq!(op, json!("="));
        assert_eq!(value, json!("bar"));
    }

    #[test]
    fn test_shortcut_with_null_value() {
        let (op, value) = split_shortcut(Some(json!(37)), Some(Value::Null), "IN");
        assert_eq!(op, json!("IN"));
        assert_eq!(value, json!(37));
    }

    #[test]
    fn test_missing_operator_uses_default() {
        let (op, value) = split_shortcut(None, Some(json!("x")), "=");
        assert_eq!(op, json!("="));
        assert_eq!(value, json!("x"));
    }

    #[test]
    fn test_full_form_is_untouched() {
        let (op, value) = split_shortcut(Some(json!("!=")), Some(json!(4)), "=");
        assert_eq!(op, json!("!="));
        assert_eq!(value, json!(4));
    }

    #[test]
    fn test_first_relation_wins() {
        let mut built: Built<()> = Built::default();
        built.relate(1, Relation::Or);
        built.relate(1, Relation::And);
        assert_eq!(built.relations.get(&1), Some(&Relation::Or));
    }

    #[test]
    fn test_unknown_relation_defaults_to_and() {
        let g = Grammar::default();
        assert_eq!(resolve_relation(&g, Some("xor")), Some(Relation::And));
        assert_eq!(resolve_relation(&g, Some("or")), Some(Relation::Or));
        assert_eq!(resolve_relation(&g, None), None);
    }
}
