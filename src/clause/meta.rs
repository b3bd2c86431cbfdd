//! Meta clauses: filters on custom key/value fields of a post.

use serde_json::Value;
use tracing::{debug, trace};

use super::{Built, ClauseGroup, TOP_LEVEL, operator_token, resolve_relation, split_shortcut};
use crate::grammar::{Grammar, Relation};

/// Callback that fills a nested meta context.
pub type NestedMetaFn = Box<dyn FnOnce(NestedMeta) -> NestedMeta>;

/// Raw positional arguments of a `where_meta` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaArgs {
    pub column: String,
    pub operator: Option<Value>,
    pub value: Option<Value>,
    pub kind: Option<String>,
    pub relation: Option<String>,
    pub level: Option<usize>,
}

impl MetaArgs {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Default::default()
        }
    }

    pub fn operator(mut self, operator: impl Into<Value>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Comparator type, e.g. `NUMERIC`.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn level(mut self, level: usize) -> Self {
        self.level = Some(level);
        self
    }
}

impl<C: Into<String>, V: Into<Value>> From<(C, V)> for MetaArgs {
    fn from((column, value): (C, V)) -> Self {
        MetaArgs::new(column).operator(value)
    }
}

impl<C: Into<String>, O: Into<Value>, V: Into<Value>> From<(C, O, V)> for MetaArgs {
    fn from((column, operator, value): (C, O, V)) -> Self {
        MetaArgs::new(column).operator(operator).value(value)
    }
}

impl<C, O, V, T> From<(C, O, V, T)> for MetaArgs
where
    C: Into<String>,
    O: Into<Value>,
    V: Into<Value>,
    T: Into<String>,
{
    fn from((column, operator, value, kind): (C, O, V, T)) -> Self {
        MetaArgs::new(column).operator(operator).value(value).kind(kind)
    }
}

/// A validated meta clause.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaClause {
    pub column: String,
    pub value: Value,
    pub operator: &'static str,
    pub kind: &'static str,
    pub level: usize,
}

/// A resolved meta tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaNode {
    Clause(MetaClause),
    Group(ClauseGroup<MetaNode>),
}

/// Input accepted by [`WhereMeta::build`].
pub enum MetaInput {
    Clause(MetaArgs),
    List(Vec<MetaInput>),
    Nested {
        query: NestedMetaFn,
        relation: Option<String>,
    },
}

impl MetaInput {
    pub fn nested(query: impl FnOnce(NestedMeta) -> NestedMeta + 'static) -> Self {
        MetaInput::Nested {
            query: Box::new(query),
            relation: None,
        }
    }

    /// Force the relation recorded for this input.
    pub fn with_relation(self, relation: &str) -> Self {
        match self {
            MetaInput::Clause(args) => MetaInput::Clause(args.relation(relation)),
            MetaInput::List(items) => {
                MetaInput::List(items.into_iter().map(|i| i.with_relation(relation)).collect())
            }
            MetaInput::Nested { query, .. } => MetaInput::Nested {
                query,
                relation: Some(relation.to_string()),
            },
        }
    }
}

impl From<MetaArgs> for MetaInput {
    fn from(args: MetaArgs) -> Self {
        MetaInput::Clause(args)
    }
}

enum PendingMeta {
    Clause(MetaArgs),
    Nested(NestedMetaFn),
}

/// Sub-query context handed to nested meta callbacks.
///
/// ```
/// use postql::clause::NestedMeta;
///
/// let scope = |q: NestedMeta| q.where_(("size", "M")).or_where(("size", "L"));
/// # let _ = scope;
/// ```
pub struct NestedMeta {
    pending: Vec<PendingMeta>,
    relation: Option<String>,
    level: usize,
}

impl NestedMeta {
    fn at_level(level: usize) -> Self {
        Self {
            pending: Vec::new(),
            relation: None,
            level,
        }
    }

    /// Nesting level clauses in this context are created at.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn where_(mut self, args: impl Into<MetaArgs>) -> Self {
        let args = args.into();
        if let Some(relation) = &args.relation {
            self.relation = Some(relation.clone());
        }
        self.pending.push(PendingMeta::Clause(args));
        self
    }

    pub fn or_where(mut self, args: impl Into<MetaArgs>) -> Self {
        self.relation = Some(Relation::Or.to_string());
        let args = args.into();
        self.pending.push(PendingMeta::Clause(args));
        self
    }

    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Add a deeper nested group, resolved after this callback returns.
    pub fn nested(mut self, query: impl FnOnce(NestedMeta) -> NestedMeta + 'static) -> Self {
        self.pending.push(PendingMeta::Nested(Box::new(query)));
        self
    }
}

/// Builds meta clauses and nested meta trees.
#[derive(Debug, Clone, Copy)]
pub struct WhereMeta<'g> {
    grammar: &'g Grammar,
}

impl<'g> WhereMeta<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn build(&self, input: MetaInput) -> Built<MetaNode> {
        let mut built = Built::default();
        self.build_into(input, &mut built);
        built
    }

    fn build_into(&self, input: MetaInput, built: &mut Built<MetaNode>) {
        match input {
            MetaInput::Clause(args) => {
                let level = args.level.unwrap_or(TOP_LEVEL);
                if let Some(relation) = resolve_relation(self.grammar, args.relation.as_deref()) {
                    built.relate(level, relation);
                }
                built.nodes.push(MetaNode::Clause(self.normalize(args, level)));
            }
            MetaInput::List(items) => {
                for item in items {
                    self.build_into(item, built);
                }
            }
            MetaInput::Nested { query, relation } => {
                if let Some(relation) = resolve_relation(self.grammar, relation.as_deref()) {
                    built.relate(TOP_LEVEL, relation);
                }
                built.nodes.push(MetaNode::Group(self.resolve(query, TOP_LEVEL + 1)));
            }
        }
    }

    /// Run `query` against a fresh context at `level` and resolve everything
    /// it accumulated, descending into nested callbacks.
    fn resolve(&self, query: NestedMetaFn, level: usize) -> ClauseGroup<MetaNode> {
        let context = query(NestedMeta::at_level(level));
        trace!(level, pending = context.pending.len(), "resolving nested meta query");

        let nodes = context
            .pending
            .into_iter()
            .map(|entry| match entry {
                PendingMeta::Clause(args) => {
                    let at = args.level.unwrap_or(level);
                    MetaNode::Clause(self.normalize(args, at))
                }
                PendingMeta::Nested(inner) => MetaNode::Group(self.resolve(inner, level + 1)),
            })
            .collect();

        ClauseGroup {
            nodes,
            relation: resolve_relation(self.grammar, context.relation.as_deref())
                .unwrap_or_default(),
            level,
        }
    }

    fn normalize(&self, args: MetaArgs, level: usize) -> MetaClause {
        let (operator, value) = split_shortcut(args.operator, args.value, "=");

        let (operator, value) =
            match operator_token(&operator).and_then(|op| self.grammar.operator(op)) {
                Some(op) => (op, value),
                None => {
                    debug!(
                        column = %args.column,
                        %operator,
                        "unknown meta operator, using it as the value"
                    );
                    ("=", operator)
                }
            };

        let kind = args
            .kind
            .as_deref()
            .and_then(|k| self.grammar.comparator(k))
            .unwrap_or("CHAR");

        MetaClause {
            column: args.column,
            value,
            operator,
            kind,
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(input: MetaInput) -> Built<MetaNode> {
        let g = Grammar::default();
        WhereMeta::new(&g).build(input)
    }

    fn clause(args: impl Into<MetaArgs>) -> MetaInput {
        MetaInput::Clause(args.into())
    }

    fn only_clause(built: &Built<MetaNode>) -> &MetaClause {
        match &built.nodes[..] {
            [MetaNode::Clause(c)] => c,
            other => panic!("expected one clause, got {:?}", other),
        }
    }

    #[test]
    fn test_shortcut_and_full_form_match() {
        let short = build(clause(("k", "v")));
        let full = build(clause(("k", "=", "v")));
        assert_eq!(short, full);

        let clause = only_clause(&short);
        assert_eq!(clause.operator, "=");
        assert_eq!(clause.value, json!("v"));
        assert_eq!(clause.kind, "CHAR");
    }

    #[test]
    fn test_comparator_type() {
        let built = build(clause(("meaning_of_life", "=", 42, "numeric")));
        assert_eq!(only_clause(&built).kind, "NUMERIC");

        let built = build(clause(("meaning_of_life", "=", 42, "INVALID_TYPE")));
        assert_eq!(only_clause(&built).kind, "CHAR");
    }

    #[test]
    fn test_invalid_operator_becomes_value() {
        let built = build(clause(("password", "invalid", "hunter2")));
        let clause = only_clause(&built);
        assert_eq!(clause.operator, "=");
        assert_eq!(clause.value, json!("invalid"));
    }

    #[test]
    fn test_relation_is_recorded_per_level() {
        let built = build(MetaArgs::from(("bar", "baz")).relation("OR").into());
        assert_eq!(built.relations.get(&1), Some(&Relation::Or));

        let built = build(clause(("bar", "baz")));
        assert!(built.relations.is_empty());
    }

    #[test]
    fn test_nested_query() {
        let built = build(MetaInput::nested(|q| {
            q.where_(("size", "M")).or_where(("size", "L"))
        }));

        let group = match &built.nodes[..] {
            [MetaNode::Group(group)] => group,
            other => panic!("expected a group, got {:?}", other),
        };
        assert_eq!(group.relation, Relation::Or);
        assert_eq!(group.level, 2);
        assert_eq!(group.nodes.len(), 2);
        assert!(matches!(
            &group.nodes[1],
            MetaNode::Clause(c) if c.value == json!("L") && c.level == 2
        ));
    }

    #[test]
    fn test_deep_nesting_increments_level() {
        let built = build(MetaInput::nested(|q| {
            q.where_(("color", "red"))
                .nested(|q| q.relation("OR").where_(("size", "M")).where_(("size", "L")))
        }));

        let MetaNode::Group(outer) = &built.nodes[0] else {
            panic!("expected a group");
        };
        assert_eq!(outer.relation, Relation::And);
        let MetaNode::Group(inner) = &outer.nodes[1] else {
            panic!("expected an inner group");
        };
        assert_eq!(inner.level, 3);
        assert_eq!(inner.relation, Relation::Or);
    }

    #[test]
    fn test_list_input_flattens() {
        let built = build(MetaInput::List(vec![
            clause(("a", 1)),
            MetaArgs::from(("b", 2)).relation("OR").into(),
            MetaArgs::from(("c", 3)).relation("AND").into(),
        ]));
        assert_eq!(built.nodes.len(), 3);
        assert_eq!(built.relations.get(&1), Some(&Relation::Or));
    }
}
