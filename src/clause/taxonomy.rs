//! Taxonomy clauses: filters on the terms a post is tagged with.

use serde_json::Value;
use tracing::{debug, trace};

use super::{Built, ClauseGroup, TOP_LEVEL, operator_token, resolve_relation, split_shortcut};
use crate::grammar::{Grammar, Relation};

/// Callback that fills a nested taxonomy context.
pub type NestedTaxonomyFn = Box<dyn FnOnce(NestedTaxonomy) -> NestedTaxonomy>;

/// Raw positional arguments of a `where_taxonomy` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyArgs {
    pub taxonomy: String,
    pub field: Option<String>,
    pub operator: Option<Value>,
    pub value: Option<Value>,
    pub include_children: bool,
    pub relation: Option<String>,
    pub level: Option<usize>,
}

impl TaxonomyArgs {
    pub fn new(taxonomy: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            field: None,
            operator: None,
            value: None,
            include_children: true,
            relation: None,
            level: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<Value>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn include_children(mut self, include: bool) -> Self {
        self.include_children = include;
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

impl<T, F, V> From<(T, F, V)> for TaxonomyArgs
where
    T: Into<String>,
    F: Into<String>,
    V: Into<Value>,
{
    fn from((taxonomy, field, value): (T, F, V)) -> Self {
        TaxonomyArgs::new(taxonomy).field(field).operator(value)
    }
}

impl<T, F, O, V> From<(T, F, O, V)> for TaxonomyArgs
where
    T: Into<String>,
    F: Into<String>,
    O: Into<Value>,
    V: Into<Value>,
{
    fn from((taxonomy, field, operator, value): (T, F, O, V)) -> Self {
        TaxonomyArgs::new(taxonomy).field(field).operator(operator).value(value)
    }
}

impl<T, F, O, V> From<(T, F, O, V, bool)> for TaxonomyArgs
where
    T: Into<String>,
    F: Into<String>,
    O: Into<Value>,
    V: Into<Value>,
{
    fn from((taxonomy, field, operator, value, include_children): (T, F, O, V, bool)) -> Self {
        TaxonomyArgs::new(taxonomy)
            .field(field)
            .operator(operator)
            .value(value)
            .include_children(include_children)
    }
}

/// A validated taxonomy clause.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyClause {
    pub taxonomy: String,
    pub field: &'static str,
    pub operator: &'static str,
    pub value: Value,
    pub include_children: bool,
    pub level: usize,
}

/// A resolved taxonomy tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum TaxonomyNode {
    Clause(TaxonomyClause),
    Group(ClauseGroup<TaxonomyNode>),
}

/// Input accepted by [`WhereTaxonomy::build`].
pub enum TaxonomyInput {
    Clause(TaxonomyArgs),
    List(Vec<TaxonomyInput>),
    /// A nested query, optionally with a taxonomy every helper defaults to.
    Nested {
        taxonomy: Option<String>,
        query: NestedTaxonomyFn,
        relation: Option<String>,
    },
}

impl TaxonomyInput {
    pub fn nested(query: impl FnOnce(NestedTaxonomy) -> NestedTaxonomy + 'static) -> Self {
        TaxonomyInput::Nested {
            taxonomy: None,
            query: Box::new(query),
            relation: None,
        }
    }

    pub fn nested_in(
        taxonomy: impl Into<String>,
        query: impl FnOnce(NestedTaxonomy) -> NestedTaxonomy + 'static,
    ) -> Self {
        TaxonomyInput::Nested {
            taxonomy: Some(taxonomy.into()),
            query: Box::new(query),
            relation: None,
        }
    }

    /// Force the relation recorded for this input.
    pub fn with_relation(self, relation: &str) -> Self {
        match self {
            TaxonomyInput::Clause(args) => TaxonomyInput::Clause(args.relation(relation)),
            TaxonomyInput::List(items) => TaxonomyInput::List(
                items.into_iter().map(|i| i.with_relation(relation)).collect(),
            ),
            TaxonomyInput::Nested { taxonomy, query, .. } => TaxonomyInput::Nested {
                taxonomy,
                query,
                relation: Some(relation.to_string()),
            },
        }
    }
}

impl From<TaxonomyArgs> for TaxonomyInput {
    fn from(args: TaxonomyArgs) -> Self {
        TaxonomyInput::Clause(args)
    }
}

enum PendingTaxonomy {
    Clause(TaxonomyArgs),
    Nested(NestedTaxonomyFn),
}

/// Sub-query context handed to nested taxonomy callbacks.
///
/// The field helpers (`slug`, `name`, `term_taxonomy_id`, `id`) query the
/// context's current taxonomy: the default the context was created with, or
/// the last one selected with [`on`](NestedTaxonomy::on).
pub struct NestedTaxonomy {
    pending: Vec<PendingTaxonomy>,
    relation: Option<String>,
    taxonomy: Option<String>,
    level: usize,
}

impl NestedTaxonomy {
    fn at_level(level: usize, taxonomy: Option<String>) -> Self {
        Self {
            pending: Vec::new(),
            relation: None,
            taxonomy,
            level,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn where_(mut self, args: impl Into<TaxonomyArgs>) -> Self {
        let args = args.into();
        if let Some(relation) = &args.relation {
            self.relation = Some(relation.clone());
        }
        self.pending.push(PendingTaxonomy::Clause(args));
        self
    }

    pub fn or_where(mut self, args: impl Into<TaxonomyArgs>) -> Self {
        self.relation = Some(Relation::Or.to_string());
        self.pending.push(PendingTaxonomy::Clause(args.into()));
        self
    }

    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Select the taxonomy queried by the field helpers that follow.
    pub fn on(mut self, taxonomy: impl Into<String>) -> Self {
        self.taxonomy = Some(taxonomy.into());
        self
    }

    pub fn slug(self, terms: impl Into<Value>) -> Self {
        self.term("slug", terms)
    }

    pub fn name(self, terms: impl Into<Value>) -> Self {
        self.term("name", terms)
    }

    pub fn term_taxonomy_id(self, terms: impl Into<Value>) -> Self {
        self.term("term_taxonomy_id", terms)
    }

    pub fn id(self, terms: impl Into<Value>) -> Self {
        self.term("term_id", terms)
    }

    /// Add a deeper nested group, resolved after this callback returns.
    pub fn nested(
        mut self,
        query: impl FnOnce(NestedTaxonomy) -> NestedTaxonomy + 'static,
    ) -> Self {
        self.pending.push(PendingTaxonomy::Nested(Box::new(query)));
        self
    }

    fn term(mut self, field: &str, terms: impl Into<Value>) -> Self {
        let taxonomy = self.taxonomy.clone().unwrap_or_default();
        if taxonomy.is_empty() {
            debug!(field, "taxonomy helper used without a taxonomy");
        }
        self.pending.push(PendingTaxonomy::Clause(
            TaxonomyArgs::new(taxonomy).field(field).operator(terms),
        ));
        self
    }
}

/// Builds taxonomy clauses and nested taxonomy trees.
#[derive(Debug, Clone, Copy)]
pub struct WhereTaxonomy<'g> {
    grammar: &'g Grammar,
}

impl<'g> WhereTaxonomy<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn build(&self, input: TaxonomyInput) -> Built<TaxonomyNode> {
        let mut built = Built::default();
        self.build_into(input, &mut built);
        built
    }

    fn build_into(&self, input: TaxonomyInput, built: &mut Built<TaxonomyNode>) {
        match input {
            TaxonomyInput::Clause(args) => {
                let level = args.level.unwrap_or(TOP_LEVEL);
                if let Some(relation) = resolve_relation(self.grammar, args.relation.as_deref()) {
                    built.relate(level, relation);
                }
                built.nodes.push(TaxonomyNode::Clause(self.normalize(args, level)));
            }
            TaxonomyInput::List(items) => {
                for item in items {
                    self.build_into(item, built);
                }
            }
            TaxonomyInput::Nested {
                taxonomy,
                query,
                relation,
            } => {
                if let Some(relation) = resolve_relation(self.grammar, relation.as_deref()) {
                    built.relate(TOP_LEVEL, relation);
                }
                let group = self.resolve(query, taxonomy, TOP_LEVEL + 1);
                built.nodes.push(TaxonomyNode::Group(group));
            }
        }
    }

    fn resolve(
        &self,
        query: NestedTaxonomyFn,
        taxonomy: Option<String>,
        level: usize,
    ) -> ClauseGroup<TaxonomyNode> {
        let context = query(NestedTaxonomy::at_level(level, taxonomy));
        trace!(level, pending = context.pending.len(), "resolving nested taxonomy query");

        let nodes = context
            .pending
            .into_iter()
            .map(|entry| match entry {
                PendingTaxonomy::Clause(args) => {
                    let at = args.level.unwrap_or(level);
                    TaxonomyNode::Clause(self.normalize(args, at))
                }
                PendingTaxonomy::Nested(inner) => {
                    TaxonomyNode::Group(self.resolve(inner, None, level + 1))
                }
            })
            .collect();

        ClauseGroup {
            nodes,
            relation: resolve_relation(self.grammar, context.relation.as_deref())
                .unwrap_or_default(),
            level,
        }
    }

    fn normalize(&self, args: TaxonomyArgs, level: usize) -> TaxonomyClause {
        let (operator, value) = split_shortcut(args.operator, args.value, "IN");

        let (operator, value) =
            match operator_token(&operator).and_then(|op| self.grammar.taxonomy_operator(op)) {
                Some(op) => (op, value),
                None => {
                    debug!(
                        taxonomy = %args.taxonomy,
                        %operator,
                        "unknown taxonomy operator, using it as the terms"
                    );
                    ("IN", operator)
                }
            };

        let field = args
            .field
            .as_deref()
            .and_then(|f| self.grammar.taxonomy_field(f))
            .unwrap_or("term_id");

        TaxonomyClause {
            taxonomy: args.taxonomy,
            field,
            operator,
            value,
            include_children: args.include_children,
            level,
        }
    }
}
