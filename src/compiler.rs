//! Bindings to backend arguments.
//!
//! Compilation runs in a fixed order: configuration defaults first, then the
//! resolved post type, then every binding in insertion order. Later writes
//! replace earlier ones, so explicit bindings override configuration.

use std::sync::Arc;

use serde_json::Value;

use crate::adapter::Coercion;
use crate::arguments::{Argument, Arguments, ClauseEntry, ClauseList};
use crate::clause::{MetaNode, TOP_LEVEL, TaxonomyNode};
use crate::config::ConfigProvider;
use crate::container::{Binding, Container};
use crate::error::{Error, Result};
use crate::formatter::{Formatter, FormatterKind, Output};
use crate::grammar::{ANY_POST_TYPE, Grammar, Relation, WILDCARD_POST_TYPE};
use crate::post::PostStore;

pub const META_QUERY: &str = "meta_query";
pub const TAX_QUERY: &str = "tax_query";

/// Compiles bindings and hands the result to a formatter.
#[derive(Clone, Default)]
pub struct Compiler {
    grammar: Grammar,
    store: Option<Arc<dyn PostStore>>,
    formatter: Option<Arc<dyn Formatter>>,
}

impl Compiler {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            store: None,
            formatter: None,
        }
    }

    /// Store used by the `array`, `count` and `query` formatters.
    pub fn set_store(&mut self, store: Arc<dyn PostStore>) {
        self.store = Some(store);
    }

    /// Formatter used instead of the configured `return` name.
    pub fn set_formatter(&mut self, formatter: Arc<dyn Formatter>) {
        self.formatter = Some(formatter);
    }

    /// Compile and format. `forced` overrides every other formatter source.
    pub fn build(
        &self,
        bindings: &Container,
        config: &dyn ConfigProvider,
        forced: Option<FormatterKind>,
    ) -> Result<Output> {
        tracing::debug!("Compiling {} bindings", bindings.len());
        let formatter = self.resolve_formatter(config, forced)?;
        let arguments = self.compile(bindings, config);
        formatter.output(arguments)
    }

    /// Produce the argument map without formatting it.
    pub fn compile(&self, bindings: &Container, config: &dyn ConfigProvider) -> Arguments {
        let mut arguments = Arguments::new();

        for &name in self.grammar.arguments() {
            if let Some(value) = config.get(name) {
                arguments.insert(name, value);
            }
        }

        arguments.insert("post_type", self.post_type(bindings));

        for (name, binding) in bindings.all() {
            // Resolved above, wildcard included.
            if name == "post_type" {
                continue;
            }
            if self.grammar.is_query_type(name) {
                self.compile_type(name, binding, &mut arguments);
            } else if self.grammar.is_argument(name) {
                match binding {
                    Binding::Value(value) => arguments.insert(name.as_str(), value.clone()),
                    other => tracing::debug!("Skipping non-scalar binding '{}': {:?}", name, other),
                }
            }
        }

        arguments
    }

    fn post_type(&self, bindings: &Container) -> Value {
        match bindings.get("post_type").and_then(Binding::as_value) {
            Some(value) if !wants_all_types(value) => value.clone(),
            _ => Value::String(ANY_POST_TYPE.to_string()),
        }
    }

    fn compile_type(&self, name: &str, binding: &Binding, arguments: &mut Arguments) {
        match (name, binding) {
            ("wheres", Binding::Wheres(wheres)) => {
                for clause in wheres {
                    arguments.insert(clause.column.as_str(), clause.value.clone());
                }
            }
            ("limit", Binding::Value(limit)) => {
                arguments.insert("posts_per_page", Coercion::Integer.apply(limit.clone()));
            }
            ("whereMetas", Binding::Metas(nodes)) => {
                let entries = nodes.iter().map(|n| flatten_meta(n, TOP_LEVEL)).collect();
                merge_clauses(arguments, META_QUERY, entries);
            }
            ("whereTaxonomies", Binding::Taxonomies(nodes)) => {
                let entries = nodes.iter().map(|n| flatten_taxonomy(n, TOP_LEVEL)).collect();
                merge_clauses(arguments, TAX_QUERY, entries);
            }
            ("whereMetaRelation", Binding::Relations(relations)) => {
                if let Some(relation) = relations.values().next() {
                    merge_relation(arguments, META_QUERY, *relation);
                }
            }
            ("whereTaxonomyRelation", Binding::Relations(relations)) => {
                if let Some(relation) = relations.values().next() {
                    merge_relation(arguments, TAX_QUERY, *relation);
                }
            }
            (name, other) => {
                tracing::debug!("Binding '{}' has an unexpected shape: {:?}", name, other);
            }
        }
    }

    fn resolve_formatter(
        &self,
        config: &dyn ConfigProvider,
        forced: Option<FormatterKind>,
    ) -> Result<Arc<dyn Formatter>> {
        if let Some(kind) = forced {
            tracing::debug!("Using the '{}' formatter", kind);
            return kind.formatter(self.store.clone()).map(Arc::from);
        }

        if let Some(formatter) = &self.formatter {
            tracing::debug!("Using a caller-supplied formatter");
            return Ok(Arc::clone(formatter));
        }

        let kind = match config.get("return") {
            Some(Value::String(name)) => self
                .grammar
                .formatter(&name)
                .ok_or_else(|| Error::config(format!("unknown formatter '{}'", name)))?,
            Some(other) => {
                return Err(Error::config(format!(
                    "the return setting must be a formatter name, got {}",
                    other
                )));
            }
            None => return Err(Error::config("no return formatter configured")),
        };

        tracing::debug!("Using the '{}' formatter", kind);
        kind.formatter(self.store.clone()).map(Arc::from)
    }
}

/// Empty, or the wildcard.
fn wants_all_types(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == WILDCARD_POST_TYPE,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn merge_clauses(arguments: &mut Arguments, name: &str, entries: Vec<ClauseEntry>) {
    tracing::trace!("Adding {} entries to {}", entries.len(), name);
    match arguments.get_mut(name) {
        Some(Argument::Clauses(list)) => list.clauses.extend(entries),
        _ => arguments.insert(name, ClauseList::new(entries, None)),
    }
}

fn merge_relation(arguments: &mut Arguments, name: &str, relation: Relation) {
    match arguments.get_mut(name) {
        Some(Argument::Clauses(list)) => list.relation = Some(relation),
        _ => arguments.insert(name, ClauseList::new(Vec::new(), Some(relation))),
    }
}

fn flatten_meta(node: &MetaNode, level: usize) -> ClauseEntry {
    match node {
        MetaNode::Clause(clause) => ClauseEntry::Meta {
            key: clause.column.clone(),
            value: clause.value.clone(),
            compare: clause.operator,
            kind: clause.kind,
        },
        MetaNode::Group(group) => {
            tracing::trace!("Flattening meta group at level {}", level + 1);
            let clauses = group
                .nodes
                .iter()
                .map(|n| flatten_meta(n, level + 1))
                .collect();
            ClauseEntry::Group(ClauseList::new(clauses, Some(group.relation)))
        }
    }
}

fn flatten_taxonomy(node: &TaxonomyNode, level: usize) -> ClauseEntry {
    match node {
        TaxonomyNode::Clause(clause) => ClauseEntry::Taxonomy {
            taxonomy: clause.taxonomy.clone(),
            field: clause.field,
            terms: clause.value.clone(),
            include_children: clause.include_children,
            operator: clause.operator,
        },
        TaxonomyNode::Group(group) => {
            tracing::trace!("Flattening taxonomy group at level {}", level + 1);
            let clauses = group
                .nodes
                .iter()
                .map(|n| flatten_taxonomy(n, level + 1))
                .collect();
            ClauseEntry::Group(ClauseList::new(clauses, Some(group.relation)))
        }
    }
}
