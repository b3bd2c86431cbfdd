//! The fluent query builder.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::adapter::{QueryAdapter, Shortcut};
use crate::arguments::Arguments;
use crate::clause::{
    Built, MetaArgs, MetaInput, MetaNode, NestedMeta, NestedTaxonomy, TaxonomyArgs, TaxonomyInput,
    TaxonomyNode, WhereArgs, WhereClauseBuilder, WhereInput, WhereMeta, WhereTaxonomy,
};
use crate::compiler::Compiler;
use crate::config::{ConfigProvider, Configurator, GlobalSettings, Settings};
use crate::container::{Binding, Container};
use crate::error::{Error, Result};
use crate::formatter::{Formatter, FormatterKind, Output};
use crate::grammar::{Grammar, Relation, SortOrder};
use crate::post::PostStore;

/// Accumulates filters and compiles them into post query arguments.
///
/// ```
/// use postql::{GlobalSettings, QueryBuilder};
/// use serde_json::json;
///
/// let arguments = QueryBuilder::with_global(GlobalSettings::isolated())
///     .of_type("post")
///     .where_meta(("size", "M"))
///     .limit(5)
///     .to_arguments();
///
/// assert_eq!(arguments.value("post_type"), Some(&json!("post")));
/// assert_eq!(arguments.value("posts_per_page"), Some(&json!(5)));
/// ```
pub struct QueryBuilder {
    grammar: Grammar,
    bindings: Container,
    configuration: Box<dyn ConfigProvider>,
    compiler: Compiler,
    adapter: QueryAdapter,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// A builder configured against the process-wide global settings.
    pub fn new() -> Self {
        Self::with_global(GlobalSettings::process())
    }

    pub fn with_global(global: GlobalSettings) -> Self {
        let grammar = Grammar::default();
        Self {
            grammar,
            bindings: Container::new(),
            configuration: Box::new(Configurator::new(global)),
            compiler: Compiler::new(grammar),
            adapter: QueryAdapter,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn bindings(&self) -> &Container {
        &self.bindings
    }

    pub fn configuration(&self) -> &dyn ConfigProvider {
        self.configuration.as_ref()
    }

    // --- Setup ---

    /// Post type to query. `*` or an empty name queries every type.
    pub fn of_type(mut self, post_type: impl Into<String>) -> Self {
        self.bindings.bind("post_type", Value::String(post_type.into()));
        self
    }

    /// Merge local settings into the current configuration.
    pub fn configure(mut self, settings: Settings) -> Self {
        self.configuration.add_many(settings);
        self
    }

    /// Replace the configuration provider.
    pub fn configure_with(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.configuration = Box::new(provider);
        self
    }

    pub fn set_config(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.configuration.add(name, value.into());
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PostStore>) -> Self {
        self.compiler.set_store(store);
        self
    }

    /// Use `formatter` instead of the one named by the `return` setting.
    pub fn format_with(mut self, formatter: impl Formatter + 'static) -> Self {
        self.compiler.set_formatter(Arc::new(formatter));
        self
    }

    // --- Plain clauses ---

    /// Add a plain clause: `("column", value)` or `("column", "op", value)`.
    ///
    /// Fails when the operator is unknown and a value was supplied.
    pub fn where_(self, args: impl Into<WhereArgs>) -> Result<Self> {
        self.add_wheres(WhereInput::Clause(args.into()))
    }

    /// Add several plain clauses. Unknown operators are corrected, not rejected.
    pub fn where_many<I, A>(self, clauses: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<WhereArgs>,
    {
        self.add_wheres(WhereInput::List(clauses.into_iter().map(Into::into).collect()))
    }

    fn add_wheres(mut self, input: WhereInput) -> Result<Self> {
        let clauses = WhereClauseBuilder::new(&self.grammar).build(input)?;
        self.bindings.append("wheres", Binding::Wheres(clauses));
        Ok(self)
    }

    // --- Meta clauses ---

    pub fn where_meta(self, args: impl Into<MetaArgs>) -> Self {
        self.where_meta_input(MetaInput::Clause(args.into()))
    }

    pub fn or_where_meta(self, args: impl Into<MetaArgs>) -> Self {
        let args: MetaArgs = args.into();
        self.where_meta_input(MetaInput::Clause(args.relation(Relation::Or.as_str())))
    }

    pub fn where_meta_many(self, inputs: Vec<MetaInput>) -> Self {
        self.where_meta_input(MetaInput::List(inputs))
    }

    /// Add a nested meta group built by `query`.
    pub fn where_meta_nested(
        self,
        query: impl FnOnce(NestedMeta) -> NestedMeta + 'static,
    ) -> Self {
        self.where_meta_input(MetaInput::nested(query))
    }

    pub fn or_where_meta_nested(
        self,
        query: impl FnOnce(NestedMeta) -> NestedMeta + 'static,
    ) -> Self {
        self.where_meta_input(MetaInput::nested(query).with_relation(Relation::Or.as_str()))
    }

    pub fn where_meta_input(mut self, input: MetaInput) -> Self {
        let built = WhereMeta::new(&self.grammar).build(input);
        self.push_metas(built);
        self
    }

    fn push_metas(&mut self, built: Built<MetaNode>) {
        self.bindings.append("whereMetas", Binding::Metas(built.nodes));
        self.merge_relations("whereMetaRelation", built.relations);
    }

    // --- Taxonomy clauses ---

    /// Add a taxonomy clause: `(taxonomy, field, terms)` or
    /// `(taxonomy, field, operator, terms[, include_children])`.
    pub fn where_taxonomy(self, args: impl Into<TaxonomyArgs>) -> Self {
        self.where_taxonomy_input(TaxonomyInput::Clause(args.into()))
    }

    pub fn or_where_taxonomy(self, args: impl Into<TaxonomyArgs>) -> Self {
        let args: TaxonomyArgs = args.into();
        self.where_taxonomy_input(TaxonomyInput::Clause(args.relation(Relation::Or.as_str())))
    }

    pub fn where_taxonomy_many(self, inputs: Vec<TaxonomyInput>) -> Self {
        self.where_taxonomy_input(TaxonomyInput::List(inputs))
    }

    pub fn where_taxonomy_nested(
        self,
        query: impl FnOnce(NestedTaxonomy) -> NestedTaxonomy + 'static,
    ) -> Self {
        self.where_taxonomy_input(TaxonomyInput::nested(query))
    }

    pub fn or_where_taxonomy_nested(
        self,
        query: impl FnOnce(NestedTaxonomy) -> NestedTaxonomy + 'static,
    ) -> Self {
        self.where_taxonomy_input(TaxonomyInput::nested(query).with_relation(Relation::Or.as_str()))
    }

    /// Nested taxonomy group whose field helpers default to `taxonomy`.
    pub fn where_taxonomy_in(
        self,
        taxonomy: impl Into<String>,
        query: impl FnOnce(NestedTaxonomy) -> NestedTaxonomy + 'static,
    ) -> Self {
        self.where_taxonomy_input(TaxonomyInput::nested_in(taxonomy, query))
    }

    pub fn where_taxonomy_input(mut self, input: TaxonomyInput) -> Self {
        let built = WhereTaxonomy::new(&self.grammar).build(input);
        self.push_taxonomies(built);
        self
    }

    fn push_taxonomies(&mut self, built: Built<TaxonomyNode>) {
        self.bindings
            .append("whereTaxonomies", Binding::Taxonomies(built.nodes));
        self.merge_relations("whereTaxonomyRelation", built.relations);
    }

    /// Layer `fresh` under the relations already bound at `key`.
    fn merge_relations(&mut self, key: &str, fresh: BTreeMap<usize, Relation>) {
        if fresh.is_empty() {
            return;
        }
        let mut merged = fresh;
        if let Some(existing) = self.bindings.get(key).and_then(Binding::as_relations) {
            merged.extend(existing.iter().map(|(level, relation)| (*level, *relation)));
        }
        self.bindings.bind(key, Binding::Relations(merged));
    }

    // --- Paging and order ---

    pub fn limit(mut self, limit: i64) -> Self {
        self.bindings.bind("limit", Value::from(limit));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.bindings.bind("offset", Value::from(offset));
        self
    }

    pub fn order(mut self, direction: SortOrder) -> Self {
        self.bindings.bind("order", Value::from(direction.as_str()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.bindings.bind("orderby", Value::String(column.into()));
        self
    }

    pub fn order_by_dir(self, column: impl Into<String>, direction: SortOrder) -> Self {
        self.order_by(column).order(direction)
    }

    // --- Shortcuts ---

    /// Bind a shortcut filter by method name, e.g. `"authorIn"`.
    pub fn shortcut(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let (key, value) = self.adapter.translate(name, value)?;
        self.bindings.bind(key, value);
        Ok(self)
    }

    pub fn apply(mut self, shortcut: Shortcut, value: impl Into<Value>) -> Self {
        let (key, value) = self.adapter.translate_shortcut(shortcut, value.into());
        self.bindings.bind(key, value);
        self
    }

    pub fn author(self, author: impl Into<Value>) -> Self {
        self.apply(Shortcut::Author, author)
    }

    pub fn author_name(self, name: impl Into<Value>) -> Self {
        self.apply(Shortcut::AuthorName, name)
    }

    pub fn author_in(self, authors: impl Into<Value>) -> Self {
        self.apply(Shortcut::AuthorIn, authors)
    }

    pub fn author_not_in(self, authors: impl Into<Value>) -> Self {
        self.apply(Shortcut::AuthorNotIn, authors)
    }

    pub fn cat(self, category: impl Into<Value>) -> Self {
        self.apply(Shortcut::Cat, category)
    }

    pub fn category_name(self, name: impl Into<Value>) -> Self {
        self.apply(Shortcut::CategoryName, name)
    }

    pub fn category_and(self, categories: impl Into<Value>) -> Self {
        self.apply(Shortcut::CategoryAnd, categories)
    }

    pub fn category_in(self, categories: impl Into<Value>) -> Self {
        self.apply(Shortcut::CategoryIn, categories)
    }

    pub fn category_not_in(self, categories: impl Into<Value>) -> Self {
        self.apply(Shortcut::CategoryNotIn, categories)
    }

    pub fn status(self, status: impl Into<Value>) -> Self {
        self.apply(Shortcut::Status, status)
    }

    // --- Terminals ---

    /// Compiled arguments, bypassing the formatter.
    pub fn to_arguments(&self) -> Arguments {
        self.compiler.compile(&self.bindings, self.configuration.as_ref())
    }

    pub fn get(&self) -> Result<Output> {
        self.compiler
            .build(&self.bindings, self.configuration.as_ref(), None)
    }

    /// Fetch a single post. With the `argument` formatter the arguments are
    /// returned as they are.
    pub fn first(&mut self) -> Result<Output> {
        self.bindings.bind("posts_per_page", Value::from(1));
        let output = self.get()?;

        if self.returns_arguments() {
            return Ok(output);
        }
        Ok(match output {
            Output::Posts(posts) => Output::Post(posts.into_iter().next()),
            other => other,
        })
    }

    /// Fetch every matching post, ignoring any page size.
    pub fn all(&mut self) -> Result<Output> {
        self.bindings.bind("posts_per_page", Value::from(-1));
        self.get()
    }

    /// Number of matching posts, whatever formatter is configured.
    pub fn count(&self) -> Result<Output> {
        self.compiler.build(
            &self.bindings,
            self.configuration.as_ref(),
            Some(FormatterKind::Count),
        )
    }

    pub fn find(&mut self, id: u64) -> Result<Output> {
        self.bindings.bind("p", Value::from(id));
        self.first()
    }

    /// Project one post property from every matching post.
    pub fn pluck(&self, column: &str) -> Result<Vec<Value>> {
        if !self.grammar.is_post_property(column) {
            return Err(Error::validation(format!("Invalid column name '{}'", column)));
        }

        let posts = self
            .compiler
            .build(
                &self.bindings,
                self.configuration.as_ref(),
                Some(FormatterKind::Array),
            )?
            .into_posts()
            .unwrap_or_default();

        Ok(posts
            .iter()
            .map(|post| post.property(column).unwrap_or(Value::Null))
            .collect())
    }

    pub fn avg(&self) -> Result<Output> {
        Err(Error::NotImplemented("avg"))
    }

    pub fn min(&self) -> Result<Output> {
        Err(Error::NotImplemented("min"))
    }

    pub fn max(&self) -> Result<Output> {
        Err(Error::NotImplemented("max"))
    }

    fn returns_arguments(&self) -> bool {
        self.configuration
            .get("return")
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|name| name == FormatterKind::Argument.name())
    }
}
