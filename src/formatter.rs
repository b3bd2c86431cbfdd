//! Output formatters: the last stage of a build.
//!
//! A formatter receives the compiled [`Arguments`] and decides what the caller
//! gets back. The `argument` formatter returns them untouched, the others run
//! them against a [`PostStore`].

use std::sync::Arc;

use serde::Serialize;

use crate::arguments::Arguments;
use crate::error::{Error, Result};
use crate::post::{Post, PostStore, QueryResult};

/// Result of a terminal builder call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Arguments(Arguments),
    Posts(Vec<Post>),
    Post(Option<Post>),
    Count(u64),
    Query(QueryResult),
}

impl Output {
    pub fn into_arguments(self) -> Option<Arguments> {
        match self {
            Output::Arguments(args) => Some(args),
            _ => None,
        }
    }

    pub fn into_posts(self) -> Option<Vec<Post>> {
        match self {
            Output::Posts(posts) => Some(posts),
            _ => None,
        }
    }

    pub fn into_post(self) -> Option<Post> {
        match self {
            Output::Post(post) => post,
            _ => None,
        }
    }

    pub fn into_count(self) -> Option<u64> {
        match self {
            Output::Count(count) => Some(count),
            _ => None,
        }
    }

    pub fn into_query(self) -> Option<QueryResult> {
        match self {
            Output::Query(result) => Some(result),
            _ => None,
        }
    }
}

/// Turns compiled arguments into a caller-visible result.
pub trait Formatter {
    fn output(&self, arguments: Arguments) -> Result<Output>;
}

/// Returns the raw arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentFormatter;

impl Formatter for ArgumentFormatter {
    fn output(&self, arguments: Arguments) -> Result<Output> {
        Ok(Output::Arguments(arguments))
    }
}

/// Returns the matching posts.
#[derive(Clone)]
pub struct ArrayFormatter {
    store: Arc<dyn PostStore>,
}

impl ArrayFormatter {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

impl Formatter for ArrayFormatter {
    fn output(&self, arguments: Arguments) -> Result<Output> {
        self.store.get_posts(&arguments).map(Output::Posts)
    }
}

/// Returns the number of matching posts, ignoring paging.
#[derive(Clone)]
pub struct CountFormatter {
    store: Arc<dyn PostStore>,
}

impl CountFormatter {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

impl Formatter for CountFormatter {
    fn output(&self, arguments: Arguments) -> Result<Output> {
        Ok(Output::Count(self.store.query(&arguments)?.found_posts))
    }
}

/// Returns the full query result.
#[derive(Clone)]
pub struct QueryFormatter {
    store: Arc<dyn PostStore>,
}

impl QueryFormatter {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

impl Formatter for QueryFormatter {
    fn output(&self, arguments: Arguments) -> Result<Output> {
        self.store.query(&arguments).map(Output::Query)
    }
}

/// Built-in formatters, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatterKind {
    Argument,
    Array,
    Query,
    Count,
}

impl FormatterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FormatterKind::Argument => "argument",
            FormatterKind::Array => "array",
            FormatterKind::Query => "query",
            FormatterKind::Count => "count",
        }
    }

    /// Whether this formatter needs a store to run.
    pub fn needs_store(&self) -> bool {
        !matches!(self, FormatterKind::Argument)
    }

    /// Instantiate the formatter, handing it `store` when it needs one.
    pub fn formatter(&self, store: Option<Arc<dyn PostStore>>) -> Result<Box<dyn Formatter>> {
        let store = match store {
            Some(store) => store,
            None if self.needs_store() => {
                return Err(Error::config(format!(
                    "the '{}' formatter needs a post store, none was configured",
                    self.name()
                )));
            }
            None => return Ok(Box::new(ArgumentFormatter)),
        };
        Ok(match self {
            FormatterKind::Argument => Box::new(ArgumentFormatter),
            FormatterKind::Array => Box::new(ArrayFormatter::new(store)),
            FormatterKind::Count => Box::new(CountFormatter::new(store)),
            FormatterKind::Query => Box::new(QueryFormatter::new(store)),
        })
    }
}

impl std::fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::MemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn store() -> Arc<dyn PostStore> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Arc::new(MemoryStore::new(vec![
            Post::new(1, "post", "One", date),
            Post::new(2, "post", "Two", date),
        ]))
    }

    fn arguments() -> Arguments {
        let mut args = Arguments::new();
        args.insert("post_type", json!("post"));
        args.insert("posts_per_page", json!(1));
        args
    }

    #[test]
    fn test_argument_formatter_passthrough() {
        let out = ArgumentFormatter.output(arguments()).unwrap();
        assert_eq!(out.into_arguments(), Some(arguments()));
    }

    #[test]
    fn test_count_ignores_paging() {
        let formatter = FormatterKind::Count.formatter(Some(store())).unwrap();
        let out = formatter.output(arguments()).unwrap();
        assert_eq!(out.into_count(), Some(2));
    }

    #[test]
    fn test_array_formatter_pages() {
        let formatter = FormatterKind::Array.formatter(Some(store())).unwrap();
        let posts = formatter.output(arguments()).unwrap().into_posts().unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[test]
    fn test_query_formatter() {
        let formatter = FormatterKind::Query.formatter(Some(store())).unwrap();
        let result = formatter.output(arguments()).unwrap().into_query().unwrap();
        assert_eq!(result.found_posts, 2);
        assert_eq!(result.arguments, arguments());
    }

    #[test]
    fn test_store_backed_formatter_without_store() {
        let err = FormatterKind::Array.formatter(None).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(FormatterKind::Argument.formatter(None).is_ok());
    }

    #[test]
    fn test_only_argument_formatter_runs_without_store() {
        for kind in [FormatterKind::Array, FormatterKind::Count, FormatterKind::Query] {
            assert!(kind.needs_store());
            assert!(matches!(kind.formatter(None), Err(Error::Config(_))));
        }
        assert!(!FormatterKind::Argument.needs_store());
    }
}
