//! # postql: fluent post queries
//!
//! Chain filters on a [`QueryBuilder`] and compile them into the flat
//! argument map a CMS-style post backend understands, with nested
//! `meta_query` and `tax_query` lists.
//!
//! ## Quick Example
//!
//! ```
//! use postql::prelude::*;
//! use serde_json::json;
//!
//! let arguments = QueryBuilder::with_global(GlobalSettings::isolated())
//!     .of_type("product")
//!     .where_meta(("price", ">=", 10, "NUMERIC"))
//!     .where_taxonomy_in("size", |q| q.relation("OR").name("M").name("L"))
//!     .to_arguments();
//!
//! assert_eq!(arguments.value("post_type"), Some(&json!("product")));
//! assert_eq!(arguments.clauses("tax_query").map(|l| l.len()), Some(1));
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Module        | Role                                   |
//! |------------|---------------|----------------------------------------|
//! | Builder    | [`builder`]   | Accumulates bindings                   |
//! | Clauses    | [`clause`]    | Normalizes and nests filter clauses    |
//! | Compiler   | [`compiler`]  | Flattens bindings into arguments       |
//! | Formatter  | [`formatter`] | Turns arguments into the return value  |

pub mod adapter;
pub mod arguments;
pub mod builder;
pub mod clause;
pub mod compiler;
pub mod config;
pub mod container;
pub mod error;
pub mod formatter;
pub mod grammar;
pub mod parser;
pub mod post;

pub use builder::QueryBuilder;
pub use config::GlobalSettings;
pub use error::{Error, Result};

pub mod prelude {
    pub use crate::adapter::Shortcut;
    pub use crate::arguments::{Argument, Arguments, ClauseEntry, ClauseList};
    pub use crate::builder::QueryBuilder;
    pub use crate::clause::{
        MetaArgs, MetaInput, NestedMeta, NestedTaxonomy, TaxonomyArgs, TaxonomyInput, WhereArgs,
    };
    pub use crate::config::{ConfigProvider, Configurator, GlobalSettings, Settings};
    pub use crate::error::*;
    pub use crate::formatter::{Formatter, FormatterKind, Output};
    pub use crate::grammar::{Grammar, Relation, SortOrder};
    pub use crate::post::{MemoryStore, Post, PostStore, QueryResult};
    pub use crate::Posts;
}

/// Static entry points bound to the process-wide settings.
///
/// ```
/// use postql::Posts;
/// use serde_json::json;
///
/// let query = Posts::of_type("page").limit(3);
/// assert_eq!(query.to_arguments().value("post_type"), Some(&json!("page")));
/// ```
pub struct Posts;

impl Posts {
    pub fn of_type(post_type: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new().of_type(post_type)
    }

    /// Query every post type.
    pub fn any() -> QueryBuilder {
        Self::of_type(grammar::ANY_POST_TYPE)
    }

    pub fn find(id: u64) -> Result<formatter::Output> {
        Self::any().find(id)
    }

    /// Every post of `post_type`, ignoring the configured page size.
    pub fn all(post_type: impl Into<String>) -> Result<formatter::Output> {
        Self::of_type(post_type).all()
    }
}
