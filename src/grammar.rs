//! Static lookup tables for the post query backend.
//!
//! The grammar never fails: callers ask whether a token is known and fall
//! back to their own defaults when it is not.

use serde::{Deserialize, Serialize};

use crate::formatter::FormatterKind;

/// Generic comparison operators (plain and meta clauses).
pub const OPERATORS: &[&str] = &[
    "=", "!=", ">", ">=", "<", "<=",
    "LIKE", "NOT LIKE", "IN", "NOT IN",
    "BETWEEN", "NOT BETWEEN", "NOT EXISTS",
    "REGEXP", "NOT REGEXP", "RLIKE",
];

/// Operators accepted by taxonomy clauses.
pub const TAXONOMY_OPERATORS: &[&str] = &["IN", "NOT IN", "AND", "EXISTS", "NOT EXISTS"];

/// Meta value comparator types.
pub const COMPARATORS: &[&str] = &[
    "NUMERIC", "BINARY", "CHAR", "DATE", "DATETIME",
    "DECIMAL", "SIGNED", "TIME", "UNSIGNED",
];

/// Term fields a taxonomy clause can match on.
pub const TAXONOMY_FIELDS: &[&str] = &["term_id", "name", "slug", "term_taxonomy_id"];

/// Bindings that need a compiling routine instead of a straight copy.
pub const QUERY_TYPES: &[&str] = &[
    "wheres",
    "whereMetas",
    "whereMetaRelation",
    "whereTaxonomies",
    "whereTaxonomyRelation",
    "limit",
];

/// Backend arguments eligible for direct pass-through.
pub const ARGUMENTS: &[&str] = &[
    "author", "author_name", "author__in", "author__not_in",
    "cat", "category_name", "category__and", "category__in", "category__not_in",
    "tag", "tag_id", "tag__and", "tag__in", "tag__not_in", "tag_slug__and", "tag_slug__in",
    "p", "name", "page_id", "pagename",
    "post_parent", "post_parent__in", "post_parent__not_in", "post__in", "post__not_in",
    "has_password", "post_password", "post_type", "post_status",
    "posts_per_page", "posts_per_archive_page", "nopaging", "paged", "offset", "page",
    "ignore_sticky_posts", "order", "orderby",
    "year", "monthnum", "w", "day", "hour", "minute", "second", "m", "perm",
    "cache_results", "update_post_term_cache", "update_post_meta_cache", "no_found_rows",
    "s", "exact", "sentence", "fields",
];

/// Fields present on every post object returned by the backend.
pub const POST_PROPERTIES: &[&str] = &[
    "ID", "post_author", "post_name", "post_type", "post_title", "post_date", "post_date_gmt",
    "post_content", "post_excerpt", "post_status", "comment_status", "ping_status",
    "post_password", "post_parent", "post_modified", "post_modified_gmt", "comment_count",
    "menu_order",
];

/// Named formatters selectable through the `return` setting.
pub const FORMATTERS: &[(&str, FormatterKind)] = &[
    ("array", FormatterKind::Array),
    ("argument", FormatterKind::Argument),
    ("query", FormatterKind::Query),
    ("count", FormatterKind::Count),
];

/// Post type value that matches every type.
pub const ANY_POST_TYPE: &str = "any";

/// Wildcard accepted in place of a post type.
pub const WILDCARD_POST_TYPE: &str = "*";

/// Boolean combinator between sibling clauses at one nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    #[default]
    And,
    Or,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::And => "AND",
            Relation::Or => "OR",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for the `order` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only registry of everything the backend understands.
#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    operators: &'static [&'static str],
    taxonomy_operators: &'static [&'static str],
    comparators: &'static [&'static str],
    taxonomy_fields: &'static [&'static str],
    query_types: &'static [&'static str],
    arguments: &'static [&'static str],
    post_properties: &'static [&'static str],
    formatters: &'static [(&'static str, FormatterKind)],
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            operators: OPERATORS,
            taxonomy_operators: TAXONOMY_OPERATORS,
            comparators: COMPARATORS,
            taxonomy_fields: TAXONOMY_FIELDS,
            query_types: QUERY_TYPES,
            arguments: ARGUMENTS,
            post_properties: POST_PROPERTIES,
            formatters: FORMATTERS,
        }
    }
}

impl Grammar {
    pub fn operators(&self) -> &'static [&'static str] {
        self.operators
    }

    pub fn taxonomy_operators(&self) -> &'static [&'static str] {
        self.taxonomy_operators
    }

    pub fn comparators(&self) -> &'static [&'static str] {
        self.comparators
    }

    pub fn taxonomy_fields(&self) -> &'static [&'static str] {
        self.taxonomy_fields
    }

    pub fn arguments(&self) -> &'static [&'static str] {
        self.arguments
    }

    pub fn post_properties(&self) -> &'static [&'static str] {
        self.post_properties
    }

    pub fn formatters(&self) -> &'static [(&'static str, FormatterKind)] {
        self.formatters
    }

    /// Look up a generic operator, returning the canonical token.
    pub fn operator(&self, op: &str) -> Option<&'static str> {
        self.operators.iter().copied().find(|o| *o == op)
    }

    /// Look up a taxonomy operator, returning the canonical token.
    pub fn taxonomy_operator(&self, op: &str) -> Option<&'static str> {
        self.taxonomy_operators.iter().copied().find(|o| *o == op)
    }

    /// Comparator type, matched case-insensitively and returned uppercase.
    pub fn comparator(&self, kind: &str) -> Option<&'static str> {
        self.comparators
            .iter()
            .copied()
            .find(|c| c.eq_ignore_ascii_case(kind))
    }

    /// Term field, matched case-insensitively and returned lowercase.
    pub fn taxonomy_field(&self, field: &str) -> Option<&'static str> {
        self.taxonomy_fields
            .iter()
            .copied()
            .find(|f| f.eq_ignore_ascii_case(field))
    }

    pub fn relation(&self, relation: &str) -> Option<Relation> {
        if relation.eq_ignore_ascii_case("AND") {
            Some(Relation::And)
        } else if relation.eq_ignore_ascii_case("OR") {
            Some(Relation::Or)
        } else {
            None
        }
    }

    pub fn is_query_type(&self, name: &str) -> bool {
        self.query_types.contains(&name)
    }

    pub fn is_argument(&self, name: &str) -> bool {
        self.arguments.contains(&name)
    }

    pub fn is_post_property(&self, name: &str) -> bool {
        self.post_properties.contains(&name)
    }

    pub fn formatter(&self, name: &str) -> Option<FormatterKind> {
        self.formatters
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }
}
