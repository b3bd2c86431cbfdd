//! Post model and the store seam used by the data-fetching formatters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::arguments::Arguments;
use crate::error::{Error, Result};
use crate::grammar::ANY_POST_TYPE;

/// A post as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "ID")]
    pub id: u64,
    pub post_author: u64,
    pub post_name: String,
    pub post_type: String,
    pub post_title: String,
    pub post_date: NaiveDateTime,
    pub post_date_gmt: NaiveDateTime,
    pub post_content: String,
    pub post_excerpt: String,
    pub post_status: String,
    pub comment_status: String,
    pub ping_status: String,
    pub post_password: String,
    pub post_parent: u64,
    pub post_modified: NaiveDateTime,
    pub post_modified_gmt: NaiveDateTime,
    pub comment_count: u64,
    pub menu_order: i64,
}

impl Post {
    /// A published post with empty content, dated `date`.
    pub fn new(
        id: u64,
        post_type: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDateTime,
    ) -> Self {
        let title = title.into();
        Self {
            id,
            post_author: 0,
            post_name: slugify(&title),
            post_type: post_type.into(),
            post_title: title,
            post_date: date,
            post_date_gmt: date,
            post_content: String::new(),
            post_excerpt: String::new(),
            post_status: "publish".to_string(),
            comment_status: "open".to_string(),
            ping_status: "open".to_string(),
            post_password: String::new(),
            post_parent: 0,
            post_modified: date,
            post_modified_gmt: date,
            comment_count: 0,
            menu_order: 0,
        }
    }

    pub fn author(mut self, author: u64) -> Self {
        self.post_author = author;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.post_status = status.into();
        self
    }

    /// Read one property by its backend name, e.g. `post_title` or `ID`.
    pub fn property(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(name),
            _ => None,
        }
    }
}

fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Result of a full query: the arguments it ran with, the page of posts and
/// the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub arguments: Arguments,
    pub posts: Vec<Post>,
    pub found_posts: u64,
}

/// Backend that executes compiled arguments.
pub trait PostStore: Send + Sync {
    fn get_posts(&self, arguments: &Arguments) -> Result<Vec<Post>>;

    fn query(&self, arguments: &Arguments) -> Result<QueryResult>;
}

/// In-memory store that understands a small subset of the arguments:
/// `post_type`, `post_status`, `p`, `author`, `offset` and `posts_per_page`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    posts: Vec<Post>,
}

impl MemoryStore {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn insert(&mut self, post: Post) {
        self.posts.push(post);
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    fn matching(&self, arguments: &Arguments) -> Result<Vec<&Post>> {
        let post_type = arguments.value("post_type");
        let post_status = arguments.value("post_status");
        let id = arguments.value("p").map(|v| as_u64(v, "p")).transpose()?;
        let author = arguments
            .value("author")
            .map(|v| as_u64(v, "author"))
            .transpose()?;

        Ok(self
            .posts
            .iter()
            .filter(|post| matches_any(post_type, &post.post_type))
            .filter(|post| matches_any(post_status, &post.post_status))
            .filter(|post| id.is_none_or(|id| post.id == id))
            .filter(|post| author.is_none_or(|author| post.post_author == author))
            .collect())
    }

    fn page<'a>(&self, posts: Vec<&'a Post>, arguments: &Arguments) -> Result<Vec<&'a Post>> {
        let offset = match arguments.value("offset") {
            Some(v) => as_u64(v, "offset")? as usize,
            None => 0,
        };
        let per_page = match arguments.value("posts_per_page") {
            Some(v) => v
                .as_i64()
                .ok_or_else(|| Error::Store(format!("posts_per_page is not an integer: {}", v)))?,
            None => -1,
        };

        let rest = posts.into_iter().skip(offset);
        Ok(if per_page < 0 {
            rest.collect()
        } else {
            rest.take(per_page as usize).collect()
        })
    }
}

impl PostStore for MemoryStore {
    fn get_posts(&self, arguments: &Arguments) -> Result<Vec<Post>> {
        let matching = self.matching(arguments)?;
        let page = self.page(matching, arguments)?;
        trace!(count = page.len(), "memory store fetched posts");
        Ok(page.into_iter().cloned().collect())
    }

    fn query(&self, arguments: &Arguments) -> Result<QueryResult> {
        let matching = self.matching(arguments)?;
        let found_posts = matching.len() as u64;
        let posts = self.page(matching, arguments)?.into_iter().cloned().collect();
        Ok(QueryResult {
            arguments: arguments.clone(),
            posts,
            found_posts,
        })
    }
}

/// `any`, a matching string, or an array containing a match.
fn matches_any(filter: Option<&Value>, actual: &str) -> bool {
    match filter {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s == ANY_POST_TYPE || s == actual,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| s == ANY_POST_TYPE || s == actual)),
        Some(_) => false,
    }
}

fn as_u64(value: &Value, name: &str) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Store(format!("{} is not a valid id: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            Post::new(1, "post", "Hello World", date(1)).author(1),
            Post::new(2, "post", "Second Post", date(2)).author(2),
            Post::new(3, "page", "About", date(3)).author(1),
            Post::new(4, "post", "Draft", date(4)).status("draft"),
        ])
    }

    fn args(pairs: &[(&str, Value)]) -> Arguments {
        let mut args = Arguments::new();
        for (name, value) in pairs {
            args.insert(*name, value.clone());
        }
        args
    }

    #[test]
    fn test_filters_type_and_status() {
        let posts = store()
            .get_posts(&args(&[
                ("post_type", json!("post")),
                ("post_status", json!("publish")),
            ]))
            .unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_any_matches_every_type() {
        let posts = store()
            .get_posts(&args(&[("post_type", json!("any")), ("post_status", json!("any"))]))
            .unwrap();
        assert_eq!(posts.len(), 4);
    }

    #[test]
    fn test_paging_and_found_posts() {
        let result = store()
            .query(&args(&[
                ("post_type", json!("any")),
                ("posts_per_page", json!(1)),
                ("offset", json!(1)),
            ]))
            .unwrap();
        assert_eq!(result.found_posts, 4);
        assert_eq!(result.posts.len(), 1);
        assert_eq!(result.posts[0].id, 2);
    }

    #[test]
    fn test_filters_id_and_author() {
        let posts = store().get_posts(&args(&[("p", json!(3))])).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post_title, "About");

        let posts = store().get_posts(&args(&[("author", json!("1"))])).unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn test_invalid_id_is_a_store_error() {
        let err = store().get_posts(&args(&[("p", json!("abc"))])).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_property_lookup() {
        let post = Post::new(9, "post", "Hello World", date(1));
        assert_eq!(post.property("ID"), Some(json!(9)));
        assert_eq!(post.property("post_name"), Some(json!("hello-world")));
        assert_eq!(post.property("nope"), None);
    }
}
