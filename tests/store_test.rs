use std::sync::Arc;

use chrono::NaiveDate;
use postql::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn store() -> Arc<dyn PostStore> {
    let date = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    Arc::new(MemoryStore::new(vec![
        Post::new(1, "post", "Hello World", date).author(3),
        Post::new(2, "post", "Second Post", date).author(4),
        Post::new(3, "page", "About", date),
        Post::new(4, "post", "Draft", date).status("draft"),
    ]))
}

fn query() -> QueryBuilder {
    QueryBuilder::with_global(GlobalSettings::isolated()).with_store(store())
}

#[test]
fn test_get_returns_published_posts_of_type() {
    let posts = query().of_type("post").get().unwrap().into_posts().unwrap();
    let ids: Vec<u64> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_first_returns_single_post() {
    let post = query().of_type("page").first().unwrap().into_post();
    assert_eq!(post.map(|p| p.post_title), Some("About".to_string()));
}

#[test]
fn test_find_missing_post() {
    let output = query().find(99).unwrap();
    assert_eq!(output, Output::Post(None));
}

#[test]
fn test_count_and_pluck() {
    let q = query().of_type("post").author(3);
    assert_eq!(q.count().unwrap().into_count(), Some(1));
    assert_eq!(q.pluck("post_name").unwrap(), vec![json!("hello-world")]);
}

#[test]
fn test_pluck_rejects_unknown_column() {
    let result = query().pluck("nope");
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_query_formatter_reports_found_posts() {
    let result = query()
        .status(json!(["publish", "draft"]))
        .set_config("return", "query")
        .limit(1)
        .get()
        .unwrap()
        .into_query()
        .unwrap();
    assert_eq!(result.found_posts, 4);
    assert_eq!(result.posts.len(), 1);
}

#[test]
fn test_store_formatter_without_store_fails() {
    let result = QueryBuilder::with_global(GlobalSettings::isolated()).get();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_aggregates_are_not_implemented() {
    let q = query();
    assert!(matches!(q.avg(), Err(Error::NotImplemented(_))));
    assert!(matches!(q.min(), Err(Error::NotImplemented(_))));
    assert!(matches!(q.max(), Err(Error::NotImplemented(_))));
}
