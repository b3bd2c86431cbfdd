use postql::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

// Every test in this binary shares the process-wide settings.
fn argument_mode() {
    GlobalSettings::process().set("return", "argument");
}

#[test]
fn test_all_ignores_page_size() {
    argument_mode();
    let args = Posts::all("post").unwrap().into_arguments().unwrap();
    assert_eq!(args.value("posts_per_page"), Some(&json!(-1)));
    assert_eq!(args.value("post_type"), Some(&json!("post")));
}

#[test]
fn test_find_queries_every_type() {
    argument_mode();
    let args = Posts::find(7).unwrap().into_arguments().unwrap();
    assert_eq!(args.value("post_type"), Some(&json!("any")));
    assert_eq!(args.value("p"), Some(&json!(7)));
}

#[test]
fn test_wildcard_type_compiles_to_any() {
    argument_mode();
    let args = Posts::of_type("*").to_arguments();
    assert_eq!(args.value("post_type"), Some(&json!("any")));
}
