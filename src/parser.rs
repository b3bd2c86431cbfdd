//! Filter expression parser using nom.
//!
//! Parses the compact filter syntax accepted on the command line.
//!
//! # Syntax Overview
//!
//! ```text
//! where:     price >= 10          tag IN [news, 'long read']
//! meta:      price>=10::NUMERIC   size=M
//! taxonomy:  size.name IN [32, 33]      category.slug news
//! ─┬── ─┬──  ─┬── ────┬─────
//!  │    │     │       └── Value (number, bool, word, 'quoted', [list])
//!  │    │     └── Operator (optional for taxonomy, defaults to IN)
//!  │    └── Term field
//!  └── Taxonomy
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, peek},
    multi::separated_list0,
    sequence::{delimited, preceded, tuple},
};
use serde_json::Value;

use crate::clause::{MetaArgs, TaxonomyArgs, WhereArgs};
use crate::error::{Error, Result};

/// A parsed filter, before grammar validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    /// Column, meta key or taxonomy.
    pub target: String,
    /// Term field, taxonomy filters only.
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Value,
    /// Comparator type, meta filters only.
    pub kind: Option<String>,
}

impl FilterExpr {
    pub fn into_where_args(self) -> WhereArgs {
        match self.operator {
            Some(op) => WhereArgs::new(self.target).operator(op).value(self.value),
            None => WhereArgs::new(self.target).operator(self.value),
        }
    }

    pub fn into_meta_args(self) -> MetaArgs {
        let args = match self.operator {
            Some(op) => MetaArgs::new(self.target).operator(op).value(self.value),
            None => MetaArgs::new(self.target).operator(self.value),
        };
        match self.kind {
            Some(kind) => args.kind(kind),
            None => args,
        }
    }

    pub fn into_taxonomy_args(self) -> TaxonomyArgs {
        let args = TaxonomyArgs::new(self.target);
        let args = match self.field {
            Some(field) => args.field(field),
            None => args,
        };
        match self.operator {
            Some(op) => args.operator(op).value(self.value),
            None => args.operator(self.value),
        }
    }
}

/// Parse a plain filter: `column<op>value`.
pub fn parse_where(input: &str) -> Result<FilterExpr> {
    finish(input, where_expr)
}

/// Parse a meta filter: `key<op>value[::TYPE]`.
pub fn parse_meta(input: &str) -> Result<FilterExpr> {
    finish(input, meta_expr)
}

/// Parse a taxonomy filter: `taxonomy.field<op>value` or `taxonomy.field value`.
pub fn parse_taxonomy(input: &str) -> Result<FilterExpr> {
    finish(input, taxonomy_expr)
}

fn finish<'a>(
    input: &'a str,
    parser: impl Fn(&'a str) -> IResult<&'a str, FilterExpr>,
) -> Result<FilterExpr> {
    let input = input.trim();

    match parser(input) {
        Ok(("", expr)) => Ok(expr),
        Ok((remaining, _)) => Err(Error::parse(
            input.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::parse(
            input.len() - e.input.len(),
            format!("Expected {:?}", e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(Error::parse(input.len(), "Incomplete expression")),
    }
}

/// Parse `column<op>value`.
fn where_expr(input: &str) -> IResult<&str, FilterExpr> {
    let (input, target) = parse_identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, (operator, value)) = parse_operator_and_value(input)?;

    Ok((
        input,
        FilterExpr {
            target: target.to_string(),
            field: None,
            operator: Some(operator),
            value,
            kind: None,
        },
    ))
}

/// Parse a where expression followed by an optional `::TYPE`.
fn meta_expr(input: &str) -> IResult<&str, FilterExpr> {
    let (input, mut expr) = where_expr(input)?;
    let (input, kind) = opt(preceded(tag("::"), parse_identifier))(input)?;
    expr.kind = kind.map(str::to_string);
    Ok((input, expr))
}

/// Parse `taxonomy.field` followed by an operator and value, or just a value.
fn taxonomy_expr(input: &str) -> IResult<&str, FilterExpr> {
    let (input, (taxonomy, _, field)) =
        tuple((parse_identifier, char('.'), parse_identifier))(input)?;

    let (input, (operator, value)) = alt((
        preceded(multispace0, map(parse_operator_and_value, |(op, v)| (Some(op), v))),
        preceded(multispace1, map(parse_value, |v| (None, v))),
    ))(input)?;

    Ok((
        input,
        FilterExpr {
            target: taxonomy.to_string(),
            field: Some(field.to_string()),
            operator,
            value,
            kind: None,
        },
    ))
}

/// Parse an identifier (column, meta key, taxonomy, field).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

/// Parse operator and value together.
fn parse_operator_and_value(input: &str) -> IResult<&str, (String, Value)> {
    let (input, operator) = alt((parse_symbol_operator, parse_keyword_operator))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_value(input)?;
    Ok((input, (operator, value)))
}

/// Symbolic operators, longest first.
fn parse_symbol_operator(input: &str) -> IResult<&str, String> {
    map(
        alt((tag(">="), tag("<="), tag("!="), tag("="), tag(">"), tag("<"))),
        str::to_string,
    )(input)
}

/// Word operators. Must be followed by whitespace or a list.
fn parse_keyword_operator(input: &str) -> IResult<&str, String> {
    let (input, word) = alt((
        tag_no_case("NOT BETWEEN"),
        tag_no_case("NOT EXISTS"),
        tag_no_case("NOT REGEXP"),
        tag_no_case("NOT LIKE"),
        tag_no_case("NOT IN"),
        tag_no_case("BETWEEN"),
        tag_no_case("EXISTS"),
        tag_no_case("REGEXP"),
        tag_no_case("RLIKE"),
        tag_no_case("LIKE"),
        tag_no_case("AND"),
        tag_no_case("IN"),
    ))(input)?;
    let (input, _) = peek(alt((multispace1, tag("["))))(input)?;
    Ok((input, word.to_uppercase()))
}

/// Parse a value.
fn parse_value(input: &str) -> IResult<&str, Value> {
    let (input, _) = multispace0(input)?;

    alt((parse_list, parse_quoted_string, parse_token))(input)
}

/// Parse `[a, b, c]`.
fn parse_list(input: &str) -> IResult<&str, Value> {
    map(
        delimited(
            tuple((char('['), multispace0)),
            separated_list0(
                delimited(multispace0, char(','), multispace0),
                alt((parse_quoted_string, parse_token)),
            ),
            preceded(multispace0, char(']')),
        ),
        Value::Array,
    )(input)
}

/// Parse a single- or double-quoted string.
fn parse_quoted_string(input: &str) -> IResult<&str, Value> {
    map(alt((quoted('\''), quoted('"'))), |s: &str| {
        Value::String(s.to_string())
    })(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    delimited(char(quote), take_while(move |c: char| c != quote), char(quote))
}

/// Parse a bare token and classify it as a number, bool or word.
fn parse_token(input: &str) -> IResult<&str, Value> {
    map(
        take_while1(|c: char| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '@' | '+')
        }),
        classify,
    )(input)
}

fn classify(token: &str) -> Value {
    if let Ok(n) = token.parse::<i64>() {
        return Value::from(n);
    }
    if token.contains('.') {
        if let Ok(f) = token.parse::<f64>() {
            return Value::from(f);
        }
    }
    match token {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(token.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_where() {
        let expr = parse_where("foo=bar").unwrap();
        assert_eq!(expr.target, "foo");
        assert_eq!(expr.operator.as_deref(), Some("="));
        assert_eq!(expr.value, json!("bar"));
    }

    #[test]
    fn test_where_with_spaces_and_number() {
        let expr = parse_where("price >= 10").unwrap();
        assert_eq!(expr.operator.as_deref(), Some(">="));
        assert_eq!(expr.value, json!(10));

        let expr = parse_where("ratio<0.5").unwrap();
        assert_eq!(expr.value, json!(0.5));
    }

    #[test]
    fn test_keyword_operator_with_list() {
        let expr = parse_where("tag not in [a, 'long read', 3]").unwrap();
        assert_eq!(expr.operator.as_deref(), Some("NOT IN"));
        assert_eq!(expr.value, json!(["a", "long read", 3]));
    }

    #[test]
    fn test_meta_with_type() {
        let expr = parse_meta("price>=10::NUMERIC").unwrap();
        assert_eq!(expr.target, "price");
        assert_eq!(expr.value, json!(10));
        assert_eq!(expr.kind.as_deref(), Some("NUMERIC"));

        let expr = parse_meta("featured=true").unwrap();
        assert_eq!(expr.value, json!(true));
        assert_eq!(expr.kind, None);
    }

    #[test]
    fn test_taxonomy_forms() {
        let expr = parse_taxonomy("size.name IN [32, 33]").unwrap();
        assert_eq!(expr.target, "size");
        assert_eq!(expr.field.as_deref(), Some("name"));
        assert_eq!(expr.operator.as_deref(), Some("IN"));
        assert_eq!(expr.value, json!([32, 33]));

        let expr = parse_taxonomy("category.slug news").unwrap();
        assert_eq!(expr.operator, None);
        assert_eq!(expr.value, json!("news"));

        let expr = parse_taxonomy("category.slug in-stock").unwrap();
        assert_eq!(expr.operator, None);
        assert_eq!(expr.value, json!("in-stock"));
    }

    #[test]
    fn test_list_with_padding() {
        let expr = parse_where("post__in IN [ 1, 2 ]").unwrap();
        assert_eq!(expr.value, json!([1, 2]));

        let expr = parse_where("post__in IN []").unwrap();
        assert_eq!(expr.value, json!([]));
    }

    #[test]
    fn test_quoted_value() {
        let expr = parse_where("title=\"Hello World\"").unwrap();
        assert_eq!(expr.value, json!("Hello World"));
    }

    #[test]
    fn test_trailing_content_is_an_error() {
        let err = parse_where("foo=bar baz").unwrap_err();
        assert!(matches!(err, Error::Parse { position: 7, .. }));
    }

    #[test]
    fn test_missing_operator_is_an_error() {
        assert!(matches!(parse_where("foo"), Err(Error::Parse { .. })));
        assert!(matches!(parse_taxonomy("size"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_into_args() {
        let args = parse_where("foo=bar").unwrap().into_where_args();
        assert_eq!(args, WhereArgs::from(("foo", "=", "bar")));

        let args = parse_taxonomy("category.slug news").unwrap().into_taxonomy_args();
        assert_eq!(args, TaxonomyArgs::from(("category", "slug", "news")));
    }
}
