//! Plain `where` clauses: `column operator value` triples that compile to
//! top-level query arguments.

use serde_json::Value;
use tracing::debug;

use super::{operator_token, split_shortcut};
use crate::error::{Error, Result};
use crate::grammar::Grammar;

/// Raw positional arguments of a `where` call.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereArgs {
    pub column: String,
    pub operator: Option<Value>,
    pub value: Option<Value>,
}

impl WhereArgs {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: None,
            value: None,
        }
    }

    pub fn operator(mut self, operator: impl Into<Value>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl<C: Into<String>, V: Into<Value>> From<(C, V)> for WhereArgs {
    fn from((column, value): (C, V)) -> Self {
        WhereArgs::new(column).operator(value)
    }
}

impl<C: Into<String>, O: Into<Value>, V: Into<Value>> From<(C, O, V)> for WhereArgs {
    fn from((column, operator, value): (C, O, V)) -> Self {
        WhereArgs::new(column).operator(operator).value(value)
    }
}

/// A validated plain clause.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub column: String,
    pub operator: &'static str,
    pub value: Value,
}

/// Input accepted by [`WhereClauseBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub enum WhereInput {
    Clause(WhereArgs),
    List(Vec<WhereArgs>),
}

impl From<WhereArgs> for WhereInput {
    fn from(args: WhereArgs) -> Self {
        WhereInput::Clause(args)
    }
}

/// Builds plain clauses against the generic operator set.
#[derive(Debug, Clone, Copy)]
pub struct WhereClauseBuilder<'g> {
    grammar: &'g Grammar,
}

impl<'g> WhereClauseBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Build the clause list for `input`.
    ///
    /// A single clause with an unknown operator and a non-null value is
    /// rejected. Members of a list are corrected instead: the operator becomes
    /// the value and `=` is used.
    pub fn build(&self, input: WhereInput) -> Result<Vec<WhereClause>> {
        match input {
            WhereInput::Clause(args) => Ok(vec![self.strict(args)?]),
            WhereInput::List(list) => Ok(list.into_iter().map(|args| self.lenient(args)).collect()),
        }
    }

    fn strict(&self, args: WhereArgs) -> Result<WhereClause> {
        let (operator, value) = split_shortcut(args.operator, args.value, "=");
        let known = operator_token(&operator).and_then(|op| self.grammar.operator(op));

        match known {
            Some(op) => Ok(WhereClause {
                column: args.column,
                operator: op,
                value,
            }),
            None if !value.is_null() => Err(Error::validation(format!(
                "Illegal operator and value combination for '{}': {}",
                args.column, operator
            ))),
            None => Ok(WhereClause {
                column: args.column,
                operator: "=",
                value: operator,
            }),
        }
    }

    fn lenient(&self, args: WhereArgs) -> WhereClause {
        let (operator, value) = split_shortcut(args.operator, args.value, "=");

        match operator_token(&operator).and_then(|op| self.grammar.operator(op)) {
            Some(op) => WhereClause {
                column: args.column,
                operator: op,
                value,
            },
            None => {
                debug!(
                    column = %args.column,
                    %operator,
                    "unknown where operator, using it as the value"
                );
                WhereClause {
                    column: args.column,
                    operator: "=",
                    value: operator,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(input: impl Into<WhereInput>) -> Result<Vec<WhereClause>> {
        let g = Grammar::default();
        WhereClauseBuilder::new(&g).build(input.into())
    }

    #[test]
    fn test_full_where() {
        let clauses = build(WhereArgs::from(("foo", "=", "bar"))).unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].column, "foo");
        assert_eq!(clauses[0].operator, "=");
        assert_eq!(clauses[0].value, json!("bar"));
    }

    #[test]
    fn test_two_argument_where_equals_full_form() {
        let short = build(WhereArgs::from(("bar", "baz"))).unwrap();
        let full = build(WhereArgs::from(("bar", "=", "baz"))).unwrap();
        assert_eq!(short, full);
    }

    #[test]
    fn test_invalid_operator_is_rejected() {
        let err = build(WhereArgs::from(("foo", "bar", "baz"))).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_list_members_are_corrected() {
        let clauses = build(WhereInput::List(vec![
            ("foo", "bar").into(),
            ("meaning", "of life").into(),
            ("universe", "bogus", 42).into(),
        ]))
        .unwrap();

        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[1].value, json!("of life"));
        assert_eq!(clauses[2].operator, "=");
        assert_eq!(clauses[2].value, json!("bogus"));
    }
}
