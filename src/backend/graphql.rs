//! GraphQL backend
//!
//! Compiles a table query into a GraphQL-style document and executes it over
//! HTTPS with bearer authentication. The document takes the shape
//! `<queryName>(<params>) { <selection> }` where the query name is the
//! camel-cased table name suffixed with `Query`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::expr::{BooleanOperator, Expr, ExprKind, Operator, Scalar};
use crate::table::Table;

use super::{Backend, BackendError, CompileError, Row};

/// Convert a snake-cased name to camel case. A name without underscores is
/// returned unchanged, so already camel-cased identifiers survive.
pub fn snake_to_camel(s: &str) -> String {
    if !s.contains('_') {
        return s.to_owned();
    }
    let mut parts = s.split('_');
    let mut out = parts.next().unwrap_or_default().to_lowercase();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

fn with_alias(field_name: String, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("{alias}: {field_name}"),
        None => field_name,
    }
}

/// Render a literal: strings and date-like values are quoted, everything
/// else is emitted bare.
fn stringify(value: &Scalar) -> String {
    match value {
        Scalar::String(_) | Scalar::Date(_) | Scalar::Time(_) | Scalar::DateTime(_) => {
            format!("\"{value}\"")
        }
        Scalar::List(items) => {
            let rendered: Vec<String> = items.iter().map(stringify).collect();
            format!("[{}]", rendered.join(", "))
        }
        other => other.to_string(),
    }
}

/// Render a field expression as a GraphQL identifier. Derived and aggregate
/// expressions fuse the operator into the identifier (`priceAvg`).
pub fn field_as_graphql(expr: &Expr, use_alias: bool) -> Result<String, CompileError> {
    match expr.kind() {
        ExprKind::Literal { value } => Ok(stringify(value)),
        ExprKind::Field { column, .. } => {
            let name = snake_to_camel(column);
            Ok(if use_alias {
                with_alias(name, expr.alias())
            } else {
                name
            })
        }
        ExprKind::Derived { op, base } => {
            // Never alias the base field.
            let fused = format!(
                "{}{}",
                field_as_graphql(base, false)?,
                snake_to_camel(&format!("_{op}"))
            );
            Ok(if use_alias {
                with_alias(fused, expr.alias())
            } else {
                fused
            })
        }
        ExprKind::Aggregate { op, base } => {
            let fused = format!(
                "{}{}",
                field_as_graphql(base, false)?,
                snake_to_camel(&format!("_{op}"))
            );
            Ok(if use_alias {
                with_alias(fused, expr.alias())
            } else {
                fused
            })
        }
        _ => Err(CompileError::UnsupportedExpression {
            reason: format!("unexpected field expression `{}`", expr.name()),
        }),
    }
}

/// Render a selection set, one field per line.
pub fn selection_as_graphql(selection: &[Expr]) -> Result<String, CompileError> {
    let fragments = selection
        .iter()
        .map(|e| field_as_graphql(e, true))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fragments.join("\n"))
}

fn format_default(op: &str, lhs: &Expr, rhs: &Expr) -> Result<String, CompileError> {
    let lhs_gql = field_as_graphql(lhs, false)?;
    let rhs_gql = field_as_graphql(rhs, false)?;
    Ok(format!(
        "{{\n    {lhs_gql}: {{\n      {op}: {rhs_gql}\n    }}\n  }}"
    ))
}

fn format_unary(op: &str, operand: &Expr) -> Result<String, CompileError> {
    let operand_gql = field_as_graphql(operand, false)?;
    Ok(format!(
        "{{\n    {operand_gql}: {{\n      {op}: null\n    }}\n  }}"
    ))
}

fn format_in_past(lhs: &Expr, rhs: &Expr) -> Result<String, CompileError> {
    let op = Operator::Boolean(BooleanOperator::InPast);
    let items = match rhs.kind() {
        ExprKind::Literal {
            value: Scalar::List(items),
        } if items.len() == 3 => items,
        _ => {
            return Err(CompileError::InvalidArgument {
                op,
                reason: format!(
                    "expected [olderThan, newerThan, granularity], got `{}`",
                    rhs.name()
                ),
            })
        }
    };
    let (older_than, newer_than, granularity) = (&items[0], &items[1], &items[2]);
    let lhs_gql = field_as_graphql(lhs, false)?;
    Ok(format!(
        "{{\n    {lhs_gql}: {{\n      olderThan: {{{granularity}: {older_than}}},\n      newerThan: {{{granularity}: {newer_than}}},\n    }}\n  }}"
    ))
}

/// Comparisons on temporal fields use `before`/`after` instead of `lt`/`gt`;
/// equality has no temporal form at all.
fn format_temporal(
    op: BooleanOperator,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<String, CompileError> {
    let temporal_op = match op {
        BooleanOperator::Lt => "before".to_owned(),
        BooleanOperator::Gt => "after".to_owned(),
        BooleanOperator::Eq | BooleanOperator::Neq => {
            return Err(CompileError::UnsupportedExpression {
                reason: format!("`{op}` is not supported for temporal fields"),
            })
        }
        other => other.to_string(),
    };
    format_default(&temporal_op, lhs, rhs)
}

/// Render a boolean expression tree as a GraphQL filter value.
pub fn expr_as_graphql(expr: &Expr) -> Result<String, CompileError> {
    match expr.kind() {
        ExprKind::Boolean { op, lhs, rhs } if op.is_combinator() => {
            let children = [expr_as_graphql(lhs)?, expr_as_graphql(rhs)?];
            Ok(format!("{{\n      {op}: [{}]\n    }}", children.join(",\n")))
        }
        ExprKind::Unary { op, operand } => format_unary(&op.to_string(), operand),
        ExprKind::Boolean { op, lhs, rhs } => {
            // Negation has no filter form in the query language.
            if *op == BooleanOperator::Not {
                return Err(CompileError::UnsupportedOperation {
                    op: Operator::Boolean(*op),
                });
            }
            if !matches!(rhs.kind(), ExprKind::Literal { .. }) {
                return Err(CompileError::UnsupportedExpression {
                    reason: format!(
                        "non-literal right-hand side in `{} {op} {}`",
                        lhs.name(),
                        rhs.name()
                    ),
                });
            }
            if *op == BooleanOperator::InPast {
                return format_in_past(lhs, rhs);
            }
            let temporal = lhs.field_kind().map(|k| k.is_temporal()).unwrap_or(false);
            if temporal {
                format_temporal(*op, lhs, rhs)
            } else {
                format_default(&op.to_string(), lhs, rhs)
            }
        }
        _ => Err(CompileError::UnsupportedExpression {
            reason: format!("`{}` is not a boolean expression", expr.name()),
        }),
    }
}

/// The GraphQL query name for a table.
pub fn query_name_as_graphql(name: &str) -> String {
    format!("{}Query", snake_to_camel(name))
}

/// Compile a table query into a GraphQL document.
pub fn compile_query(table: &Table) -> Result<String, CompileError> {
    let selection = match table.selection() {
        Some(selection) if !selection.is_empty() => selection,
        _ => {
            return Err(CompileError::EmptySelection {
                table: table.name().to_owned(),
            })
        }
    };
    let selection_fragment = selection_as_graphql(selection)?;

    let mut params = Vec::new();
    if let Some(filter) = table.filter_expr() {
        params.push(format!("filter: {}", expr_as_graphql(filter)?));
    }
    if let Some(ordering) = table.ordering() {
        let rendered = ordering
            .iter()
            .map(|(field, dir)| {
                field_as_graphql(field, false)
                    .map(|f| format!("{{{f}: {}}}", dir.to_string().to_lowercase()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        params.push(format!("orderBy: [{}]", rendered.join(", ")));
    }
    params.push(format!("limit: {}", table.limit_rows()));

    Ok(format!(
        "{}({}) {{\n{selection_fragment}\n}}",
        query_name_as_graphql(table.name()),
        params.join(", ")
    ))
}

/// Executes compiled documents against a GraphQL endpoint.
pub struct GraphqlBackend {
    client: reqwest::Client,
    url: String,
    auth_token: String,
}

impl GraphqlBackend {
    pub fn new(url: &str, auth_token: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        GraphqlBackend {
            client,
            url: url.to_owned(),
            auth_token,
        }
    }
}

#[async_trait]
impl Backend for GraphqlBackend {
    async fn compile(&self, table: &Table) -> Result<String, BackendError> {
        Ok(compile_query(table)?)
    }

    async fn execute(&self, table: &Table) -> Result<Vec<Row>, BackendError> {
        let document = compile_query(table)?;
        let query_name = query_name_as_graphql(table.name());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.auth_token)
            .json(&json!({ "query": format!("{{{document}}}") }))
            .send()
            .await?
            .error_for_status()?;

        let mut payload: serde_json::Value = response.json().await?;
        let rows = payload["data"][&query_name].take();
        if rows.is_null() {
            return Err(BackendError::MissingData { query_name });
        }
        serde_json::from_value::<Vec<Row>>(rows).map_err(|e| {
            tracing::error!(query_name = %query_name, error = %e, "failed to parse result rows");
            BackendError::ResultParse(e)
        })
    }
}
