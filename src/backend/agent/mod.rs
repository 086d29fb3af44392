//! Query agent backend
//!
//! Compiles a table query into the `query_agent` protobuf request and
//! executes it over gRPC. Compilation is a pure translation of the
//! expression tree; grouping is inferred from the selection when it mixes
//! aggregated and plain fields.

pub mod client;
pub mod pb;
pub mod pool;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;

use crate::expr::{
    AggregateOperator, BooleanOperator, Expr, ExprKind, Operator, ProjectionOperator, Scalar,
    UnaryOperator,
};
use crate::table::{Direction, Table};

use super::{Backend, BackendError, CompileError, Row};
use pool::AgentConnections;

fn make_literal(value: &Scalar) -> pb::query::Literal {
    use pb::query::literal::LiteralType;

    let literal_type = match value {
        Scalar::String(s) => LiteralType::String(s.clone()),
        Scalar::I64(n) => LiteralType::I64(*n),
        Scalar::F64(n) => LiteralType::F64(*n),
        Scalar::Bool(b) => LiteralType::Boolean(*b),
        // Temporal values travel as integer timestamps: dates and datetimes
        // as epoch milliseconds (UTC), times as milliseconds since midnight.
        Scalar::Date(d) => {
            LiteralType::Timestamp(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
        }
        Scalar::Time(t) => {
            LiteralType::Timestamp(t.signed_duration_since(NaiveTime::MIN).num_milliseconds())
        }
        Scalar::DateTime(dt) => LiteralType::Timestamp(dt.and_utc().timestamp_millis()),
        Scalar::List(items) => LiteralType::List(pb::query::literal::List {
            values: items.iter().map(make_literal).collect(),
        }),
    };
    pb::query::Literal {
        literal_type: Some(literal_type),
    }
}

fn projection_op(op: ProjectionOperator) -> pb::query::derived_expression::ProjectionOperator {
    use pb::query::derived_expression::ProjectionOperator as Wire;

    match op {
        ProjectionOperator::Year => Wire::Year,
        ProjectionOperator::Month => Wire::Month,
        ProjectionOperator::Day => Wire::Day,
        ProjectionOperator::DayOfWeek => Wire::DayOfWeek,
        ProjectionOperator::Week => Wire::Week,
        ProjectionOperator::WeekDate => Wire::DateOfWeek,
        ProjectionOperator::Date => Wire::Date,
        ProjectionOperator::Time => Wire::Time,
        ProjectionOperator::Hour => Wire::Hour,
        ProjectionOperator::Minute => Wire::Minute,
        ProjectionOperator::Second => Wire::Second,
        ProjectionOperator::Millisecond => Wire::Millisecond,
    }
}

fn aggregate_op(op: AggregateOperator) -> pb::query::aggregate_expression::AggregateOperator {
    use pb::query::aggregate_expression::AggregateOperator as Wire;

    match op {
        AggregateOperator::Min => Wire::Min,
        AggregateOperator::Max => Wire::Max,
        AggregateOperator::Sum => Wire::Sum,
        AggregateOperator::Count => Wire::Count,
        AggregateOperator::CountDistinct => Wire::CountDistinct,
        // The agent has a single mean aggregation.
        AggregateOperator::Avg | AggregateOperator::AvgDistinct => Wire::Mean,
    }
}

fn boolean_op(
    op: BooleanOperator,
) -> Result<pb::query::boolean_expression::BooleanOperator, CompileError> {
    use pb::query::boolean_expression::BooleanOperator as Wire;

    match op {
        BooleanOperator::And => Ok(Wire::And),
        BooleanOperator::Or => Ok(Wire::Or),
        BooleanOperator::Eq => Ok(Wire::Eq),
        BooleanOperator::Neq => Ok(Wire::Neq),
        BooleanOperator::Lt => Ok(Wire::Lt),
        BooleanOperator::Lte => Ok(Wire::Lte),
        BooleanOperator::Gt => Ok(Wire::Gt),
        BooleanOperator::Gte => Ok(Wire::Gte),
        BooleanOperator::Like => Ok(Wire::Like),
        BooleanOperator::Between => Ok(Wire::Between),
        BooleanOperator::In => Ok(Wire::In),
        BooleanOperator::HasAny => Ok(Wire::HasAny),
        BooleanOperator::HasAll => Ok(Wire::HasAll),
        // These are rewritten into ranges at construction time; a raw tag
        // reaching the compiler is a hard error.
        BooleanOperator::Not | BooleanOperator::InPast => Err(CompileError::UnhandledOperator {
            op: Operator::Boolean(op),
        }),
    }
}

fn compile_expression(expr: &Expr) -> Result<pb::query::Expression, CompileError> {
    use pb::query::expression::ExType;

    let ex_type = match expr.kind() {
        ExprKind::Field { column, .. } => ExType::Field(pb::query::FieldReference {
            field_name: column.clone(),
        }),
        ExprKind::Literal { value } => ExType::Literal(make_literal(value)),
        ExprKind::Derived { op, base } => ExType::Derived(pb::query::DerivedExpression {
            argument: Some(Box::new(compile_expression(base)?)),
            op: projection_op(*op) as i32,
        }),
        ExprKind::Aggregate { op, base } => ExType::Aggregate(pb::query::AggregateExpression {
            argument: Some(Box::new(compile_expression(base)?)),
            op: aggregate_op(*op) as i32,
        }),
        ExprKind::Boolean { .. } | ExprKind::Unary { .. } => {
            ExType::Condition(compile_condition(expr)?)
        }
    };
    Ok(pb::query::Expression {
        ex_type: Some(ex_type),
    })
}

fn wrap_condition(condition: pb::query::BooleanExpression) -> pb::query::Expression {
    pb::query::Expression {
        ex_type: Some(pb::query::expression::ExType::Condition(condition)),
    }
}

fn compile_condition(expr: &Expr) -> Result<pb::query::BooleanExpression, CompileError> {
    use pb::query::boolean_expression::BooleanOperator as Wire;

    match expr.kind() {
        ExprKind::Boolean { op, lhs, rhs } if op.is_combinator() => {
            Ok(pb::query::BooleanExpression {
                op: boolean_op(*op)? as i32,
                arguments: vec![
                    wrap_condition(compile_condition(lhs)?),
                    wrap_condition(compile_condition(rhs)?),
                ],
            })
        }
        ExprKind::Unary { op, operand } => {
            let wire_op = match op {
                UnaryOperator::IsNull => Wire::IsNull,
                UnaryOperator::IsNotNull => Wire::IsNotNull,
            };
            Ok(pb::query::BooleanExpression {
                op: wire_op as i32,
                arguments: vec![compile_expression(operand)?],
            })
        }
        ExprKind::Boolean { op, lhs, rhs } => {
            let wire_op = boolean_op(*op)?;
            if !matches!(rhs.kind(), ExprKind::Literal { .. }) {
                return Err(CompileError::UnsupportedExpression {
                    reason: format!(
                        "non-literal right-hand side in `{} {op} {}`",
                        lhs.name(),
                        rhs.name()
                    ),
                });
            }
            Ok(pb::query::BooleanExpression {
                op: wire_op as i32,
                arguments: vec![compile_expression(lhs)?, compile_expression(rhs)?],
            })
        }
        _ => Err(CompileError::UnsupportedExpression {
            reason: format!("`{}` is not a boolean expression", expr.name()),
        }),
    }
}

/// Grouping identity of an expression: the column name for a field
/// reference, `op(key)` for a projection, nothing for anything else.
fn group_key(expr: &Expr) -> Option<String> {
    match expr.kind() {
        ExprKind::Field { column, .. } => Some(column.clone()),
        ExprKind::Derived { op, base } => group_key(base).map(|k| format!("{op}({k})")),
        _ => None,
    }
}

fn compile_group_entry(expr: &Expr) -> Result<Option<pb::query::GroupByExpression>, CompileError> {
    use pb::query::group_by_expression::ExType;

    let ex_type = match expr.kind() {
        ExprKind::Field { column, .. } => ExType::Field(pb::query::FieldReference {
            field_name: column.clone(),
        }),
        ExprKind::Derived { op, base } => ExType::Derived(pb::query::DerivedExpression {
            argument: Some(Box::new(compile_expression(base)?)),
            op: projection_op(*op) as i32,
        }),
        _ => return Ok(None),
    };
    Ok(Some(pb::query::GroupByExpression {
        ex_type: Some(ex_type),
    }))
}

/// Compile a table query into a wire request, without transport metadata.
pub fn compile_query(table: &Table) -> Result<pb::Query, CompileError> {
    let selection = table.selection().unwrap_or_default();

    let select = selection
        .iter()
        .map(|expr| {
            Ok(pb::query::SelectExpression {
                argument: Some(compile_expression(expr)?),
                alias: expr.alias().map(str::to_owned),
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let filter = table
        .filter_expr()
        .map(compile_condition)
        .transpose()?;

    // When the selection aggregates anything, every plain selected field
    // and every ordering field not already selected becomes a grouping key.
    let mut group_by = Vec::new();
    let has_aggregate = selection
        .iter()
        .any(|e| matches!(e.kind(), ExprKind::Aggregate { .. }));
    if has_aggregate {
        let mut seen = HashSet::new();
        for expr in selection {
            if matches!(expr.kind(), ExprKind::Aggregate { .. }) {
                continue;
            }
            if let Some(key) = group_key(expr) {
                if seen.insert(key) {
                    if let Some(entry) = compile_group_entry(expr)? {
                        group_by.push(entry);
                    }
                }
            }
        }
        if let Some(ordering) = table.ordering() {
            for (expr, _) in ordering {
                if let Some(key) = group_key(expr) {
                    if seen.insert(key) {
                        if let Some(entry) = compile_group_entry(expr)? {
                            group_by.push(entry);
                        }
                    }
                }
            }
        }
    }

    let order_by = table
        .ordering()
        .unwrap_or_default()
        .iter()
        .map(|(expr, dir)| {
            let direction = match dir {
                Direction::Asc => pb::query::order_by_expression::Direction::Asc,
                Direction::Desc => pb::query::order_by_expression::Direction::Desc,
            };
            Ok(pb::query::OrderByExpression {
                argument: Some(compile_expression(expr)?),
                direction: Some(direction as i32),
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let limit = (table.limit_rows() > 0).then(|| table.limit_rows());

    Ok(pb::Query {
        id: None,
        client_version: None,
        select_from: table.name().to_owned(),
        select,
        filter,
        group_by,
        order_by,
        limit,
        dry_run: None,
    })
}

/// Executes compiled queries over an established agent connection.
pub struct AgentBackend {
    connections: Arc<AgentConnections>,
    connection_id: String,
}

impl AgentBackend {
    pub fn new(connections: Arc<AgentConnections>, connection_id: String) -> Self {
        AgentBackend {
            connections,
            connection_id,
        }
    }

    fn make_query(&self, table: &Table) -> Result<pb::Query, CompileError> {
        let mut query = compile_query(table)?;
        query.id = Some(pb::query::Id::ConnectionId(self.connection_id.clone()));
        query.client_version = Some(pb::ClientVersion {
            client: pb::client_version::Client::Rust as i32,
            code_version: env!("CARGO_PKG_VERSION").to_owned(),
            dataset_version: table.dataset_version().to_owned(),
        });
        Ok(query)
    }
}

#[async_trait]
impl Backend for AgentBackend {
    async fn compile(&self, table: &Table) -> Result<String, BackendError> {
        let mut query = self.make_query(table)?;
        query.dry_run = Some(true);
        let result = self.connections.transport().execute_query(query).await?;
        Ok(result.query_string)
    }

    async fn execute(&self, table: &Table) -> Result<Vec<Row>, BackendError> {
        let query = self.make_query(table)?;
        let result = self.connections.transport().execute_query(query).await?;
        serde_json::from_str::<Vec<Row>>(&result.json_data).map_err(|e| {
            tracing::error!(error = %e, "failed to parse agent result rows");
            BackendError::ResultParse(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::client::AgentTransport;
    use super::*;
    use crate::expr::{DateField, FloatField, IntField, StringField, TimeField};
    use crate::table::Selector;
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::Mutex;

    fn sample_table() -> Table {
        Table::builder("transactions")
            .dataset("transactions", "0.3.0")
            .field(&IntField::new("id"))
            .field(&StringField::new("name"))
            .field(&FloatField::new("price"))
            .field(&DateField::new("created_on"))
            .build()
            .unwrap()
    }

    fn field_name(entry: &pb::query::GroupByExpression) -> &str {
        match entry.ex_type.as_ref().unwrap() {
            pb::query::group_by_expression::ExType::Field(f) => &f.field_name,
            other => panic!("expected field reference, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_selection_compiles_to_field_references() {
        let query = compile_query(
            &sample_table().select(["id", "name"]).unwrap().limit(10),
        )
        .unwrap();

        assert_eq!(query.select_from, "transactions");
        assert_eq!(query.select.len(), 2);
        for (entry, expected) in query.select.iter().zip(["id", "name"]) {
            match entry.argument.as_ref().unwrap().ex_type.as_ref().unwrap() {
                pb::query::expression::ExType::Field(f) => {
                    assert_eq!(f.field_name, expected);
                }
                other => panic!("expected field reference, got {other:?}"),
            }
        }
        assert!(query.filter.is_none());
        assert!(query.group_by.is_empty());
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn test_grouping_inference() {
        let price = FloatField::new("price");
        let query = sample_table()
            .select([
                Selector::from("id"),
                Selector::from("name"),
                Selector::from(price.avg().with_alias("avgPrice")),
            ])
            .unwrap()
            .filter(price.gt(0.0))
            .order_by([
                ("avgPrice", Direction::Desc),
                ("created_on", Direction::Asc),
            ])
            .unwrap();

        let compiled = compile_query(&query).unwrap();
        let keys: Vec<&str> = compiled.group_by.iter().map(field_name).collect();
        assert_eq!(keys, ["id", "name", "created_on"]);
        assert_eq!(compiled.order_by.len(), 2);
    }

    #[test]
    fn test_no_grouping_without_aggregates() {
        let query = sample_table()
            .select(["id", "name"])
            .unwrap()
            .order_by([("created_on", Direction::Asc)])
            .unwrap();
        assert!(compile_query(&query).unwrap().group_by.is_empty());
    }

    #[test]
    fn test_limit_zero_is_omitted() {
        let query = sample_table().select(["id"]).unwrap().limit(0);
        assert_eq!(compile_query(&query).unwrap().limit, None);
    }

    #[test]
    fn test_temporal_literal_lowering() {
        use pb::query::literal::LiteralType;

        let date = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
        match make_literal(&Scalar::Date(date)).literal_type.unwrap() {
            LiteralType::Timestamp(ms) => assert_eq!(ms, 1_617_235_200_000),
            other => panic!("expected timestamp, got {other:?}"),
        }

        let time = NaiveTime::from_hms_opt(1, 0, 1).unwrap();
        match make_literal(&Scalar::Time(time)).literal_type.unwrap() {
            LiteralType::Timestamp(ms) => assert_eq!(ms, 3_601_000),
            other => panic!("expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_list_literal_lowering() {
        use pb::query::literal::LiteralType;

        let list = Scalar::List(vec![Scalar::I64(1), Scalar::I64(2)]);
        match make_literal(&list).literal_type.unwrap() {
            LiteralType::List(l) => assert_eq!(l.values.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_operator_map() {
        use pb::query::aggregate_expression::AggregateOperator as Wire;

        assert_eq!(aggregate_op(AggregateOperator::Avg), Wire::Mean);
        assert_eq!(aggregate_op(AggregateOperator::AvgDistinct), Wire::Mean);
        assert_eq!(
            aggregate_op(AggregateOperator::CountDistinct),
            Wire::CountDistinct
        );
    }

    #[test]
    fn test_projection_operator_map() {
        use pb::query::derived_expression::ProjectionOperator as Wire;

        assert_eq!(projection_op(ProjectionOperator::WeekDate), Wire::DateOfWeek);
        assert_eq!(projection_op(ProjectionOperator::DayOfWeek), Wire::DayOfWeek);
    }

    #[test]
    fn test_unary_condition() {
        let cond = compile_condition(&StringField::new("name").is_null()).unwrap();
        assert_eq!(
            cond.op,
            pb::query::boolean_expression::BooleanOperator::IsNull as i32
        );
        assert_eq!(cond.arguments.len(), 1);
    }

    #[test]
    fn test_raw_in_past_is_unhandled() {
        let lhs = DateField::new("created_on").expr();
        let rhs = Expr::literal(vec![Scalar::I64(1), Scalar::I64(2)]);
        let cond = Expr::boolean(BooleanOperator::InPast, lhs, rhs);
        assert!(matches!(
            compile_condition(&cond),
            Err(CompileError::UnhandledOperator { .. })
        ));
    }

    #[test]
    fn test_non_literal_rhs_is_rejected() {
        let cond = Expr::boolean(
            BooleanOperator::Eq,
            StringField::new("a").expr(),
            StringField::new("b").expr(),
        );
        assert!(matches!(
            compile_condition(&cond),
            Err(CompileError::UnsupportedExpression { .. })
        ));
    }

    #[test]
    fn test_expanded_in_past_compiles() {
        let d = TimeField::new("t");
        let cond = d.in_past(1, 2, crate::expr::TimeGranularity::Hours);
        let compiled = compile_condition(&cond).unwrap();
        assert_eq!(
            compiled.op,
            pb::query::boolean_expression::BooleanOperator::And as i32
        );
    }

    struct RecordingTransport {
        queries: Mutex<Vec<pb::Query>>,
        json_data: String,
    }

    #[async_trait]
    impl AgentTransport for RecordingTransport {
        async fn create_connection(
            &self,
            _request: pb::ConnectionRequest,
        ) -> Result<pb::ConnectionResponse, BackendError> {
            Ok(pb::ConnectionResponse::default())
        }

        async fn execute_query(&self, query: pb::Query) -> Result<pb::QueryResult, BackendError> {
            let dry_run = query.dry_run.unwrap_or(false);
            self.queries.lock().unwrap().push(query);
            Ok(pb::QueryResult {
                query_string: if dry_run {
                    "SELECT id FROM transactions".to_owned()
                } else {
                    String::new()
                },
                json_data: self.json_data.clone(),
            })
        }

        async fn disconnect_connection(
            &self,
            _request: pb::DisconnectRequest,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn backend_over(json_data: &str) -> (AgentBackend, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport {
            queries: Mutex::new(Vec::new()),
            json_data: json_data.to_owned(),
        });
        let connections = Arc::new(AgentConnections::new(transport.clone()));
        (AgentBackend::new(connections, "conn-1".into()), transport)
    }

    #[tokio::test]
    async fn test_compile_runs_a_dry_query() {
        let (backend, transport) = backend_over("[]");
        let table = sample_table().select(["id"]).unwrap();

        let sql = backend.compile(&table).await.unwrap();
        assert_eq!(sql, "SELECT id FROM transactions");

        let queries = transport.queries.lock().unwrap();
        assert_eq!(queries[0].dry_run, Some(true));
        assert_eq!(
            queries[0].id,
            Some(pb::query::Id::ConnectionId("conn-1".into()))
        );
        let version = queries[0].client_version.as_ref().unwrap();
        assert_eq!(version.client, pb::client_version::Client::Rust as i32);
    }

    #[tokio::test]
    async fn test_execute_parses_result_rows() {
        let (backend, _) = backend_over(r#"[{"id": 1}, {"id": 2}]"#);
        let table = sample_table().select(["id"]).unwrap();

        let rows = backend.execute(&table).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_execute_rejects_malformed_payload() {
        let (backend, _) = backend_over("not json");
        let table = sample_table().select(["id"]).unwrap();

        assert!(matches!(
            backend.execute(&table).await,
            Err(BackendError::ResultParse(_))
        ));
    }
}
