//! Expression tree
//!
//! Immutable expression values shared via `Arc`: field references, literals,
//! derived projections, aggregations and boolean predicates. Expressions
//! never evaluate anything locally; compilers walk the tree through
//! [`Expr::operator`] and [`Expr::operands`] and translate it for a backend.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::operator::{
    AggregateOperator, BooleanOperator, Operator, ProjectionOperator, UnaryOperator,
};
use super::time::{to_iso_date, to_iso_datetime, to_iso_time};

/// Errors raised while building expressions.
#[derive(Debug, thiserror::Error)]
pub enum ExprError {
    /// An operation that requires a column-backed operand was applied to an
    /// expression that does not resolve to one.
    #[error("cannot apply `{op}` to `{operand}`: operand is not backed by a field reference")]
    NotFieldBacked { op: Operator, operand: String },
}

/// A literal value carried by an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    List(Vec<Scalar>),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{s}"),
            Scalar::I64(n) => write!(f, "{n}"),
            Scalar::F64(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Date(d) => write!(f, "{}", to_iso_date(*d)),
            Scalar::Time(t) => write!(f, "{}", to_iso_time(*t)),
            Scalar::DateTime(dt) => write!(f, "{}", to_iso_datetime(*dt)),
            Scalar::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Scalar::Date(v)
    }
}

impl From<NaiveTime> for Scalar {
    fn from(v: NaiveTime) -> Self {
        Scalar::Time(v)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(v: NaiveDateTime) -> Self {
        Scalar::DateTime(v)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Scalar {
    fn from(v: Vec<T>) -> Self {
        Scalar::List(v.into_iter().map(Into::into).collect())
    }
}

/// The value category of a column, recorded on its field reference.
///
/// Compilers use this to decide literal representation (temporal columns
/// compare against ISO strings or epoch millis) and to gate temporal-only
/// rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Strings, numbers, booleans, arrays.
    Value,
    Date,
    Time,
    DateTime,
}

impl FieldKind {
    pub fn is_temporal(&self) -> bool {
        !matches!(self, FieldKind::Value)
    }
}

/// The shape of an expression node.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Reference to a named column.
    Field { column: String, kind: FieldKind },
    /// A literal value.
    Literal { value: Scalar },
    /// A date/time component projected out of a field-backed expression.
    Derived {
        op: ProjectionOperator,
        base: Arc<Expr>,
    },
    /// An aggregation over a field-backed expression.
    Aggregate {
        op: AggregateOperator,
        base: Arc<Expr>,
    },
    /// A binary boolean predicate or combinator.
    Boolean {
        op: BooleanOperator,
        lhs: Arc<Expr>,
        rhs: Arc<Expr>,
    },
    /// A unary boolean check.
    Unary {
        op: UnaryOperator,
        operand: Arc<Expr>,
    },
}

/// A single operand reported by [`Expr::operands`].
#[derive(Debug, PartialEq)]
pub enum Operand<'a> {
    /// A column name (field references).
    Name(&'a str),
    /// A literal value.
    Value(&'a Scalar),
    /// A sub-expression.
    Expr(&'a Expr),
}

/// An immutable, typed query expression.
///
/// Cloning is cheap: sub-trees are shared via `Arc`, and aliasing returns a
/// new node without touching the original.
#[derive(Debug, Clone)]
pub struct Expr {
    name: String,
    alias: Option<String>,
    kind: ExprKind,
}

impl Expr {
    /// A reference to the named column.
    pub fn field(column: impl Into<String>, kind: FieldKind) -> Expr {
        let column = column.into();
        Expr {
            name: column.clone(),
            alias: None,
            kind: ExprKind::Field { column, kind },
        }
    }

    /// A literal value.
    pub fn literal(value: impl Into<Scalar>) -> Expr {
        let value = value.into();
        Expr {
            name: format!("lit({value})"),
            alias: None,
            kind: ExprKind::Literal { value },
        }
    }

    /// Project a date/time component out of `base`.
    ///
    /// `base` must resolve, transitively, to a field reference.
    pub fn derived(op: ProjectionOperator, base: Expr) -> Result<Expr, ExprError> {
        ensure_field_backed(Operator::Projection(op), &base)?;
        Ok(Self::derived_unchecked(op, base))
    }

    pub(crate) fn derived_unchecked(op: ProjectionOperator, base: Expr) -> Expr {
        Expr {
            name: format!("({op}({}))", base.name),
            alias: None,
            kind: ExprKind::Derived {
                op,
                base: Arc::new(base),
            },
        }
    }

    /// Aggregate `base`.
    ///
    /// `base` must resolve, transitively, to a field reference.
    pub fn aggregate(op: AggregateOperator, base: Expr) -> Result<Expr, ExprError> {
        ensure_field_backed(Operator::Aggregate(op), &base)?;
        Ok(Self::aggregate_unchecked(op, base))
    }

    pub(crate) fn aggregate_unchecked(op: AggregateOperator, base: Expr) -> Expr {
        Expr {
            name: format!("({op}({}))", base.name),
            alias: None,
            kind: ExprKind::Aggregate {
                op,
                base: Arc::new(base),
            },
        }
    }

    /// A binary boolean predicate or combinator.
    pub fn boolean(op: BooleanOperator, lhs: Expr, rhs: Expr) -> Expr {
        Expr {
            name: format!("({} {op} {})", lhs.name, rhs.name),
            alias: None,
            kind: ExprKind::Boolean {
                op,
                lhs: Arc::new(lhs),
                rhs: Arc::new(rhs),
            },
        }
    }

    /// A unary boolean check.
    pub fn unary(op: UnaryOperator, operand: Expr) -> Expr {
        Expr {
            name: format!("({op}({}))", operand.name),
            alias: None,
            kind: ExprKind::Unary {
                op,
                operand: Arc::new(operand),
            },
        }
    }

    /// Conjunction with another boolean expression.
    pub fn and(self, other: Expr) -> Expr {
        Expr::boolean(BooleanOperator::And, self, other)
    }

    /// Disjunction with another boolean expression.
    pub fn or(self, other: Expr) -> Expr {
        Expr::boolean(BooleanOperator::Or, self, other)
    }

    /// The expression's debug name (column name, `lit(..)` or a nested
    /// operator form).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The output alias, if one was set.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Return a copy of this expression carrying `alias`. The original is
    /// left untouched.
    pub fn with_alias(&self, alias: impl Into<String>) -> Expr {
        let mut copy = self.clone();
        copy.alias = Some(alias.into());
        copy
    }

    /// The node's shape.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// The operator tag of this node. Field references and literals report
    /// [`Operator::Ident`].
    pub fn operator(&self) -> Operator {
        match &self.kind {
            ExprKind::Field { .. } | ExprKind::Literal { .. } => Operator::Ident,
            ExprKind::Derived { op, .. } => Operator::Projection(*op),
            ExprKind::Aggregate { op, .. } => Operator::Aggregate(*op),
            ExprKind::Boolean { op, .. } => Operator::Boolean(*op),
            ExprKind::Unary { op, .. } => Operator::Unary(*op),
        }
    }

    /// The node's direct operands.
    ///
    /// A field reference reports its column name, a literal its value (list
    /// literals report each item), and every operator node its
    /// sub-expressions in order.
    pub fn operands(&self) -> Vec<Operand<'_>> {
        match &self.kind {
            ExprKind::Field { column, .. } => vec![Operand::Name(column)],
            ExprKind::Literal { value } => match value {
                Scalar::List(items) => items.iter().map(Operand::Value).collect(),
                other => vec![Operand::Value(other)],
            },
            ExprKind::Derived { base, .. } => vec![Operand::Expr(base)],
            ExprKind::Aggregate { base, .. } => vec![Operand::Expr(base)],
            ExprKind::Boolean { lhs, rhs, .. } => {
                vec![Operand::Expr(lhs), Operand::Expr(rhs)]
            }
            ExprKind::Unary { operand, .. } => vec![Operand::Expr(operand)],
        }
    }

    /// The field kind of a direct column reference, if this is one.
    ///
    /// Derived and aggregate wrappers report nothing: a projected component
    /// of a temporal column is an ordinary value and must not pick up
    /// temporal-only comparison rewrites.
    pub(crate) fn field_kind(&self) -> Option<FieldKind> {
        match &self.kind {
            ExprKind::Field { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Check that `expr` resolves, transitively, to a field reference.
fn ensure_field_backed(op: Operator, expr: &Expr) -> Result<(), ExprError> {
    match &expr.kind {
        ExprKind::Field { .. } => Ok(()),
        ExprKind::Derived { base, .. } | ExprKind::Aggregate { base, .. } => {
            ensure_field_backed(op, base)
        }
        _ => Err(ExprError::NotFieldBacked {
            op,
            operand: expr.name.clone(),
        }),
    }
}

impl PartialEq for Expr {
    /// Structural identity by debug name and alias. Two independently built
    /// references to the same column compare equal.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.alias == other.alias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_reports_ident_and_its_name() {
        let f = Expr::field("price", FieldKind::Value);
        assert_eq!(f.operator(), Operator::Ident);
        assert_eq!(f.operands(), vec![Operand::Name("price")]);
        assert_eq!(f.name(), "price");
    }

    #[test]
    fn test_literal_name_and_operands() {
        let lit = Expr::literal(42i64);
        assert_eq!(lit.name(), "lit(42)");
        assert_eq!(lit.operator(), Operator::Ident);
        assert_eq!(lit.operands(), vec![Operand::Value(&Scalar::I64(42))]);
    }

    #[test]
    fn test_list_literal_reports_items() {
        let lit = Expr::literal(vec!["a", "b"]);
        assert_eq!(
            lit.operands(),
            vec![
                Operand::Value(&Scalar::String("a".into())),
                Operand::Value(&Scalar::String("b".into())),
            ]
        );
    }

    #[test]
    fn test_derived_and_aggregate_names_nest() {
        let base = Expr::field("created_on", FieldKind::Date);
        let year = Expr::derived(ProjectionOperator::Year, base).unwrap();
        assert_eq!(year.name(), "(year(created_on))");

        let max = Expr::aggregate(AggregateOperator::Max, year).unwrap();
        assert_eq!(max.name(), "(max((year(created_on))))");
    }

    #[test]
    fn test_derived_rejects_literal_base() {
        let err = Expr::derived(ProjectionOperator::Year, Expr::literal(1i64));
        assert!(matches!(err, Err(ExprError::NotFieldBacked { .. })));
    }

    #[test]
    fn test_boolean_name() {
        let price = Expr::field("price", FieldKind::Value);
        let cond = Expr::boolean(BooleanOperator::Gt, price, Expr::literal(10i64));
        assert_eq!(cond.name(), "(price gt lit(10))");
    }

    #[test]
    fn test_and_or_combinators() {
        let a = Expr::boolean(
            BooleanOperator::Eq,
            Expr::field("a", FieldKind::Value),
            Expr::literal(1i64),
        );
        let b = Expr::boolean(
            BooleanOperator::Eq,
            Expr::field("b", FieldKind::Value),
            Expr::literal(2i64),
        );
        let both = a.and(b);
        assert_eq!(both.operator(), Operator::Boolean(BooleanOperator::And));
        assert_eq!(both.operands().len(), 2);
    }

    #[test]
    fn test_aliasing_is_non_mutating() {
        let f = Expr::field("price", FieldKind::Value);
        let aliased = f.with_alias("p");
        assert_eq!(f.alias(), None);
        assert_eq!(aliased.alias(), Some("p"));
        assert_eq!(aliased.name(), "price");
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::from(true).to_string(), "true");
        assert_eq!(Scalar::from(1.5f64).to_string(), "1.5");
        assert_eq!(Scalar::from(vec![1i64, 2, 3]).to_string(), "[1, 2, 3]");
        let d = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
        assert_eq!(Scalar::from(d).to_string(), "2021-04-01");
    }

    #[test]
    fn test_field_kind_stops_at_wrappers() {
        let base = Expr::field("ts", FieldKind::DateTime);
        assert_eq!(base.field_kind(), Some(FieldKind::DateTime));
        // Projected components are plain values, not temporal columns.
        let derived = Expr::derived(ProjectionOperator::Date, base).unwrap();
        assert!(derived.field_kind().is_none());
        assert!(Expr::literal(1i64).field_kind().is_none());
    }
}
