//! Query expressions
//!
//! The typed building blocks of a query: operator vocabulary, the immutable
//! expression tree, the `Field<T>` surface that constructs it, and the
//! calendar arithmetic behind relative-time filters.

mod field;
mod model;
mod operator;
pub(crate) mod time;

pub use field::{
    ArrayField, BoolField, ColumnType, DateField, DateTimeField, DerivedField, Field, FloatField,
    IntField, StringField, TimeField,
};
pub use model::{Expr, ExprError, ExprKind, FieldKind, Operand, Scalar};
pub use operator::{
    AggregateOperator, BooleanOperator, DateGranularity, DateTimeGranularity, Operator,
    ProjectionOperator, TimeGranularity, UnaryOperator,
};
