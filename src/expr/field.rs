//! Typed field surface
//!
//! `Field<T>` is the entry point for building expressions: a named column
//! with a Rust value type. Comparisons accept anything convertible to that
//! type, so `price.gt(100.0)` and `county.eq("GREATER LONDON")` both type
//! check while `county.eq(100.0)` does not. Temporal fields add component
//! projections, `before`/`after` and relative `in_past` ranges.

use std::marker::PhantomData;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::model::{Expr, FieldKind, Scalar};
use super::operator::{
    AggregateOperator, BooleanOperator, DateGranularity, DateTimeGranularity, ProjectionOperator,
    TimeGranularity, UnaryOperator,
};
use super::time::{add_date_duration, add_datetime_duration, add_time_duration};

/// Value types a column can carry.
pub trait ColumnType: Into<Scalar> {
    const KIND: FieldKind;
}

impl ColumnType for String {
    const KIND: FieldKind = FieldKind::Value;
}

impl ColumnType for i64 {
    const KIND: FieldKind = FieldKind::Value;
}

impl ColumnType for f64 {
    const KIND: FieldKind = FieldKind::Value;
}

impl ColumnType for bool {
    const KIND: FieldKind = FieldKind::Value;
}

impl ColumnType for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;
}

impl ColumnType for NaiveTime {
    const KIND: FieldKind = FieldKind::Time;
}

impl ColumnType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;
}

impl<T: ColumnType> ColumnType for Vec<T> {
    const KIND: FieldKind = FieldKind::Value;
}

/// A named column of value type `T`.
#[derive(Debug)]
pub struct Field<T> {
    column: String,
    alias: Option<String>,
    _marker: PhantomData<T>,
}

// Derived Clone would demand `T: Clone`; only the name and alias are cloned.
impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Field {
            column: self.column.clone(),
            alias: self.alias.clone(),
            _marker: PhantomData,
        }
    }
}

pub type StringField = Field<String>;
pub type IntField = Field<i64>;
pub type FloatField = Field<f64>;
pub type BoolField = Field<bool>;
pub type DateField = Field<NaiveDate>;
pub type TimeField = Field<NaiveTime>;
pub type DateTimeField = Field<NaiveDateTime>;
pub type ArrayField<T> = Field<Vec<T>>;

impl<T: ColumnType> Field<T> {
    pub fn new(column: impl Into<String>) -> Self {
        Field {
            column: column.into(),
            alias: None,
            _marker: PhantomData,
        }
    }

    /// Return a copy carrying an output alias.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.alias = Some(alias.into());
        copy
    }

    /// The field reference as an expression.
    pub fn expr(&self) -> Expr {
        let e = Expr::field(&*self.column, T::KIND);
        match &self.alias {
            Some(alias) => e.with_alias(alias),
            None => e,
        }
    }

    fn compare(&self, op: BooleanOperator, value: impl Into<T>) -> Expr {
        Expr::boolean(op, self.expr(), Expr::literal(value.into()))
    }

    pub fn eq(&self, value: impl Into<T>) -> Expr {
        self.compare(BooleanOperator::Eq, value)
    }

    pub fn neq(&self, value: impl Into<T>) -> Expr {
        self.compare(BooleanOperator::Neq, value)
    }

    pub fn gt(&self, value: impl Into<T>) -> Expr {
        self.compare(BooleanOperator::Gt, value)
    }

    pub fn gte(&self, value: impl Into<T>) -> Expr {
        self.compare(BooleanOperator::Gte, value)
    }

    pub fn lt(&self, value: impl Into<T>) -> Expr {
        self.compare(BooleanOperator::Lt, value)
    }

    pub fn lte(&self, value: impl Into<T>) -> Expr {
        self.compare(BooleanOperator::Lte, value)
    }

    /// Inclusive range check, expanded to `gte(lo) and lte(hi)`.
    pub fn between(&self, lo: impl Into<T>, hi: impl Into<T>) -> Expr {
        self.gte(lo).and(self.lte(hi))
    }

    /// Membership in a list of values.
    pub fn is_in<V: Into<T>>(&self, values: Vec<V>) -> Expr {
        let items: Vec<Scalar> = values.into_iter().map(|v| v.into().into()).collect();
        Expr::boolean(BooleanOperator::In, self.expr(), Expr::literal(items))
    }

    pub fn is_null(&self) -> Expr {
        Expr::unary(UnaryOperator::IsNull, self.expr())
    }

    pub fn is_not_null(&self) -> Expr {
        Expr::unary(UnaryOperator::IsNotNull, self.expr())
    }

    pub fn min(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Min, self.expr())
    }

    pub fn max(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Max, self.expr())
    }

    pub fn count(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Count, self.expr())
    }

    pub fn count_distinct(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::CountDistinct, self.expr())
    }
}

macro_rules! numeric_aggregates {
    ($($ty:ty),+) => {$(
        impl Field<$ty> {
            pub fn sum(&self) -> Expr {
                Expr::aggregate_unchecked(AggregateOperator::Sum, self.expr())
            }

            pub fn avg(&self) -> Expr {
                Expr::aggregate_unchecked(AggregateOperator::Avg, self.expr())
            }

            pub fn avg_distinct(&self) -> Expr {
                Expr::aggregate_unchecked(AggregateOperator::AvgDistinct, self.expr())
            }
        }
    )+};
}

numeric_aggregates!(i64, f64);

impl Field<String> {
    /// SQL `LIKE` pattern match.
    pub fn like(&self, pattern: impl Into<String>) -> Expr {
        self.compare(BooleanOperator::Like, pattern)
    }
}

impl<T: ColumnType> Field<Vec<T>> {
    /// True when the array column shares at least one element with `values`.
    pub fn has_any<V: Into<T>>(&self, values: Vec<V>) -> Expr {
        let items: Vec<Scalar> = values.into_iter().map(|v| v.into().into()).collect();
        Expr::boolean(BooleanOperator::HasAny, self.expr(), Expr::literal(items))
    }

    /// True when the array column contains every element of `values`.
    pub fn has_all<V: Into<T>>(&self, values: Vec<V>) -> Expr {
        let items: Vec<Scalar> = values.into_iter().map(|v| v.into().into()).collect();
        Expr::boolean(BooleanOperator::HasAll, self.expr(), Expr::literal(items))
    }
}

/// A component projected out of a temporal field, such as `year(d)`.
///
/// Projections compare and aggregate like any other column-backed
/// expression: `start_date.year().eq(2023)` filters on the projected year.
#[derive(Debug, Clone)]
pub struct DerivedField {
    expr: Expr,
}

impl DerivedField {
    fn new(op: ProjectionOperator, base: Expr) -> Self {
        DerivedField {
            expr: Expr::derived_unchecked(op, base),
        }
    }

    /// Return a copy carrying an output alias.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        DerivedField {
            expr: self.expr.with_alias(alias),
        }
    }

    /// The projection as an expression.
    pub fn expr(&self) -> Expr {
        self.expr.clone()
    }

    pub fn name(&self) -> &str {
        self.expr.name()
    }

    fn compare(&self, op: BooleanOperator, value: impl Into<Scalar>) -> Expr {
        Expr::boolean(op, self.expr.clone(), Expr::literal(value))
    }

    pub fn eq(&self, value: impl Into<Scalar>) -> Expr {
        self.compare(BooleanOperator::Eq, value)
    }

    pub fn neq(&self, value: impl Into<Scalar>) -> Expr {
        self.compare(BooleanOperator::Neq, value)
    }

    pub fn gt(&self, value: impl Into<Scalar>) -> Expr {
        self.compare(BooleanOperator::Gt, value)
    }

    pub fn gte(&self, value: impl Into<Scalar>) -> Expr {
        self.compare(BooleanOperator::Gte, value)
    }

    pub fn lt(&self, value: impl Into<Scalar>) -> Expr {
        self.compare(BooleanOperator::Lt, value)
    }

    pub fn lte(&self, value: impl Into<Scalar>) -> Expr {
        self.compare(BooleanOperator::Lte, value)
    }

    /// Inclusive range check, expanded to `gte(lo) and lte(hi)`.
    pub fn between(&self, lo: impl Into<Scalar>, hi: impl Into<Scalar>) -> Expr {
        self.gte(lo).and(self.lte(hi))
    }

    pub fn min(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Min, self.expr.clone())
    }

    pub fn max(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Max, self.expr.clone())
    }

    pub fn avg(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Avg, self.expr.clone())
    }

    pub fn count(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::Count, self.expr.clone())
    }

    pub fn count_distinct(&self) -> Expr {
        Expr::aggregate_unchecked(AggregateOperator::CountDistinct, self.expr.clone())
    }
}

impl From<DerivedField> for Expr {
    fn from(f: DerivedField) -> Expr {
        f.expr
    }
}

impl From<&DerivedField> for Expr {
    fn from(f: &DerivedField) -> Expr {
        f.expr()
    }
}

macro_rules! projection {
    ($name:ident, $op:expr) => {
        pub fn $name(&self) -> DerivedField {
            DerivedField::new($op, self.expr())
        }
    };
}

/// Expand a relative range into `gte(lower) and lte(upper)`, swapping the
/// bounds when `older_than` does not precede `newer_than`.
fn in_past_bounds(older_than: i64, newer_than: i64) -> (i64, i64) {
    if older_than > newer_than {
        tracing::warn!(
            older_than,
            newer_than,
            "inPast bounds are reversed, swapping them"
        );
        (newer_than, older_than)
    } else {
        (older_than, newer_than)
    }
}

impl Field<NaiveDate> {
    projection!(year, ProjectionOperator::Year);
    projection!(month, ProjectionOperator::Month);
    projection!(day, ProjectionOperator::Day);
    projection!(day_of_week, ProjectionOperator::DayOfWeek);
    projection!(week, ProjectionOperator::Week);

    pub fn before(&self, d: NaiveDate) -> Expr {
        self.compare(BooleanOperator::Lt, d)
    }

    pub fn after(&self, d: NaiveDate) -> Expr {
        self.compare(BooleanOperator::Gt, d)
    }

    /// Values between `older_than` and `newer_than` units before today.
    pub fn in_past(&self, older_than: i64, newer_than: i64, granularity: DateGranularity) -> Expr {
        let (older, newer) = in_past_bounds(older_than, newer_than);
        let today = Utc::now().date_naive();
        let lower = add_date_duration(today, -newer, granularity);
        let upper = add_date_duration(today, -older, granularity);
        self.gte(lower).and(self.lte(upper))
    }
}

impl Field<NaiveTime> {
    projection!(hour, ProjectionOperator::Hour);
    projection!(minute, ProjectionOperator::Minute);
    projection!(second, ProjectionOperator::Second);
    projection!(millisecond, ProjectionOperator::Millisecond);

    pub fn before(&self, t: NaiveTime) -> Expr {
        self.compare(BooleanOperator::Lt, t)
    }

    pub fn after(&self, t: NaiveTime) -> Expr {
        self.compare(BooleanOperator::Gt, t)
    }

    /// Values between `older_than` and `newer_than` units before the current
    /// time of day. Bounds clamp at midnight instead of wrapping.
    pub fn in_past(&self, older_than: i64, newer_than: i64, granularity: TimeGranularity) -> Expr {
        let (older, newer) = in_past_bounds(older_than, newer_than);
        let now = Utc::now().time();
        let lower = add_time_duration(now, -newer, granularity);
        let upper = add_time_duration(now, -older, granularity);
        self.gte(lower).and(self.lte(upper))
    }
}

impl Field<NaiveDateTime> {
    projection!(year, ProjectionOperator::Year);
    projection!(month, ProjectionOperator::Month);
    projection!(day, ProjectionOperator::Day);
    projection!(day_of_week, ProjectionOperator::DayOfWeek);
    projection!(week, ProjectionOperator::Week);
    projection!(week_date, ProjectionOperator::WeekDate);
    projection!(date, ProjectionOperator::Date);
    projection!(time, ProjectionOperator::Time);
    projection!(hour, ProjectionOperator::Hour);
    projection!(minute, ProjectionOperator::Minute);
    projection!(second, ProjectionOperator::Second);
    projection!(millisecond, ProjectionOperator::Millisecond);

    pub fn before(&self, dt: NaiveDateTime) -> Expr {
        self.compare(BooleanOperator::Lt, dt)
    }

    pub fn after(&self, dt: NaiveDateTime) -> Expr {
        self.compare(BooleanOperator::Gt, dt)
    }

    /// Values between `older_than` and `newer_than` units before now (UTC).
    pub fn in_past(
        &self,
        older_than: i64,
        newer_than: i64,
        granularity: DateTimeGranularity,
    ) -> Expr {
        let (older, newer) = in_past_bounds(older_than, newer_than);
        let now = Utc::now().naive_utc();
        let lower = add_datetime_duration(now, -newer, granularity);
        let upper = add_datetime_duration(now, -older, granularity);
        self.gte(lower).and(self.lte(upper))
    }
}

impl<T: ColumnType> From<&Field<T>> for Expr {
    fn from(f: &Field<T>) -> Expr {
        f.expr()
    }
}
