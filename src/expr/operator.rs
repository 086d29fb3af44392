//! Operator vocabulary
//!
//! Closed enums for every operator tag an expression can carry, plus the
//! calendar granularity units used by relative-time filters. The `Display`
//! impls render the camel-cased tags that compilers and debug names use.

use std::fmt;

/// Tag returned by [`Expr::operator`](crate::expr::Expr::operator).
///
/// Field references and literals report `Ident`; every other expression kind
/// reports the operation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// A plain field reference or literal value.
    Ident,
    /// A date/time component projection.
    Projection(ProjectionOperator),
    /// An aggregation.
    Aggregate(AggregateOperator),
    /// A binary boolean comparison or combinator.
    Boolean(BooleanOperator),
    /// A unary boolean check.
    Unary(UnaryOperator),
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Ident => write!(f, "ident"),
            Operator::Projection(op) => write!(f, "{op}"),
            Operator::Aggregate(op) => write!(f, "{op}"),
            Operator::Boolean(op) => write!(f, "{op}"),
            Operator::Unary(op) => write!(f, "{op}"),
        }
    }
}

/// Aggregations that can be applied to a column-backed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOperator {
    Min,
    Max,
    Sum,
    Count,
    CountDistinct,
    Avg,
    AvgDistinct,
}

impl fmt::Display for AggregateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            AggregateOperator::Min => "min",
            AggregateOperator::Max => "max",
            AggregateOperator::Sum => "sum",
            AggregateOperator::Count => "count",
            AggregateOperator::CountDistinct => "countDistinct",
            AggregateOperator::Avg => "avg",
            AggregateOperator::AvgDistinct => "avgDistinct",
        };
        write!(f, "{tag}")
    }
}

/// Date/time component projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionOperator {
    Year,
    Month,
    Day,
    DayOfWeek,
    Week,
    WeekDate,
    Date,
    Time,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl fmt::Display for ProjectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ProjectionOperator::Year => "year",
            ProjectionOperator::Month => "month",
            ProjectionOperator::Day => "day",
            ProjectionOperator::DayOfWeek => "dayOfWeek",
            ProjectionOperator::Week => "week",
            ProjectionOperator::WeekDate => "weekDate",
            ProjectionOperator::Date => "date",
            ProjectionOperator::Time => "time",
            ProjectionOperator::Hour => "hour",
            ProjectionOperator::Minute => "minute",
            ProjectionOperator::Second => "second",
            ProjectionOperator::Millisecond => "millisecond",
        };
        write!(f, "{tag}")
    }
}

/// Binary boolean comparisons and combinators.
///
/// `Not` and `InPast` are legacy vocabulary: no field combinator produces
/// them (relative-time filters are expanded into a `between`-style range at
/// construction), but the tags remain so that compilers can reject trees
/// carrying them with a precise error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    Between,
    And,
    Or,
    HasAny,
    HasAll,
    Not,
    InPast,
}

impl BooleanOperator {
    /// True for `and`/`or`, which combine two boolean expressions rather
    /// than comparing a field to a literal.
    pub fn is_combinator(&self) -> bool {
        matches!(self, BooleanOperator::And | BooleanOperator::Or)
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BooleanOperator::Eq => "eq",
            BooleanOperator::Neq => "neq",
            BooleanOperator::Gt => "gt",
            BooleanOperator::Gte => "gte",
            BooleanOperator::Lt => "lt",
            BooleanOperator::Lte => "lte",
            BooleanOperator::Like => "like",
            BooleanOperator::In => "in",
            BooleanOperator::Between => "between",
            BooleanOperator::And => "and",
            BooleanOperator::Or => "or",
            BooleanOperator::HasAny => "hasAny",
            BooleanOperator::HasAll => "hasAll",
            BooleanOperator::Not => "not",
            BooleanOperator::InPast => "inPast",
        };
        write!(f, "{tag}")
    }
}

/// Unary boolean checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    IsNull,
    IsNotNull,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            UnaryOperator::IsNull => "isNull",
            UnaryOperator::IsNotNull => "isNotNull",
        };
        write!(f, "{tag}")
    }
}

/// Calendar units for relative ranges over date fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGranularity {
    Years,
    Months,
    Weeks,
    Days,
}

impl fmt::Display for DateGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DateGranularity::Years => "years",
            DateGranularity::Months => "months",
            DateGranularity::Weeks => "weeks",
            DateGranularity::Days => "days",
        };
        write!(f, "{tag}")
    }
}

/// Clock units for relative ranges over time fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGranularity {
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TimeGranularity::Hours => "hours",
            TimeGranularity::Minutes => "minutes",
            TimeGranularity::Seconds => "seconds",
            TimeGranularity::Milliseconds => "milliseconds",
        };
        write!(f, "{tag}")
    }
}

/// Calendar and clock units for relative ranges over datetime fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeGranularity {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl fmt::Display for DateTimeGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DateTimeGranularity::Years => "years",
            DateTimeGranularity::Months => "months",
            DateTimeGranularity::Weeks => "weeks",
            DateTimeGranularity::Days => "days",
            DateTimeGranularity::Hours => "hours",
            DateTimeGranularity::Minutes => "minutes",
            DateTimeGranularity::Seconds => "seconds",
            DateTimeGranularity::Milliseconds => "milliseconds",
        };
        write!(f, "{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tags() {
        assert_eq!(Operator::Ident.to_string(), "ident");
        assert_eq!(AggregateOperator::CountDistinct.to_string(), "countDistinct");
        assert_eq!(ProjectionOperator::DayOfWeek.to_string(), "dayOfWeek");
        assert_eq!(BooleanOperator::HasAny.to_string(), "hasAny");
        assert_eq!(UnaryOperator::IsNotNull.to_string(), "isNotNull");
    }

    #[test]
    fn test_combinators() {
        assert!(BooleanOperator::And.is_combinator());
        assert!(BooleanOperator::Or.is_combinator());
        assert!(!BooleanOperator::Eq.is_combinator());
        assert!(!BooleanOperator::InPast.is_combinator());
    }

    #[test]
    fn test_granularity_tags() {
        assert_eq!(DateGranularity::Weeks.to_string(), "weeks");
        assert_eq!(TimeGranularity::Milliseconds.to_string(), "milliseconds");
        assert_eq!(DateTimeGranularity::Years.to_string(), "years");
    }
}
