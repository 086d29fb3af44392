//! # Quarry
//!
//! Typed query-expression builder for tabular data sources. Queries are
//! assembled from immutable expression trees over typed fields, carried by a
//! [`Table`] descriptor, and compiled for whichever backend the table's
//! source resolves to: the gRPC query agent or a GraphQL endpoint.
//!
//! ## Modules
//!
//! - [`expr`]: typed fields and the immutable expression tree
//! - [`table`]: the immutable table query descriptor
//! - [`backend`]: backend resolution and both compilers
//! - [`config`]: environment-driven connection settings
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use quarry::{AgentPool, BackendResolver, Config, DateField, Direction, StringField, Table};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Arc::new(AgentPool::new());
//! let resolver = Arc::new(BackendResolver::new(Config::from_env(), pool.clone()));
//!
//! let county = StringField::new("county");
//! let date_of_transfer = DateField::new("date_of_transfer");
//! let table = Table::builder("uk_real_estate_records")
//!     .dataset("uk-real-estate", "0.1.0")
//!     .source("https://data.example.com/api/graphql")
//!     .resolver(resolver)
//!     .field(&county)
//!     .field(&date_of_transfer)
//!     .build()?;
//!
//! let document = table
//!     .select(["county", "date_of_transfer"])?
//!     .filter(
//!         county.eq("GREATER LONDON").and(
//!             date_of_transfer.after(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
//!         ),
//!     )
//!     .order_by([("date_of_transfer", Direction::Desc)])?
//!     .limit(10)
//!     .compile()
//!     .await?;
//! println!("{document}");
//!
//! pool.close_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod expr;
pub mod table;

pub use backend::agent::pool::{AgentConnections, AgentPool};
pub use backend::{Backend, BackendError, BackendResolver, CompileError, ResolveBackend, Row};
pub use config::{Config, ConfigError};
pub use expr::{
    AggregateOperator, ArrayField, BoolField, BooleanOperator, ColumnType, DateField,
    DateGranularity, DateTimeField, DateTimeGranularity, DerivedField, Expr, ExprError, ExprKind,
    Field, FieldKind, FloatField, IntField, Operand, Operator, ProjectionOperator, Scalar,
    StringField, TimeField, TimeGranularity, UnaryOperator,
};
pub use table::{Direction, Selector, Table, TableBuilder, TableError};
