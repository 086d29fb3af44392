//! Table query descriptor
//!
//! A `Table` names a data source and carries an immutable query state:
//! selection, filter, ordering and row limit. Every query-shaping method
//! returns a new `Table`, so descriptors can be shared and branched freely.
//! Compilation and execution are delegated to a backend resolved once per
//! descriptor family and memoized.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::backend::{Backend, BackendError, ResolveBackend, Row};
use crate::expr::{ColumnType, DerivedField, Expr, ExprKind, Field};

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// Errors raised while shaping a table query.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("unknown field `{selector}` on table `{table}`")]
    UnknownField { table: String, selector: String },

    #[error("duplicate field `{name}` on table `{table}`")]
    DuplicateField { table: String, name: String },
}

/// Something that names a field: a column name, or an expression built from
/// one (projections, aggregations, aliased fields).
#[derive(Debug, Clone)]
pub enum Selector {
    Name(String),
    Expr(Expr),
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_owned())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl From<Expr> for Selector {
    fn from(expr: Expr) -> Self {
        Selector::Expr(expr)
    }
}

impl From<&Expr> for Selector {
    fn from(expr: &Expr) -> Self {
        Selector::Expr(expr.clone())
    }
}

impl<T: ColumnType> From<&Field<T>> for Selector {
    fn from(field: &Field<T>) -> Self {
        Selector::Expr(field.expr())
    }
}

impl From<DerivedField> for Selector {
    fn from(derived: DerivedField) -> Self {
        Selector::Expr(derived.into())
    }
}

impl From<&DerivedField> for Selector {
    fn from(derived: &DerivedField) -> Self {
        Selector::Expr(derived.expr())
    }
}

/// An immutable query over a named table.
#[derive(Clone)]
pub struct Table {
    name: String,
    dataset_name: String,
    dataset_version: String,
    source: Option<String>,
    fields: Arc<HashMap<String, Expr>>,
    filter: Option<Expr>,
    selection: Option<Vec<Expr>>,
    ordering: Option<Vec<(Expr, Direction)>>,
    limit: u64,
    resolver: Option<Arc<dyn ResolveBackend>>,
    // Shared across every descriptor derived from the same builder, so the
    // whole family resolves a backend at most once.
    backend: Arc<OnceCell<Arc<dyn Backend>>>,
}

impl Table {
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            dataset_name: String::new(),
            dataset_version: String::new(),
            source: None,
            fields: Vec::new(),
            resolver: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn dataset_version(&self) -> &str {
        &self.dataset_version
    }

    /// The source locator this table resolves against, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The registered field with the given column name.
    pub fn field(&self, name: &str) -> Option<&Expr> {
        self.fields.get(name)
    }

    pub fn selection(&self) -> Option<&[Expr]> {
        self.selection.as_deref()
    }

    pub fn filter_expr(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn ordering(&self) -> Option<&[(Expr, Direction)]> {
        self.ordering.as_deref()
    }

    pub fn limit_rows(&self) -> u64 {
        self.limit
    }

    /// Resolve a selector against the registered fields.
    fn resolve(&self, selector: Selector) -> Result<Expr, TableError> {
        match selector {
            Selector::Name(name) => {
                self.fields
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| TableError::UnknownField {
                        table: self.name.clone(),
                        selector: name,
                    })
            }
            Selector::Expr(expr) => Ok(expr),
        }
    }

    /// Resolve an ordering selector: registered fields first, then aliases
    /// introduced by the current selection.
    fn resolve_ordering(&self, selector: Selector) -> Result<Expr, TableError> {
        if let Selector::Name(name) = &selector {
            if !self.fields.contains_key(name.as_str()) {
                if let Some(selection) = &self.selection {
                    if let Some(aliased) =
                        selection.iter().find(|e| e.alias() == Some(name.as_str()))
                    {
                        return Ok(aliased.clone());
                    }
                }
            }
        }
        self.resolve(selector)
    }

    /// Return a copy selecting the given fields or expressions.
    pub fn select<I>(&self, selectors: I) -> Result<Table, TableError>
    where
        I: IntoIterator,
        I::Item: Into<Selector>,
    {
        let selection = selectors
            .into_iter()
            .map(|s| self.resolve(s.into()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut copy = self.clone();
        copy.selection = Some(selection);
        Ok(copy)
    }

    /// Return a copy filtered by the given boolean expression.
    pub fn filter(&self, expr: Expr) -> Table {
        let mut copy = self.clone();
        copy.filter = Some(expr);
        copy
    }

    /// Return a copy ordered by the given selectors. Names resolve against
    /// registered fields first and selection aliases second.
    pub fn order_by<I, S>(&self, ordering: I) -> Result<Table, TableError>
    where
        I: IntoIterator<Item = (S, Direction)>,
        S: Into<Selector>,
    {
        let ordering = ordering
            .into_iter()
            .map(|(s, dir)| self.resolve_ordering(s.into()).map(|e| (e, dir)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut copy = self.clone();
        copy.ordering = Some(ordering);
        Ok(copy)
    }

    /// Return a copy with the given row limit.
    pub fn limit(&self, n: u64) -> Table {
        let mut copy = self.clone();
        copy.limit = n;
        copy
    }

    async fn backend(&self) -> Result<Arc<dyn Backend>, BackendError> {
        let resolver = self
            .resolver
            .clone()
            .ok_or_else(|| BackendError::NoResolver {
                table: self.name.clone(),
            })?;
        self.backend
            .get_or_try_init(|| async {
                tracing::debug!(table = %self.name, "resolving backend");
                resolver.resolve(self).await
            })
            .await
            .cloned()
    }

    /// Compile the query without executing it and return the backend's
    /// source representation of it.
    pub async fn compile(&self) -> Result<String, BackendError> {
        self.backend().await?.compile(self).await
    }

    /// Execute the query and return the result rows.
    pub async fn execute(&self) -> Result<Vec<Row>, BackendError> {
        self.backend().await?.execute(self).await
    }
}

/// Builder for the immutable [`Table`] descriptor.
pub struct TableBuilder {
    name: String,
    dataset_name: String,
    dataset_version: String,
    source: Option<String>,
    fields: Vec<Expr>,
    resolver: Option<Arc<dyn ResolveBackend>>,
}

impl TableBuilder {
    /// Name and version of the dataset this table belongs to.
    pub fn dataset(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self.dataset_version = version.into();
        self
    }

    /// Source locator used for backend selection.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ResolveBackend>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Register a field on the table.
    pub fn field(mut self, field: impl Into<Expr>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn build(self) -> Result<Table, TableError> {
        let mut fields = HashMap::with_capacity(self.fields.len());
        for expr in self.fields {
            let column = match expr.kind() {
                ExprKind::Field { column, .. } => column.clone(),
                _ => expr.name().to_owned(),
            };
            if fields.insert(column.clone(), expr).is_some() {
                return Err(TableError::DuplicateField {
                    table: self.name,
                    name: column,
                });
            }
        }
        Ok(Table {
            name: self.name,
            dataset_name: self.dataset_name,
            dataset_version: self.dataset_version,
            source: self.source,
            fields: Arc::new(fields),
            filter: None,
            selection: None,
            ordering: None,
            limit: 1000,
            resolver: self.resolver,
            backend: Arc::new(OnceCell::new()),
        })
    }
}
