//! Data-store collaborator seam.
//!
//! The resolver only ever sees `QueryExecutor`; the production implementation
//! runs template SQL over the MySQL pool with every value bound, then
//! flattens each row into positional scalars for the typed decoders in
//! `rows`. Tests swap in scripted executors.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use thiserror::Error;
use tracing::debug;

use crate::insight::queries::{BindValue, QuerySpec};
use crate::insight::rows::{ResultRow, SqlValue};

/// Failure taxonomy of the data-store collaborator. The resolver treats both
/// variants as opaque report-able failures.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("data store unreachable: {0}")]
    Connection(String),
    #[error("data store rejected the query: {0}")]
    Query(String),
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, spec: &QuerySpec) -> Result<Vec<ResultRow>, ExecuteError>;
}

/// Production executor over the KPI store.
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn execute(&self, spec: &QuerySpec) -> Result<Vec<ResultRow>, ExecuteError> {
        let mut query = sqlx::query(&spec.sql);
        for bind in &spec.binds {
            query = match bind {
                BindValue::Int(v) => query.bind(*v),
                BindValue::Text(v) => query.bind(v.clone()),
                BindValue::Date(v) => query.bind(*v),
            };
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;
        debug!(kind = ?spec.kind, rows = rows.len(), "query executed");
        Ok(rows.iter().map(flatten_row).collect())
    }
}

fn classify_sqlx_error(err: sqlx::Error) -> ExecuteError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => ExecuteError::Connection(err.to_string()),
        other => ExecuteError::Query(other.to_string()),
    }
}

fn flatten_row(row: &MySqlRow) -> ResultRow {
    (0..row.len()).map(|idx| flatten_column(row, idx)).collect()
}

/// Converts one cell into a positional scalar. Decode attempts run from the
/// narrowest type out: integers, doubles, decimals (aggregates come back as
/// DECIMAL), dates, datetimes, text. Anything undecodable becomes Null.
fn flatten_column(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(value) = row.try_get::<Option<i64>, _>(idx) {
        return value.map(SqlValue::Int).unwrap_or(SqlValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(idx) {
        return value.map(SqlValue::Float).unwrap_or(SqlValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<Decimal>, _>(idx) {
        return value
            .and_then(|decimal| decimal.to_f64())
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return value.map(SqlValue::Date).unwrap_or(SqlValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return value
            .map(|datetime| SqlValue::Date(datetime.date()))
            .unwrap_or(SqlValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(idx) {
        return value.map(SqlValue::Text).unwrap_or(SqlValue::Null);
    }
    SqlValue::Null
}
