//! Typed result rows — positional decoding of the heterogeneous scalars the
//! KPI store returns.
//!
//! Each template's projection order is a contract between its query builder
//! and its row type; the decoder is the single place that knows the column
//! positions. Integer cells widen to floats where a float is expected, and
//! nullable columns decode into Options. Everything else is a `RowError`,
//! which the resolver renders instead of propagating.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// One scalar cell from the data store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl SqlValue {
    fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Date(_) => "date",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v}"),
            SqlValue::Date(v) => write!(f, "{v}"),
        }
    }
}

/// One positional row.
pub type ResultRow = Vec<SqlValue>;

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("row has {got} columns, expected at least {want}")]
    Arity { want: usize, got: usize },
    #[error("column {index} ({name}): expected {want}, got {got}")]
    Type {
        index: usize,
        name: &'static str,
        want: &'static str,
        got: &'static str,
    },
    #[error("column {index} ({name}): value out of range")]
    Range { index: usize, name: &'static str },
}

/// Decodes every row with the given per-row decoder, failing on the first
/// malformed row.
pub fn decode_all<T>(
    rows: &[ResultRow],
    decode: impl Fn(&ResultRow) -> Result<T, RowError>,
) -> Result<Vec<T>, RowError> {
    rows.iter().map(decode).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Positional cell accessors
// ─────────────────────────────────────────────────────────────────────────────

fn cell<'a>(row: &'a [SqlValue], index: usize) -> Result<&'a SqlValue, RowError> {
    row.get(index).ok_or(RowError::Arity {
        want: index + 1,
        got: row.len(),
    })
}

fn text(row: &[SqlValue], index: usize, name: &'static str) -> Result<String, RowError> {
    match cell(row, index)? {
        SqlValue::Text(v) => Ok(v.clone()),
        other => Err(RowError::Type {
            index,
            name,
            want: "text",
            got: other.kind(),
        }),
    }
}

fn opt_text(row: &[SqlValue], index: usize, name: &'static str) -> Result<Option<String>, RowError> {
    match cell(row, index)? {
        SqlValue::Null => Ok(None),
        SqlValue::Text(v) => Ok(Some(v.clone())),
        other => Err(RowError::Type {
            index,
            name,
            want: "text or null",
            got: other.kind(),
        }),
    }
}

fn int(row: &[SqlValue], index: usize, name: &'static str) -> Result<i64, RowError> {
    match cell(row, index)? {
        SqlValue::Int(v) => Ok(*v),
        other => Err(RowError::Type {
            index,
            name,
            want: "int",
            got: other.kind(),
        }),
    }
}

fn float(row: &[SqlValue], index: usize, name: &'static str) -> Result<f64, RowError> {
    match cell(row, index)? {
        SqlValue::Float(v) => Ok(*v),
        SqlValue::Int(v) => Ok(*v as f64),
        other => Err(RowError::Type {
            index,
            name,
            want: "number",
            got: other.kind(),
        }),
    }
}

fn opt_float(row: &[SqlValue], index: usize, name: &'static str) -> Result<Option<f64>, RowError> {
    match cell(row, index)? {
        SqlValue::Null => Ok(None),
        SqlValue::Float(v) => Ok(Some(*v)),
        SqlValue::Int(v) => Ok(Some(*v as f64)),
        other => Err(RowError::Type {
            index,
            name,
            want: "number or null",
            got: other.kind(),
        }),
    }
}

fn date(row: &[SqlValue], index: usize, name: &'static str) -> Result<NaiveDate, RowError> {
    match cell(row, index)? {
        SqlValue::Date(v) => Ok(*v),
        other => Err(RowError::Type {
            index,
            name,
            want: "date",
            got: other.kind(),
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-template rows
// ─────────────────────────────────────────────────────────────────────────────

/// Row shape shared by the top and worst performer templates.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformerRow {
    pub last_name: String,
    pub first_name: String,
    pub fact: Option<f64>,
    pub plan: Option<f64>,
    pub result_pct: Option<f64>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl PerformerRow {
    pub fn decode(row: &ResultRow) -> Result<Self, RowError> {
        Ok(Self {
            last_name: text(row, 0, "last_name")?,
            first_name: text(row, 1, "first_name")?,
            fact: opt_float(row, 2, "fact")?,
            plan: opt_float(row, 3, "plan")?,
            result_pct: opt_float(row, 4, "result")?,
            period_start: date(row, 5, "period_start")?,
            period_end: date(row, 6, "period_end")?,
        })
    }
}

/// One period of one employee's dynamics.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsRow {
    pub last_name: String,
    pub first_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub fact: Option<f64>,
    pub plan: Option<f64>,
    pub result_pct: Option<f64>,
    pub month: u32,
    pub year: i32,
}

impl DynamicsRow {
    pub fn decode(row: &ResultRow) -> Result<Self, RowError> {
        let month = int(row, 7, "month")?;
        let month = u32::try_from(month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or(RowError::Range { index: 7, name: "month" })?;
        let year = int(row, 8, "year")?;
        let year = i32::try_from(year).map_err(|_| RowError::Range { index: 8, name: "year" })?;
        Ok(Self {
            last_name: text(row, 0, "last_name")?,
            first_name: text(row, 1, "first_name")?,
            period_start: date(row, 2, "period_start")?,
            period_end: date(row, 3, "period_end")?,
            fact: opt_float(row, 4, "fact")?,
            plan: opt_float(row, 5, "plan")?,
            result_pct: opt_float(row, 6, "result")?,
            month,
            year,
        })
    }
}

/// Aggregated plan-completion figures for one employee.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanAnalysisRow {
    pub last_name: String,
    pub first_name: String,
    pub total_periods: i64,
    pub overachieved_periods: i64,
    pub underachieved_periods: i64,
    pub avg_result: f64,
    pub avg_fact: f64,
    pub avg_plan: f64,
    pub overachievement_rate: f64,
}

impl PlanAnalysisRow {
    pub fn decode(row: &ResultRow) -> Result<Self, RowError> {
        Ok(Self {
            last_name: text(row, 0, "last_name")?,
            first_name: text(row, 1, "first_name")?,
            total_periods: int(row, 2, "total_periods")?,
            overachieved_periods: int(row, 3, "overachieved_periods")?,
            underachieved_periods: int(row, 4, "underachieved_periods")?,
            avg_result: float(row, 5, "avg_result")?,
            avg_fact: float(row, 6, "avg_fact")?,
            avg_plan: float(row, 7, "avg_plan")?,
            overachievement_rate: float(row, 8, "overachievement_rate")?,
        })
    }
}

/// Per-evaluator aggregate for the evaluation-summary template.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSummaryRow {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub avg_rating: f64,
    pub rating_count: i64,
    /// All of this evaluator's comments joined with " | ".
    pub comments: Option<String>,
}

impl EvaluationSummaryRow {
    pub fn decode(row: &ResultRow) -> Result<Self, RowError> {
        Ok(Self {
            last_name: text(row, 0, "last_name")?,
            first_name: text(row, 1, "first_name")?,
            middle_name: opt_text(row, 2, "middle_name")?,
            avg_rating: float(row, 3, "avg_rating")?,
            rating_count: int(row, 4, "rating_count")?,
            comments: opt_text(row, 5, "comments")?,
        })
    }
}

/// One evaluation category (self, manager, peer) of the three-way breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationBreakdownRow {
    pub evaluation_type: String,
    pub avg_rating: f64,
    pub rating_count: i64,
    pub detailed_comments: Option<String>,
    pub min_rating: f64,
    pub max_rating: f64,
    pub all_ratings: Option<String>,
}

impl EvaluationBreakdownRow {
    pub fn decode(row: &ResultRow) -> Result<Self, RowError> {
        Ok(Self {
            evaluation_type: text(row, 0, "evaluation_type")?,
            avg_rating: float(row, 1, "avg_rating")?,
            rating_count: int(row, 2, "rating_count")?,
            detailed_comments: opt_text(row, 3, "detailed_comments")?,
            min_rating: float(row, 4, "min_rating")?,
            max_rating: float(row, 5, "max_rating")?,
            all_ratings: opt_text(row, 6, "all_ratings")?,
        })
    }
}

/// Stage-one winner of the compound best-performer flow.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPerformerRow {
    pub last_name: String,
    pub first_name: String,
    pub overachieved_periods: i64,
    pub overachievement_rate: f64,
}

impl BestPerformerRow {
    pub fn decode(row: &ResultRow) -> Result<Self, RowError> {
        Ok(Self {
            last_name: text(row, 0, "last_name")?,
            first_name: text(row, 1, "first_name")?,
            overachieved_periods: int(row, 2, "overachieved_periods")?,
            overachievement_rate: float(row, 3, "overachievement_rate")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
