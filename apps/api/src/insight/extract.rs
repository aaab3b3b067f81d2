//! Parameter extractors — pull structured query parameters out of free text.
//!
//! Every extractor is a pure function of the prompt with a hard-coded
//! default, so the pipeline always ends up with a complete `ParameterSet`.
//! Several behaviors here are inherited from the legacy resolver and are
//! pinned by tests rather than "fixed": the first integer anywhere in the
//! prompt doubles as the row limit, month roots are matched as substrings,
//! and the date-range year and evaluation year default differently.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

/// Default year for date ranges when the prompt names none. Fixed legacy
/// value; the evaluation-year extractor defaults to the current year instead.
const DEFAULT_RANGE_YEAR: i32 = 2022;

/// Default row limit when the prompt contains no integer.
const DEFAULT_LIMIT: i64 = 10;

/// How a date range was derived from the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    SingleMonth,
    MonthSpan,
    WholeYear,
}

/// Inclusive calendar range for period filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: RangeKind,
}

/// Requested sort direction for the ranked templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// ORDER BY keyword. Closed enum, never user text, so splicing it into
    /// SQL is safe.
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Aggregation period granularity. Wire values match the KPI store's
/// `closed_period_values.period_type` column. `Decade` (a ten-day accounting
/// period) exists in the store but has no prompt vocabulary; it is only
/// reachable programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGranularity {
    Day,
    Week,
    Decade,
    Month,
    Quarter,
    Year,
}

impl PeriodGranularity {
    pub fn wire_value(self) -> i64 {
        match self {
            PeriodGranularity::Day => 1,
            PeriodGranularity::Week => 2,
            PeriodGranularity::Decade => 3,
            PeriodGranularity::Month => 4,
            PeriodGranularity::Quarter => 5,
            PeriodGranularity::Year => 6,
        }
    }
}

/// Everything the extractors can pull out of one prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSet {
    /// Candidate employee names, de-duplicated and sorted. Order carries no
    /// meaning; callers wanting "the" name take the first entry.
    pub employee_names: Vec<String>,
    /// None means the prompt is evaluation-flavored and the indicator id is
    /// not applicable: those templates hard-code their own indicator ids.
    pub indicator_id: Option<i64>,
    pub date_range: DateRange,
    pub limit: i64,
    pub sort_order: SortOrder,
    pub granularity: PeriodGranularity,
    pub evaluation_year: i32,
}

/// Runs every extractor over the prompt.
pub fn extract_parameters(prompt: &str) -> ParameterSet {
    ParameterSet {
        employee_names: extract_employee_names(prompt),
        indicator_id: extract_indicator_id(prompt),
        date_range: extract_date_range(prompt),
        limit: extract_limit(prompt),
        sort_order: extract_sort_order(prompt),
        granularity: extract_granularity(prompt),
        evaluation_year: extract_evaluation_year(prompt),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Employee names
// ─────────────────────────────────────────────────────────────────────────────

fn name_run_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2}").expect("valid name-run pattern")
    })
}

fn name_pair_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z][a-z]+\s+[A-Z][a-z]+").expect("valid name-pair pattern"))
}

/// Scans for runs of one to three capitalized words. Two overlapping patterns
/// (a greedy 1-3 word run and a strict two-word pair) are unioned and
/// de-duplicated through a set, so the result is sorted, not prompt-ordered.
/// Capitalized sentence starters match too; downstream name filters simply
/// find no rows for them.
pub fn extract_employee_names(prompt: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    for pattern in [name_run_pattern(), name_pair_pattern()] {
        for found in pattern.find_iter(prompt) {
            names.insert(found.as_str().to_string());
        }
    }
    names.into_iter().collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Indicator id
// ─────────────────────────────────────────────────────────────────────────────

/// Evaluation vocabulary that suppresses indicator-id extraction. Broader
/// than the classifier's evaluation families on purpose: the evaluation
/// templates ignore the indicator id either way.
const EVALUATION_CONTEXT_KEYWORDS: &[&str] = &[
    "summary of evaluations",
    "evaluation analysis",
    "manager evaluation",
    "manager's evaluation",
    "self-evaluation",
    "evaluations",
    "comments",
];

fn indicator_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)indicator[a-z]*\s*#?\s*(\d+)").expect("valid indicator pattern"))
}

/// Looks for "indicator" (any suffix form) followed by an optional "#" and a
/// number; defaults to indicator 1. Returns None for evaluation-flavored
/// prompts, where the field does not apply.
pub fn extract_indicator_id(prompt: &str) -> Option<i64> {
    let lower = prompt.to_lowercase();
    if EVALUATION_CONTEXT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return None;
    }
    let parsed = indicator_pattern()
        .captures(prompt)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|id| *id > 0);
    Some(parsed.unwrap_or(1))
}

// ─────────────────────────────────────────────────────────────────────────────
// Date range
// ─────────────────────────────────────────────────────────────────────────────

/// Month roots matched as plain substrings of the lowercased prompt. Exactly
/// one root per month and no root is a substring of another, so the count of
/// hits equals the count of distinct months mentioned.
const MONTH_ROOTS: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Tokens that mark a two-month mention as a span rather than noise.
const RANGE_CONNECTIVES: &[&str] = &["to", "through", "until", "between", "from"];

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").expect("valid year pattern"))
}

/// Derives an inclusive date range from the prompt.
///
/// One month mentioned: that calendar month. Two months plus a range
/// connective: first-of-min through last-of-max, normalized regardless of
/// textual order. Anything else: the whole year.
pub fn extract_date_range(prompt: &str) -> DateRange {
    let lower = prompt.to_lowercase();
    let year = year_pattern()
        .find(&lower)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(DEFAULT_RANGE_YEAR);

    let mut months: Vec<u32> = Vec::new();
    for (root, number) in MONTH_ROOTS {
        if lower.contains(root) {
            months.push(*number);
        }
    }

    if let [month] = months[..] {
        return DateRange {
            start: first_day(year, month),
            end: last_day(year, month),
            kind: RangeKind::SingleMonth,
        };
    }

    if months.len() == 2 && has_range_connective(&lower) {
        let lo = months[0].min(months[1]);
        let hi = months[0].max(months[1]);
        return DateRange {
            start: first_day(year, lo),
            end: last_day(year, hi),
            kind: RangeKind::MonthSpan,
        };
    }

    DateRange {
        start: first_day(year, 1),
        end: last_day(year, 12),
        kind: RangeKind::WholeYear,
    }
}

fn has_range_connective(lower: &str) -> bool {
    lower.split_whitespace().any(|token| {
        let trimmed = token.trim_matches(|ch: char| !ch.is_ascii_alphanumeric());
        RANGE_CONNECTIVES.contains(&trimmed)
    })
}

fn first_day(year: i32, month: u32) -> NaiveDate {
    // Months come from the fixed root table, so construction cannot fail.
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid first day of month")
}

/// Last calendar day of the month, leap years included.
fn last_day(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    first_day(next_year, next_month)
        .pred_opt()
        .expect("valid last day of month")
}

// ─────────────────────────────────────────────────────────────────────────────
// Limit, sort order, granularity, evaluation year
// ─────────────────────────────────────────────────────────────────────────────

fn integer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid integer pattern"))
}

/// First integer literal anywhere in the prompt, default 10. Deliberately
/// unscoped: "for indicator 3" with no other digits yields limit 3. The value
/// only ever caps row counts.
pub fn extract_limit(prompt: &str) -> i64 {
    integer_pattern()
        .find(prompt)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIMIT)
}

/// Vocabulary flipping the ranked templates to ascending order.
const ASCENDING_KEYWORDS: &[&str] = &["worst", "bad", "poor", "low", "weakest"];

pub fn extract_sort_order(prompt: &str) -> SortOrder {
    let lower = prompt.to_lowercase();
    if ASCENDING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    }
}

/// Granularity vocabulary, scanned in declaration order; month first so that
/// mixed prompts ("monthly and daily") resolve to months.
const GRANULARITY_TABLE: &[(&[&str], PeriodGranularity)] = &[
    (&["monthly", "by month", "month"], PeriodGranularity::Month),
    (&["daily", "by day", "day"], PeriodGranularity::Day),
    (&["weekly", "by week", "week"], PeriodGranularity::Week),
    (&["quarterly", "by quarter", "quarter"], PeriodGranularity::Quarter),
    (&["yearly", "by year", "year", "annual"], PeriodGranularity::Year),
];

pub fn extract_granularity(prompt: &str) -> PeriodGranularity {
    let lower = prompt.to_lowercase();
    for (keywords, granularity) in GRANULARITY_TABLE {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return *granularity;
        }
    }
    PeriodGranularity::Month
}

fn evaluation_year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(20\d{2})\b").expect("valid evaluation-year pattern"))
}

/// Year for the evaluation templates. Stricter pattern than the date-range
/// extractor (whole 20xx word) and a different default (current UTC year,
/// not 2022). The mismatch is inherited and kept; the tests pin both sides.
pub fn extract_evaluation_year(prompt: &str) -> i32 {
    evaluation_year_pattern()
        .captures(prompt)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or_else(|| Utc::now().year())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
