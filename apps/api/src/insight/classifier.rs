//! Intent classifier — maps a free-text prompt onto the closed template set.
//!
//! Classification is total and deterministic: lowercase the prompt, then walk
//! a fixed priority cascade of substring keyword families. The evaluation
//! families are checked first, then the compound best-performer trigger, then
//! the generic keyword table in declaration order, and finally the default.
//! Families overlap on purpose; precedence is the contract and the tests pin
//! it.

use serde::{Deserialize, Serialize};

/// The closed set of query templates the resolver can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    TopPerformers,
    WorstPerformers,
    EmployeeDynamics,
    PlanAnalysis,
    PeriodComparison,
    EvaluationSummary,
    ManagerSelfEvaluation,
    BestPerformerWithDynamics,
}

impl TemplateKind {
    /// Templates that cannot run without at least one extracted employee name.
    pub fn requires_employee_name(self) -> bool {
        matches!(
            self,
            TemplateKind::EmployeeDynamics
                | TemplateKind::EvaluationSummary
                | TemplateKind::ManagerSelfEvaluation
        )
    }
}

/// Keyword family selecting the evaluation-summary template.
const EVALUATION_SUMMARY_KEYWORDS: &[&str] = &[
    "summary of evaluations",
    "evaluation summary",
    "evaluation analysis",
    "average rating",
    "comment analysis",
];

/// Keyword family selecting the manager/self-evaluation comparison template.
const MANAGER_SELF_KEYWORDS: &[&str] = &[
    "manager and self evaluation",
    "manager evaluation and self",
    "manager's evaluation and self",
    "self-evaluation and manager",
    "compare self-evaluation",
];

/// Over-delivery half of the compound best-performer trigger.
const OVER_DELIVERY_PHRASES: &[&str] = &[
    "most often exceeded the plan",
    "most often overachieved",
    "most frequently exceeded the plan",
];

/// Month-series half of the compound best-performer trigger.
const MONTHLY_PHRASES: &[&str] = &["monthly", "month by month", "month-by-month", "by month"];

/// Generic keyword table, scanned in declaration order; first hit wins.
/// The order is load-bearing: "bad results" lands on the dynamics family
/// because "results" is scanned before "bad results".
const TEMPLATE_TABLE: &[(&[&str], TemplateKind)] = &[
    (
        &["top", "best", "most effective", "leaders"],
        TemplateKind::TopPerformers,
    ),
    (
        &["dynamics", "results", "by month", "monthly", "month-by-month"],
        TemplateKind::EmployeeDynamics,
    ),
    (
        &["plan", "overachiev", "over-deliver", "underachiev", "exceeded the plan"],
        TemplateKind::PlanAnalysis,
    ),
    (
        &["worst", "bad results", "low performance"],
        TemplateKind::WorstPerformers,
    ),
    (
        &["comparison", "compare", "over the period", "between"],
        TemplateKind::PeriodComparison,
    ),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classifies a prompt into a template. Total: every prompt maps to a kind.
pub fn classify(prompt: &str) -> TemplateKind {
    let lower = prompt.to_lowercase();

    if contains_any(&lower, EVALUATION_SUMMARY_KEYWORDS) {
        return TemplateKind::EvaluationSummary;
    }
    if contains_any(&lower, MANAGER_SELF_KEYWORDS) {
        return TemplateKind::ManagerSelfEvaluation;
    }
    // The compound trigger sits between the evaluation families and the
    // generic table: its phrasing also matches the plan-analysis family below,
    // so it must fire first.
    if contains_any(&lower, OVER_DELIVERY_PHRASES) && contains_any(&lower, MONTHLY_PHRASES) {
        return TemplateKind::BestPerformerWithDynamics;
    }
    for (keywords, kind) in TEMPLATE_TABLE {
        if contains_any(&lower, keywords) {
            return *kind;
        }
    }
    TemplateKind::TopPerformers
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
