//! Query builders — one per template, each producing MySQL text with `?`
//! placeholders and an ordered bind list.
//!
//! Every dynamic value travels as a bind. The only text spliced into SQL is
//! the closed-enum sort keyword (ASC/DESC) and the name-filter skeleton,
//! whose name values are themselves bound. Bind order always matches
//! placeholder order; a shared test asserts the counts line up for every
//! builder.

use chrono::NaiveDate;

use crate::insight::classifier::TemplateKind;
use crate::insight::extract::{ParameterSet, SortOrder};

/// Behaviour category marking evaluation-type indicators in the KPI store.
const EVALUATION_BEHAVIOUR_ID: i64 = 5;
/// Indicator holding self-evaluation records.
const SELF_EVALUATION_INDICATOR_ID: i64 = 6;
/// Indicators holding manager evaluation records.
const MANAGER_EVALUATION_INDICATOR_IDS: [i64; 2] = [7, 8];

/// One bound query value, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

/// An executable query: the template it serves, the SQL text, and the values
/// for its placeholders in order.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub kind: TemplateKind,
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Join spine shared by all performance templates: employees to their org
/// units, org units to their indicators, indicators to closed period values.
const PERFORMANCE_JOINS: &str = "\
FROM user u
JOIN user_to_mo utm ON u.user_id = utm.user_id
JOIN indicator_to_mo itm ON utm.mo_id = itm.mo_id
JOIN closed_period_values cpv ON itm.indicator_to_mo_id = cpv.indicator_to_mo_id";

fn performance_binds(params: &ParameterSet) -> Vec<BindValue> {
    vec![
        BindValue::Int(params.indicator_id.unwrap_or(1)),
        BindValue::Date(params.date_range.start),
        BindValue::Date(params.date_range.end),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Ranked performers
// ─────────────────────────────────────────────────────────────────────────────

fn ranked_performers(params: &ParameterSet, kind: TemplateKind, order: SortOrder) -> QuerySpec {
    let sql = format!(
        "SELECT u.last_name, u.first_name, cpv.fact, cpv.plan, cpv.result, \
cpv.period_start, cpv.period_end
{PERFORMANCE_JOINS}
WHERE itm.indicator_id = ?
  AND cpv.period_start >= ?
  AND cpv.period_end <= ?
  AND cpv.fact IS NOT NULL
ORDER BY cpv.fact {}
LIMIT ?",
        order.sql()
    );
    let mut binds = performance_binds(params);
    binds.push(BindValue::Int(params.limit));
    QuerySpec { kind, sql, binds }
}

/// Ranked employees by fact value, honoring the extracted sort order.
pub fn top_performers(params: &ParameterSet) -> QuerySpec {
    ranked_performers(params, TemplateKind::TopPerformers, params.sort_order)
}

/// Same query as `top_performers` with the sort order forced ascending.
pub fn worst_performers(params: &ParameterSet) -> QuerySpec {
    ranked_performers(params, TemplateKind::WorstPerformers, SortOrder::Ascending)
}

// ─────────────────────────────────────────────────────────────────────────────
// Dynamics
// ─────────────────────────────────────────────────────────────────────────────

fn dynamics_sql(name_clause: &str, order_clause: &str) -> String {
    format!(
        "SELECT u.last_name, u.first_name, cpv.period_start, cpv.period_end, \
cpv.fact, cpv.plan, cpv.result,
       MONTH(cpv.period_start) AS month, YEAR(cpv.period_start) AS year
{PERFORMANCE_JOINS}
WHERE itm.indicator_id = ?
  AND cpv.period_start >= ?
  AND cpv.period_end <= ?
  AND cpv.period_type = ?
  AND cpv.fact IS NOT NULL
{name_clause}ORDER BY {order_clause}"
    )
}

/// Per-name filter clause plus its binds. A two-token name must match
/// last+first exactly (extra tokens beyond the second are dropped); a single
/// token matches either column as a substring. Multiple names OR-combine.
fn name_filter(names: &[String]) -> (String, Vec<BindValue>) {
    if names.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut clauses = Vec::new();
    let mut binds = Vec::new();
    for name in names {
        if let Some((last, rest)) = name.split_once(' ') {
            let first = rest.split_whitespace().next().unwrap_or(rest);
            clauses.push("(u.last_name = ? AND u.first_name = ?)");
            binds.push(BindValue::Text(last.to_string()));
            binds.push(BindValue::Text(first.to_string()));
        } else {
            clauses.push("(u.last_name LIKE ? OR u.first_name LIKE ?)");
            let pattern = format!("%{name}%");
            binds.push(BindValue::Text(pattern.clone()));
            binds.push(BindValue::Text(pattern));
        }
    }
    (format!("  AND ({})\n", clauses.join(" OR ")), binds)
}

fn dynamics_query(params: &ParameterSet, kind: TemplateKind) -> QuerySpec {
    let (name_clause, name_binds) = name_filter(&params.employee_names);
    let sql = dynamics_sql(&name_clause, "u.last_name, u.first_name, cpv.period_start");
    let mut binds = performance_binds(params);
    binds.push(BindValue::Int(params.granularity.wire_value()));
    binds.extend(name_binds);
    QuerySpec { kind, sql, binds }
}

/// Per-period facts for the named employees at the extracted granularity.
pub fn employee_dynamics(params: &ParameterSet) -> QuerySpec {
    dynamics_query(params, TemplateKind::EmployeeDynamics)
}

/// Period comparison reuses the dynamics projection; only the report differs.
pub fn period_comparison(params: &ParameterSet) -> QuerySpec {
    dynamics_query(params, TemplateKind::PeriodComparison)
}

/// Dynamics for one exact employee, used as stage two of the compound
/// best-performer flow. The name comes from a stage-one row, never from the
/// prompt, so it binds as an exact last/first equality pair.
pub fn exact_employee_dynamics(last_name: &str, first_name: &str, params: &ParameterSet) -> QuerySpec {
    let sql = dynamics_sql(
        "  AND u.last_name = ?\n  AND u.first_name = ?\n",
        "cpv.period_start",
    );
    let mut binds = performance_binds(params);
    binds.push(BindValue::Int(params.granularity.wire_value()));
    binds.push(BindValue::Text(last_name.to_string()));
    binds.push(BindValue::Text(first_name.to_string()));
    QuerySpec {
        kind: TemplateKind::BestPerformerWithDynamics,
        sql,
        binds,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan analysis
// ─────────────────────────────────────────────────────────────────────────────

/// Per-employee plan completion aggregates: period counts above and below
/// plan, averages, and the over-delivery rate the ranking sorts by.
pub fn plan_analysis(params: &ParameterSet) -> QuerySpec {
    let sql = format!(
        "SELECT u.last_name, u.first_name,
       COUNT(*) AS total_periods,
       COUNT(CASE WHEN cpv.result > 100 THEN 1 END) AS overachieved_periods,
       COUNT(CASE WHEN cpv.result < 100 THEN 1 END) AS underachieved_periods,
       AVG(cpv.result) AS avg_result,
       AVG(cpv.fact) AS avg_fact,
       AVG(cpv.plan) AS avg_plan,
       ROUND(COUNT(CASE WHEN cpv.result > 100 THEN 1 END) * 100.0 / COUNT(*), 2) AS overachievement_rate
{PERFORMANCE_JOINS}
WHERE itm.indicator_id = ?
  AND cpv.period_start >= ?
  AND cpv.period_end <= ?
  AND cpv.fact IS NOT NULL
  AND cpv.plan IS NOT NULL
  AND cpv.result IS NOT NULL
GROUP BY u.user_id, u.last_name, u.first_name
HAVING COUNT(*) > 0
ORDER BY overachievement_rate DESC, avg_result DESC
LIMIT ?"
    );
    let mut binds = performance_binds(params);
    binds.push(BindValue::Int(params.limit));
    QuerySpec {
        kind: TemplateKind::PlanAnalysis,
        sql,
        binds,
    }
}

/// Stage one of the compound flow: the single employee with the best
/// over-delivery record. Always requests exactly one row regardless of the
/// extracted limit.
pub fn best_performer(params: &ParameterSet) -> QuerySpec {
    let sql = format!(
        "SELECT u.last_name, u.first_name,
       COUNT(CASE WHEN cpv.result > 100 THEN 1 END) AS overachieved_periods,
       ROUND(COUNT(CASE WHEN cpv.result > 100 THEN 1 END) * 100.0 / COUNT(*), 2) AS overachievement_rate
{PERFORMANCE_JOINS}
WHERE itm.indicator_id = ?
  AND cpv.period_start >= ?
  AND cpv.period_end <= ?
  AND cpv.fact IS NOT NULL
  AND cpv.plan IS NOT NULL
  AND cpv.result IS NOT NULL
GROUP BY u.user_id, u.last_name, u.first_name
HAVING COUNT(*) > 0
ORDER BY overachievement_rate DESC, overachieved_periods DESC
LIMIT 1"
    );
    QuerySpec {
        kind: TemplateKind::BestPerformerWithDynamics,
        sql,
        binds: performance_binds(params),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluations
// ─────────────────────────────────────────────────────────────────────────────

/// Per-evaluator rating summary for one employee: peer evaluations are fact
/// rows (plan = 0) on behaviour-category indicators, excluding the
/// employee's own entries.
pub fn evaluation_summary(employee_name: &str, year: i32) -> QuerySpec {
    let sql = "\
SELECT evaluator.last_name, evaluator.first_name, evaluator.middle_name,
       AVG(f.value) AS avg_rating,
       COUNT(f.value) AS rating_count,
       GROUP_CONCAT(f.comment SEPARATOR ' | ') AS comments
FROM indicator_to_mo_fact f
JOIN indicator_to_mo itm ON f.indicator_to_mo_id = itm.indicator_to_mo_id
JOIN indicator i ON itm.indicator_id = i.indicator_id
JOIN indicator_behaviour ib ON i.indicator_behaviour_id = ib.indicator_behaviour_id
JOIN mo evaluated_mo ON itm.mo_id = evaluated_mo.mo_id
JOIN user evaluated_user ON evaluated_mo.name = CONCAT(evaluated_user.last_name, ' ', evaluated_user.first_name, ' ', evaluated_user.middle_name)
JOIN user evaluator ON f.user_id = evaluator.user_id
WHERE ib.indicator_behaviour_id = ?
  AND f.plan = 0
  AND YEAR(f.fact_time) = ?
  AND CONCAT(evaluated_user.last_name, ' ', evaluated_user.first_name, ' ', evaluated_user.middle_name) LIKE ?
  AND f.user_id != evaluated_user.user_id
GROUP BY evaluator.user_id, evaluator.last_name, evaluator.first_name, evaluator.middle_name
ORDER BY avg_rating DESC"
        .to_string();
    QuerySpec {
        kind: TemplateKind::EvaluationSummary,
        sql,
        binds: vec![
            BindValue::Int(EVALUATION_BEHAVIOUR_ID),
            BindValue::Int(i64::from(year)),
            BindValue::Text(format!("%{employee_name}%")),
        ],
    }
}

fn evaluation_branch(label: &str, indicator_filter: &str, author_filter: &str) -> String {
    format!(
        "    SELECT '{label}' AS evaluation_type, f.value, f.comment
    FROM indicator_to_mo_fact f
    JOIN indicator_to_mo itm ON f.indicator_to_mo_id = itm.indicator_to_mo_id
    JOIN indicator i ON itm.indicator_id = i.indicator_id
    JOIN user_to_mo utmo ON itm.mo_id = utmo.mo_id
    JOIN user u ON utmo.user_id = u.user_id
    WHERE {indicator_filter}
      AND f.plan = 0
      AND YEAR(f.fact_time) = ?
      AND CONCAT(u.last_name, ' ', u.first_name, ' ', IFNULL(u.middle_name, '')) LIKE ?
      AND {author_filter}"
    )
}

/// Three-way evaluation comparison for one employee: self-evaluations,
/// manager evaluations, and peer evaluations, each branch aggregated into
/// one row per category.
pub fn manager_self_evaluation(employee_name: &str, year: i32) -> QuerySpec {
    let self_branch = evaluation_branch(
        "Self-evaluation",
        "i.indicator_id = ?",
        "f.user_id = u.user_id",
    );
    let manager_branch = evaluation_branch(
        "Manager evaluation",
        "i.indicator_id IN (?, ?)",
        "f.user_id != u.user_id",
    );
    let peer_branch = "    SELECT 'Peer evaluation' AS evaluation_type, f.value, f.comment
    FROM indicator_to_mo_fact f
    JOIN indicator_to_mo itm ON f.indicator_to_mo_id = itm.indicator_to_mo_id
    JOIN indicator i ON itm.indicator_id = i.indicator_id
    JOIN indicator_behaviour ib ON i.indicator_behaviour_id = ib.indicator_behaviour_id
    JOIN user_to_mo utmo ON itm.mo_id = utmo.mo_id
    JOIN user u ON utmo.user_id = u.user_id
    WHERE ib.indicator_behaviour_id = ?
      AND f.plan = 0
      AND YEAR(f.fact_time) = ?
      AND CONCAT(u.last_name, ' ', u.first_name, ' ', IFNULL(u.middle_name, '')) LIKE ?
      AND f.user_id != u.user_id";

    let sql = format!(
        "SELECT evaluation_type,
       AVG(value) AS avg_rating,
       COUNT(value) AS rating_count,
       GROUP_CONCAT(DISTINCT CASE
           WHEN comment IS NOT NULL AND comment != ''
           THEN CONCAT('Rating: ', value, '% - ', comment)
           ELSE CONCAT('Rating: ', value, '%')
       END SEPARATOR '\n') AS detailed_comments,
       MIN(value) AS min_rating,
       MAX(value) AS max_rating,
       GROUP_CONCAT(DISTINCT value ORDER BY value DESC) AS all_ratings
FROM (
{self_branch}
    UNION ALL
{manager_branch}
    UNION ALL
{peer_branch}
) AS combined_evaluations
GROUP BY evaluation_type
ORDER BY evaluation_type"
    );

    let like = format!("%{employee_name}%");
    QuerySpec {
        kind: TemplateKind::ManagerSelfEvaluation,
        sql,
        binds: vec![
            BindValue::Int(SELF_EVALUATION_INDICATOR_ID),
            BindValue::Int(i64::from(year)),
            BindValue::Text(like.clone()),
            BindValue::Int(MANAGER_EVALUATION_INDICATOR_IDS[0]),
            BindValue::Int(MANAGER_EVALUATION_INDICATOR_IDS[1]),
            BindValue::Int(i64::from(year)),
            BindValue::Text(like.clone()),
            BindValue::Int(EVALUATION_BEHAVIOUR_ID),
            BindValue::Int(i64::from(year)),
            BindValue::Text(like),
        ],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::extract::{DateRange, PeriodGranularity, RangeKind};

    fn sample_params() -> ParameterSet {
        ParameterSet {
            employee_names: vec![],
            indicator_id: Some(3),
            date_range: DateRange {
                start: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2022, 3, 31).unwrap(),
                kind: RangeKind::SingleMonth,
            },
            limit: 5,
            sort_order: SortOrder::Descending,
            granularity: PeriodGranularity::Month,
            evaluation_year: 2022,
        }
    }

    fn placeholder_count(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn test_every_builder_binds_every_placeholder() {
        let params = ParameterSet {
            employee_names: vec!["Ivanov Petr".to_string(), "Smith".to_string()],
            ..sample_params()
        };
        let specs = vec![
            top_performers(&params),
            worst_performers(&params),
            employee_dynamics(&params),
            period_comparison(&params),
            plan_analysis(&params),
            best_performer(&params),
            exact_employee_dynamics("Ivanov", "Petr", &params),
            evaluation_summary("Ivanov Petr", 2024),
            manager_self_evaluation("Ivanov Petr", 2024),
        ];
        for spec in specs {
            assert_eq!(
                placeholder_count(&spec.sql),
                spec.binds.len(),
                "placeholder/bind mismatch for {:?}",
                spec.kind
            );
        }
    }

    #[test]
    fn test_top_performers_binds_and_order() {
        let spec = top_performers(&sample_params());
        assert_eq!(spec.kind, TemplateKind::TopPerformers);
        assert!(spec.sql.contains("ORDER BY cpv.fact DESC"));
        assert!(spec.sql.contains("LIMIT ?"));
        assert_eq!(
            spec.binds,
            vec![
                BindValue::Int(3),
                BindValue::Date(NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()),
                BindValue::Date(NaiveDate::from_ymd_opt(2022, 3, 31).unwrap()),
                BindValue::Int(5),
            ]
        );
    }

    #[test]
    fn test_worst_is_top_with_forced_ascending_order() {
        // Even with a descending parameter set the worst builder sorts
        // ascending; everything else is byte-identical to the top builder
        // built from an ascending set.
        let descending = sample_params();
        let ascending = ParameterSet {
            sort_order: SortOrder::Ascending,
            ..sample_params()
        };
        let worst = worst_performers(&descending);
        let top = top_performers(&ascending);
        assert!(worst.sql.contains("ORDER BY cpv.fact ASC"));
        assert_eq!(worst.sql, top.sql);
        assert_eq!(worst.binds, top.binds);
        assert_eq!(worst.kind, TemplateKind::WorstPerformers);
    }

    #[test]
    fn test_dynamics_binds_granularity_wire_value() {
        let params = ParameterSet {
            employee_names: vec!["Shpak Alexander".to_string()],
            granularity: PeriodGranularity::Quarter,
            ..sample_params()
        };
        let spec = employee_dynamics(&params);
        assert!(spec.sql.contains("cpv.period_type = ?"));
        assert_eq!(spec.binds[3], BindValue::Int(5));
    }

    #[test]
    fn test_dynamics_exact_pair_filter() {
        let params = ParameterSet {
            employee_names: vec!["Ivanov Petr".to_string()],
            ..sample_params()
        };
        let spec = employee_dynamics(&params);
        assert!(spec.sql.contains("(u.last_name = ? AND u.first_name = ?)"));
        assert_eq!(spec.binds[4], BindValue::Text("Ivanov".to_string()));
        assert_eq!(spec.binds[5], BindValue::Text("Petr".to_string()));
    }

    #[test]
    fn test_dynamics_single_token_substring_filter() {
        let params = ParameterSet {
            employee_names: vec!["Smith".to_string()],
            ..sample_params()
        };
        let spec = employee_dynamics(&params);
        assert!(spec.sql.contains("(u.last_name LIKE ? OR u.first_name LIKE ?)"));
        assert_eq!(spec.binds[4], BindValue::Text("%Smith%".to_string()));
        assert_eq!(spec.binds[5], BindValue::Text("%Smith%".to_string()));
    }

    #[test]
    fn test_dynamics_multiple_names_or_combine() {
        let params = ParameterSet {
            employee_names: vec!["Ivanov Petr".to_string(), "Smith".to_string()],
            ..sample_params()
        };
        let spec = employee_dynamics(&params);
        assert!(spec
            .sql
            .contains("(u.last_name = ? AND u.first_name = ?) OR (u.last_name LIKE ? OR u.first_name LIKE ?)"));
        assert_eq!(spec.binds.len(), 8);
    }

    #[test]
    fn test_dynamics_third_name_token_is_dropped() {
        let params = ParameterSet {
            employee_names: vec!["Sidorova Anna Petrovna".to_string()],
            ..sample_params()
        };
        let spec = employee_dynamics(&params);
        assert_eq!(spec.binds[4], BindValue::Text("Sidorova".to_string()));
        assert_eq!(spec.binds[5], BindValue::Text("Anna".to_string()));
    }

    #[test]
    fn test_dynamics_without_names_has_no_name_clause() {
        let spec = employee_dynamics(&sample_params());
        assert!(!spec.sql.contains("LIKE"));
        assert_eq!(spec.binds.len(), 4);
    }

    #[test]
    fn test_period_comparison_reuses_dynamics_query() {
        let params = sample_params();
        let comparison = period_comparison(&params);
        let dynamics = employee_dynamics(&params);
        assert_eq!(comparison.sql, dynamics.sql);
        assert_eq!(comparison.binds, dynamics.binds);
        assert_eq!(comparison.kind, TemplateKind::PeriodComparison);
    }

    #[test]
    fn test_plan_analysis_shape() {
        let spec = plan_analysis(&sample_params());
        assert!(spec.sql.contains("GROUP BY u.user_id"));
        assert!(spec.sql.contains("HAVING COUNT(*) > 0"));
        assert!(spec.sql.contains("ORDER BY overachievement_rate DESC, avg_result DESC"));
        assert_eq!(spec.binds.last(), Some(&BindValue::Int(5)));
    }

    #[test]
    fn test_best_performer_requests_exactly_one_row() {
        let spec = best_performer(&sample_params());
        assert!(spec.sql.ends_with("LIMIT 1"));
        // The extracted limit is not bound: stage one is always a single row.
        assert_eq!(spec.binds.len(), 3);
    }

    #[test]
    fn test_best_performer_counts_only_complete_periods() {
        // The rate denominator is COUNT(*), so every incomplete period must be
        // filtered out up front; a missing plan filter would inflate the
        // denominator and can crown a different employee.
        let spec = best_performer(&sample_params());
        assert!(spec.sql.contains("cpv.fact IS NOT NULL"));
        assert!(spec.sql.contains("cpv.plan IS NOT NULL"));
        assert!(spec.sql.contains("cpv.result IS NOT NULL"));
    }

    #[test]
    fn test_exact_dynamics_orders_by_period_only() {
        let spec = exact_employee_dynamics("Ivanov", "Petr", &sample_params());
        assert!(spec.sql.ends_with("ORDER BY cpv.period_start"));
        assert_eq!(spec.binds[4], BindValue::Text("Ivanov".to_string()));
        assert_eq!(spec.binds[5], BindValue::Text("Petr".to_string()));
    }

    #[test]
    fn test_evaluation_summary_binds() {
        let spec = evaluation_summary("Ivanov Petr", 2024);
        assert_eq!(spec.kind, TemplateKind::EvaluationSummary);
        assert!(spec.sql.contains("GROUP_CONCAT(f.comment SEPARATOR ' | ')"));
        assert_eq!(
            spec.binds,
            vec![
                BindValue::Int(5),
                BindValue::Int(2024),
                BindValue::Text("%Ivanov Petr%".to_string()),
            ]
        );
    }

    #[test]
    fn test_manager_self_evaluation_binds_three_branches() {
        let spec = manager_self_evaluation("Ivanov Petr", 2024);
        assert_eq!(spec.binds.len(), 10);
        // Branch order: self (indicator 6), manager (7 and 8), peer
        // (behaviour 5), each followed by year and the name pattern.
        assert_eq!(spec.binds[0], BindValue::Int(6));
        assert_eq!(spec.binds[3], BindValue::Int(7));
        assert_eq!(spec.binds[4], BindValue::Int(8));
        assert_eq!(spec.binds[7], BindValue::Int(5));
        assert_eq!(spec.binds[2], BindValue::Text("%Ivanov Petr%".to_string()));
        assert!(spec.sql.contains("'Self-evaluation'"));
        assert!(spec.sql.contains("'Manager evaluation'"));
        assert!(spec.sql.contains("'Peer evaluation'"));
        assert!(spec.sql.contains("GROUP BY evaluation_type"));
    }
}
