//! Report formatters — render typed rows into the chat-facing report text.
//!
//! Reports are plain strings with light markdown and emoji markers, matching
//! what the chat front end renders. Formatters are pure; anything async
//! (narrative generation) happens in the resolver and arrives here as a
//! finished string. Every formatter returns the same uniform message for an
//! empty row set.

use std::collections::BTreeMap;

use crate::insight::rows::{
    BestPerformerRow, DynamicsRow, EvaluationBreakdownRow, EvaluationSummaryRow, PerformerRow,
    PlanAnalysisRow, ResultRow,
};

/// Uniform message for any template that produced zero rows.
pub const EMPTY_RESULT_MESSAGE: &str = "📭 No data found";

/// Shown in place of the generated narrative when the text-generation
/// collaborator is unavailable.
pub const FALLBACK_NARRATIVE: &str = "⚠️ Expert analysis is unavailable right now.\n\n\
**Baseline summary:** the collected ratings above show a regular evaluation cadence; \
the per-category averages and rating counts give a stable picture of how the employee \
is assessed.";

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// How many comments an evaluator gets in the summary before truncation.
const COMMENT_PREVIEW_COUNT: usize = 3;

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn format_measure(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "N/A".to_string())
}

fn month_abbreviation(month: u32) -> &'static str {
    // Decoders guarantee 1..=12.
    MONTH_ABBREVIATIONS[(month - 1) as usize]
}

// ─────────────────────────────────────────────────────────────────────────────
// Ranked performers
// ─────────────────────────────────────────────────────────────────────────────

/// Ranked performer list, one aligned line per employee.
pub fn format_performers(rows: &[PerformerRow], worst: bool) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }
    let title = if worst {
        "📉 Worst performers:"
    } else {
        "📊 Top performers by results:"
    };
    let mut lines = vec![title.to_string()];
    for (idx, row) in rows.iter().enumerate() {
        lines.push(format!(
            "{:2}. {:<25} | Fact: {:>8} | Plan: {:>8} | Result: {:>8}%",
            idx + 1,
            format!("{} {}", row.last_name, row.first_name),
            format_measure(row.fact),
            format_measure(row.plan),
            format_measure(row.result_pct),
        ));
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Dynamics
// ─────────────────────────────────────────────────────────────────────────────

/// Per-employee period series, grouped by employee and ordered by period.
/// Periods above 100% get the growth marker.
pub fn format_dynamics(rows: &[DynamicsRow]) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }
    let mut groups: BTreeMap<(String, String), Vec<&DynamicsRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.last_name.clone(), row.first_name.clone()))
            .or_default()
            .push(row);
    }

    let mut lines = vec!["📈 Performance dynamics:".to_string(), String::new()];
    for ((last_name, first_name), mut periods) in groups {
        periods.sort_by_key(|row| row.period_start);
        lines.push(format!("👤 {last_name} {first_name}:"));
        for row in periods {
            let marker = if row.result_pct.map(|r| r > 100.0).unwrap_or(false) {
                "📈"
            } else {
                "📊"
            };
            lines.push(format!(
                "   {} {} {}: Fact={}, Plan={}, Result={}%",
                marker,
                month_abbreviation(row.month),
                row.year,
                format_measure(row.fact),
                format_measure(row.plan),
                format_measure(row.result_pct),
            ));
        }
        lines.push(String::new());
    }
    while lines.last().map(String::is_empty).unwrap_or(false) {
        lines.pop();
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan analysis
// ─────────────────────────────────────────────────────────────────────────────

/// Ranked plan-completion blocks with over/under counts and the rate.
pub fn format_plan_analysis(rows: &[PlanAnalysisRow]) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }
    let mut lines = vec!["📊 Plan completion analysis:".to_string(), String::new()];
    for (idx, row) in rows.iter().enumerate() {
        lines.push(format!("{:2}. {} {}", idx + 1, row.last_name, row.first_name));
        lines.push(format!(
            "    📈 Overachieved: {}/{} periods ({}%)",
            row.overachieved_periods,
            row.total_periods,
            format_number(row.overachievement_rate),
        ));
        lines.push(format!(
            "    📉 Underachieved: {}/{} periods",
            row.underachieved_periods, row.total_periods,
        ));
        lines.push(format!(
            "    📊 Average result: {:.2}% (fact {:.2} against plan {:.2})",
            row.avg_result, row.avg_fact, row.avg_plan,
        ));
        lines.push(String::new());
    }
    while lines.last().map(String::is_empty).unwrap_or(false) {
        lines.pop();
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluations
// ─────────────────────────────────────────────────────────────────────────────

fn evaluator_name(row: &EvaluationSummaryRow) -> String {
    match &row.middle_name {
        Some(middle) if !middle.is_empty() => {
            format!("{} {} {}", row.last_name, row.first_name, middle)
        }
        _ => format!("{} {}", row.last_name, row.first_name),
    }
}

/// Evaluation summary: the overall average is the mean of the per-evaluator
/// averages, not of the raw ratings. Comments are previewed per evaluator
/// with a count of what was cut.
pub fn format_evaluation_summary(rows: &[EvaluationSummaryRow]) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }
    let overall = rows.iter().map(|row| row.avg_rating).sum::<f64>() / rows.len() as f64;
    let mut out = String::from("📊 **Evaluation summary**\n\n");
    out.push_str(&format!("**Overall average rating:** {overall:.1}%\n"));
    out.push_str(&format!("**Evaluators:** {}\n\n", rows.len()));
    out.push_str("### Per-evaluator breakdown\n\n");
    for row in rows {
        out.push_str(&format!("**{}:**\n", evaluator_name(row)));
        out.push_str(&format!("- Average rating: {:.1}%\n", row.avg_rating));
        out.push_str(&format!("- Ratings: {}\n", row.rating_count));
        if let Some(comments) = &row.comments {
            let all: Vec<&str> = comments.split(" | ").collect();
            let preview: Vec<&str> = all.iter().take(COMMENT_PREVIEW_COUNT).copied().collect();
            out.push_str(&format!("- Comments: {}\n", preview.join("; ")));
            if all.len() > COMMENT_PREVIEW_COUNT {
                out.push_str(&format!(
                    "  (and {} more comments)\n",
                    all.len() - COMMENT_PREVIEW_COUNT
                ));
            }
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Three-way evaluation comparison: per-category statistics blocks followed
/// by the expert narrative (generated or fallback, the caller decides).
pub fn format_manager_self_evaluation(
    rows: &[EvaluationBreakdownRow],
    employee_name: &str,
    narrative: &str,
) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }
    let mut out = format!("📊 **Evaluation analysis: {employee_name}**\n\n");
    out.push_str("### 📈 Rating statistics\n\n");
    for row in rows {
        out.push_str(&format!("**{}:**\n", row.evaluation_type));
        out.push_str(&format!("- Ratings: {}\n", row.rating_count));
        out.push_str(&format!("- Average rating: {:.1}%\n", row.avg_rating));
        out.push_str(&format!(
            "- Range: {}% to {}%\n\n",
            format_number(row.min_rating),
            format_number(row.max_rating),
        ));
    }
    out.push_str("### 🤖 Expert analysis\n\n");
    out.push_str(narrative);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Compound best performer
// ─────────────────────────────────────────────────────────────────────────────

/// Stage-one winner header plus the winner's monthly dynamics. An empty
/// stage-two series keeps the header and adds hint lines instead.
pub fn format_best_performer(winners: &[BestPerformerRow], dynamics: &[DynamicsRow]) -> String {
    let Some(best) = winners.first() else {
        return EMPTY_RESULT_MESSAGE.to_string();
    };
    let mut lines = vec![
        format!("🏆 Best plan performer: {} {}", best.last_name, best.first_name),
        format!(
            "📈 Overachieved periods: {} ({}% of all periods)",
            best.overachieved_periods,
            format_number(best.overachievement_rate),
        ),
        String::new(),
    ];
    if dynamics.is_empty() {
        lines.push("📭 No monthly dynamics found for this employee".to_string());
        lines.push("💡 Try another period or granularity".to_string());
    } else {
        lines.push(format_dynamics(dynamics));
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic fallback
// ─────────────────────────────────────────────────────────────────────────────

/// Untyped fallback: enumerate rows with comma-separated cells. Used by the
/// period-comparison template.
pub fn format_generic(rows: &[ResultRow]) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }
    let mut lines = vec!["📄 Query results:".to_string()];
    for (idx, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        lines.push(format!("{}. {}", idx + 1, cells.join(", ")));
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::rows::SqlValue;
    use chrono::NaiveDate;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn performer(last: &str, fact: Option<f64>) -> PerformerRow {
        PerformerRow {
            last_name: last.to_string(),
            first_name: "Petr".to_string(),
            fact,
            plan: Some(100.0),
            result_pct: fact,
            period_start: ymd(2022, 3, 1),
            period_end: ymd(2022, 3, 31),
        }
    }

    fn dynamics(last: &str, month: u32, result: Option<f64>) -> DynamicsRow {
        DynamicsRow {
            last_name: last.to_string(),
            first_name: "Petr".to_string(),
            period_start: ymd(2022, month, 1),
            period_end: ymd(2022, month, 28),
            fact: result,
            plan: Some(100.0),
            result_pct: result,
            month,
            year: 2022,
        }
    }

    fn breakdown(category: &str) -> EvaluationBreakdownRow {
        EvaluationBreakdownRow {
            evaluation_type: category.to_string(),
            avg_rating: 87.5,
            rating_count: 4,
            detailed_comments: Some("Rating: 90% - solid work".to_string()),
            min_rating: 80.0,
            max_rating: 95.0,
            all_ratings: Some("95,90,85,80".to_string()),
        }
    }

    #[test]
    fn test_every_formatter_uses_the_uniform_empty_message() {
        assert_eq!(format_performers(&[], false), EMPTY_RESULT_MESSAGE);
        assert_eq!(format_performers(&[], true), EMPTY_RESULT_MESSAGE);
        assert_eq!(format_dynamics(&[]), EMPTY_RESULT_MESSAGE);
        assert_eq!(format_plan_analysis(&[]), EMPTY_RESULT_MESSAGE);
        assert_eq!(format_evaluation_summary(&[]), EMPTY_RESULT_MESSAGE);
        assert_eq!(
            format_manager_self_evaluation(&[], "Ivanov Petr", ""),
            EMPTY_RESULT_MESSAGE
        );
        assert_eq!(format_best_performer(&[], &[]), EMPTY_RESULT_MESSAGE);
        assert_eq!(format_generic(&[]), EMPTY_RESULT_MESSAGE);
    }

    #[test]
    fn test_performers_are_ranked_and_aligned() {
        let report = format_performers(&[performer("Ivanov", Some(105.5)), performer("Shpak", Some(98.0))], false);
        assert!(report.starts_with("📊 Top performers"));
        assert!(report.contains(" 1. Ivanov Petr"));
        assert!(report.contains(" 2. Shpak Petr"));
        assert!(report.contains("Result:   105.50%"));
    }

    #[test]
    fn test_worst_performers_title() {
        let report = format_performers(&[performer("Ivanov", Some(12.0))], true);
        assert!(report.starts_with("📉 Worst performers:"));
    }

    #[test]
    fn test_null_measures_render_as_na() {
        let report = format_performers(&[performer("Ivanov", None)], false);
        assert!(report.contains("Fact:      N/A"));
    }

    #[test]
    fn test_dynamics_groups_and_marks_growth() {
        let rows = vec![
            dynamics("Shpak", 4, Some(95.0)),
            dynamics("Ivanov", 3, Some(120.0)),
            dynamics("Shpak", 3, Some(101.0)),
        ];
        let report = format_dynamics(&rows);
        // Groups sort by name, periods sort within the group.
        let ivanov = report.find("👤 Ivanov Petr:").unwrap();
        let shpak = report.find("👤 Shpak Petr:").unwrap();
        assert!(ivanov < shpak);
        let mar = report.find("📈 Mar 2022: Fact=101").unwrap();
        let apr = report.find("📊 Apr 2022: Fact=95").unwrap();
        assert!(mar < apr);
        assert!(report.contains("📈 Mar 2022: Fact=120"));
    }

    #[test]
    fn test_exactly_100_percent_is_not_growth() {
        let report = format_dynamics(&[dynamics("Shpak", 3, Some(100.0))]);
        assert!(report.contains("📊 Mar 2022"));
        assert!(!report.contains("📈 Mar 2022"));
    }

    #[test]
    fn test_plan_analysis_blocks() {
        let row = PlanAnalysisRow {
            last_name: "Ivanov".to_string(),
            first_name: "Petr".to_string(),
            total_periods: 12,
            overachieved_periods: 8,
            underachieved_periods: 3,
            avg_result: 104.27,
            avg_fact: 521.33,
            avg_plan: 500.0,
            overachievement_rate: 66.67,
        };
        let report = format_plan_analysis(&[row]);
        assert!(report.contains(" 1. Ivanov Petr"));
        assert!(report.contains("📈 Overachieved: 8/12 periods (66.67%)"));
        assert!(report.contains("📉 Underachieved: 3/12 periods"));
        assert!(report.contains("Average result: 104.27%"));
    }

    #[test]
    fn test_evaluation_summary_overall_is_mean_of_averages() {
        let rows = vec![
            EvaluationSummaryRow {
                last_name: "Petrov".to_string(),
                first_name: "Ivan".to_string(),
                middle_name: None,
                avg_rating: 80.0,
                rating_count: 10,
                comments: None,
            },
            EvaluationSummaryRow {
                last_name: "Sidorova".to_string(),
                first_name: "Anna".to_string(),
                middle_name: Some("Petrovna".to_string()),
                avg_rating: 90.0,
                rating_count: 2,
                comments: None,
            },
        ];
        // Mean of per-evaluator averages, not weighted by rating counts.
        let report = format_evaluation_summary(&rows);
        assert!(report.contains("**Overall average rating:** 85.0%"));
        assert!(report.contains("**Evaluators:** 2"));
        assert!(report.contains("**Sidorova Anna Petrovna:**"));
    }

    #[test]
    fn test_evaluation_summary_truncates_comments() {
        let row = EvaluationSummaryRow {
            last_name: "Petrov".to_string(),
            first_name: "Ivan".to_string(),
            middle_name: None,
            avg_rating: 88.0,
            rating_count: 5,
            comments: Some("one | two | three | four | five".to_string()),
        };
        let report = format_evaluation_summary(&[row]);
        assert!(report.contains("- Comments: one; two; three"));
        assert!(report.contains("(and 2 more comments)"));
        assert!(!report.contains("four"));
    }

    #[test]
    fn test_manager_self_embeds_narrative_and_stats() {
        let rows = vec![breakdown("Self-evaluation"), breakdown("Manager evaluation")];
        let report = format_manager_self_evaluation(&rows, "Ivanov Petr", "The picture is balanced.");
        assert!(report.starts_with("📊 **Evaluation analysis: Ivanov Petr**"));
        assert!(report.contains("**Self-evaluation:**"));
        assert!(report.contains("**Manager evaluation:**"));
        assert!(report.contains("- Range: 80% to 95%"));
        assert!(report.ends_with("The picture is balanced."));
    }

    #[test]
    fn test_best_performer_with_dynamics() {
        let winner = BestPerformerRow {
            last_name: "Ivanov".to_string(),
            first_name: "Petr".to_string(),
            overachieved_periods: 8,
            overachievement_rate: 66.67,
        };
        let report = format_best_performer(&[winner], &[dynamics("Ivanov", 3, Some(120.0))]);
        assert!(report.starts_with("🏆 Best plan performer: Ivanov Petr"));
        assert!(report.contains("Overachieved periods: 8 (66.67% of all periods)"));
        assert!(report.contains("📈 Mar 2022"));
    }

    #[test]
    fn test_best_performer_with_empty_dynamics_keeps_header_and_hints() {
        let winner = BestPerformerRow {
            last_name: "Ivanov".to_string(),
            first_name: "Petr".to_string(),
            overachieved_periods: 8,
            overachievement_rate: 66.67,
        };
        let report = format_best_performer(&[winner], &[]);
        assert!(report.contains("🏆 Best plan performer: Ivanov Petr"));
        assert!(report.contains("📭 No monthly dynamics found"));
        assert!(report.contains("💡 Try another period"));
    }

    #[test]
    fn test_generic_enumerates_cells() {
        let rows = vec![vec![
            SqlValue::Text("Ivanov".to_string()),
            SqlValue::Int(3),
            SqlValue::Null,
            SqlValue::Date(ymd(2022, 3, 1)),
        ]];
        let report = format_generic(&rows);
        assert!(report.starts_with("📄 Query results:"));
        assert!(report.contains("1. Ivanov, 3, NULL, 2022-03-01"));
    }
}
