//! Prompt templates for the evaluation-narrative generation call.

use crate::insight::rows::EvaluationBreakdownRow;

/// System prompt for the narrative call.
pub const NARRATIVE_SYSTEM: &str = "You are an expert in HR and people analytics. \
Analyze evaluation data objectively and professionally.";

/// Builds the expert-analysis prompt, embedding every category's statistics
/// and detailed comments.
pub fn build_narrative_prompt(rows: &[EvaluationBreakdownRow], employee_name: &str) -> String {
    let mut prompt = format!(
        "Analyze the evaluations of employee {employee_name} and give a detailed \
expert opinion as an HR specialist.\n\nEvaluation data:\n"
    );
    let mut total_ratings = 0i64;
    for row in rows {
        total_ratings += row.rating_count;
        prompt.push_str(&format!(
            "\n=== {} ===\n\
• Ratings: {}\n\
• Average rating: {:.1}%\n\
• Rating range: {}% to {}%\n\
• Detailed comments and ratings:\n{}\n",
            row.evaluation_type,
            row.rating_count,
            row.avg_rating,
            row.min_rating,
            row.max_rating,
            row.detailed_comments.as_deref().unwrap_or("No comments provided"),
        ));
    }
    prompt.push_str(&format!(
        "\nTotal ratings: {total_ratings}\n\n\
Provide a detailed analysis covering:\n\
1. Overall characterization of the employee based on the ratings\n\
2. Whether positive or negative observations dominate\n\
3. Gaps between the self-evaluation and the evaluations of others\n\
4. Strengths and weaknesses called out in the comments\n\
5. Overall conclusions and recommendations\n\n\
Answer as an HR expert, using professional terminology."
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown(category: &str, count: i64) -> EvaluationBreakdownRow {
        EvaluationBreakdownRow {
            evaluation_type: category.to_string(),
            avg_rating: 87.5,
            rating_count: count,
            detailed_comments: Some("Rating: 90% - solid work".to_string()),
            min_rating: 80.0,
            max_rating: 95.0,
            all_ratings: None,
        }
    }

    #[test]
    fn test_prompt_embeds_every_category() {
        let rows = vec![breakdown("Self-evaluation", 2), breakdown("Manager evaluation", 3)];
        let prompt = build_narrative_prompt(&rows, "Ivanov Petr");
        assert!(prompt.contains("employee Ivanov Petr"));
        assert!(prompt.contains("=== Self-evaluation ==="));
        assert!(prompt.contains("=== Manager evaluation ==="));
        assert!(prompt.contains("Rating: 90% - solid work"));
        assert!(prompt.contains("Total ratings: 5"));
    }

    #[test]
    fn test_prompt_handles_missing_comments() {
        let mut row = breakdown("Peer evaluation", 1);
        row.detailed_comments = None;
        let prompt = build_narrative_prompt(&[row], "Ivanov Petr");
        assert!(prompt.contains("No comments provided"));
    }
}
