//! Resolver — the pipeline turning one prompt into one report.
//!
//! Steps: classify the prompt, extract parameters, build the template query,
//! execute it through the data-store seam, decode typed rows, format the
//! report. The compound template runs two executions with a hard data
//! dependency between them.
//!
//! The resolver is infallible from the caller's side: extraction gaps,
//! collaborator failures and malformed rows are all rendered into the
//! returned report text.

use thiserror::Error;
use tracing::{info, warn};

use crate::insight::classifier::{classify, TemplateKind};
use crate::insight::executor::{ExecuteError, QueryExecutor};
use crate::insight::extract::{extract_parameters, ParameterSet};
use crate::insight::format;
use crate::insight::narrative::{NarrativeError, Narrator};
use crate::insight::prompts;
use crate::insight::queries;
use crate::insight::rows::{
    decode_all, BestPerformerRow, DynamicsRow, EvaluationBreakdownRow, EvaluationSummaryRow,
    PerformerRow, PlanAnalysisRow, RowError,
};

/// Outcome of one resolution: the selected template and the rendered report.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub template: TemplateKind,
    pub report: String,
}

/// Internal failure taxonomy; only ever rendered, never propagated.
#[derive(Debug, Error)]
enum ResolveError {
    #[error("could not determine the employee name")]
    MissingEmployeeName,
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error("malformed result row: {0}")]
    Row(#[from] RowError),
}

fn render_error(err: &ResolveError) -> String {
    match err {
        ResolveError::MissingEmployeeName => {
            "❌ Could not determine the employee name".to_string()
        }
        other => format!("❌ Query failed: {other}"),
    }
}

/// Resolves one prompt end to end. Always returns a report.
pub async fn resolve_prompt(
    executor: &dyn QueryExecutor,
    narrator: &dyn Narrator,
    prompt: &str,
) -> Resolution {
    let template = classify(prompt);
    let params = extract_parameters(prompt);
    info!(?template, names = params.employee_names.len(), "resolved query intent");

    if template.requires_employee_name() && params.employee_names.is_empty() {
        let report = render_error(&ResolveError::MissingEmployeeName);
        return Resolution { template, report };
    }

    let report = match run_template(executor, narrator, template, &params).await {
        Ok(report) => report,
        Err(err) => {
            warn!(?template, error = %err, "resolution failed");
            render_error(&err)
        }
    };
    Resolution { template, report }
}

async fn run_template(
    executor: &dyn QueryExecutor,
    narrator: &dyn Narrator,
    template: TemplateKind,
    params: &ParameterSet,
) -> Result<String, ResolveError> {
    match template {
        TemplateKind::TopPerformers => {
            let spec = queries::top_performers(params);
            let rows = decode_all(&executor.execute(&spec).await?, PerformerRow::decode)?;
            Ok(format::format_performers(&rows, false))
        }
        TemplateKind::WorstPerformers => {
            let spec = queries::worst_performers(params);
            let rows = decode_all(&executor.execute(&spec).await?, PerformerRow::decode)?;
            Ok(format::format_performers(&rows, true))
        }
        TemplateKind::EmployeeDynamics => {
            let spec = queries::employee_dynamics(params);
            let rows = decode_all(&executor.execute(&spec).await?, DynamicsRow::decode)?;
            Ok(format::format_dynamics(&rows))
        }
        TemplateKind::PeriodComparison => {
            // Same query as dynamics; the report stays untyped.
            let spec = queries::period_comparison(params);
            let rows = executor.execute(&spec).await?;
            Ok(format::format_generic(&rows))
        }
        TemplateKind::PlanAnalysis => {
            let spec = queries::plan_analysis(params);
            let rows = decode_all(&executor.execute(&spec).await?, PlanAnalysisRow::decode)?;
            Ok(format::format_plan_analysis(&rows))
        }
        TemplateKind::EvaluationSummary => {
            let name = first_employee_name(params)?;
            let spec = queries::evaluation_summary(name, params.evaluation_year);
            let rows = decode_all(&executor.execute(&spec).await?, EvaluationSummaryRow::decode)?;
            Ok(format::format_evaluation_summary(&rows))
        }
        TemplateKind::ManagerSelfEvaluation => {
            manager_self_evaluation(executor, narrator, params).await
        }
        TemplateKind::BestPerformerWithDynamics => {
            best_performer_with_dynamics(executor, params).await
        }
    }
}

fn first_employee_name(params: &ParameterSet) -> Result<&str, ResolveError> {
    params
        .employee_names
        .first()
        .map(String::as_str)
        .ok_or(ResolveError::MissingEmployeeName)
}

async fn manager_self_evaluation(
    executor: &dyn QueryExecutor,
    narrator: &dyn Narrator,
    params: &ParameterSet,
) -> Result<String, ResolveError> {
    let name = first_employee_name(params)?;
    let spec = queries::manager_self_evaluation(name, params.evaluation_year);
    let rows = decode_all(&executor.execute(&spec).await?, EvaluationBreakdownRow::decode)?;
    if rows.is_empty() {
        return Ok(format::EMPTY_RESULT_MESSAGE.to_string());
    }
    let prompt = prompts::build_narrative_prompt(&rows, name);
    let narrative = match narrator.generate(prompts::NARRATIVE_SYSTEM, &prompt).await {
        Ok(text) => text,
        Err(NarrativeError::Unavailable(reason)) => {
            warn!(%reason, "narrative generator unavailable, using fallback");
            format::FALLBACK_NARRATIVE.to_string()
        }
    };
    Ok(format::format_manager_self_evaluation(&rows, name, &narrative))
}

/// Two sequential executions with a data dependency: the stage-two name
/// filter is the stage-one winner's exact name. An empty stage one ends the
/// flow with the uniform empty message.
async fn best_performer_with_dynamics(
    executor: &dyn QueryExecutor,
    params: &ParameterSet,
) -> Result<String, ResolveError> {
    let stage_one = queries::best_performer(params);
    let winners = decode_all(&executor.execute(&stage_one).await?, BestPerformerRow::decode)?;
    let Some(winner) = winners.first() else {
        return Ok(format::EMPTY_RESULT_MESSAGE.to_string());
    };

    let stage_two = queries::exact_employee_dynamics(&winner.last_name, &winner.first_name, params);
    let dynamics = decode_all(&executor.execute(&stage_two).await?, DynamicsRow::decode)?;
    Ok(format::format_best_performer(&winners, &dynamics))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
