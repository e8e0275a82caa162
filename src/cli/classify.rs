use crate::classifier;
use crate::cli::commands::ClassifyArgs;
use crate::errors::ReproError;
use crate::feed::{FileFeed, VulnerabilityFeed};
use crate::knowledge::KnowledgeBase;
use crate::models::VulnerabilityReport;
use crate::runners::{Route, RunnerRegistry};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RoutingRow {
    pub vulnerability: String,
    pub category: String,
    pub automatable: bool,
    pub route: String,
}

pub async fn handle_classify(args: ClassifyArgs) -> Result<(), ReproError> {
    let reports = FileFeed::new(&args.feed).load().await?;
    let registry = if args.no_runners {
        RunnerRegistry::new()
    } else {
        RunnerRegistry::with_defaults(&KnowledgeBase::builtin())
    };
    let rows = routing_table(&reports, &registry);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let width = rows.iter().map(|r| r.vulnerability.len()).max().unwrap_or(13).max(13);
    println!("{:<width$}  {:<26}  ROUTE", "VULNERABILITY", "CATEGORY", width = width);
    for row in &rows {
        println!("{:<width$}  {:<26}  {}", row.vulnerability, row.category, row.route, width = width);
    }
    Ok(())
}

pub fn routing_table(reports: &[VulnerabilityReport], registry: &RunnerRegistry) -> Vec<RoutingRow> {
    reports
        .iter()
        .map(|report| {
            let classification = classifier::classify(&report.name, &report.details);
            let route = match registry.route(&classification) {
                Route::Runner(runner) => format!("runner:{}", runner.name()),
                Route::Generated => "generated".to_string(),
                Route::Manual => "manual_testing_required".to_string(),
            };
            RoutingRow {
                vulnerability: report.name.clone(),
                category: classification.category.to_string(),
                automatable: classification.automatable,
                route,
            }
        })
        .collect()
}
