//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.
//! Counts reflect the stored state; they do not poll the executor.

use std::fmt::Write;

use appservice_core::{CallerContext, TaskSummary};

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &AppState) -> String {
    let mut output = String::new();

    collect_task_metrics(state, &mut output).await;
    collect_catalog_metrics(state, &mut output);

    output
}

/// Collect task metrics by state.
async fn collect_task_metrics(state: &AppState, output: &mut String) {
    let tasks = state.store.snapshot().await;
    let summary = TaskSummary::from_states(tasks.iter().map(|t| t.state));

    writeln!(
        output,
        "# HELP appservice_tasks_total Total number of tasks by state"
    )
    .ok();
    writeln!(output, "# TYPE appservice_tasks_total gauge").ok();
    for (task_state, count) in summary.iter() {
        writeln!(
            output,
            "appservice_tasks_total{{state=\"{}\"}} {count}",
            task_state.as_str().to_lowercase()
        )
        .ok();
    }
}

/// Collect catalog size.
fn collect_catalog_metrics(state: &AppState, output: &mut String) {
    let apps = state.catalog.list(&CallerContext::anonymous()).len();

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP appservice_apps_total Number of apps in the catalog"
    )
    .ok();
    writeln!(output, "# TYPE appservice_apps_total gauge").ok();
    writeln!(output, "appservice_apps_total {apps}").ok();
}
