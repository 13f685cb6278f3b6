use crate::error::CliError;
use model::execution::{
    job::{JobExecution, JobStatus},
    step::StepName,
};

pub fn print_finished(execution: &JobExecution) {
    println!(
        "Migration finished. ID: {}, Status: {}",
        execution.id, execution.status
    );
    if execution.status == JobStatus::Failed {
        if let Some(step) = execution.failed_step {
            println!("Failed step: {step}");
        }
        if let Some(reason) = &execution.failure {
            println!("Reason: {reason}");
        }
    }
}

pub fn print_history_json(executions: &[JobExecution]) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(executions)?);
    Ok(())
}

pub fn print_history_table(job_name: &str, executions: &[JobExecution]) {
    if executions.is_empty() {
        println!("No executions of job '{job_name}'");
        return;
    }

    println!("Executions of job '{job_name}':");
    println!(
        "{:<6} {:<10} {:<26} {:<9} {:>8} {:>8} {:>8} {:>8}",
        "ID", "Status", "Started", "Failed", "author", "genre", "book", "comment"
    );
    for execution in executions {
        println!("{}", history_row(execution));
    }
}

fn history_row(execution: &JobExecution) -> String {
    let rows = |step: StepName| {
        execution
            .step(step)
            .map(|s| s.rows_committed().to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "{:<6} {:<10} {:<26} {:<9} {:>8} {:>8} {:>8} {:>8}",
        execution.id,
        execution.status.as_str(),
        execution.started_at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        execution
            .failed_step
            .map(|s| s.as_str())
            .unwrap_or("-"),
        rows(StepName::Author),
        rows(StepName::Genre),
        rows(StepName::Book),
        rows(StepName::Comment),
    )
}
