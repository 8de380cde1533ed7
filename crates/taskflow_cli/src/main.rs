//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `taskflow_core` linkage without the Flutter runtime.
//! - Exercise one recurring completion against an in-memory store.

use taskflow_core::model::recurrence::RecurrencePattern;
use taskflow_core::{open_db_in_memory, NewTask, SqliteTaskRepository, TaskService};

fn main() {
    println!("taskflow_core ping={}", taskflow_core::ping());
    println!("taskflow_core version={}", taskflow_core::core_version());

    if let Err(err) = recurring_probe() {
        eprintln!("taskflow_core probe=error message={err}");
        std::process::exit(1);
    }
}

fn recurring_probe() -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn)?);

    let task = service.create_task(NewTask {
        due_at: Some(0),
        recurrence: Some(RecurrencePattern::weekly().every(2)),
        ..NewTask::titled("probe")
    })?;
    let outcome = service.complete_task(task.id)?;
    let next_due = outcome.successor.and_then(|next| next.due_at);
    println!(
        "taskflow_core probe=ok successor_due_at={}",
        next_due.map_or_else(|| "none".to_string(), |due| due.to_string())
    );
    Ok(())
}
