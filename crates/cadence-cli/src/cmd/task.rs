use crate::output::{print_json, print_table};
use cadence_core::engine::{Engine, MirrorOutcome};
use cadence_core::task::Task;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Start a task (one task in flight at a time)
    Start { task_id: String },
    /// Complete the task currently in progress
    Complete,
    /// Reset a task to pending
    Reset {
        task_id: String,
        /// Required to reset a task that is not in progress
        #[arg(long)]
        force: bool,
    },
    /// List every task with its status
    List,
    /// Show the tasks whose dependencies are all satisfied
    Next,
    /// Show full details for one task
    Show { task_id: String },
    /// Post a comment on a task's mirrored issue or work item
    Comment {
        task_id: String,
        /// Comment text (joined with spaces)
        #[arg(required = true)]
        text: Vec<String>,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let engine = Engine::open(root)?;
    match subcmd {
        TaskSubcommand::Start { task_id } => start(&engine, &task_id, json),
        TaskSubcommand::Complete => complete(&engine, json),
        TaskSubcommand::Reset { task_id, force } => reset(&engine, &task_id, force, json),
        TaskSubcommand::List => list(&engine, json),
        TaskSubcommand::Next => next(&engine, json),
        TaskSubcommand::Show { task_id } => show(&engine, &task_id, json),
        TaskSubcommand::Comment { task_id, text } => {
            comment(&engine, &task_id, &text.join(" "), json)
        }
    }
}

fn comment(engine: &Engine, task_id: &str, text: &str, json: bool) -> anyhow::Result<()> {
    let report = engine.comment_task(task_id, text)?;
    if json {
        print_json(&report)?;
    } else {
        match &report.outcome {
            MirrorOutcome::Synced { .. } => println!("Commented on {}", report.task_id),
            MirrorOutcome::Skipped => {
                println!("{} has no mirrored item; comment not sent", report.task_id)
            }
            MirrorOutcome::Failed { message } => {
                println!("Warning: comment on {} failed: {message}", report.task_id)
            }
        }
    }
    Ok(())
}

fn start(engine: &Engine, task_id: &str, json: bool) -> anyhow::Result<()> {
    let report = engine.start_task(task_id)?;
    if json {
        print_json(&report)?;
    } else {
        println!("Started {}: {}", report.task.id, report.task.title);
    }
    Ok(())
}

fn complete(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let report = engine.complete_active_task()?;
    if json {
        print_json(&report)?;
    } else {
        println!("Completed {}: {}", report.task.id, report.task.title);
    }
    Ok(())
}

fn reset(engine: &Engine, task_id: &str, force: bool, json: bool) -> anyhow::Result<()> {
    let report = engine.reset_task(task_id, force)?;
    if json {
        print_json(&report)?;
    } else {
        println!("Reset {} to pending", report.task.id);
    }
    Ok(())
}

fn list(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let tasks = engine.tasks()?;
    if json {
        print_json(&tasks)?;
    } else {
        let rows = tasks.iter().map(task_row).collect();
        print_table(&["TASK", "STATUS", "PHASE", "TITLE", "DEPENDS"], rows);
    }
    Ok(())
}

fn next(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let status = engine.status()?;
    if json {
        print_json(&status.ready_tasks)?;
    } else if let Some(active) = &status.active_task {
        println!("In progress: {active} (complete it before starting another)");
    } else if status.ready_tasks.is_empty() {
        println!("No tasks are ready");
    } else {
        println!("Ready: {}", status.ready_tasks.join(", "));
    }
    Ok(())
}

fn show(engine: &Engine, task_id: &str, json: bool) -> anyhow::Result<()> {
    let tasks = engine.tasks()?;
    let task = cadence_core::task::find(&tasks, task_id)?;

    if json {
        print_json(task)?;
    } else {
        println!("[{}] {} — {}", task.id, task.status, task.title);
        println!("  phase: {}, estimated: {}h", task.phase, task.estimated_hours);
        if let Some(d) = &task.description {
            println!("  {d}");
        }
        if !task.dependencies.is_empty() {
            println!("  depends: {}", task.dependencies.join(", "));
        }
        for c in &task.completion_criteria {
            println!("  - [ ] {c}");
        }
        if let Some(ext) = &task.external_issue {
            println!("  external: {ext}");
        }
        if task.deprecated {
            println!("  deprecated");
        }
    }
    Ok(())
}

fn task_row(t: &Task) -> Vec<String> {
    vec![
        t.id.clone(),
        if t.deprecated {
            "deprecated".to_string()
        } else {
            t.status.to_string()
        },
        t.phase.to_string(),
        t.title.clone(),
        t.dependencies.join(","),
    ]
}
