use crate::cmd::plan::split_ids;
use crate::output::{print_json, print_table};
use cadence_core::amendment::{self, AmendmentChange};
use cadence_core::engine::Engine;
use cadence_core::store::ProjectContext;
use cadence_core::task::Task;
use cadence_core::types::TaskPhase;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum AmendSubcommand {
    /// Change a task's title
    SetTitle {
        task_id: String,
        title: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Change a task's description
    SetDescription {
        task_id: String,
        description: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Change a task's estimated hours
    SetHours {
        task_id: String,
        hours: f64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Change a task's lifecycle phase
    SetPhase {
        task_id: String,
        phase: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Replace a task's dependency list (comma-separated ids)
    SetDeps {
        task_id: String,
        depends: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Add a task to the locked plan
    AddTask {
        title: String,
        #[arg(long, default_value = "implementation")]
        phase: String,
        #[arg(long, default_value = "0")]
        hours: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        depends: Option<String>,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Retire a task without deleting it
    Deprecate {
        task_id: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Block a pending task on an external impediment
    Block {
        task_id: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Release a blocked task back to pending
    Unblock {
        task_id: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// Show the amendment log
    Log,
}

pub fn run(root: &Path, subcmd: AmendSubcommand, json: bool) -> anyhow::Result<()> {
    let (change, reason, by) = match subcmd {
        AmendSubcommand::Log => return log(root, json),
        AmendSubcommand::SetTitle {
            task_id,
            title,
            reason,
            by,
        } => (AmendmentChange::SetTitle { task_id, title }, reason, by),
        AmendSubcommand::SetDescription {
            task_id,
            description,
            reason,
            by,
        } => (
            AmendmentChange::SetDescription {
                task_id,
                description,
            },
            reason,
            by,
        ),
        AmendSubcommand::SetHours {
            task_id,
            hours,
            reason,
            by,
        } => (AmendmentChange::SetHours { task_id, hours }, reason, by),
        AmendSubcommand::SetPhase {
            task_id,
            phase,
            reason,
            by,
        } => {
            let phase: TaskPhase = phase.parse()?;
            (AmendmentChange::SetPhase { task_id, phase }, reason, by)
        }
        AmendSubcommand::SetDeps {
            task_id,
            depends,
            reason,
            by,
        } => (
            AmendmentChange::SetDependencies {
                task_id,
                dependencies: split_ids(Some(&depends)),
            },
            reason,
            by,
        ),
        AmendSubcommand::AddTask {
            title,
            phase,
            hours,
            description,
            depends,
            reason,
            by,
        } => {
            let phase: TaskPhase = phase.parse()?;
            let mut task = Task::new("", title, phase);
            task.estimated_hours = hours;
            task.description = description;
            task.dependencies = split_ids(depends.as_deref());
            (AmendmentChange::AddTask { task }, reason, by)
        }
        AmendSubcommand::Deprecate {
            task_id,
            reason,
            by,
        } => (AmendmentChange::Deprecate { task_id }, reason, by),
        AmendSubcommand::Block {
            task_id,
            reason,
            by,
        } => (AmendmentChange::Block { task_id }, reason, by),
        AmendSubcommand::Unblock {
            task_id,
            reason,
            by,
        } => (AmendmentChange::Unblock { task_id }, reason, by),
    };

    let by = by
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "local".to_string());

    let engine = Engine::open(root)?;
    let report = engine.amend_plan(change, &reason, &by)?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Amended {} ({}): {}",
            report.entry.task_id, report.entry.field, report.entry.reason
        );
    }
    Ok(())
}

fn log(root: &Path, json: bool) -> anyhow::Result<()> {
    let ctx = ProjectContext::discover(root)?;
    let entries = amendment::load_log(root, &ctx.plan_id)?;

    if json {
        print_json(&entries)?;
    } else {
        let rows = entries
            .iter()
            .map(|e| {
                vec![
                    e.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    e.task_id.clone(),
                    e.field.clone(),
                    e.reason.clone(),
                    e.amended_by.clone(),
                ]
            })
            .collect();
        print_table(&["WHEN", "TASK", "FIELD", "REASON", "BY"], rows);
    }
    Ok(())
}
