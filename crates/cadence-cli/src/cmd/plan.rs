use crate::output::{print_json, print_table};
use anyhow::Context;
use cadence_core::engine::Engine;
use cadence_core::plan::Plan;
use cadence_core::store::{self, ProjectContext};
use cadence_core::task::Task;
use cadence_core::types::TaskPhase;
use cadence_core::{paths, CadenceError};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// Create a new draft plan and make it active
    New {
        #[arg(required = true)]
        title: Vec<String>,
        /// Plan id slug (default: derived from the title)
        #[arg(long)]
        slug: Option<String>,
    },
    /// Add a task to the active draft plan
    AddTask {
        #[arg(required = true)]
        title: Vec<String>,
        /// Lifecycle phase: design, implementation, testing, deployment
        #[arg(long, default_value = "implementation")]
        phase: String,
        /// Estimated hours
        #[arg(long, default_value = "0")]
        hours: f64,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated dependency ids (e.g. TASK-001,TASK-002)
        #[arg(long)]
        depends: Option<String>,
        /// Completion criterion (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },
    /// Validate and freeze the active plan; task files become live state
    Lock,
    /// Show a plan document
    Show { plan_id: Option<String> },
    /// List every plan
    List,
    /// Make an existing plan the active one
    Activate { plan_id: String },
    /// Archive a plan (never deletes; clears the active pointer)
    Archive { plan_id: Option<String> },
}

pub fn run(root: &Path, subcmd: PlanSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PlanSubcommand::New { title, slug } => new(root, &title.join(" "), slug.as_deref(), json),
        PlanSubcommand::AddTask {
            title,
            phase,
            hours,
            description,
            depends,
            criteria,
        } => add_task(
            root,
            &title.join(" "),
            &phase,
            hours,
            description,
            depends.as_deref(),
            criteria,
            json,
        ),
        PlanSubcommand::Lock => lock(root, json),
        PlanSubcommand::Show { plan_id } => show(root, plan_id.as_deref(), json),
        PlanSubcommand::List => list(root, json),
        PlanSubcommand::Activate { plan_id } => activate(root, &plan_id, json),
        PlanSubcommand::Archive { plan_id } => archive(root, plan_id.as_deref(), json),
    }
}

fn new(root: &Path, title: &str, slug: Option<&str>, json: bool) -> anyhow::Result<()> {
    if !root.join(paths::CLAUDE_DIR).is_dir() {
        return Err(CadenceError::NotInitialized.into());
    }

    let slug = match slug {
        Some(s) => s.to_string(),
        None => slugify(title),
    };
    paths::validate_slug(&slug)?;

    let next = Plan::list(root)?
        .iter()
        .filter_map(|p| paths::plan_id_number(&p.plan_id))
        .max()
        .unwrap_or(0)
        + 1;
    let plan_id = paths::format_plan_id(next, &slug);

    if paths::plan_dir(root, &plan_id).exists() {
        return Err(CadenceError::PlanExists(plan_id).into());
    }

    let plan = Plan::new(plan_id.clone(), title);
    plan.save(root).context("failed to write plan document")?;
    store::set_active_plan(root, &plan_id)?;

    if json {
        print_json(&serde_json::json!({ "planId": plan_id, "title": title, "active": true }))?;
    } else {
        println!("Created plan {plan_id}: {title}");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn add_task(
    root: &Path,
    title: &str,
    phase: &str,
    hours: f64,
    description: Option<String>,
    depends: Option<&str>,
    criteria: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = ProjectContext::discover(root)?;
    let mut plan = Plan::load(root, &ctx.plan_id)?;

    let phase: TaskPhase = phase.parse()?;
    let mut task = Task::new("", title, phase);
    task.estimated_hours = hours;
    task.description = description;
    task.dependencies = split_ids(depends);
    task.completion_criteria = criteria;

    let id = plan.add_draft_task(task)?;
    plan.save(root).context("failed to write plan document")?;

    if json {
        print_json(&serde_json::json!({ "planId": ctx.plan_id, "taskId": id, "title": title }))?;
    } else {
        println!("Added {id}: {title}");
    }
    Ok(())
}

fn lock(root: &Path, json: bool) -> anyhow::Result<()> {
    let engine = Engine::open(root)?;
    let report = engine.lock_plan()?;

    if json {
        print_json(&report)?;
    } else if report.already_locked {
        println!(
            "Plan {} is already locked ({} tasks)",
            report.plan_id,
            report.statistics.total()
        );
    } else {
        println!(
            "Locked plan {} with {} tasks",
            report.plan_id,
            report.statistics.total()
        );
        for m in &report.mirrors {
            println!("  mirror {}: {:?}", m.task_id, m.outcome);
        }
    }
    Ok(())
}

fn show(root: &Path, plan_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let plan_id = match plan_id {
        Some(id) => id.to_string(),
        None => ProjectContext::discover(root)?.plan_id,
    };
    let plan = Plan::load(root, &plan_id)?;

    if json {
        print_json(&plan)?;
    } else {
        println!("{} — {}", plan.plan_id, plan.title);
        println!(
            "  structure: {}, locked: {}, tasks: {}",
            plan.structure,
            plan.is_locked(),
            plan.flatten().len()
        );
        for t in plan.flatten() {
            let deps = if t.dependencies.is_empty() {
                String::new()
            } else {
                format!(" (after {})", t.dependencies.join(", "))
            };
            println!("  [{}] {} — {}{}", t.id, t.phase, t.title, deps);
        }
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let plans = Plan::list(root)?;
    let active = store::active_plan(root)?;

    if json {
        let items: Vec<_> = plans
            .iter()
            .map(|p| {
                serde_json::json!({
                    "planId": p.plan_id,
                    "title": p.title,
                    "locked": p.is_locked(),
                    "archived": store::is_archived(root, &p.plan_id),
                    "active": active.as_deref() == Some(p.plan_id.as_str()),
                })
            })
            .collect();
        print_json(&items)?;
    } else {
        let rows = plans
            .iter()
            .map(|p| {
                vec![
                    p.plan_id.clone(),
                    p.title.clone(),
                    if p.is_locked() { "locked" } else { "draft" }.to_string(),
                    if store::is_archived(root, &p.plan_id) {
                        "archived"
                    } else if active.as_deref() == Some(p.plan_id.as_str()) {
                        "active"
                    } else {
                        ""
                    }
                    .to_string(),
                ]
            })
            .collect();
        print_table(&["PLAN", "TITLE", "STATE", ""], rows);
    }
    Ok(())
}

fn activate(root: &Path, plan_id: &str, json: bool) -> anyhow::Result<()> {
    if store::is_archived(root, plan_id) {
        return Err(CadenceError::PlanNotFound(format!("{plan_id} (archived)")).into());
    }
    store::set_active_plan(root, plan_id)?;

    if json {
        print_json(&serde_json::json!({ "planId": plan_id, "active": true }))?;
    } else {
        println!("Activated {plan_id}");
    }
    Ok(())
}

fn archive(root: &Path, plan_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let plan_id = match plan_id {
        Some(id) => id.to_string(),
        None => ProjectContext::discover(root)?.plan_id,
    };
    store::archive_plan(root, &plan_id)?;

    if json {
        print_json(&serde_json::json!({ "planId": plan_id, "archived": true }))?;
    } else {
        println!("Archived {plan_id}");
    }
    Ok(())
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').chars().take(64).collect()
}

pub fn split_ids(csv: Option<&str>) -> Vec<String> {
    csv.map(|s| {
        s.split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
