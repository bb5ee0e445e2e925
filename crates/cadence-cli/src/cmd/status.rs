use crate::output::print_json;
use cadence_core::engine::Engine;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let engine = Engine::open(root)?;
    let status = engine.status()?;

    if json {
        print_json(&status)?;
        return Ok(());
    }

    println!("{} — {}", status.plan_id, status.title);
    if !status.locked {
        println!(
            "  draft ({} tasks); run 'cadence plan lock' to begin",
            status.statistics.total()
        );
        return Ok(());
    }

    let s = &status.statistics;
    println!(
        "  {} pending, {} in progress, {} completed, {} blocked (platform: {})",
        s.pending, s.in_progress, s.completed, s.blocked, status.platform
    );
    match &status.active_task {
        Some(id) => println!("  in progress: {id}"),
        None if !status.ready_tasks.is_empty() => {
            println!("  ready: {}", status.ready_tasks.join(", "))
        }
        None if s.completed == s.total() && s.total() > 0 => println!("  all tasks completed"),
        None => println!("  no tasks are ready"),
    }
    Ok(())
}
