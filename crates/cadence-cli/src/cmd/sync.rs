use crate::output::print_json;
use cadence_core::engine::{Engine, MirrorOutcome};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let engine = Engine::open(root)?;
    let report = engine.sync()?;

    if json {
        print_json(&report)?;
        return Ok(());
    }

    if report.mirrors.is_empty() {
        println!("Nothing to sync");
        return Ok(());
    }
    for m in &report.mirrors {
        match &m.outcome {
            MirrorOutcome::Skipped => println!("{}: skipped", m.task_id),
            MirrorOutcome::Synced { external_id } => match external_id {
                Some(ext) => println!("{}: synced as {ext}", m.task_id),
                None => println!("{}: synced", m.task_id),
            },
            MirrorOutcome::Failed { message } => println!("{}: failed ({message})", m.task_id),
        }
    }
    Ok(())
}
