use crate::output::print_json;
use anyhow::Context;
use cadence_core::store;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    store::init(root).context("failed to initialize .claude/ store")?;

    if json {
        print_json(&serde_json::json!({ "initialized": true, "root": root.display().to_string() }))?;
    } else {
        println!("Initialized cadence store in {}", root.join(".claude").display());
    }
    Ok(())
}
