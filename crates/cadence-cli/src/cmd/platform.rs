use crate::output::print_json;
use cadence_core::config::TrackerConfig;
use cadence_core::platform;
use cadence_core::shell::SystemShell;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = TrackerConfig::load(root)?;
    let detected = platform::detect(root, &config, &SystemShell);

    if json {
        print_json(&serde_json::json!({
            "platform": detected,
            "enabled": config.enabled,
            "autoDetect": config.auto_detect,
            "overridePlatform": config.override_platform,
            "owner": config.owner,
            "project": config.project,
        }))?;
    } else {
        println!("Platform: {detected}");
        if !config.enabled {
            println!("  mirroring disabled in .claude/tracker.json");
        } else if !config.auto_detect {
            println!("  explicit override (autoDetect off)");
        } else {
            println!("  detected from the git origin remote");
        }
    }
    Ok(())
}
