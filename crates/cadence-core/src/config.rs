use crate::error::Result;
use crate::platform::Platform;
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Issue-tracker settings, loaded from `.claude/tracker.json`. A missing
/// file means defaults: mirroring enabled, platform auto-detected from the
/// git remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default = "default_true")]
    pub auto_update: bool,
    #[serde(default = "default_true")]
    pub auto_close: bool,
    /// GitHub owner/org, or Azure DevOps organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// GitHub repository, or Azure DevOps project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default = "default_true")]
    pub auto_detect: bool,
    /// Honored only when `auto_detect` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_platform: Option<Platform>,
}

fn default_true() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_create: true,
            auto_update: true,
            auto_close: true,
            owner: None,
            project: None,
            auto_detect: true,
            override_platform: None,
        }
    }
}

impl TrackerConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::tracker_config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        io::read_json(&path)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_json(&paths::tracker_config_path(root), self)
    }
}
