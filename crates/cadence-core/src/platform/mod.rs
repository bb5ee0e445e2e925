//! Platform detection and the routing layer that mirrors local task state
//! into an external issue tracker. The lifecycle engine talks only to the
//! `IssueTracker` trait; backend choice happens once, at construction.

pub mod azure;
pub mod github;
pub mod router;

pub use router::IssueTracker;

use crate::config::TrackerConfig;
use crate::shell::Shell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Github,
    Azure,
    None,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Github => "github",
            Platform::Azure => "azure",
            Platform::None => "none",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

static DETECT_CACHE: OnceLock<Mutex<HashMap<String, Platform>>> = OnceLock::new();

fn cache() -> &'static Mutex<HashMap<String, Platform>> {
    DETECT_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Drop cached detection results. Tests that reuse a root path between
/// scenarios need this; production runs never do.
pub fn clear_cache() {
    if let Ok(mut map) = cache().lock() {
        map.clear();
    }
}

/// Classify a git remote URL. Ambiguous or malformed remotes degrade to
/// `None` rather than raising: callers treat `None` as "operate locally
/// only, skip external mirroring."
pub fn classify_remote(url: &str) -> Platform {
    if url.contains("github.com") {
        Platform::Github
    } else if url.contains("dev.azure.com") {
        Platform::Azure
    } else {
        Platform::None
    }
}

/// Infer which backend governs the repository at `root`. An explicit
/// override (`auto_detect == false`) wins without touching git; otherwise
/// the origin remote is inspected once per process and cached per root.
pub fn detect(root: &Path, config: &TrackerConfig, shell: &dyn Shell) -> Platform {
    if !config.auto_detect {
        return config.override_platform.unwrap_or(Platform::None);
    }

    let key = root.display().to_string();
    if let Ok(map) = cache().lock() {
        if let Some(&cached) = map.get(&key) {
            return cached;
        }
    }

    let platform = match shell.run("git", &["-C", &key, "remote", "get-url", "origin"]) {
        Ok(out) if out.success() => classify_remote(out.stdout.trim()),
        _ => Platform::None,
    };

    if let Ok(mut map) = cache().lock() {
        map.insert(key, platform);
    }
    platform
}

// ---------------------------------------------------------------------------
// PlatformBinding
// ---------------------------------------------------------------------------

/// Computed once per invocation, never persisted: which backend governs the
/// repository and, if mirroring is enabled, a ready tracker for it.
pub struct PlatformBinding {
    pub platform: Platform,
    pub tracker: Option<Box<dyn IssueTracker>>,
}

impl PlatformBinding {
    /// Local-only binding: no detection, no external calls.
    pub fn none() -> Self {
        Self {
            platform: Platform::None,
            tracker: None,
        }
    }

    /// Wrap a pre-built tracker. Tests inject doubles this way.
    pub fn with_tracker(tracker: Box<dyn IssueTracker>) -> Self {
        Self {
            platform: tracker.platform(),
            tracker: Some(tracker),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.tracker.is_some()
    }

    /// Detect the platform and construct the matching adapter.
    pub fn resolve(root: &Path, config: &TrackerConfig, shell: Arc<dyn Shell>) -> Self {
        if !config.enabled {
            return Self::none();
        }
        let platform = detect(root, config, shell.as_ref());
        let tracker: Option<Box<dyn IssueTracker>> = match platform {
            Platform::Github => Some(Box::new(github::GithubTracker::new(shell, config))),
            Platform::Azure => Some(Box::new(azure::AzureTracker::new(shell, config))),
            Platform::None => None,
        };
        Self { platform, tracker }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
