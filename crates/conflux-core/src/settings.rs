//! Process-wide engine settings
//!
//! Behavior toggles are read once at startup and are read-only afterwards.
//! The out-of-scope engine bootstrap is expected to call [`init`] before
//! any evaluation traffic; when it never does, every toggle stays at its
//! default (off).

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Engine-wide behavior toggles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Missing trailing-path segments resolve to null instead of erroring
    #[serde(default)]
    pub skip_missing_paths: bool,

    /// The mapper tolerates unresolvable fields (null / empty array)
    /// instead of aborting the whole Apply
    #[serde(default)]
    pub relaxed_mapping: bool,
}

impl EngineSettings {
    /// Parse settings from a YAML snippet.
    ///
    /// ```yaml
    /// skip_missing_paths: true
    /// relaxed_mapping: false
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read settings from `CONFLUX_SKIP_MISSING_PATHS` and
    /// `CONFLUX_RELAXED_MAPPING` (`1` or `true` enable a toggle).
    pub fn from_env() -> Self {
        Self {
            skip_missing_paths: env_flag("CONFLUX_SKIP_MISSING_PATHS"),
            relaxed_mapping: env_flag("CONFLUX_RELAXED_MAPPING"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

static SETTINGS: OnceCell<EngineSettings> = OnceCell::new();

/// Install the process-wide settings.
///
/// Returns false when settings were already installed (the first
/// installation wins).
pub fn init(settings: EngineSettings) -> bool {
    SETTINGS.set(settings).is_ok()
}

/// The installed process-wide settings, or the defaults when [`init`]
/// was never called.
pub fn settings() -> EngineSettings {
    SETTINGS.get().copied().unwrap_or_default()
}
