use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::routines::RoutineKind;

/// One logical account: a window to drive and the routine to run in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Regex matched against window titles.
    pub window_title: String,
    pub routine: RoutineKind,
    /// How many rounds to run before the worker retires.
    pub rounds: u32,
    /// This account starts rounds for the party.
    pub leader: bool,
    /// This account carries the damage (affects unit saturation).
    pub main_damage: bool,
    /// The game renders inside an embedded client area with its own
    /// title strip; capture must shift down past it.
    pub nested_client: bool,
    /// When set, taps and swipes go to this device over the device
    /// bridge instead of the window.
    pub device_serial: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            window_title: String::new(),
            routine: RoutineKind::ExplorationSolo,
            rounds: 1,
            leader: false,
            main_damage: false,
            nested_client: false,
            device_serial: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub accounts: Vec<AccountConfig>,
    pub references_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// Swap out saturated units between rounds.
    pub replace_saturated_units: bool,
    /// End the whole process when a hard wait times out.
    pub quit_on_timeout: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            references_dir: PathBuf::from("references"),
            screenshots_dir: PathBuf::from("screenshots"),
            logs_dir: PathBuf::from("logs"),
            replace_saturated_units: false,
            quit_on_timeout: true,
        }
    }
}

/// The process-wide toggles every worker shares.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub replace_saturated_units: bool,
    pub quit_on_timeout: bool,
    pub screenshots_dir: PathBuf,
}

impl Settings {
    pub fn policy(&self) -> RunPolicy {
        RunPolicy {
            replace_saturated_units: self.replace_saturated_units,
            quit_on_timeout: self.quit_on_timeout,
            screenshots_dir: self.screenshots_dir.clone(),
        }
    }

    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }
}
