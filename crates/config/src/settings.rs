// Application settings
// Loaded from ~/.config/hourgrid/settings.json

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hourgrid_engine::{ReconcileOptions, ViewMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // API
    /// Used by `hgrid login` when no `--api-base` is given
    #[serde(rename = "api.baseUrl")]
    pub api_base_url: String,

    #[serde(rename = "api.requestTimeoutSecs")]
    pub request_timeout_secs: u64,

    // Grid
    #[serde(rename = "grid.defaultView")]
    pub default_view: ViewMode,

    /// Refuse to create entries without an owner
    #[serde(rename = "grid.requireOwner")]
    pub require_owner: bool,

    /// Category context loaded when `--context` is omitted
    #[serde(rename = "grid.categoryContext")]
    pub category_context: Option<String>,

    /// Owner candidates offered by the picker
    #[serde(rename = "grid.owners")]
    pub owners: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            default_view: ViewMode::Month,
            require_owner: false,
            category_context: None,
            owners: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hourgrid");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file is created with the
    /// commented defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring `//` comment lines.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions { require_owner: self.require_owner }
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // API endpoint used by `hgrid login` when --api-base is omitted
    "api.baseUrl": "http://localhost:8080",
    "api.requestTimeoutSecs": 30,

    // View opened by `hgrid show` / `hgrid edit`: "week", "fifteen_day", "month"
    "grid.defaultView": "month",

    // Refuse to create entries that have no owner
    "grid.requireOwner": false,

    // Category context used when --context is omitted
    "grid.categoryContext": null,

    // Owners offered by the picker (Ctrl+O in the editor)
    "grid.owners": []
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
