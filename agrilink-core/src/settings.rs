//! Settings persistence module
//!
//! Saves and loads backend settings to/from disk. Environment variables
//! override whatever is on disk.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.json";
const APP_NAME: &str = "AgriLink";

/// Keys accepted by [`AppSettings::set`]
pub const SETTING_KEYS: [&str; 4] = [
    "supabase_url",
    "supabase_anon_key",
    "site_url",
    "request_timeout_secs",
];

pub const ENV_SUPABASE_URL: &str = "AGRILINK_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "AGRILINK_SUPABASE_ANON_KEY";
pub const ENV_SITE_URL: &str = "AGRILINK_SITE_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "AGRILINK_REQUEST_TIMEOUT_SECS";

/// App settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Supabase project URL
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    /// Public anon key sent as `apikey`
    #[serde(default)]
    pub supabase_anon_key: String,
    /// Where OAuth providers send the user back to
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Upper bound for any single backend call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_supabase_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            supabase_url: default_supabase_url(),
            supabase_anon_key: String::new(),
            site_url: default_site_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// OAuth landing URL inside the app
    pub fn oauth_redirect_url(&self) -> String {
        format!("{}/auth/callback", self.site_url.trim_end_matches('/'))
    }

    /// Update one setting by its file key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            "supabase_url" | "site_url" => {
                url::Url::parse(value).map_err(|e| format!("Invalid URL for {}: {}", key, e))?;
                let value = value.trim_end_matches('/').to_string();
                if key == "supabase_url" {
                    self.supabase_url = value;
                } else {
                    self.site_url = value;
                }
            }
            "supabase_anon_key" => self.supabase_anon_key = value.to_string(),
            "request_timeout_secs" => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => return Err(format!("{} must be a positive number of seconds", key)),
            },
            _ => {
                return Err(format!(
                    "Unknown setting '{}', expected one of: {}",
                    key,
                    SETTING_KEYS.join(", ")
                ));
            }
        }
        debug!("Setting {} updated", key);
        Ok(())
    }

    /// Apply overrides using `lookup` (normally `std::env::var`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SUPABASE_URL) {
            self.supabase_url = url;
        }
        if let Some(key) = lookup(ENV_SUPABASE_ANON_KEY) {
            self.supabase_anon_key = key;
        }
        if let Some(site) = lookup(ENV_SITE_URL) {
            self.site_url = site;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!("Ignoring invalid {}={:?}", ENV_REQUEST_TIMEOUT, raw),
            }
        }
    }
}

/// Get the settings directory path
fn get_settings_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}

/// Get the full path to the settings file
pub fn get_settings_path() -> Option<PathBuf> {
    get_settings_dir().map(|p| p.join(SETTINGS_FILE))
}

/// Load settings from disk, then apply environment overrides
pub fn load_settings() -> AppSettings {
    let mut settings = match get_settings_path() {
        Some(path) => load_settings_from(&path),
        None => {
            debug!("Could not determine settings path, using defaults");
            AppSettings::default()
        }
    };
    settings.apply_overrides(|key| std::env::var(key).ok());
    settings
}

/// Load settings from a specific file. Missing or malformed files yield defaults.
pub fn load_settings_from(path: &std::path::Path) -> AppSettings {
    if !path.exists() {
        debug!("Settings file does not exist, using defaults");
        return AppSettings::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(settings) => {
                info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file: {}", e);
                AppSettings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file: {}", e);
            AppSettings::default()
        }
    }
}

/// Save settings to disk
pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    let dir = get_settings_dir().ok_or_else(|| "Could not determine settings directory".to_string())?;
    save_settings_to(settings, &dir.join(SETTINGS_FILE))
}

pub fn save_settings_to(settings: &AppSettings, path: &std::path::Path) -> Result<(), String> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create settings directory: {}", e))?;
    }

    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    fs::write(path, json).map_err(|e| format!("Failed to write settings file: {}", e))?;
    info!("Saved settings to {:?}", path);
    Ok(())
}
