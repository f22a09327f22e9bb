//! Event Settings - explicit load/save store
//!
//! Operator settings live behind [`SettingsStore`]; the core only ever sees
//! the immutable values handed to it per call.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;
use crate::placement::PlacementConfig;
use crate::roster::parse_categories;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSettings {
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// `YYYY-MM-DD`
    #[serde(default = "default_event_date")]
    pub event_date: String,
    #[serde(default)]
    pub event_venue: String,
    #[serde(default)]
    pub event_topic: String,
    #[serde(default)]
    pub organizer: String,
    /// Comma separated category list offered at registration.
    #[serde(default = "default_categories")]
    pub categories: String,
    #[serde(default)]
    pub placement: PlacementConfig,
}

fn default_event_name() -> String { "Certificate of Participation".to_string() }
fn default_event_date() -> String { Local::now().format("%Y-%m-%d").to_string() }
fn default_categories() -> String { "Participate,Teacher".to_string() }

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            event_name: default_event_name(),
            event_date: default_event_date(),
            event_venue: String::new(),
            event_topic: String::new(),
            organizer: String::new(),
            categories: default_categories(),
            placement: PlacementConfig::default(),
        }
    }
}

impl EventSettings {
    pub fn category_list(&self) -> Vec<String> {
        parse_categories(&self.categories)
    }

    /// Archive file name, e.g. `Certificate_of_Participation_Certificates.zip`.
    pub fn archive_name(&self) -> String {
        format!("{}_Certificates.zip", self.event_name.replace(' ', "_"))
    }
}

pub trait SettingsStore {
    fn load(&self) -> Result<EventSettings>;
    fn save(&self, settings: &EventSettings) -> Result<()>;
}

/// Settings persisted as a pretty-printed JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonSettingsStore {
    /// Defaults when the file does not exist yet.
    fn load(&self) -> Result<EventSettings> {
        if !self.path.exists() {
            return Ok(EventSettings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, settings: &EventSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    inner: Mutex<Option<EventSettings>>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<EventSettings> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, settings: &EventSettings) -> Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(settings.clone());
        Ok(())
    }
}
