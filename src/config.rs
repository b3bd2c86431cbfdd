//! Two-tier query configuration.
//!
//! Settings are read from the local (per-query) tier first and fall back to
//! the global tier, which is shared by every builder holding the same
//! [`GlobalSettings`] handle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{Error, Result};

/// A flat settings map.
pub type Settings = Map<String, Value>;

/// Contract for anything that can configure a query.
pub trait ConfigProvider {
    /// Look a setting up, preferring local values.
    fn get(&self, name: &str) -> Option<Value>;

    /// Set one local setting.
    fn add(&mut self, name: &str, value: Value);

    /// Set several local settings at once.
    fn add_many(&mut self, settings: Settings) {
        for (name, value) in settings {
            self.add(&name, value);
        }
    }

    fn has(&self, name: &str) -> bool;

    /// Global settings merged under local ones.
    fn dump(&self) -> Settings;
}

/// Settings every fresh global tier starts with.
pub fn default_settings() -> Settings {
    let defaults = json!({
        "posts_per_page": -1,
        "post_type": "any",
        "post_status": "publish",
        "return": "array",
    });
    match defaults {
        Value::Object(map) => map,
        _ => Settings::new(),
    }
}

/// Default location of the global settings file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("postql").join("config.toml"))
}

static PROCESS: OnceLock<GlobalSettings> = OnceLock::new();

/// Shared handle to a global settings tier.
#[derive(Debug, Clone)]
pub struct GlobalSettings {
    inner: Arc<RwLock<Settings>>,
}

impl GlobalSettings {
    /// The process-wide tier used by [`QueryBuilder::new`](crate::QueryBuilder::new).
    pub fn process() -> GlobalSettings {
        PROCESS.get_or_init(GlobalSettings::isolated).clone()
    }

    /// A private tier initialized with the defaults.
    pub fn isolated() -> GlobalSettings {
        GlobalSettings {
            inner: Arc::new(RwLock::new(default_settings())),
        }
    }

    /// Restore the defaults, dropping every other setting.
    pub fn reset(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = default_settings();
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn set_many(&self, settings: Settings) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in settings {
            guard.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn snapshot(&self) -> Settings {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Merge the top-level table of a TOML file into this tier.
    pub fn load_toml(&self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let settings = parse_toml(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), keys = settings.len(), "loaded global settings");
        self.set_many(settings);
        Ok(())
    }
}

fn parse_toml(content: &str) -> std::result::Result<Settings, toml::de::Error> {
    toml::from_str::<Settings>(content)
}

/// The default provider: local settings layered over a global tier.
#[derive(Debug, Clone)]
pub struct Configurator {
    local: Settings,
    global: GlobalSettings,
}

impl Configurator {
    pub fn new(global: GlobalSettings) -> Self {
        Self {
            local: Settings::new(),
            global,
        }
    }

    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    pub fn local(&self) -> &Settings {
        &self.local
    }
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new(GlobalSettings::process())
    }
}

impl ConfigProvider for Configurator {
    fn get(&self, name: &str) -> Option<Value> {
        self.local.get(name).cloned().or_else(|| self.global.get(name))
    }

    fn add(&mut self, name: &str, value: Value) {
        self.local.insert(name.to_string(), value);
    }

    fn has(&self, name: &str) -> bool {
        self.local.contains_key(name) || self.global.has(name)
    }

    fn dump(&self) -> Settings {
        let mut merged = self.global.snapshot();
        for (name, value) in &self.local {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configurator::new(GlobalSettings::isolated());
        assert_eq!(config.get("posts_per_page"), Some(json!(-1)));
        assert_eq!(config.get("post_type"), Some(json!("any")));
        assert_eq!(config.get("post_status"), Some(json!("publish")));
        assert_eq!(config.get("return"), Some(json!("array")));
        assert!(!config.has("orderby"));
    }

    #[test]
    fn test_local_overrides_global() {
        let global = GlobalSettings::isolated();
        global.set("posts_per_page", 10);
        let mut config = Configurator::new(global.clone());
        config.add("posts_per_page", json!(3));

        assert_eq!(config.get("posts_per_page"), Some(json!(3)));
        assert_eq!(config.dump().get("posts_per_page"), Some(&json!(3)));
        assert_eq!(global.get("posts_per_page"), Some(json!(10)));
    }

    #[test]
    fn test_global_is_shared_between_configurators() {
        let global = GlobalSettings::isolated();
        let a = Configurator::new(global.clone());
        let b = Configurator::new(global.clone());
        global.set("return", "argument");
        assert_eq!(a.get("return"), Some(json!("argument")));
        assert_eq!(b.get("return"), Some(json!("argument")));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let global = GlobalSettings::isolated();
        global.set("orderby", "title");
        global.set("return", "count");
        global.reset();
        assert!(!global.has("orderby"));
        assert_eq!(global.get("return"), Some(json!("array")));
    }

    #[test]
    fn test_add_many() {
        let mut config = Configurator::new(GlobalSettings::isolated());
        let mut settings = Settings::new();
        settings.insert("post_status".into(), json!("draft"));
        settings.insert("orderby".into(), json!("date"));
        config.add_many(settings);
        assert_eq!(config.get("post_status"), Some(json!("draft")));
        assert_eq!(config.local().len(), 2);
    }

    #[test]
    fn test_parse_toml_table() {
        let settings = parse_toml("return = \"argument\"\nposts_per_page = 20\n").unwrap();
        assert_eq!(settings.get("return"), Some(&json!("argument")));
        assert_eq!(settings.get("posts_per_page"), Some(&json!(20)));
    }

    #[test]
    fn test_parse_toml_error() {
        assert!(parse_toml("return = ").is_err());
    }
}
