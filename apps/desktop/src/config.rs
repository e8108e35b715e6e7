use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use counter_core::{CounterConfig, EngineError};
use shared::domain::{MAX_LIMIT, MIN_LIMIT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub reset_delay_ms: u64,
    pub min_limit: i64,
    pub max_limit: i64,
    pub initial_count: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/counter.db".into(),
            reset_delay_ms: 3_000,
            min_limit: MIN_LIMIT,
            max_limit: MAX_LIMIT,
            initial_count: 0,
        }
    }
}

impl Settings {
    pub fn counter_config(&self) -> Result<CounterConfig, EngineError> {
        CounterConfig::from_parts(
            self.min_limit,
            self.max_limit,
            Duration::from_millis(self.reset_delay_ms),
            self.initial_count,
        )
    }
}

pub fn load_settings(config_path: &Path) -> Settings {
    load_settings_from(config_path, |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = value` file, then environment variables.
/// Values that fail to parse are ignored.
pub fn load_settings_from(config_path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        if let Ok(table) = toml::from_str::<toml::Table>(&raw) {
            let file_cfg = flatten_table(&table);
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            apply_numeric(&mut settings, |key| file_cfg.get(key).cloned());
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    apply_numeric(&mut settings, |key| env(&format!("APP__{}", key.to_ascii_uppercase())));

    settings
}

fn flatten_table(table: &toml::Table) -> HashMap<String, String> {
    table
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

fn apply_numeric(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = lookup("reset_delay_ms").and_then(|v| v.trim().parse().ok()) {
        settings.reset_delay_ms = parsed;
    }
    if let Some(parsed) = lookup("min_limit").and_then(|v| v.trim().parse().ok()) {
        settings.min_limit = parsed;
    }
    if let Some(parsed) = lookup("max_limit").and_then(|v| v.trim().parse().ok()) {
        settings.max_limit = parsed;
    }
    if let Some(parsed) = lookup("initial_count").and_then(|v| v.trim().parse().ok()) {
        settings.initial_count = parsed;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
