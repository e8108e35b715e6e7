use super::*;

use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&temp_root.path().join("absent.toml"), no_env);
    assert_eq!(settings, Settings::default());

    let config = settings.counter_config().expect("config");
    assert_eq!(config.reset_delay, Duration::from_secs(3));
    assert_eq!(config.limits.min(), 0);
    assert_eq!(config.limits.max(), 10);
}

#[test]
fn file_values_accept_strings_and_integers() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let path = temp_root.path().join("counter.toml");
    fs::write(
        &path,
        "database_url = \"sqlite://./data/alt.db\"\nreset_delay_ms = 1500\nmax_limit = \"20\"\n",
    )
    .expect("write config");

    let settings = load_settings_from(&path, no_env);
    assert_eq!(settings.database_url, "sqlite://./data/alt.db");
    assert_eq!(settings.reset_delay_ms, 1_500);
    assert_eq!(settings.max_limit, 20);
    assert_eq!(settings.min_limit, 0);
}

#[test]
fn environment_overrides_file_and_ignores_garbage() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let path = temp_root.path().join("counter.toml");
    fs::write(&path, "reset_delay_ms = 1500\ninitial_count = 4\n").expect("write config");

    let env: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "sqlite://./data/env.db"),
        ("APP__DATABASE_URL", "sqlite://./data/app.db"),
        ("APP__RESET_DELAY_MS", "250"),
        ("APP__INITIAL_COUNT", "not-a-number"),
    ]);
    let settings = load_settings_from(&path, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(settings.database_url, "sqlite://./data/app.db");
    assert_eq!(settings.reset_delay_ms, 250);
    assert_eq!(settings.initial_count, 4);
}

#[test]
fn inverted_limits_fail_to_build_counter_config() {
    let settings = Settings {
        min_limit: 5,
        max_limit: 1,
        ..Settings::default()
    };
    assert!(matches!(
        settings.counter_config(),
        Err(EngineError::InvalidLimits(_))
    ));
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("   "), Settings::default().database_url);
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("counter.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
