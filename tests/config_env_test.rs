use amigo::Settings;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_env_overrides_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");

    fs::write(
        &config_path,
        r#"
[server]
port = 8000
host = "assets.local"

[watch]
extensions = ["png"]
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("AMIGO_SERVER__PORT", "9999");
        env::set_var("AMIGO_WATCH__SYNC_REGISTRY", "false");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("AMIGO_SERVER__PORT");
        env::remove_var("AMIGO_WATCH__SYNC_REGISTRY");
    }

    // Env var beats the file
    assert_eq!(settings.server.port, 9999);
    // File value stays when no env var is set
    assert_eq!(settings.server.host, "assets.local");
    assert!(!settings.watch.sync_registry);
    assert_eq!(settings.watch.extensions, vec!["png"]);
    assert_eq!(settings.url_builder().base(), "http://assets.local:9999");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings::load_from(temp_dir.path().join("nope.toml")).unwrap();

    assert_eq!(settings.server.host, "localhost");
    assert!(settings.watch.directories.is_empty());
}
