use herald::{Config, ExecutionStrategy, Notifier, NotifyFormat};
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// A helper function to run a test with a temporary config file.
fn with_config_file<F>(toml_content: &str, test_fn: F)
where
    F: FnOnce(PathBuf),
{
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    let path = file.path().to_path_buf();
    test_fn(path);
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let toml_content = r#"
        log_level = "debug"
        strategy = "concurrent"
        suppress_construction_errors = false
        [asset]
        app_id = "Pager"
        app_desc = "Pager alerts"
        body_format = "markdown"
        interpret_escapes = true
        secure_logging = false
        async_mode = false
    "#;
    with_config_file(toml_content, |path| {
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.strategy, ExecutionStrategy::Concurrent);
        assert!(!config.suppress_construction_errors);
        assert_eq!(config.asset.app_id, "Pager");
        assert_eq!(config.asset.body_format, Some(NotifyFormat::Markdown));
        assert!(config.asset.interpret_escapes);
        assert!(!config.asset.secure_logging);
        assert!(!config.asset.async_mode);
        // Unset asset fields keep their defaults.
        assert_eq!(config.asset.app_url, herald::Asset::default().app_url);
    });
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let config = Config::load(None).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    with_config_file("strategy = \"concurrent\"\n[asset]\napp_id = \"File\"\n", |path| {
        std::env::set_var("HERALD_STRATEGY", "sequential");
        std::env::set_var("HERALD_ASSET__APP_ID", "Env");
        let config = Config::load(Some(&path));
        std::env::remove_var("HERALD_STRATEGY");
        std::env::remove_var("HERALD_ASSET__APP_ID");

        let config = config.unwrap();
        assert_eq!(config.strategy, ExecutionStrategy::Sequential);
        assert_eq!(config.asset.app_id, "Env");
    });
}

#[test]
#[serial]
fn test_invalid_strategy_is_rejected() {
    with_config_file("strategy = \"parallel\"\n", |path| {
        assert!(Config::load(Some(&path)).is_err());
    });
}

#[test]
#[serial]
fn test_notifier_from_loaded_config() {
    with_config_file("strategy = \"concurrent\"\n[asset]\napp_id = \"Ops\"\n", |path| {
        let config = Config::load(Some(&path)).unwrap();
        let mut notifier = Notifier::from_config(&config);
        assert_eq!(notifier.strategy(), ExecutionStrategy::Concurrent);
        assert_eq!(notifier.asset().app_id, "Ops");
        assert!(notifier.add("log://", &[]).unwrap());
        assert_eq!(notifier.details(None).asset["app_id"], "Ops");
    });
}
