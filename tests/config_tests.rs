use relief_verify::config::{EngineConfig, StoreBackend};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = EngineConfig::default();

    assert_eq!(config.gathering.check_timeout_ms, 10_000);
    assert_eq!(config.gathering.case_budget_ms, 30_000);
    assert_eq!(config.gathering.max_location_hints, 2);

    assert_eq!(config.scoring.no_data, 50);
    assert_eq!(config.scoring.very_new_domain, 30);
    assert_eq!(config.scoring.new_domain, 15);
    assert_eq!(config.scoring.scam_high, 40);
    assert_eq!(config.scoring.scam_low, 20);
    assert_eq!(config.scoring.unregistered_org, 25);

    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert!(config.providers.scam_database_url.is_none());
    assert!(!config.providers.search_enabled());
    assert!(config.narrative.gemini_api_key.is_none());

    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let config: EngineConfig = toml::from_str(
        r#"
        [gathering]
        check_timeout_ms = 2500

        [store]
        backend = "files"
        path = "/var/lib/relief"
        "#,
    )
    .unwrap();

    assert_eq!(config.gathering.check_timeout_ms, 2500);
    assert_eq!(config.gathering.case_budget_ms, 30_000);
    assert_eq!(config.store.backend, StoreBackend::Files);
    assert_eq!(config.scoring.no_data, 50);
}

#[test]
fn test_invalid_values_rejected() {
    let mut config = EngineConfig::default();
    config.gathering.case_budget_ms = 0;
    config.narrative.max_tokens = 0;
    config.scoring.very_new_domain_days = 0;

    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("case_budget_ms"));
    assert!(err.contains("max_tokens"));
    assert!(err.contains("very_new_domain_days"));
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("relief-verify.toml");

    let mut config = EngineConfig::default();
    config.gathering.case_budget_ms = 12_000;
    config.scoring.unregistered_org = 30;
    config.providers.organization_type = "charity".into();
    config.save(&path).await.unwrap();

    let loaded = EngineConfig::load(&path).await.unwrap();
    assert_eq!(loaded.gathering.case_budget_ms, 12_000);
    assert_eq!(loaded.scoring, config.scoring);
    assert_eq!(loaded.providers.organization_type, "charity");
}

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = EngineConfig::load(&dir.path().join("absent.toml"))
        .await
        .unwrap();
    assert_eq!(loaded.gathering.check_timeout_ms, 10_000);
}

#[tokio::test]
async fn test_invalid_file_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    tokio::fs::write(&path, "[providers]\nsearch_max_results = 50\n")
        .await
        .unwrap();

    let err = EngineConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("search_max_results"));
}

#[test]
fn test_api_keys_never_serialized() {
    let mut config = EngineConfig::default();
    config.narrative.gemini_api_key = Some("secret-gemini".into());
    config.narrative.openai_api_key = Some("secret-openai".into());

    let text = toml::to_string_pretty(&config).unwrap();
    assert!(!text.contains("secret-gemini"));
    assert!(!text.contains("secret-openai"));
}

#[tokio::test]
async fn test_env_overrides_file_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("relief-verify.toml");
    tokio::fs::write(
        &path,
        "[providers]\nregistry_url = \"https://registry.from-file.example\"\n",
    )
    .await
    .unwrap();

    // Only this test touches these variables.
    unsafe {
        std::env::set_var("RELIEF_VERIFY_REGISTRY_URL", "https://registry.from-env.example");
        std::env::set_var("RELIEF_VERIFY_SCAM_DATABASE_URL", "   ");
    }
    let loaded = EngineConfig::load(&path).await;
    unsafe {
        std::env::remove_var("RELIEF_VERIFY_REGISTRY_URL");
        std::env::remove_var("RELIEF_VERIFY_SCAM_DATABASE_URL");
    }

    let loaded = loaded.unwrap();
    assert_eq!(
        loaded.providers.registry_url.as_deref(),
        Some("https://registry.from-env.example")
    );
    // Blank values are ignored.
    assert!(loaded.providers.scam_database_url.is_none());
}
