//! Integration tests for configuration loading and validation

use super::test_utils::with_isolated_env;
use stagehand::config::{CheckpointBackend, ConfigLoader};
use tempfile::TempDir;

#[test]
fn test_provider_section_loads_and_validates() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("stagehand.toml");
    std::fs::write(
        &config_file,
        r#"
[provider]
endpoint = "http://localhost:11434/v1"
model = "llama3"
temperature = 0.7

[invocation]
timeout_secs = 30
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let provider = config.provider.as_ref().unwrap();
    assert_eq!(provider.model, "llama3");
    assert_eq!(provider.api_key_env, "OPENAI_API_KEY");
    assert_eq!(provider.temperature, Some(0.7));
    assert_eq!(config.invocation.timeout_secs, 30);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_values_are_all_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bad.toml");
    std::fs::write(
        &config_file,
        r#"
[gate]
accept_threshold = 150

[provider]
model = ""
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(rendered.len(), 2);
    assert!(rendered[0].starts_with("Gate:"));
    assert!(rendered[1].starts_with("Provider:"));
}

#[test]
fn test_environment_selects_provider_and_backend() {
    with_isolated_env(
        &[
            ("STAGEHAND__PROVIDER__MODEL", "gpt-4o-mini"),
            ("STAGEHAND__CHECKPOINT__BACKEND", "memory"),
        ],
        |temp| {
            let config = ConfigLoader::load(temp.path()).unwrap();
            assert_eq!(config.provider.unwrap().model, "gpt-4o-mini");
            assert_eq!(config.checkpoint.backend, CheckpointBackend::Memory);
        },
    );
}

#[test]
fn test_explicit_file_replaces_workspace_files() {
    with_isolated_env(&[], |temp| {
        std::fs::create_dir_all(temp.path().join("config")).unwrap();
        std::fs::write(
            temp.path().join("config/config.toml"),
            "[gate]\nmax_revisions = 9\n",
        )
        .unwrap();
        let explicit = temp.path().join("explicit.toml");
        std::fs::write(&explicit, "[gate]\naccept_threshold = 75\n").unwrap();

        let config = ConfigLoader::load_with_override(temp.path(), Some(&explicit)).unwrap();
        assert_eq!(config.gate.accept_threshold, 75);
        assert_eq!(config.gate.max_revisions, 3);
    });
}
