use std::{env, fs};

use accounts_query::PageOverflow;
use accounts_server::config::StorageBackend;
use accounts_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("accounts.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
api_prefix = "/api"
cors_origins = ["https://bank.example.com"]

[storage]
backend = "memory"

[storage.postgres]
host = "db"
user = "accounts"
password = "secret"

[pagination]
default_size = 20
max_size = 200
overflow = "reject"

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.api_prefix, "/api");
    assert_eq!(cfg.server.cors_origins, vec!["https://bank.example.com"]);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.pagination.default_size, 20);
    assert_eq!(cfg.pagination.overflow, PageOverflow::Reject);
    assert_eq!(
        cfg.storage.postgres.masked_url(),
        "postgres://accounts:****@db:5432/accounts"
    );

    // 2) Env override should win over file
    unsafe {
        env::set_var("ACCOUNTS__PAGINATION__DEFAULT_SIZE", "15");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.pagination.default_size, 15);
    unsafe {
        env::remove_var("ACCOUNTS__PAGINATION__DEFAULT_SIZE");
    }

    // 3) Invalid values are rejected by validation
    let invalid = toml_content.replace("default_size = 20", "default_size = 500");
    fs::write(&path, invalid).expect("write invalid toml");
    let err = load_config(path.to_str()).unwrap_err();
    assert!(err.contains("default_size"), "{err}");

    let invalid = toml_content.replace("api_prefix = \"/api\"", "api_prefix = \"api/\"");
    fs::write(&path, invalid).expect("write invalid toml");
    assert!(load_config(path.to_str()).is_err());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");
    let cfg = load_config(path.to_str()).expect("defaults should be valid");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.api_prefix, "/v1");
    assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
}
