use std::io::Write;

use arbor::config::{ServerConfig, DEFAULT_ADDRESS};
use arbor::runtime_config::DEFAULT_STACK_SIZE;
use arbor::DispatchMode;
use tempfile::NamedTempFile;

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("arbor_config_")
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_yaml() {
    let file = config_file(
        ".yaml",
        "address: \"127.0.0.1:9000\"\ndispatch_mode: automatic\nstack_size: 0x8000\n",
    );
    let config = ServerConfig::load(file.path()).unwrap();

    assert_eq!(config.address, "127.0.0.1:9000");
    assert_eq!(config.dispatch_mode, DispatchMode::Automatic);
    assert_eq!(config.stack_size, 0x8000);
}

#[test]
fn test_load_yml_with_port_only_address() {
    let file = config_file(".yml", "address: \":7000\"\n");
    let config = ServerConfig::load(file.path()).unwrap();

    assert_eq!(config.address, "0.0.0.0:7000");
    assert_eq!(config.dispatch_mode, DispatchMode::Manual);
    assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
}

#[test]
fn test_load_toml() {
    let file = config_file(
        ".toml",
        "address = \"0.0.0.0:8181\"\ndispatch_mode = \"manual\"\nstack_size = 65536\n",
    );
    let config = ServerConfig::load(file.path()).unwrap();

    assert_eq!(config.address, "0.0.0.0:8181");
    assert_eq!(config.dispatch_mode, DispatchMode::Manual);
    assert_eq!(config.stack_size, 65536);
}

#[test]
fn test_toml_stack_size_as_hex_string() {
    let file = config_file(".toml", "stack_size = \"0x10000\"\n");
    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config.stack_size, 0x10000);
    assert_eq!(config.address, DEFAULT_ADDRESS);
}

#[test]
fn test_empty_yaml_is_all_defaults() {
    let file = config_file(".yaml", "{}\n");
    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_unknown_field_is_rejected() {
    let file = config_file(".yaml", "address: \":1\"\nworkers: 4\n");
    let err = ServerConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("workers"), "{err:#}");
}

#[test]
fn test_unknown_dispatch_mode_is_rejected() {
    let file = config_file(".yaml", "dispatch_mode: sometimes\n");
    assert!(ServerConfig::load(file.path()).is_err());
}

#[test]
fn test_unsupported_extension() {
    let file = config_file(".json", "{}");
    let err = ServerConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("Unsupported config format"));
}

#[test]
fn test_missing_file() {
    let err = ServerConfig::load("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read server config"));
}

#[test]
fn test_runtime_config_follows_stack_size() {
    let file = config_file(".yaml", "stack_size: \"0x20000\"\n");
    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config.runtime().stack_size, 0x20000);
}
