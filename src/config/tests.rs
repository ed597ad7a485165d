//! Config module tests

use super::*;

#[test]
fn test_substitute_env_vars_simple() {
    std::env::set_var("TEST_VAR_SIMPLE", "hello");
    let result = substitute_env_vars("value = \"${TEST_VAR_SIMPLE}\"");
    assert_eq!(result, "value = \"hello\"");
    std::env::remove_var("TEST_VAR_SIMPLE");
}

#[test]
fn test_substitute_env_vars_with_default() {
    // Unset var should use default
    std::env::remove_var("TEST_VAR_UNSET");
    let result = substitute_env_vars("value = \"${TEST_VAR_UNSET:-default_value}\"");
    assert_eq!(result, "value = \"default_value\"");

    // Set var should use env value
    std::env::set_var("TEST_VAR_SET", "env_value");
    let result = substitute_env_vars("value = \"${TEST_VAR_SET:-default_value}\"");
    assert_eq!(result, "value = \"env_value\"");
    std::env::remove_var("TEST_VAR_SET");
}

#[test]
fn test_substitute_env_vars_missing_no_default() {
    std::env::remove_var("TEST_VAR_MISSING");
    let result = substitute_env_vars("value = \"${TEST_VAR_MISSING}\"");
    assert_eq!(result, "value = \"\"");
}

#[test]
fn test_load_config_with_env_substitution() {
    let temp_dir = std::env::temp_dir();
    let config_path = temp_dir.join("shardlink_test_config.toml");

    std::env::set_var("TEST_MGMT_HOST", "127.0.0.1");
    std::env::set_var("TEST_MGMT_PORT", "5899");

    let config_content = r#"
[cluster]
management_bind = "${TEST_MGMT_HOST}:${TEST_MGMT_PORT}"
node_id = "${TEST_NODE_ID:-node-default}"
"#;

    std::fs::write(&config_path, config_content).unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.cluster.management_bind.to_string(), "127.0.0.1:5899");
    assert_eq!(config.cluster.node_id.as_deref(), Some("node-default"));

    std::fs::remove_file(&config_path).ok();
    std::env::remove_var("TEST_MGMT_HOST");
    std::env::remove_var("TEST_MGMT_PORT");
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.connector.bind.port(), 5684);
    assert_eq!(config.connector.mtu, 1400);
    assert!(config.connector.receive_buffer_size.is_none());
    assert_eq!(config.cluster.management_bind.port(), 5884);
    assert!(!config.metrics.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_config() {
    let toml = r#"
[connector]
bind = "127.0.0.1:5684"
"#;

    let config = Config::parse(toml).unwrap();
    assert_eq!(config.connector.bind.to_string(), "127.0.0.1:5684");
}

#[test]
fn test_parse_full_config() {
    let toml = r#"
[log]
level = "debug"

[connector]
bind = "0.0.0.0:5684"
receive_buffer_size = 65536
send_buffer_size = 32768
mtu = 1280

[cluster]
management_bind = "0.0.0.0:5884"
node_id = "node-42"
secure_identity = "cluster-mgmt"
secret_key = "000102030405060708090a0b0c0d0e0f"

[metrics]
enabled = true
bind = "127.0.0.1:9100"
"#;

    let config = Config::parse(toml).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.connector.receive_buffer_size, Some(65536));
    assert_eq!(config.connector.send_buffer_size, Some(32768));
    assert_eq!(config.connector.mtu, 1280);
    assert_eq!(config.cluster.node_id.as_deref(), Some("node-42"));
    assert_eq!(config.cluster.secure_identity.as_deref(), Some("cluster-mgmt"));
    assert_eq!(
        config.cluster.secret_key.as_ref().map(|k| k.len()),
        Some(16)
    );
    assert_eq!(config.metrics_bind(), Some("127.0.0.1:9100".parse().unwrap()));
}

#[test]
fn test_parse_rejects_identity_without_key() {
    let toml = r#"
[cluster]
secure_identity = "cluster-mgmt"
"#;
    assert!(matches!(
        Config::parse(toml),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_parse_rejects_key_without_identity() {
    let toml = r#"
[cluster]
secret_key = "00010203"
"#;
    assert!(matches!(
        Config::parse(toml),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_parse_rejects_bad_hex_key() {
    let toml = r#"
[cluster]
secure_identity = "cluster-mgmt"
secret_key = "not-hex"
"#;
    assert!(Config::parse(toml).is_err());
}

#[test]
fn test_parse_rejects_zero_mtu() {
    let toml = r#"
[connector]
mtu = 0
"#;
    assert!(matches!(
        Config::parse(toml),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_parse_rejects_colliding_binds() {
    let toml = r#"
[connector]
bind = "127.0.0.1:5684"

[cluster]
management_bind = "127.0.0.1:5684"
"#;
    assert!(matches!(
        Config::parse(toml),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_missing_file_uses_defaults() {
    let config = Config::load("/nonexistent/shardlink.toml").unwrap();
    assert_eq!(config.connector.bind.port(), 5684);
}
