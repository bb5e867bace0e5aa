// Configuration unit tests

use openimg::cache::CacheBackend;
use openimg::config::*;

#[test]
fn test_empty_yaml_yields_defaults() {
    let config = Config::from_yaml_with_env("").expect("empty config should load");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.address, "0.0.0.0");
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.image.default_quality, 85);
    assert!(config.coalescing.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_can_select_disk_backend() {
    let yaml = r#"
cache:
  backend: disk
  disk:
    cache_dir: /tmp/openimg-test
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.cache.backend, CacheBackend::Disk);
    assert_eq!(config.cache.disk.cache_dir, "/tmp/openimg-test");
}

#[test]
fn test_can_disable_cache_and_coalescing() {
    let yaml = r#"
cache:
  backend: none
coalescing:
  enabled: false
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.cache.backend, CacheBackend::None);
    assert!(!config.coalescing.enabled);
}

#[test]
fn test_rejects_unknown_backend() {
    let yaml = r#"
cache:
  backend: redis
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_substitutes_environment_variables() {
    std::env::set_var("OPENIMG_UNIT_TEST_PORT", "9191");
    let yaml = r#"
server:
  port: ${OPENIMG_UNIT_TEST_PORT}
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.server.port, 9191);
}

#[test]
fn test_missing_environment_variable_is_an_error() {
    let yaml = r#"
server:
  address: ${OPENIMG_UNIT_TEST_UNSET_VARIABLE}
"#;
    let err = Config::from_yaml_with_env(yaml).unwrap_err();
    assert!(err.contains("OPENIMG_UNIT_TEST_UNSET_VARIABLE"));
}

#[test]
fn test_validate_rejects_bad_image_quality() {
    let yaml = r#"
image:
  default_quality: 0
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert!(config.validate().is_err());
}
