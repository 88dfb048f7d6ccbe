//! Configuration file loading and override precedence.

use caching_proxy::config::ProxyConfig;
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn resolve(args: &[&str]) -> caching_proxy::Result<ProxyConfig> {
    let matches = ProxyConfig::build_cli()
        .try_get_matches_from(std::iter::once("caching-proxy").chain(args.iter().copied()))
        .unwrap();
    ProxyConfig::from_matches(&matches)
}

#[test]
fn test_file_only_configuration() {
    let file = write_config(
        r#"
listen_port: 9100
origin_host: origin.internal
read_timeout: "2s"
"#,
    );

    let config = resolve(&["--config", file.path().to_str().unwrap()]).unwrap();
    assert_eq!(config.listen_port, 9100);
    assert_eq!(config.origin_host, "origin.internal");
    assert_eq!(config.read_timeout, Duration::from_secs(2));
    // Untouched fields keep their defaults
    assert_eq!(config.origin_port, 80);
}

#[test]
fn test_cli_overrides_file() {
    let file = write_config(
        r#"
listen_port: 9100
origin_host: origin.internal
"#,
    );

    let config = resolve(&[
        "--config",
        file.path().to_str().unwrap(),
        "--port",
        "9200",
        "--origin",
        "http://other.example.com",
    ])
    .unwrap();
    assert_eq!(config.listen_port, 9200);
    assert_eq!(config.origin_host, "other.example.com");
}

#[test]
fn test_unreadable_file_is_a_config_error() {
    assert!(resolve(&["--config", "/nonexistent/caching-proxy.yaml"]).is_err());
}

#[test]
fn test_file_with_invalid_duration_is_rejected() {
    let file = write_config(
        r#"
origin_host: origin.internal
read_timeout: "eventually"
"#,
    );
    assert!(resolve(&["--config", file.path().to_str().unwrap()]).is_err());
}
