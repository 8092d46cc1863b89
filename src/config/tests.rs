use std::io::Write;

use tempfile::NamedTempFile;

use super::*;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write tmp");
    file
}

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn defaults_apply_without_sources() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), DEFAULT_API_BASE_URL);
    assert_eq!(settings.api.user_agent, None);
    assert_eq!(settings.cache.keep_unused_for, Duration::from_secs(60));
    assert_eq!(settings.cache.sweep_interval, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn environment_overrides_file() {
    let file = toml_file(
        r#"
[api]
base_url = "http://books.internal/api/"

[cache]
keep_unused_for_seconds = 5

[logging]
level = "debug"
"#,
    );

    let settings = load(&ConfigSources {
        config_file: Some(file.path().to_path_buf()),
        environment: env(&[
            ("LIBRIS__CACHE__KEEP_UNUSED_FOR_SECONDS", "0"),
            ("LIBRIS__LOGGING__JSON", "true"),
        ]),
    })
    .expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "http://books.internal/api/");
    assert_eq!(settings.cache.keep_unused_for, Duration::ZERO);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = load(&ConfigSources {
        config_file: Some(PathBuf::from("/nonexistent/libris.toml")),
        environment: env(&[]),
    })
    .expect_err("file is required");

    assert!(matches!(err, LoadError::Build(_)));
}

#[test]
fn zero_sweep_interval_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.sweep_interval_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero interval");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.sweep_interval_seconds",
            ..
        }
    ));
}

#[test]
fn non_http_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("ftp://books.internal/".to_string());

    let err = Settings::from_raw(raw).expect_err("ftp scheme");
    assert!(matches!(err, LoadError::Invalid { key: "api.base_url", .. }));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn blank_user_agent_is_ignored() {
    let mut raw = RawSettings::default();
    raw.api.user_agent = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.api.user_agent, None);
}
