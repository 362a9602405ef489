//! Test plan for the `dreamink-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and the style catalogue merge.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use dreamink_config::{load, AppConfig, AuthConfig, HttpConfig, StylizeConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "DREAMINK_CONFIG",
    "DREAMINK__AUTH__MIN_PASSWORD_LENGTH",
    "DREAMINK__DATABASE__MAX_CONNECTIONS",
    "DREAMINK__DATABASE__URL",
    "DREAMINK__HTTP__ADDRESS",
    "DREAMINK__HTTP__PORT",
    "DREAMINK__HTTP__MAX_UPLOAD_BYTES",
    "DREAMINK__STYLIZE__DEVICE",
    "DREAMINK__STYLIZE__RUNTIME__BASE_URL",
    "DREAMINK__STYLIZE__RUNTIME__REQUEST_TIMEOUT_SECONDS",
    "DREAMINK__STYLIZE__STYLES__PIXAR__MODEL_PATH",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.http.max_upload_bytes, defaults.http.max_upload_bytes);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.auth.min_password_length,
        defaults.auth.min_password_length
    );
    assert_eq!(config.stylize.device, defaults.stylize.device);
    assert_eq!(
        config.stylize.num_inference_steps,
        defaults.stylize.num_inference_steps
    );
    assert!((config.stylize.strength - 0.6).abs() < f32::EPSILON);
    assert!((config.stylize.guidance_scale - 7.5).abs() < f32::EPSILON);

    let names: Vec<_> = config.stylize.styles.keys().cloned().collect();
    assert_eq!(names, vec!["comic", "ghibli", "oil", "pixar"]);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "dreamink.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/dreamink.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [database]
        url = "sqlite://custom.db"
        "#,
    );
    ctx.set_var(
        "DREAMINK_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("configuration load should read DREAMINK_CONFIG");
    assert_eq!(config.database.url, "sqlite://custom.db");
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "dreamink.toml",
        r#"
        [http]
        port = 8181

        [database]
        max_connections = 50
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.stylize.runtime.base_url, defaults.stylize.runtime.base_url);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "dreamink.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("DREAMINK__HTTP__PORT", "8080");
    ctx.set_var("DREAMINK__STYLIZE__RUNTIME__BASE_URL", "http://gpu-box:9000");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.stylize.runtime.base_url, "http://gpu-box:9000");
}

#[test]
#[serial]
fn load_merges_style_overrides_into_default_catalogue() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "dreamink.toml",
        r#"
        [stylize.styles.pixar]
        model_path = "/models/pixar-v2"

        [stylize.styles.watercolor]
        model_path = "/models/watercolor"
        prompt = "Soft watercolor wash"

        [stylize.styles.oil]
        enabled = false
        "#,
    );

    let config = load().expect("configuration load should merge style tables");
    let styles = &config.stylize.styles;

    assert_eq!(styles["pixar"].model_path, "/models/pixar-v2");
    assert!(styles["pixar"].prompt.starts_with("Pixar-style 3D cartoon"));
    assert_eq!(styles["watercolor"].prompt, "Soft watercolor wash");
    assert!(styles["watercolor"].enabled);
    assert!(!styles["oil"].enabled);
    assert!(styles.contains_key("comic"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "dreamink.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_accept_any_non_empty_password() {
    assert_eq!(AuthConfig::default().min_password_length, 1);
}

#[test]
fn stylize_config_defaults_match_sampling_parameters() {
    let defaults = StylizeConfig::default();
    assert_eq!(defaults.image_size, 512);
    assert_eq!(defaults.num_inference_steps, 30);
    assert_eq!(defaults.device, "cuda");
    assert!(defaults.negative_prompt.contains("extra limbs"));
    assert_eq!(
        defaults.styles["pixar"].model_path,
        defaults.styles["oil"].model_path
    );
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
    assert_eq!(defaults.max_upload_bytes, 10 * 1024 * 1024);
}
