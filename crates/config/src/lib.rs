use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "dreamink.toml",
    "config/dreamink.toml",
    "crates/config/dreamink.toml",
    "../dreamink.toml",
    "../config/dreamink.toml",
    "../crates/config/dreamink.toml",
];

const ENV_PREFIX: &str = "DREAMINK";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub stylize: StylizeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    /// Upper bound for request bodies, multipart uploads included.
    #[serde(default = "HttpConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl HttpConfig {
    const fn default_max_upload_bytes() -> usize {
        10 * 1024 * 1024
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dreamink.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_min_password_length")]
    pub min_password_length: usize,
}

impl AuthConfig {
    const fn default_min_password_length() -> usize {
        1
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: Self::default_min_password_length(),
        }
    }
}

/// Settings for the image stylization endpoint and the diffusion runtime it
/// delegates to.
///
/// ```
/// use dreamink_config::StylizeConfig;
///
/// let stylize = StylizeConfig::default();
/// assert_eq!(stylize.image_size, 512);
/// assert_eq!(stylize.num_inference_steps, 30);
/// assert!(stylize.styles.contains_key("ghibli"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylizeConfig {
    #[serde(default)]
    pub runtime: DiffusionRuntimeConfig,
    #[serde(default = "StylizeConfig::default_device")]
    pub device: String,
    #[serde(default = "StylizeConfig::default_strength")]
    pub strength: f32,
    #[serde(default = "StylizeConfig::default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "StylizeConfig::default_num_inference_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "StylizeConfig::default_image_size")]
    pub image_size: u32,
    #[serde(default = "StylizeConfig::default_negative_prompt")]
    pub negative_prompt: String,
    #[serde(default = "StylizeConfig::default_styles")]
    pub styles: BTreeMap<String, DiffusionStyleConfig>,
}

impl StylizeConfig {
    fn default_device() -> String {
        "cuda".to_string()
    }

    const fn default_strength() -> f32 {
        0.6
    }

    const fn default_guidance_scale() -> f32 {
        7.5
    }

    const fn default_num_inference_steps() -> u32 {
        30
    }

    const fn default_image_size() -> u32 {
        512
    }

    fn default_negative_prompt() -> String {
        "blurry, distorted, deformed, watermark, text, extra limbs, low quality".to_string()
    }

    fn default_styles() -> BTreeMap<String, DiffusionStyleConfig> {
        [
            (
                "pixar",
                "models/sd-turbo",
                "Pixar-style 3D cartoon, bright colors, cinematic lighting, smooth textures, same face and proportions.",
            ),
            (
                "comic",
                "models/dreamshaper-8",
                "Comic-book art, expressive line work, vibrant colors, clean outlines, same facial details.",
            ),
            (
                "ghibli",
                "models/classic-anim-diffusion",
                "Studio Ghibli 2D anime look, soft lighting, calm tones, detailed but subtle, consistent face structure.",
            ),
            (
                "oil",
                "models/sd-turbo",
                "Oil painting with realistic brush strokes, soft tone, artistic lighting, preserved facial features.",
            ),
        ]
        .into_iter()
        .map(|(name, model_path, prompt)| {
            (
                name.to_string(),
                DiffusionStyleConfig {
                    model_path: model_path.to_string(),
                    prompt: prompt.to_string(),
                    enabled: true,
                },
            )
        })
        .collect()
    }
}

impl Default for StylizeConfig {
    fn default() -> Self {
        Self {
            runtime: DiffusionRuntimeConfig::default(),
            device: Self::default_device(),
            strength: Self::default_strength(),
            guidance_scale: Self::default_guidance_scale(),
            num_inference_steps: Self::default_num_inference_steps(),
            image_size: Self::default_image_size(),
            negative_prompt: Self::default_negative_prompt(),
            styles: Self::default_styles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionStyleConfig {
    pub model_path: String,
    pub prompt: String,
    #[serde(default = "DiffusionStyleConfig::default_enabled")]
    pub enabled: bool,
}

impl DiffusionStyleConfig {
    const fn default_enabled() -> bool {
        true
    }
}

/// Connection settings for the external model runtime that owns the
/// diffusion weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionRuntimeConfig {
    #[serde(default = "DiffusionRuntimeConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "DiffusionRuntimeConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl DiffusionRuntimeConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:7861".to_string()
    }

    const fn default_request_timeout() -> u64 {
        300
    }
}

impl Default for DiffusionRuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use dreamink_config::load;
///
/// std::env::remove_var("DREAMINK_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default(
            "http.max_upload_bytes",
            i64::try_from(defaults.http.max_upload_bytes).unwrap_or(i64::MAX),
        )?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "auth.min_password_length",
            i64::try_from(defaults.auth.min_password_length).unwrap_or(i64::MAX),
        )?
        .set_default(
            "stylize.runtime.base_url",
            defaults.stylize.runtime.base_url.clone(),
        )?
        .set_default(
            "stylize.runtime.request_timeout_seconds",
            i64::try_from(defaults.stylize.runtime.request_timeout_seconds).unwrap_or(i64::MAX),
        )?
        .set_default("stylize.device", defaults.stylize.device.clone())?
        .set_default("stylize.strength", f64::from(defaults.stylize.strength))?
        .set_default(
            "stylize.guidance_scale",
            f64::from(defaults.stylize.guidance_scale),
        )?
        .set_default(
            "stylize.num_inference_steps",
            i64::from(defaults.stylize.num_inference_steps),
        )?
        .set_default("stylize.image_size", i64::from(defaults.stylize.image_size))?
        .set_default(
            "stylize.negative_prompt",
            defaults.stylize.negative_prompt.clone(),
        )?;

    // Default styles are merged key by key so a file or env var can repoint a
    // single model without restating the whole catalogue.
    for (name, style) in &defaults.stylize.styles {
        builder = builder
            .set_default(
                format!("stylize.styles.{name}.model_path"),
                style.model_path.clone(),
            )?
            .set_default(format!("stylize.styles.{name}.prompt"), style.prompt.clone())?
            .set_default(format!("stylize.styles.{name}.enabled"), style.enabled)?;
    }

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("DREAMINK_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via DREAMINK_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
