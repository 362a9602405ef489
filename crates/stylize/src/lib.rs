mod pipeline;
mod remote;
mod sketch;
mod style;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dreamink_config::StylizeConfig;
use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;
use tracing::info;

pub use pipeline::{Device, ImageToImage, Img2ImgRequest, PipelineLoader, PipelineRegistry, PipelineSpec};
pub use remote::{RemoteDiffusionLoader, RemoteDiffusionPipeline};
pub use sketch::{pencil_sketch, SKETCH_BLUR_SIGMA};
pub use style::{display_name, ResolvedStyle, StyleCatalog, StyleSpec, SKETCH_STYLE};

#[derive(Debug, Error)]
pub enum StylizeError {
    #[error("Invalid style '{0}'")]
    UnknownStyle(String),
    #[error("invalid image data: {0}")]
    InvalidImage(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("model runtime request failed: {0}")]
    RuntimeHttp(#[from] reqwest::Error),
    #[error("model runtime responded with status {status}: {body}")]
    RuntimeStatus { status: u16, body: String },
    #[error("invalid model runtime response: {0}")]
    RuntimeResponse(String),
    #[error("invalid base64 image from model runtime: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sampling settings shared by every diffusion style.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub negative_prompt: String,
    pub strength: f32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub image_size: u32,
}

impl SamplingParams {
    pub fn from_config(config: &StylizeConfig) -> Self {
        Self {
            negative_prompt: config.negative_prompt.clone(),
            strength: config.strength,
            guidance_scale: config.guidance_scale,
            num_inference_steps: config.num_inference_steps,
            image_size: config.image_size.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StylizedImage {
    pub style: String,
    pub message: String,
    pub png: Vec<u8>,
}

impl StylizedImage {
    fn new(style: &str, png: Vec<u8>) -> Self {
        Self {
            style: style.to_string(),
            message: format!("{} stylization successful", display_name(style)),
            png,
        }
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.png)
    }
}

/// Entry point for the stylization endpoint: routes a style name to the sketch
/// filter or to the style's diffusion pipeline.
pub struct Stylizer {
    catalog: StyleCatalog,
    params: SamplingParams,
    device: Device,
    registry: PipelineRegistry,
}

impl Stylizer {
    pub fn new(config: &StylizeConfig, loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            catalog: StyleCatalog::from_config(config),
            params: SamplingParams::from_config(config),
            device: Device::from_config(&config.device),
            registry: PipelineRegistry::new(loader),
        }
    }

    /// Build a stylizer backed by the configured model runtime.
    pub fn from_config(config: &StylizeConfig) -> Result<Self, StylizeError> {
        let loader = RemoteDiffusionLoader::new(&config.runtime)?;
        Ok(Self::new(config, Arc::new(loader)))
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn styles(&self) -> Vec<String> {
        self.catalog.names()
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    pub async fn stylize(&self, style: &str, image: Vec<u8>) -> Result<StylizedImage, StylizeError> {
        let style = style.to_lowercase();

        let spec = match self.catalog.resolve(&style) {
            Some(ResolvedStyle::Sketch) => {
                let png = tokio::task::spawn_blocking(move || pencil_sketch(&image)).await??;
                info!(style = %style, "pencil sketch stylization complete");
                return Ok(StylizedImage::new(&style, png));
            }
            Some(ResolvedStyle::Diffusion(spec)) => spec.clone(),
            None => return Err(StylizeError::UnknownStyle(style)),
        };

        let size = self.params.image_size;
        let init_image = tokio::task::spawn_blocking(move || prepare_init_image(&image, size)).await??;

        let pipeline = self
            .registry
            .pipeline(&PipelineSpec {
                style: spec.name.clone(),
                model_path: spec.model_path.clone(),
                device: self.device,
            })
            .await?;

        info!(style = %style, pipeline = pipeline.name(), "generating diffusion stylization");

        let png = pipeline
            .generate(Img2ImgRequest {
                prompt: spec.prompt.clone(),
                negative_prompt: self.params.negative_prompt.clone(),
                image_png: init_image,
                strength: self.params.strength,
                guidance_scale: self.params.guidance_scale,
                num_inference_steps: self.params.num_inference_steps,
            })
            .await?;

        info!(style = %style, "diffusion stylization complete");
        Ok(StylizedImage::new(&style, png))
    }
}

/// Decode, drop alpha and resize to the square sampling resolution.
fn prepare_init_image(bytes: &[u8], size: u32) -> Result<Vec<u8>, StylizeError> {
    let image = image::load_from_memory(bytes).map_err(StylizeError::InvalidImage)?;
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    sketch::encode_png(rgb.resize_exact(size, size, FilterType::CatmullRom))
}
