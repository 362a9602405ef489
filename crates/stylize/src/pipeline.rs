use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::StylizeError;

/// Compute device requested from the model runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    /// Anything other than `cuda` falls back to CPU.
    pub fn from_config(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("cuda") {
            Self::Cuda
        } else {
            Self::Cpu
        }
    }

    /// Half precision on GPU, full precision on CPU.
    pub fn dtype(self) -> &'static str {
        match self {
            Self::Cuda => "float16",
            Self::Cpu => "float32",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda => f.write_str("cuda"),
            Self::Cpu => f.write_str("cpu"),
        }
    }
}

/// Everything a loader needs to bring up the pipeline of one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub style: String,
    pub model_path: String,
    pub device: Device,
}

/// One image-to-image generation call.
#[derive(Debug, Clone)]
pub struct Img2ImgRequest {
    pub prompt: String,
    pub negative_prompt: String,
    /// PNG encoded source image, already resized.
    pub image_png: Vec<u8>,
    pub strength: f32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
}

/// A loaded diffusion pipeline. Returns the generated image as PNG bytes.
#[async_trait]
pub trait ImageToImage: Send + Sync {
    async fn generate(&self, request: Img2ImgRequest) -> Result<Vec<u8>, StylizeError>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn ImageToImage>, StylizeError>;
}

type Slot = Arc<OnceCell<Arc<dyn ImageToImage>>>;

/// Lazily loaded pipelines keyed by style name.
///
/// Each style is loaded at most once. Concurrent first requests for the same
/// style wait on a single load, other styles are not blocked, and a failed
/// load leaves the slot empty so the next request retries.
pub struct PipelineRegistry {
    loader: Arc<dyn PipelineLoader>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl PipelineRegistry {
    pub fn new(loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn pipeline(&self, spec: &PipelineSpec) -> Result<Arc<dyn ImageToImage>, StylizeError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(spec.style.clone()).or_default().clone()
        };

        let pipeline = slot
            .get_or_try_init(|| async {
                info!(
                    style = %spec.style,
                    model_path = %spec.model_path,
                    device = %spec.device,
                    "loading diffusion pipeline"
                );
                self.loader.load(spec).await
            })
            .await?;

        Ok(Arc::clone(pipeline))
    }

    /// Styles whose pipeline finished loading, sorted.
    pub async fn loaded_styles(&self) -> Vec<String> {
        let slots = self.slots.lock().await;
        let mut loaded: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(style, _)| style.clone())
            .collect();
        loaded.sort();
        loaded
    }
}
