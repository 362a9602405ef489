//! HTTP client for the external model runtime that hosts the diffusion
//! weights. The runtime loads a pipeline once per style and then serves
//! img2img calls against it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dreamink_config::DiffusionRuntimeConfig;
use image::ImageFormat;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pipeline::{Device, ImageToImage, Img2ImgRequest, PipelineLoader, PipelineSpec};
use crate::StylizeError;

#[derive(Debug, Serialize)]
struct LoadPipelineRequest<'a> {
    name: &'a str,
    model_path: &'a str,
    device: Device,
    dtype: &'static str,
    safety_checker: bool,
}

#[derive(Debug, Deserialize)]
struct LoadPipelineResponse {
    pipeline_id: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    image: String,
    strength: f32,
    guidance_scale: f32,
    num_inference_steps: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    image: String,
}

#[derive(Clone)]
pub struct RemoteDiffusionLoader {
    client: Client,
    base_url: String,
}

impl RemoteDiffusionLoader {
    pub fn new(config: &DiffusionRuntimeConfig) -> Result<Self, StylizeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PipelineLoader for RemoteDiffusionLoader {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn ImageToImage>, StylizeError> {
        let url = format!("{}/pipelines", self.base_url);
        let body = LoadPipelineRequest {
            name: &spec.style,
            model_path: &spec.model_path,
            device: spec.device,
            dtype: spec.device.dtype(),
            safety_checker: false,
        };

        let response = self.client.post(url).json(&body).send().await?;
        let loaded: LoadPipelineResponse = check_status(response).await?.json().await?;

        info!(style = %spec.style, pipeline_id = %loaded.pipeline_id, "diffusion pipeline ready");

        Ok(Arc::new(RemoteDiffusionPipeline {
            client: self.client.clone(),
            endpoint: format!("{}/pipelines/{}/img2img", self.base_url, loaded.pipeline_id),
            style: spec.style.clone(),
        }))
    }
}

pub struct RemoteDiffusionPipeline {
    client: Client,
    endpoint: String,
    style: String,
}

#[async_trait]
impl ImageToImage for RemoteDiffusionPipeline {
    async fn generate(&self, request: Img2ImgRequest) -> Result<Vec<u8>, StylizeError> {
        let body = GenerateRequest {
            prompt: &request.prompt,
            negative_prompt: &request.negative_prompt,
            image: STANDARD.encode(&request.image_png),
            strength: request.strength,
            guidance_scale: request.guidance_scale,
            num_inference_steps: request.num_inference_steps,
        };

        debug!(style = %self.style, endpoint = %self.endpoint, "requesting img2img generation");

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let generated: GenerateResponse = check_status(response).await?.json().await?;

        let png = STANDARD.decode(generated.image.as_bytes())?;
        match image::guess_format(&png) {
            Ok(ImageFormat::Png) => Ok(png),
            _ => Err(StylizeError::RuntimeResponse(
                "model runtime returned a non-PNG image".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.style
    }
}

async fn check_status(response: Response) -> Result<Response, StylizeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StylizeError::RuntimeStatus {
        status: status.as_u16(),
        body,
    })
}
