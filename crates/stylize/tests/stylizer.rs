//! Behaviour of the `Stylizer` front door with an in-process pipeline.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dreamink_config::StylizeConfig;
use dreamink_stylize::{
    Device, ImageToImage, Img2ImgRequest, PipelineLoader, PipelineSpec, StylizeError, Stylizer,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

#[derive(Default)]
struct RecordingLoader {
    specs: Mutex<Vec<PipelineSpec>>,
    requests: Arc<Mutex<Vec<Img2ImgRequest>>>,
}

struct EchoPipeline {
    style: String,
    requests: Arc<Mutex<Vec<Img2ImgRequest>>>,
}

#[async_trait]
impl ImageToImage for EchoPipeline {
    async fn generate(&self, request: Img2ImgRequest) -> Result<Vec<u8>, StylizeError> {
        let output = request.image_png.clone();
        self.requests.lock().unwrap().push(request);
        Ok(output)
    }

    fn name(&self) -> &str {
        &self.style
    }
}

#[async_trait]
impl PipelineLoader for RecordingLoader {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn ImageToImage>, StylizeError> {
        self.specs.lock().unwrap().push(spec.clone());
        Ok(Arc::new(EchoPipeline {
            style: spec.style.clone(),
            requests: Arc::clone(&self.requests),
        }))
    }
}

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 90]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn stylizer(config: &StylizeConfig) -> (Stylizer, Arc<RecordingLoader>) {
    let loader = Arc::new(RecordingLoader::default());
    (Stylizer::new(config, loader.clone()), loader)
}

#[tokio::test]
async fn sketch_style_bypasses_pipelines() {
    let (stylizer, loader) = stylizer(&StylizeConfig::default());

    let result = stylizer.stylize("Sketch", sample_png(32, 32)).await.unwrap();

    assert_eq!(result.style, "sketch");
    assert_eq!(result.message, "Pencil Sketch stylization successful");
    assert_eq!(image::guess_format(&result.png).unwrap(), ImageFormat::Png);
    assert!(loader.specs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn diffusion_style_runs_pipeline_with_style_prompt() {
    let mut config = StylizeConfig::default();
    config.device = "cpu".to_string();
    let (stylizer, loader) = stylizer(&config);

    let result = stylizer.stylize("PIXAR", sample_png(100, 60)).await.unwrap();

    assert_eq!(result.message, "Pixar stylization successful");
    let resized = image::load_from_memory(&result.png).unwrap();
    assert_eq!((resized.width(), resized.height()), (512, 512));

    let specs = loader.specs.lock().unwrap().clone();
    assert_eq!(
        specs,
        vec![PipelineSpec {
            style: "pixar".to_string(),
            model_path: config.styles["pixar"].model_path.clone(),
            device: Device::Cpu,
        }]
    );

    let requests = loader.requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.prompt, config.styles["pixar"].prompt);
    assert_eq!(request.negative_prompt, config.negative_prompt);
    assert_eq!(request.num_inference_steps, 30);
    assert!((request.strength - 0.6).abs() < f32::EPSILON);
    assert!((request.guidance_scale - 7.5).abs() < f32::EPSILON);
}

#[tokio::test]
async fn pipeline_is_reused_across_requests() {
    let (stylizer, loader) = stylizer(&StylizeConfig::default());

    stylizer.stylize("comic", sample_png(8, 8)).await.unwrap();
    stylizer.stylize("comic", sample_png(8, 8)).await.unwrap();
    stylizer.stylize("oil", sample_png(8, 8)).await.unwrap();

    assert_eq!(loader.specs.lock().unwrap().len(), 2);
    assert_eq!(loader.requests.lock().unwrap().len(), 3);
    assert_eq!(stylizer.registry().loaded_styles().await, vec!["comic", "oil"]);
}

#[tokio::test]
async fn unknown_style_is_rejected_before_loading() {
    let (stylizer, loader) = stylizer(&StylizeConfig::default());

    let err = stylizer
        .stylize("Watercolor", sample_png(8, 8))
        .await
        .unwrap_err();

    assert!(matches!(&err, StylizeError::UnknownStyle(style) if style == "watercolor"));
    assert_eq!(err.to_string(), "Invalid style 'watercolor'");
    assert!(loader.specs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_upload_is_invalid_image() {
    let (stylizer, loader) = stylizer(&StylizeConfig::default());

    let err = stylizer
        .stylize("ghibli", b"GIF89a-but-not-really".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, StylizeError::InvalidImage(_)));

    let err = stylizer
        .stylize("sketch", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StylizeError::InvalidImage(_)));

    assert!(loader.specs.lock().unwrap().is_empty());
}

#[test]
fn styles_list_reflects_configuration() {
    let mut config = StylizeConfig::default();
    config.styles.retain(|name, _| name == "ghibli");

    let (stylizer, _) = stylizer(&config);
    assert_eq!(stylizer.styles(), vec!["sketch", "ghibli"]);
    assert_eq!(stylizer.device(), Device::Cuda);
}
