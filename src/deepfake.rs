//! ONNX-backed deepfake image classifier.
//!
//! The model is a binary image classifier exported to ONNX with logits
//! ordered `[fake, real]`. The service stays up when the model file is
//! missing; detection requests then report the model as unavailable.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use ort::{inputs, session::builder::GraphOptimizationLevel, session::Session, value::Value};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::DeepfakeResult;

// ViT-style classifier input: 224x224 RGB, scaled to [0,1] then
// normalized with mean 0.5 / std 0.5 per channel.
const INPUT_SIZE: u32 = 224;

#[derive(Debug, Error)]
pub enum DeepfakeError {
    #[error("Cannot identify image file. It might be corrupted or not a supported format.")]
    UnidentifiedImage,
    #[error("Invalid model output format for deepfake scores.")]
    InvalidOutput,
    #[error("Inference error: {0}")]
    Inference(#[from] ort::Error),
}

pub struct DeepfakeDetector {
    session: Session,
}

impl DeepfakeDetector {
    /// Loads the classifier from an ONNX file.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load deepfake model from {model_path:?}"))?;

        info!("Deepfake model loaded from {:?}", model_path);

        Ok(Self { session })
    }

    /// Classifies image bytes into real/fake percentages summing to 100.
    pub fn detect(&mut self, image_bytes: &[u8]) -> Result<DeepfakeResult, DeepfakeError> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|_| DeepfakeError::UnidentifiedImage)?;

        let tensor = preprocess(&image);

        let size = INPUT_SIZE as usize;
        let input = Value::from_array(([1_usize, 3, size, size], tensor.into_boxed_slice()))?;
        let outputs = self.session.run(inputs![input])?;

        let (_, logits) = outputs[0].try_extract_tensor::<f32>()?;

        debug!("Deepfake model produced {} logits", logits.len());

        scores_from_logits(logits)
    }
}

/// Resizes and normalizes the image into a CHW float tensor.
fn preprocess(image: &image::DynamicImage) -> Vec<f32> {
    let resized = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Vec::with_capacity(3 * (INPUT_SIZE * INPUT_SIZE) as usize);
    for channel in 0..3 {
        for y in 0..INPUT_SIZE {
            for x in 0..INPUT_SIZE {
                let pixel = resized.get_pixel(x, y);
                let scaled = pixel[channel] as f32 / 255.0;
                tensor.push((scaled - 0.5) / 0.5);
            }
        }
    }

    tensor
}

/// Softmaxes the first two logits and normalizes into percentages.
fn scores_from_logits(logits: &[f32]) -> Result<DeepfakeResult, DeepfakeError> {
    if logits.len() < 2 {
        return Err(DeepfakeError::InvalidOutput);
    }

    let probabilities = softmax(&logits[..2]);

    let safe: Vec<f64> = probabilities.iter().map(|&p| p.max(0.0) as f64).collect();
    let total: f64 = safe.iter().sum();

    let (fake_score, real_score) = if total > 0.0 {
        (safe[0] / total * 100.0, safe[1] / total * 100.0)
    } else {
        (0.0, 0.0)
    };

    Ok(DeepfakeResult {
        real_score: round2(real_score),
        fake_score: round2(fake_score),
    })
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&x| x / sum).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
