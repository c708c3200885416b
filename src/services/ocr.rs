// src/services/ocr.rs

//! Text extraction from saved images.
//!
//! Raster images are converted to grayscale and binarized with Otsu's
//! threshold before being handed to tesseract; anything else is passed to
//! tesseract as-is. Failures are logged and reported as `None`.

use std::path::Path;

use async_trait::async_trait;
use image::{GrayImage, ImageFormat, Luma};
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::OcrConfig;

/// Extensions that get grayscale/threshold preprocessing.
const RASTER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Turns an image file into text.
#[async_trait]
pub trait Ocr: Send + Sync {
    /// Extracted text, or `None` if recognition failed for any reason.
    async fn extract(&self, image_path: &Path) -> Option<String>;
}

/// OCR backed by the `tesseract` executable.
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn is_raster(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                RASTER_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    async fn try_extract(&self, image_path: &Path) -> Result<String> {
        if Self::is_raster(image_path) {
            let source = image_path.to_path_buf();
            let prepared = tokio::task::spawn_blocking(move || preprocess(&source))
                .await
                .map_err(AppError::ocr)??;
            log::debug!("Thresholding applied to {}", image_path.display());
            self.run_tesseract(prepared.path()).await
        } else {
            log::warn!(
                "No raster extension on {}. Attempting direct OCR.",
                image_path.display()
            );
            self.run_tesseract(image_path).await
        }
    }

    async fn run_tesseract(&self, input: &Path) -> Result<String> {
        let output = Command::new(&self.config.binary)
            .arg(input)
            .arg("stdout")
            .arg("--oem")
            .arg(self.config.oem.to_string())
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("-l")
            .arg(&self.config.language)
            .output()
            .await
            .map_err(|e| AppError::ocr(format!("failed to run {}: {}", self.config.binary, e)))?;

        if !output.status.success() {
            return Err(AppError::ocr(format!(
                "{} exited with {}: {}",
                self.config.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Ocr for TesseractOcr {
    async fn extract(&self, image_path: &Path) -> Option<String> {
        if !self.config.enabled {
            log::debug!("OCR disabled, skipping {}", image_path.display());
            return None;
        }

        log::info!("Converting image to text from path: {}", image_path.display());
        match self.try_extract(image_path).await {
            Ok(text) => {
                log::info!("Text extraction successful for {}", image_path.display());
                Some(text)
            }
            Err(e) => {
                log::error!(
                    "Error during image-to-text conversion for {}: {}",
                    image_path.display(),
                    e
                );
                None
            }
        }
    }
}

/// Grayscale + Otsu binarization into a temporary PNG.
fn preprocess(source: &Path) -> Result<NamedTempFile> {
    let gray = image::open(source)?.to_luma8();
    let binary = binarize(&gray);

    let prepared = tempfile::Builder::new()
        .prefix("ocr-")
        .suffix(".png")
        .tempfile()?;
    binary.save_with_format(prepared.path(), ImageFormat::Png)?;
    Ok(prepared)
}

/// Otsu's threshold: the gray level maximizing between-class variance.
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for Luma([value]) in image.pixels() {
        histogram[*value as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| level as f64 * *count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_variance = 0f64;
    let mut threshold = 0u8;

    for (level, count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += level as f64 * *count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_total - background_sum) / foreground_weight as f64;
        let variance = background_weight as f64
            * foreground_weight as f64
            * (background_mean - foreground_mean).powi(2);

        if variance > best_variance {
            best_variance = variance;
            threshold = level as u8;
        }
    }

    threshold
}

/// Pixels above the Otsu level become white, the rest black.
pub fn binarize(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    let mut out = image.clone();
    for Luma([value]) in out.pixels_mut() {
        *value = if *value > level { 255 } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone() -> GrayImage {
        GrayImage::from_fn(4, 4, |x, _| if x < 2 { Luma([50]) } else { Luma([200]) })
    }

    #[test]
    fn otsu_separates_two_tones() {
        let level = otsu_level(&two_tone());
        assert!((50..200).contains(&level));
    }

    #[test]
    fn binarize_outputs_black_and_white() {
        let out = binarize(&two_tone());
        assert_eq!(out.get_pixel(0, 0), &Luma([0]));
        assert_eq!(out.get_pixel(3, 3), &Luma([255]));
        assert!(out.pixels().all(|Luma([v])| *v == 0 || *v == 255));
    }

    #[test]
    fn raster_extensions() {
        assert!(TesseractOcr::is_raster(Path::new("a/b/c.JPG")));
        assert!(TesseractOcr::is_raster(Path::new("c.png")));
        assert!(!TesseractOcr::is_raster(Path::new("c.gif")));
        assert!(!TesseractOcr::is_raster(Path::new("noext")));
    }

    #[tokio::test]
    async fn unreadable_image_yields_none() {
        let ocr = TesseractOcr::new(OcrConfig::default());
        assert_eq!(ocr.extract(Path::new("/nonexistent/x.png")).await, None);
    }

    #[tokio::test]
    async fn disabled_engine_yields_none() {
        let config = OcrConfig {
            enabled: false,
            ..OcrConfig::default()
        };
        let ocr = TesseractOcr::new(config);
        assert_eq!(ocr.extract(Path::new("whatever.png")).await, None);
    }

    #[test]
    fn preprocess_writes_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("in.png");
        two_tone().save(&source).unwrap();

        let prepared = preprocess(&source).unwrap();
        let loaded = image::open(prepared.path()).unwrap().to_luma8();
        assert_eq!(loaded.dimensions(), (4, 4));
    }
}
