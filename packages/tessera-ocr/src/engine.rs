use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::region::TextRegion;

/// Image handed to the engine.
#[derive(Debug, Clone)]
pub enum OcrInput {
    /// An image file already on disk. Passed to the engine as-is.
    FilePath(PathBuf),
    /// A decoded image. `format` selects the encoding of the temporary input
    /// file; `None` means PNG.
    Image {
        image: DynamicImage,
        format: Option<ImageFormat>,
    },
    /// An encoded image held in memory. The format is sniffed from the data.
    Bytes(Vec<u8>),
}

impl OcrInput {
    pub fn image(image: DynamicImage) -> Self {
        OcrInput::Image {
            image,
            format: None,
        }
    }

    pub fn image_with_format(image: DynamicImage, format: ImageFormat) -> Self {
        OcrInput::Image {
            image,
            format: Some(format),
        }
    }
}

impl From<PathBuf> for OcrInput {
    fn from(path: PathBuf) -> Self {
        OcrInput::FilePath(path)
    }
}

impl From<&std::path::Path> for OcrInput {
    fn from(path: &std::path::Path) -> Self {
        OcrInput::FilePath(path.to_path_buf())
    }
}

impl From<DynamicImage> for OcrInput {
    fn from(image: DynamicImage) -> Self {
        OcrInput::image(image)
    }
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub regions: Vec<TextRegion>,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{0} is not installed or it's not in your PATH")]
    EngineNotFound(String),
    #[error("engine exited with status {status}: {message}")]
    EngineError { status: i32, message: String },
    #[error("engine process timed out after {0:?}")]
    Timeout(Duration),
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),
    #[error("engine exited cleanly but did not produce {}", path.display())]
    OutputMissing { path: PathBuf },
    #[error("{feature} output not supported, tesseract >= {required} required")]
    FeatureNotSupported {
        feature: &'static str,
        required: &'static str,
    },
    #[error("invalid tesseract version: {0:?}")]
    InvalidVersion(String),
    #[error("invalid extra config: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, OcrError>;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput>;
}
