//! Turns an [`OcrInput`] into a file the engine can read.
//!
//! Every invocation owns a unique base path created in the temp directory.
//! The engine writes its outputs next to it as `{base}.{ext}` and decoded
//! images are written to `{base}_input.{ext}`. Everything matching `{base}*`
//! is removed when the [`TempArtifacts`] guard goes away.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::engine::{OcrError, OcrInput, Result};

/// Formats accepted for in-memory images.
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Pnm,
    ImageFormat::Tiff,
    ImageFormat::Bmp,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Format used when an in-memory image carries no format tag.
pub const DEFAULT_FORMAT: ImageFormat = ImageFormat::Png;

const TEMP_PREFIX: &str = "tess_";

/// Validates the format of a decoded image and flattens any alpha channel
/// onto white. Returns the image to encode together with its format.
pub fn prepare(
    image: &DynamicImage,
    format: Option<ImageFormat>,
) -> Result<(Cow<'_, DynamicImage>, ImageFormat)> {
    let format = format.unwrap_or(DEFAULT_FORMAT);
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(OcrError::UnsupportedImage(format!(
            "unsupported image format {:?}",
            format
        )));
    }

    if image.color().has_alpha() {
        return Ok((Cow::Owned(flatten_alpha(image)), format));
    }
    Ok((Cow::Borrowed(image), format))
}

/// Composites `image` over an opaque white canvas of the same size.
pub fn flatten_alpha(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let mut canvas = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));

    for (dst, src) in canvas.pixels_mut().zip(rgba.pixels()) {
        let alpha = u32::from(src[3]);
        for c in 0..3 {
            let blended = u32::from(src[c]) * alpha + 255 * (255 - alpha);
            dst[c] = ((blended + 127) / 255) as u8;
        }
    }

    DynamicImage::ImageRgb8(canvas)
}

/// Converts `image` to a pixel type the encoder for `format` accepts. GIF
/// only takes 8-bit RGB, JPEG, BMP and WebP take 8-bit gray or RGB, and the
/// rest also take 16-bit buffers. Float buffers are always converted.
fn encodable(image: Cow<'_, DynamicImage>, format: ImageFormat) -> Cow<'_, DynamicImage> {
    let color = image.color();
    let deep = matches!(
        format,
        ImageFormat::Png | ImageFormat::Tiff | ImageFormat::Pnm
    );
    let keep = match format {
        ImageFormat::Gif => color == ColorType::Rgb8,
        _ if deep => matches!(
            color,
            ColorType::L8 | ColorType::Rgb8 | ColorType::L16 | ColorType::Rgb16
        ),
        _ => matches!(color, ColorType::L8 | ColorType::Rgb8),
    };
    if keep {
        return image;
    }

    let converted = if format == ImageFormat::Gif {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else if deep {
        DynamicImage::ImageRgb16(image.to_rgb16())
    } else if color == ColorType::L16 {
        DynamicImage::ImageLuma8(image.to_luma8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    Cow::Owned(converted)
}

/// Scoped ownership of the temporary files of one invocation.
#[derive(Debug)]
pub struct TempArtifacts {
    base: PathBuf,
    input: PathBuf,
    released: bool,
}

impl TempArtifacts {
    /// Reserves a fresh base path and materializes `input` as a file.
    pub fn create(input: &OcrInput, temp_dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let named = match temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let base = named.into_temp_path().keep().map_err(|e| e.error)?;

        // The guard exists before anything else can fail.
        let mut artifacts = Self {
            input: base.clone(),
            base,
            released: false,
        };
        artifacts.input = artifacts.materialize(input)?;
        Ok(artifacts)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path of the output file the engine writes for `extension`.
    pub fn output(&self, extension: &str) -> PathBuf {
        let mut name = self.base.clone().into_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }

    /// Removes all files of this invocation, reporting failures other than
    /// files that are already gone.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        cleanup(&self.base)
    }

    fn materialize(&self, input: &OcrInput) -> Result<PathBuf> {
        match input {
            OcrInput::FilePath(path) => Ok(normalize_path(path)),
            OcrInput::Image { image, format } => self.write_image(image, *format),
            OcrInput::Bytes(data) => {
                let format = image::guess_format(data).map_err(|e| {
                    OcrError::UnsupportedImage(format!("unrecognized image data: {}", e))
                })?;
                let image = image::load_from_memory_with_format(data, format)?;
                self.write_image(&image, Some(format))
            }
        }
    }

    fn write_image(&self, image: &DynamicImage, format: Option<ImageFormat>) -> Result<PathBuf> {
        let (image, format) = prepare(image, format)?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        let mut name = self.base.clone().into_os_string();
        name.push("_input.");
        name.push(extension);
        let path = PathBuf::from(name);

        let image = encodable(image, format);
        image.save_with_format(&path, format)?;
        log::debug!("wrote engine input {}", path.display());
        Ok(path)
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = cleanup(&self.base) {
            log::warn!("failed to remove temp files for {}: {}", self.base.display(), e);
        }
    }
}

/// Resolves symlinks and relative components. Paths that cannot be resolved
/// are made absolute and handed to the engine unchanged otherwise.
pub fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Removes every file whose name starts with `base`.
pub fn cleanup(base: &Path) -> io::Result<()> {
    let pattern = format!("{}*", glob::Pattern::escape(&base.to_string_lossy()));
    let entries = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    for entry in entries {
        let path = entry.map_err(|e| io::Error::new(e.error().kind(), e.to_string()))?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
