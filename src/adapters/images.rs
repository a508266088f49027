// src/adapters/images.rs

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::{AdapterResult, ImageOptions, commit};
use crate::errors::CompilationError;
use crate::fs::{FileSystem, SourceFile};

/// Losslessly recompress PNGs and re-encode JPEGs at `options.quality`.
///
/// The smaller of the original and the re-encoded bytes is kept; formats
/// we cannot decode (SVG, GIF, ...) are copied as-is.
pub fn optimize(
    fs: &dyn FileSystem,
    sources: &[SourceFile],
    dest: &Path,
    options: &ImageOptions,
) -> AdapterResult {
    let mut outputs = Vec::with_capacity(sources.len());

    for source in sources {
        let original = fs
            .read(&source.path)
            .map_err(|e| CompilationError::at(&source.path, e))?;

        let bytes = match image::guess_format(&original) {
            Ok(ImageFormat::Png) => smallest(original, encode_png, &source.path)?,
            Ok(ImageFormat::Jpeg) => {
                smallest(original, |img| encode_jpeg(img, options.quality), &source.path)?
            }
            _ => original,
        };

        outputs.push((dest.join(&source.relative), bytes));
    }

    commit(fs, outputs)
}

fn smallest(
    original: Vec<u8>,
    encode: impl FnOnce(&DynamicImage) -> image::ImageResult<Vec<u8>>,
    path: &Path,
) -> Result<Vec<u8>, CompilationError> {
    let img = image::load_from_memory(&original).map_err(|e| CompilationError::at(path, e))?;
    let encoded = encode(&img).map_err(|e| CompilationError::at(path, e))?;
    debug!(?path, before = original.len(), after = encoded.len(), "re-encoded image");
    Ok(if encoded.len() < original.len() {
        encoded
    } else {
        original
    })
}

fn encode_png(img: &DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(out)
}
