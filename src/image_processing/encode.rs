use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config_file::{Configuration, OutputFormat};

/// Encode `img` to `path` in the configured format and return the written size.
///
/// A partially written file is removed when encoding fails.
pub fn encode(img: &RgbImage, config: &Configuration, path: &Path) -> Result<u64> {
    let result = write_image(img, config, path);
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result?;

    let size = fs::metadata(path)
        .with_context(|| format!("Failed to stat output: {}", path.display()))?
        .len();
    Ok(size)
}

fn write_image(img: &RgbImage, config: &Configuration, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let (width, height) = img.dimensions();

    match config.output_format {
        OutputFormat::Jpeg => {
            write_jpeg(&mut writer, img, config.jpeg_quality, true)
                .with_context(|| format!("Failed to save JPEG: {}", path.display()))?;
        }
        OutputFormat::Png => {
            PngEncoder::new_with_quality(&mut writer, CompressionType::Fast, FilterType::NoFilter)
                .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
                .with_context(|| format!("Failed to save PNG: {}", path.display()))?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output: {}", path.display()))?;
    Ok(())
}

/// Baseline JPEG; `optimize` computes per-image Huffman tables
fn write_jpeg<W: Write>(writer: W, img: &RgbImage, quality: u8, optimize: bool) -> Result<()> {
    let (width, height) = img.dimensions();
    let width = u16::try_from(width)
        .map_err(|_| anyhow::anyhow!("JPEG width {} exceeds 65535", width))?;
    let height = u16::try_from(height)
        .map_err(|_| anyhow::anyhow!("JPEG height {} exceeds 65535", height))?;

    let mut encoder = jpeg_encoder::Encoder::new(writer, quality);
    encoder.set_optimized_huffman_tables(optimize);
    encoder.encode(img.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)?;
    Ok(())
}
