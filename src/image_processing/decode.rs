use anyhow::{Context, Result};
use image::{ImageError, ImageFormat, ImageReader};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use super::normalize::DecodedImage;

/// ImageMagick entry points, v7 first then the v6 `convert` binary
const MAGICK_COMMANDS: [&str; 2] = ["magick", "convert"];

/// Turns a source file into a fully materialized image
pub trait HeifDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// Decoder used by the converter binary.
///
/// Formats the `image` crate recognizes by content are decoded in-process.
/// HEIF containers are handed to ImageMagick, which writes PNG to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDecoder;

impl HeifDecoder for SystemDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let reader = ImageReader::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("Failed to read image header: {}", path.display()))?;

        if reader.format().is_none() {
            drop(reader);
            return decode_with_imagemagick(path);
        }

        match reader.decode() {
            Ok(img) => Ok(img.into()),
            // recognized but not compiled in (e.g. an AVIF-branded HEIF)
            Err(ImageError::Unsupported(_)) => decode_with_imagemagick(path),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to decode image: {}", path.display()))
            }
        }
    }
}

/// Check if ImageMagick is available on the system
pub fn is_heif_decoder_available() -> bool {
    MAGICK_COMMANDS.iter().any(|cmd| {
        Command::new(cmd)
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    })
}

fn decode_with_imagemagick(path: &Path) -> Result<DecodedImage> {
    let mut last_error = None;

    for cmd in MAGICK_COMMANDS {
        // `[0]` selects the primary image of the container
        let output = match Command::new(cmd)
            .arg(format!("{}[0]", path.display()))
            .arg("png:-")
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                last_error = Some(anyhow::anyhow!("'{}' not found", cmd));
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to run {}", cmd));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "ImageMagick failed to decode {}: {}",
                path.display(),
                stderr.trim()
            ));
        }

        let img = image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
            .with_context(|| format!("ImageMagick returned unreadable data for {}", path.display()))?;
        return Ok(img.into());
    }

    Err(last_error
        .unwrap_or_else(|| anyhow::anyhow!("no decoder"))
        .context(format!(
            "No HEIF decoder available for {} (install ImageMagick with libheif)",
            path.display()
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::normalize::ColorMode;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_decodes_sniffed_content_regardless_of_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.heic");
        RgbaImage::from_pixel(6, 4, Rgba([10, 20, 30, 40]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let decoded = SystemDecoder.decode(&path).unwrap();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.color_mode(), ColorMode::Rgba);
    }

    #[test]
    fn test_unsupported_sniffed_format_falls_through_to_imagemagick() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brand.heif");
        // ISO-BMFF header with an AVIF brand; the AVIF decoder is not compiled in
        let mut bytes = vec![0x00, 0x00, 0x00, 0x1c];
        bytes.extend_from_slice(b"ftypavif\0\0\0\0avifmif1miaf");
        std::fs::write(&path, &bytes).unwrap();

        let reader = ImageReader::open(&path).unwrap().with_guessed_format().unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Avif));

        let message = format!("{:#}", SystemDecoder.decode(&path).unwrap_err());
        assert!(
            message.contains("ImageMagick") || message.contains("HEIF decoder"),
            "in-process error was returned instead of the fallback: {}",
            message
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(SystemDecoder.decode(&dir.path().join("gone.heic")).is_err());
    }

    #[test]
    fn test_garbage_content_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.heif");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(SystemDecoder.decode(&path).is_err());
    }
}
