pub mod decode;
pub mod encode;
pub mod normalize;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config_file::Configuration;
use crate::utils::{error_println, has_valid_extension, verbose_println};
use decode::{HeifDecoder, SystemDecoder};

/// Extensions picked up from the input folder (compared lowercase)
pub const HEIF_EXTENSIONS: [&str; 2] = ["heic", "heif"];

/// Size statistics for one converted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRecord {
    pub filename: String,
    pub original_size: u64,
    pub converted_size: u64,
}

impl ConversionRecord {
    /// converted / original, defined as 1.0 for an empty source
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.converted_size as f64 / self.original_size as f64
        }
    }
}

pub struct ConversionEngine<D = SystemDecoder> {
    decoder: D,
    verbose: bool,
}

impl ConversionEngine<SystemDecoder> {
    pub fn new(verbose: bool) -> Self {
        Self::with_decoder(SystemDecoder, verbose)
    }
}

impl<D: HeifDecoder> ConversionEngine<D> {
    pub fn with_decoder(decoder: D, verbose: bool) -> Self {
        Self { decoder, verbose }
    }

    /// List the HEIC/HEIF files directly inside `input_dir`, in filesystem order
    pub fn discover_images(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        verbose_println(
            self.verbose,
            &format!("Scanning directory: {}", input_dir.display()),
        );

        let mut image_files = Vec::new();
        let walker = WalkDir::new(input_dir)
            .follow_links(false)
            .min_depth(1)
            .max_depth(1);

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            // `Path::is_file` follows symlinks; dangling links are not files
            if entry.path().is_file() && has_valid_extension(entry.path(), &HEIF_EXTENSIONS) {
                image_files.push(entry.into_path());
            }
        }

        verbose_println(
            self.verbose,
            &format!("Found {} image files", image_files.len()),
        );
        Ok(image_files)
    }

    /// Convert every eligible file in `input_dir` into `output_dir`.
    ///
    /// Both directories are created when missing. Files that fail are
    /// reported and skipped; an empty input folder yields no records.
    pub fn convert(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        config: &Configuration,
    ) -> Result<Vec<ConversionRecord>> {
        ensure_dirs(input_dir, output_dir)?;
        let files = self.discover_images(input_dir)?;
        self.convert_files(&files, output_dir, config, &ProgressBar::hidden())
    }

    /// Convert an already discovered file list, advancing `progress` per file
    pub fn convert_files(
        &self,
        files: &[PathBuf],
        output_dir: &Path,
        config: &Configuration,
        progress: &ProgressBar,
    ) -> Result<Vec<ConversionRecord>> {
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

        let extension = config.output_format.extension();
        let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
        let mut records = Vec::with_capacity(files.len());

        for input_path in files {
            let filename = display_name(input_path);
            let output_path = output_path_for(input_path, output_dir, extension);

            let outcome = if let Some(first) = claimed.get(&output_path).copied() {
                Err(anyhow::anyhow!(
                    "output {} already produced from {}",
                    display_name(&output_path),
                    display_name(first)
                ))
            } else {
                claimed.insert(output_path.clone(), input_path.as_path());
                self.convert_single_image(input_path, &output_path, config)
            };

            match outcome {
                Ok(record) => {
                    progress.set_message(truncate_name(&display_name(&output_path), 30));
                    records.push(record);
                }
                Err(e) => {
                    progress.suspend(|| error_println(&format!("Error {}: {:#}", filename, e)));
                }
            }
            progress.inc(1);
        }

        Ok(records)
    }

    /// Decode, normalize and encode one file
    fn convert_single_image(
        &self,
        input_path: &Path,
        output_path: &Path,
        config: &Configuration,
    ) -> Result<ConversionRecord> {
        verbose_println(
            self.verbose,
            &format!("Processing: {}", input_path.display()),
        );

        let original_size = std::fs::metadata(input_path)
            .with_context(|| format!("Failed to stat input: {}", input_path.display()))?
            .len();

        let decoded = self.decoder.decode(input_path)?;
        let (width, height) = decoded.dimensions();
        verbose_println(
            self.verbose,
            &format!(
                "Decoded {}x{} image, color mode {:?}",
                width,
                height,
                decoded.color_mode()
            ),
        );

        let rgb = normalize::normalize(decoded);
        let converted_size = encode::encode(&rgb, config, output_path)?;

        verbose_println(
            self.verbose,
            &format!("Saved: {} ({} bytes)", output_path.display(), converted_size),
        );

        Ok(ConversionRecord {
            filename: display_name(input_path),
            original_size,
            converted_size,
        })
    }
}

/// Create the input and output folders if they do not exist yet
pub fn ensure_dirs(input_dir: &Path, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(input_dir)
        .with_context(|| format!("Failed to create input directory: {}", input_dir.display()))?;
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;
    Ok(())
}

/// `<output_dir>/<stem>.<extension>`
pub fn output_path_for(input_path: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    output_dir.join(format!("{}.{}", stem, extension))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        name.to_string()
    } else {
        let head: String = name.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
