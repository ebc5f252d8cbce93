//! Interactive menu loop: choose a format, convert, report, repeat.

use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use std::io::{BufRead, Write};
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config_file::{
    clamp_quality, ConfigStore, Configuration, OutputFormat, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
use crate::image_processing::decode::HeifDecoder;
use crate::image_processing::{ensure_dirs, ConversionEngine, ConversionRecord};
use crate::report::summarize;
use crate::utils::{create_progress_bar, format_duration};

/// Fixed folder and file layout under a root directory
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Answer at the format-selection prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Jpeg,
    Png,
    Quit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" => Some(MenuChoice::Jpeg),
            "2" => Some(MenuChoice::Png),
            "q" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

/// Resolve the quality prompt answer.
///
/// Empty or non-numeric input keeps `default`; numbers are clamped to
/// `1..=100`, including ones too large to parse.
pub fn resolve_quality(input: &str, default: u8) -> u8 {
    let input = input.trim();
    if input.is_empty() {
        return default;
    }
    match input.parse::<i64>() {
        Ok(value) => clamp_quality(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => MAX_JPEG_QUALITY,
            IntErrorKind::NegOverflow => MIN_JPEG_QUALITY,
            _ => default,
        },
    }
}

pub struct Shell<R, W, D> {
    input: R,
    output: W,
    workspace: Workspace,
    store: ConfigStore,
    engine: ConversionEngine<D>,
    show_progress: bool,
}

impl<R: BufRead, W: Write, D: HeifDecoder> Shell<R, W, D> {
    pub fn new(input: R, output: W, workspace: Workspace, engine: ConversionEngine<D>) -> Self {
        let store = ConfigStore::new(workspace.config_path());
        Self {
            input,
            output,
            workspace,
            store,
            engine,
            show_progress: true,
        }
    }

    /// Draw progress bars (on by default; tests turn it off)
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run rounds until the user quits or input ends
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.print_header()?;

            let Some(config) = self.choose_format()? else {
                writeln!(self.output, "\n{}", style("Exiting.").yellow())?;
                return Ok(());
            };

            let started = Instant::now();
            let Some(records) = self.convert_round(&config)? else {
                writeln!(
                    self.output,
                    "{}",
                    style("No .heic/.heif files in 'input' folder.").red()
                )?;
                if self.prompt("\nPress Enter to return...")?.is_none() {
                    return Ok(());
                }
                continue;
            };

            if records.is_empty() {
                writeln!(self.output, "\n{}", style("No files were converted.").red())?;
            } else {
                write!(
                    self.output,
                    "{}",
                    summarize(&records, config.output_format, config.jpeg_quality)
                )?;
                writeln!(
                    self.output,
                    "   Time: {}",
                    style(format_duration(started.elapsed())).dim()
                )?;
            }
            writeln!(
                self.output,
                "\n{}",
                style("Ready for next conversion.").cyan()
            )?;
            let prompt = format!("\n{}", style(" Press Enter to restart... ").white().on_blue());
            if self.prompt(&prompt)?.is_none() {
                return Ok(());
            }
        }
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(
            self.output,
            "\n{}",
            style(" HEIC to PNG/JPEG Converter ").white().on_blue()
        )?;
        writeln!(self.output, "{}\n", style("=".repeat(60)).cyan())?;
        Ok(())
    }

    /// Prompt until a valid choice; `None` means quit.
    /// The chosen configuration is persisted before it is returned.
    pub fn choose_format(&mut self) -> Result<Option<Configuration>> {
        let mut config = self.store.load();

        loop {
            writeln!(self.output, "{}", style("Select output format:").yellow())?;
            writeln!(self.output, "1. JPEG")?;
            writeln!(self.output, "2. PNG")?;
            writeln!(self.output, "Q. Quit\n")?;

            let Some(answer) = self.prompt(&format!("{}", style("→ Enter 1, 2, or Q: ").cyan()))?
            else {
                return Ok(None);
            };

            match MenuChoice::parse(&answer) {
                Some(MenuChoice::Quit) => return Ok(None),
                Some(MenuChoice::Jpeg) => {
                    let prompt = format!(
                        "{}",
                        style(format!(
                            "→ JPEG quality (1–100, Enter = {}): ",
                            config.jpeg_quality
                        ))
                        .cyan()
                    );
                    let Some(answer) = self.prompt(&prompt)? else {
                        return Ok(None);
                    };
                    config.jpeg_quality = resolve_quality(&answer, config.jpeg_quality);
                    config.output_format = OutputFormat::Jpeg;
                    break;
                }
                Some(MenuChoice::Png) => {
                    config.output_format = OutputFormat::Png;
                    break;
                }
                None => {
                    writeln!(self.output, "{}\n", style("Invalid input. Try again.").red())?;
                }
            }
        }

        // save errors are ignored
        let _ = self.store.save(&config);
        Ok(Some(config))
    }

    /// One conversion round; `None` when the input folder has nothing to convert
    fn convert_round(&mut self, config: &Configuration) -> Result<Option<Vec<ConversionRecord>>> {
        let input_dir = self.workspace.input_dir();
        let output_dir = self.workspace.output_dir();
        ensure_dirs(&input_dir, &output_dir)?;

        let files = self.engine.discover_images(&input_dir)?;
        if files.is_empty() {
            return Ok(None);
        }

        writeln!(
            self.output,
            "\n{}",
            style(format!(
                "Found {} file(s). Converting to {}...",
                files.len(),
                config.output_format.label()
            ))
            .green()
        )?;
        self.output.flush()?;

        let progress = if self.show_progress {
            create_progress_bar(files.len() as u64)?
        } else {
            ProgressBar::hidden()
        };
        progress.set_message("Converting");

        let records = self
            .engine
            .convert_files(&files, &output_dir, config, &progress)?;
        progress.finish_and_clear();
        Ok(Some(records))
    }

    /// Print `message` and read one line; `None` on end of input
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from terminal")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
