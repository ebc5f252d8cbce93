//! Conversion round summary shown after every batch.

use console::style;
use std::fmt;

use crate::config_file::OutputFormat;
use crate::image_processing::ConversionRecord;
use crate::utils::format_size;

/// How many of the largest outputs are listed
pub const TOP_OUTPUTS: usize = 3;

/// Direction of the total size change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeChange {
    Grew(u64),
    Shrank(u64),
}

impl SizeChange {
    fn between(original: u64, converted: u64) -> Self {
        if converted > original {
            SizeChange::Grew(converted - original)
        } else {
            SizeChange::Shrank(original - converted)
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SizeChange::Grew(_) => "↑",
            SizeChange::Shrank(_) => "↓",
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            SizeChange::Grew(n) | SizeChange::Shrank(n) => *n,
        }
    }
}

/// Aggregate statistics for one conversion round
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub files: usize,
    pub total_original: u64,
    pub total_converted: u64,
    pub change: SizeChange,
    pub largest: Vec<ConversionRecord>,
}

impl Summary {
    pub fn from_records(records: &[ConversionRecord]) -> Self {
        let total_original: u64 = records.iter().map(|r| r.original_size).sum();
        let total_converted: u64 = records.iter().map(|r| r.converted_size).sum();

        let mut largest = records.to_vec();
        // stable sort: ties keep conversion order
        largest.sort_by(|a, b| b.converted_size.cmp(&a.converted_size));
        largest.truncate(TOP_OUTPUTS);

        Self {
            files: records.len(),
            total_original,
            total_converted,
            change: SizeChange::between(total_original, total_converted),
            largest,
        }
    }
}

/// "JPEG (quality 80%)" or "PNG"
pub fn format_label(format: OutputFormat, quality: u8) -> String {
    match format {
        OutputFormat::Jpeg => format!("JPEG (quality {}%)", quality),
        OutputFormat::Png => "PNG".to_string(),
    }
}

/// End-of-round report, rendered through `Display`
pub struct SummaryReport {
    summary: Summary,
    format: OutputFormat,
    quality: u8,
}

impl SummaryReport {
    pub fn new(records: &[ConversionRecord], format: OutputFormat, quality: u8) -> Self {
        Self {
            summary: Summary::from_records(records),
            format,
            quality,
        }
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.summary;

        writeln!(f, "\n{}", style(" Conversion Complete ").black().on_green())?;
        writeln!(f, "{}", style("=".repeat(60)).cyan())?;
        writeln!(
            f,
            "\n{}",
            style(format!("Files converted: {}", summary.files)).green()
        )?;
        writeln!(
            f,
            "{}",
            style(format!("Format: {}", format_label(self.format, self.quality))).blue()
        )?;

        writeln!(f, "{}", style("Size summary:").yellow())?;
        writeln!(f, "   Original: {}", style(format_size(summary.total_original)).cyan())?;
        writeln!(f, "   Converted: {}", style(format_size(summary.total_converted)).cyan())?;
        writeln!(
            f,
            "   Change: {} {}",
            summary.change.arrow(),
            style(format_size(summary.change.amount())).magenta()
        )?;

        if !summary.largest.is_empty() {
            writeln!(f, "\n{}", style("Top 3 largest outputs:").yellow())?;
            for record in &summary.largest {
                writeln!(
                    f,
                    "   • {}: {} → {} ({:.2}x)",
                    record.filename,
                    format_size(record.original_size),
                    format_size(record.converted_size),
                    record.ratio()
                )?;
            }
        }
        Ok(())
    }
}

/// Render the end-of-round report
pub fn summarize(records: &[ConversionRecord], format: OutputFormat, quality: u8) -> String {
    SummaryReport::new(records, format, quality).to_string()
}
