use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Environment variable that switches on per-file tracing
pub const VERBOSE_ENV: &str = "HEIC_CONVERTER_VERBOSE";

/// Create a styled progress bar for a conversion round
pub fn create_progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} {msg:<30} [{bar:30.cyan/blue}] {pos}/{len} [{elapsed}<{eta}]",
        )?
        .progress_chars("█▌ "),
    );
    Ok(pb)
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Format a byte count with decimal units ("1 Byte", "512 Bytes", "1.5 kB", "2.0 MB")
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    const BASE: f64 = 1000.0;

    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1000 {
        return format!("{} Bytes", bytes);
    }

    let mut value = bytes as f64 / BASE;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < BASE {
            break;
        }
        value /= BASE;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[&str]) -> bool {
    match get_file_extension(path) {
        Some(ext) => extensions.contains(&ext.as_str()),
        None => false,
    }
}

/// Whether verbose tracing was requested through the environment
pub fn verbose_from_env() -> bool {
    std::env::var(VERBOSE_ENV)
        .map(|value| !value.is_empty() && value != "0")
        .unwrap_or(false)
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        eprintln!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    eprintln!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(1), "1 Byte");
        assert_eq!(format_size(999), "999 Bytes");
        assert_eq!(format_size(1000), "1.0 kB");
        assert_eq!(format_size(1500), "1.5 kB");
        assert_eq!(format_size(500_000), "500.0 kB");
        assert_eq!(format_size(2_000_000), "2.0 MB");
        assert_eq!(format_size(3_500_000_000), "3.5 GB");
    }

    #[test]
    fn test_has_valid_extension_is_case_insensitive() {
        let extensions = ["heic", "heif"];
        assert!(has_valid_extension(&PathBuf::from("a.heic"), &extensions));
        assert!(has_valid_extension(&PathBuf::from("b.HEIF"), &extensions));
        assert!(has_valid_extension(&PathBuf::from("dir/c.HeIc"), &extensions));
        assert!(!has_valid_extension(&PathBuf::from("d.jpg"), &extensions));
        assert!(!has_valid_extension(&PathBuf::from("heic"), &extensions));
    }

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(3).unwrap();
        assert_eq!(pb.length(), Some(3));
    }
}
