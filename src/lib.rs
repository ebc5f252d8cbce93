// Library exports for the converter binary and its tests
pub mod config_file;
pub mod image_processing;
pub mod report;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use config_file::{ConfigError, ConfigStore, Configuration, OutputFormat};
pub use image_processing::decode::{HeifDecoder, SystemDecoder};
pub use image_processing::normalize::{normalize, ColorMode, DecodedImage, PalettedImage};
pub use image_processing::{ConversionEngine, ConversionRecord};
pub use report::{summarize, Summary, SummaryReport};
pub use shell::{MenuChoice, Shell, Workspace};
