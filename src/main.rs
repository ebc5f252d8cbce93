use anyhow::{Context, Result};
use console::style;
use std::io;

use heic_converter::image_processing::decode::is_heif_decoder_available;
use heic_converter::utils::{verbose_from_env, verbose_println, warn_println};
use heic_converter::{ConversionEngine, Shell, Workspace};

fn run() -> Result<()> {
    let verbose = verbose_from_env();

    ctrlc::set_handler(|| {
        println!("\n{}", style("Interrupted.").yellow());
        std::process::exit(130);
    })
    .context("Failed to install Ctrl-C handler")?;

    // Print banner
    println!("\n{}", style(" HEIC/HEIF Batch Converter ").bold().white().on_blue());

    if !is_heif_decoder_available() {
        warn_println(
            "HEIF support unavailable: ImageMagick ('magick' or 'convert') was not found. \
             Install ImageMagick with libheif to convert .heic/.heif files.",
        );
    }

    let workspace = Workspace::new(
        std::env::current_dir().context("Failed to determine working directory")?,
    );
    verbose_println(
        verbose,
        &format!("Working directory: {}", workspace.root().display()),
    );

    let stdin = io::stdin();
    let mut shell = Shell::new(
        stdin.lock(),
        io::stdout(),
        workspace,
        ConversionEngine::new(verbose),
    );
    shell.run()
}

fn main() {
    if let Err(e) = run() {
        println!("\n{}", style(format!("Error: {:#}", e)).red());
        std::process::exit(1);
    }
}
