//! img-inline - inline local images into generated HTML.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use img_inline::cli::{Cli, Commands, run};
use img_inline::config::InlineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = InlineConfig::load(&cli)?;

    match &cli.command {
        Commands::Run { .. } => run::run_site(&config),
        Commands::File { path, output } => run::run_file(&config, path, output.as_deref()),
    }
}
