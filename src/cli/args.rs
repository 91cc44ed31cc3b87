//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Inline local images into generated HTML
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: inline.toml)
    #[arg(short = 'C', long, global = true, default_value = "inline.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Source assets directory (overrides `src_dir`)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub src: Option<PathBuf>,

    /// Output directory (overrides `dist_dir`)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub dist: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rewrite every HTML file under the output directory
    #[command(visible_alias = "r")]
    Run {
        /// Rewrite through the pre-emit hook instead of the post-emit hook
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        pre_emit: Option<bool>,
    },

    /// Rewrite a single HTML file
    #[command(visible_alias = "f")]
    File {
        /// HTML file to rewrite
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}
