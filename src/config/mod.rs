//! Configuration for `inline.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError, ConfigDiagnostics
//! ├── plugins    # Ordered SVG plugin sequence + merge rule
//! ├── size       # ByteSize ("5KB" or 5148)
//! └── mod.rs     # InlineConfig (this file)
//! ```
//!
//! # Example
//!
//! ```toml
//! run_pre_emit = false
//! base_path = "assets/"     # relocation subdirectory under dist_dir
//! image_limit = "5KB"       # rasters at or above this are relocated
//! src_dir = "src"           # where `<img src>` values are resolved
//! dist_dir = "dist"         # build output
//!
//! [svgo]                    # overrides for the optimizer plugin sequence
//! floatPrecision = 2
//! removeDimensions = true
//! ```
//!
//! Host-style camelCase names (`runPreEmit`, `basePath`, `imageLimit`,
//! `svgoConfig`) are accepted as aliases.

mod error;
mod plugins;
mod size;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use plugins::{PluginConfig, is_enabled_value};
pub use size::ByteSize;

use crate::cli::{Cli, Commands};
use crate::utils::path::normalize_path;
use crate::{debug, log};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use util::find_config_file;

/// Rasters at or above this many bytes are relocated instead of embedded.
pub const DEFAULT_IMAGE_LIMIT: u64 = 5148;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing inline.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Which host hook drives the rewrite: pre-emit (in-memory) or post-emit.
    #[serde(alias = "runPreEmit")]
    pub run_pre_emit: bool,

    /// Subdirectory of `dist_dir` that receives relocated rasters.
    #[serde(alias = "basePath")]
    pub base_path: String,

    /// Raster inlining threshold.
    #[serde(alias = "imageLimit")]
    pub image_limit: ByteSize,

    /// Source assets directory `<img src>` values resolve against.
    #[serde(alias = "srcDir")]
    pub src_dir: PathBuf,

    /// Build output directory.
    #[serde(alias = "distDir")]
    pub dist_dir: PathBuf,

    /// Overrides merged onto [`PluginConfig::defaults`].
    #[serde(alias = "svgoConfig")]
    pub svgo: PluginConfig,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            run_pre_emit: false,
            base_path: "assets/".to_string(),
            image_limit: ByteSize::new(DEFAULT_IMAGE_LIMIT),
            src_dir: PathBuf::from("src"),
            dist_dir: PathBuf::from("dist"),
            svgo: PluginConfig::new(),
        }
    }
}

impl InlineConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file. A missing file is not an
    /// error: defaults apply, rooted at the current directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let (mut config, root) = match find_config_file(&cli.config) {
            Some(path) => {
                let config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (Self { config_path: path, ..config }, root)
            }
            None => {
                debug!("config"; "`{}` not found, using defaults", cli.config.display());
                (Self::default(), std::env::current_dir()?)
            }
        };

        config.apply_cli(cli);
        config.finalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warning"; "unknown fields in {}, ignoring: {}", path.display(), ignored.join(", "));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Apply CLI overrides.
    fn apply_cli(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        Self::update_option(&mut self.src_dir, cli.src.as_ref());
        Self::update_option(&mut self.dist_dir, cli.dist.as_ref());
        if let Commands::Run { pre_emit } = &cli.command {
            Self::update_option(&mut self.run_pre_emit, pre_emit.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve directories against `root` and normalize `base_path`.
    pub fn finalize(&mut self, root: &Path) {
        self.root = normalize_path(root);
        self.src_dir = normalize_path(&self.root.join(&self.src_dir));
        self.dist_dir = normalize_path(&self.root.join(&self.dist_dir));
        self.base_path = normalize_base_path(&self.base_path);
    }

    /// Builder-style [`finalize`](Self::finalize) for library hosts.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.finalize(root);
        self
    }

    // ========================================================================
    // derived values
    // ========================================================================

    /// Effective plugin sequence: defaults with `svgo` overrides applied.
    pub fn plugins(&self) -> PluginConfig {
        PluginConfig::defaults().merged(&self.svgo)
    }

    /// Inlining threshold in bytes.
    pub fn image_limit(&self) -> u64 {
        self.image_limit.bytes()
    }

    /// Directory relocated rasters are copied into.
    pub fn relocation_dir(&self) -> PathBuf {
        self.dist_dir.join(&self.base_path)
    }

    /// `src` value for a relocated raster: `./<base_path><file_name>`.
    pub fn relocated_src(&self, file_name: &str) -> String {
        format!("./{}{}", self.base_path, file_name)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        let base = Path::new(&self.base_path);
        if base.is_absolute() {
            diag.error_with_hint(
                "base_path",
                format!("`{}` must be relative to dist_dir", self.base_path),
                "use e.g. base_path = \"assets/\"",
            );
        } else if base.components().any(|c| c == Component::ParentDir) {
            diag.error("base_path", format!("`{}` must not contain `..`", self.base_path));
        }

        if self.src_dir.as_os_str().is_empty() {
            diag.error("src_dir", "must not be empty");
        }
        if self.dist_dir.as_os_str().is_empty() {
            diag.error("dist_dir", "must not be empty");
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

/// Strip leading `./` and `/`, and end non-empty values with a single `/`.
fn normalize_base_path(base: &str) -> String {
    let trimmed = base
        .trim()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

// ============================================================================
// tests
// ============================================================================
