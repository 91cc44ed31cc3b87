//! Replacement fragments for eligible image references.
//!
//! | kind   | condition           | fragment                                 |
//! |--------|---------------------|------------------------------------------|
//! | svg    | optimizer succeeds  | optimized `<svg>...</svg>` verbatim      |
//! | raster | size < image_limit  | `<img src="data:<mime>;base64,<data>">`  |
//! | raster | size >= image_limit | `<img src="./<base_path><file name>">`   |
//!
//! Relocated files are copied to `<dist_dir>/<base_path>/<file name>`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{AssetKind, AssetRecord, Candidate, Strategy};
use crate::config::{InlineConfig, PluginConfig};
use crate::svg::SvgOptimizer;
use crate::utils::html::img_tag;
use crate::utils::mime;

/// Characters escaped when a relocated file name becomes a URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Per-asset failure. Never fatal to the document.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to read `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to optimize `{}`", .path.display())]
    Optimize {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The transformer produced an empty fragment.
    #[error("empty replacement for `{}`", .path.display())]
    Empty { path: PathBuf },

    #[error("failed to relocate `{}` to `{}`", .from.display(), .to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransformError {
    /// Optimizer rejections are expected for odd SVGs and only warned about.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Optimize { .. } | Self::Empty { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Optimize { path, .. } | Self::Empty { path } => path,
            Self::Relocate { from, .. } => from,
        }
    }
}

/// Fragment that replaces the candidate's span, plus what was done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub fragment: String,
    pub record: AssetRecord,
}

/// Produces a replacement for one candidate.
///
/// The rewrite engine only talks to this trait, so tests can count calls or
/// script failures.
pub trait AssetTransform {
    fn transform(&self, candidate: &Candidate) -> Result<Replacement, TransformError>;
}

/// Default transformer: svg inlining, base64 embedding, relocation.
pub struct Transformer<'a> {
    config: &'a InlineConfig,
    plugins: PluginConfig,
    optimizer: &'a dyn SvgOptimizer,
}

impl<'a> Transformer<'a> {
    /// Plugin overrides are merged once here and reused for every SVG.
    pub fn new(config: &'a InlineConfig, optimizer: &'a dyn SvgOptimizer) -> Self {
        Self {
            config,
            plugins: config.plugins(),
            optimizer,
        }
    }

    fn inline_svg(&self, path: &Path) -> Result<Replacement, TransformError> {
        let read_err = |source| TransformError::Read {
            path: path.to_path_buf(),
            source,
        };
        let size = fs::metadata(path).map_err(read_err)?.len();
        let content = fs::read_to_string(path).map_err(read_err)?;

        let fragment = self
            .optimizer
            .optimize(&content, &self.plugins)
            .map_err(|source| TransformError::Optimize {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Replacement {
            fragment,
            record: AssetRecord {
                path: path.to_path_buf(),
                size,
                mime: mime::types::SVG,
                strategy: Strategy::InlineSvg,
            },
        })
    }

    fn raster(&self, path: &Path) -> Result<Replacement, TransformError> {
        let size = fs::metadata(path)
            .map_err(|source| TransformError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if size >= self.config.image_limit() {
            self.relocate(path, size)
        } else {
            self.embed(path, size)
        }
    }

    fn embed(&self, path: &Path, size: u64) -> Result<Replacement, TransformError> {
        let bytes = fs::read(path).map_err(|source| TransformError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mime = mime::from_path(path);
        let src = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));

        Ok(Replacement {
            fragment: img_tag(&src),
            record: AssetRecord {
                path: path.to_path_buf(),
                size,
                mime,
                strategy: Strategy::Embed,
            },
        })
    }

    fn relocate(&self, path: &Path, size: u64) -> Result<Replacement, TransformError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let dir = self.config.relocation_dir();
        let dest = dir.join(&file_name);
        let relocate_err = |source| TransformError::Relocate {
            from: path.to_path_buf(),
            to: dest.clone(),
            source,
        };

        // Several documents may race here; create_dir_all tolerates that.
        fs::create_dir_all(&dir).map_err(relocate_err)?;
        fs::copy(path, &dest).map_err(relocate_err)?;

        let encoded = utf8_percent_encode(&file_name, SEGMENT).to_string();
        Ok(Replacement {
            fragment: img_tag(&self.config.relocated_src(&encoded)),
            record: AssetRecord {
                path: path.to_path_buf(),
                size,
                mime: mime::from_path(path),
                strategy: Strategy::Relocate,
            },
        })
    }
}

impl AssetTransform for Transformer<'_> {
    fn transform(&self, candidate: &Candidate) -> Result<Replacement, TransformError> {
        match candidate.kind {
            AssetKind::Svg => self.inline_svg(&candidate.path),
            AssetKind::Raster => self.raster(&candidate.path),
        }
    }
}
