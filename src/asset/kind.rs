//! Asset kind definitions.

use std::path::PathBuf;

/// Kind of image asset, decided by the `src` value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// `.svg` reference, inlined as optimized markup.
    Svg,
    /// `.png` / `.jpg` reference, embedded or relocated by size.
    Raster,
}

impl AssetKind {
    /// Classify by literal substring, the same way eligibility is checked.
    ///
    /// `.svg` wins when several markers appear (`a.svg.png`).
    pub fn from_src(src: &str) -> Option<Self> {
        if src.contains(".svg") {
            Some(Self::Svg)
        } else if src.contains(".png") || src.contains(".jpg") {
            Some(Self::Raster)
        } else {
            None
        }
    }
}

/// How a candidate was (or is about to be) replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Optimized `<svg>` markup replaces the `<img>`.
    InlineSvg,
    /// `<img src="data:...;base64,...">`.
    Embed,
    /// File copied under the relocation directory, `<img>` points at it.
    Relocate,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InlineSvg => "inline",
            Self::Embed => "embed",
            Self::Relocate => "relocate",
        }
    }
}

/// Processing-time facts about one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub path: PathBuf,
    pub size: u64,
    pub mime: &'static str,
    pub strategy: Strategy,
}
