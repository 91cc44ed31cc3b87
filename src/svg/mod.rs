//! SVG optimization.
//!
//! - [`SvgOptimizer`]: the seam the image transformer calls through
//! - [`UsvgOptimizer`]: default implementation (usvg parse + re-serialize)
//! - [`bounds`]: text passes over serialized output (viewBox, dimensions)
//!
//! ```text
//! raw svg ──► usvg::Tree ──► WriteOptions ──► passes ──► inline markup
//!                 ▲               ▲              ▲
//!                dpi        precision/indent   expandViewBox
//!                           prefixIds/quotes   removeDimensions
//! ```

mod bounds;
mod optimize;

pub use optimize::{OptimizeOptions, Pass, UsvgOptimizer};

use crate::config::PluginConfig;
use anyhow::Result;

/// Turns raw SVG text into optimized markup.
///
/// Implementations must be safe to share between documents processed in
/// parallel.
pub trait SvgOptimizer: Send + Sync {
    /// Optimize `svg` using the ordered plugin sequence.
    fn optimize(&self, svg: &str, plugins: &PluginConfig) -> Result<String>;
}
