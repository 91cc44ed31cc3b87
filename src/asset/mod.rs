//! Image asset handling.
//!
//! - [`Classifier`]: which `<img>` nodes are eligible
//! - [`Transformer`]: what replaces them (inline svg, data URI, relocation)

mod classify;
mod kind;
mod transform;

pub use classify::{Candidate, Classifier};
pub use kind::{AssetKind, AssetRecord, Strategy};
pub use transform::{AssetTransform, Replacement, TransformError, Transformer};
