//! img-inline - inline local images into generated HTML.
//!
//! `<img>` references to local `.svg`, `.png` and `.jpg` files are replaced
//! in place:
//!
//! - svg: optimized inline markup
//! - small raster: `data:` URI
//! - large raster: copied under `dist_dir/base_path`, `<img>` repointed
//!
//! Hosts call [`pipeline::Pipeline::pre_emit`] or
//! [`pipeline::Pipeline::post_emit`].

pub mod asset;
pub mod cli;
pub mod config;
pub mod html;
pub mod logger;
pub mod pipeline;
pub mod rewrite;
pub mod svg;
pub mod utils;
