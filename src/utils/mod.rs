//! Shared helpers for html text, mime types and paths.

pub mod html;
pub mod mime;
pub mod path;
