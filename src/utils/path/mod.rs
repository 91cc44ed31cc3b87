//! Path utilities.
//!
//! - `normalize_path` - filesystem paths to absolute form
//! - `resolve_asset_path` - map an `<img src>` value onto the source tree

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, then falls back to joining with the
/// current directory for paths that do not exist yet.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Resolve an `src` attribute value against the source assets directory.
///
/// Query strings and fragments are dropped, percent escapes decoded, and
/// leading `./` or `/` ignored. `..` segments never climb above `base`.
///
/// # Example
/// ```ignore
/// let path = resolve_asset_path(Path::new("src"), "./images/my%20logo.svg?v=2");
/// assert_eq!(path, PathBuf::from("src/images/my logo.svg"));
/// ```
pub fn resolve_asset_path(base: &Path, src: &str) -> PathBuf {
    let src = strip_query(src);
    let decoded = percent_decode_str(src).decode_utf8_lossy();

    let mut result = base.to_path_buf();
    let mut depth = 0usize;

    for part in decoded.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if depth > 0 {
                    result.pop();
                    depth -= 1;
                }
            }
            _ => {
                result.push(part);
                depth += 1;
            }
        }
    }

    result
}

/// Drop `?query` and `#fragment` suffixes from a URL-ish path.
#[inline]
pub fn strip_query(src: &str) -> &str {
    src.find(['?', '#']).map_or(src, |idx| &src[..idx])
}
