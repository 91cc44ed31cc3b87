//! Stroke-inclusive bounds and root tag rewriting.
//!
//! Backs the `expandViewBox` and `removeDimensions` plugins, which run as
//! text passes over the serialized SVG.

use usvg::{Node, Rect, Tree};

/// Union of the stroke bounding boxes of every node in the tree.
///
/// Returns `None` for a tree without visible elements.
pub fn calculate_stroke_bounds(tree: &Tree) -> Option<Rect> {
    let mut bounds = None;
    traverse_group(tree.root(), &mut bounds);
    bounds
}

fn traverse_group(group: &usvg::Group, bounds: &mut Option<Rect>) {
    for node in group.children() {
        *bounds = Some(match *bounds {
            Some(existing) => union(existing, node.stroke_bounding_box()),
            None => node.stroke_bounding_box(),
        });

        if let Node::Group(nested) = node {
            traverse_group(nested, bounds);
        }
    }
}

fn union(a: Rect, b: Rect) -> Rect {
    let min_x = a.x().min(b.x());
    let min_y = a.y().min(b.y());
    let max_x = a.right().max(b.right());
    let max_y = a.bottom().max(b.bottom());
    Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y).unwrap_or(a)
}

/// Replace (or insert) the root `viewBox` so it matches `bounds`.
pub fn expand_viewbox_to_bounds(svg: &str, bounds: Rect) -> String {
    let viewbox = format!(
        "{} {} {} {}",
        bounds.x(),
        bounds.y(),
        bounds.width(),
        bounds.height()
    );
    set_root_attr(svg, "viewBox", &viewbox)
}

/// Drop `width` and `height` from the root `<svg>` tag.
pub fn remove_dimensions(svg: &str) -> String {
    let svg = remove_root_attr(svg, "width");
    remove_root_attr(&svg, "height")
}

/// Byte range of the root `<svg ...>` opening tag.
fn root_tag(svg: &str) -> Option<(usize, usize)> {
    let start = svg.find("<svg")?;
    let end = start + svg[start..].find('>')?;
    Some((start, end))
}

/// Find ` name="` inside the root tag, returning (attr_start, value_start, value_end).
fn find_root_attr(svg: &str, name: &str) -> Option<(usize, usize, usize)> {
    let (start, end) = root_tag(svg)?;
    let needle = format!(" {name}=\"");
    let attr_start = start + svg[start..end].find(&needle)?;
    let value_start = attr_start + needle.len();
    let value_end = value_start + svg[value_start..end].find('"')?;
    Some((attr_start, value_start, value_end))
}

fn set_root_attr(svg: &str, name: &str, value: &str) -> String {
    if let Some((_, value_start, value_end)) = find_root_attr(svg, name) {
        return format!("{}{}{}", &svg[..value_start], value, &svg[value_end..]);
    }

    match root_tag(svg) {
        Some((start, _)) => {
            let insert = start + "<svg".len();
            format!("{} {}=\"{}\"{}", &svg[..insert], name, value, &svg[insert..])
        }
        None => svg.to_string(),
    }
}

fn remove_root_attr(svg: &str, name: &str) -> String {
    match find_root_attr(svg, name) {
        Some((attr_start, _, value_end)) => {
            format!("{}{}", &svg[..attr_start], &svg[value_end + 1..])
        }
        None => svg.to_string(),
    }
}
