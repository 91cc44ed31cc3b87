//! HTML tree with byte spans.
//!
//! Wraps the `tl` parser and converts its arena into an owned tree. Every
//! node records the `[start, end)` byte range it occupies in the buffer it
//! was parsed from, so callers can splice the original text directly.
//!
//! Spans are only meaningful for that exact buffer. After any edit the
//! buffer has to be parsed again.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::ops::Range;

/// A parsed element, text run or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Lowercase tag name, `None` for text and comments.
    pub name: Option<String>,
    /// Raw attribute values keyed by lowercase name (entities not decoded).
    pub attrs: FxHashMap<String, String>,
    pub children: Vec<Node>,
    /// Byte range in the source buffer.
    pub span: Range<usize>,
}

impl Node {
    /// Whether this is an element with the given (lowercase) tag name.
    #[inline]
    pub fn is_tag(&self, tag: &str) -> bool {
        self.name.as_deref() == Some(tag)
    }

    #[inline]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// This node and all of its descendants, depth-first pre-order.
    pub fn descendants(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }
}

/// Depth-first pre-order walk over a forest, in document order.
pub struct Preorder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Walk every node of a parsed document in document order.
pub fn preorder(nodes: &[Node]) -> Preorder<'_> {
    Preorder {
        stack: nodes.iter().rev().collect(),
    }
}

/// Parse `html` into top-level nodes.
pub fn parse(html: &str) -> Result<Vec<Node>> {
    let dom = tl::parse(html, tl::ParserOptions::default()).context("failed to parse HTML")?;
    let parser = dom.parser();

    Ok(dom
        .children()
        .iter()
        .filter_map(|handle| convert(*handle, parser, html))
        .collect())
}

/// Elements whose content is text, not markup.
///
/// `tl` still parses tags inside them, so their children are dropped to keep
/// e.g. an `<img>` inside a JS string out of the tree.
const RAW_TEXT_ELEMENTS: [&str; 8] = [
    "script", "style", "textarea", "title", "xmp", "noembed", "noframes", "iframe",
];

/// Convert a tl node handle into an owned node.
fn convert(handle: tl::NodeHandle, parser: &tl::Parser, source: &str) -> Option<Node> {
    let node = handle.get(parser)?;

    match node {
        tl::Node::Tag(tag) => {
            let span = span_of(source, tag.raw().as_bytes())?;
            let name = tag.name().as_utf8_str().to_ascii_lowercase();

            let attrs = tag
                .attributes()
                .iter()
                .map(|(key, value)| {
                    (
                        key.to_ascii_lowercase(),
                        value.map(|v| v.into_owned()).unwrap_or_default(),
                    )
                })
                .collect();

            let children = if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                Vec::new()
            } else {
                tag.children()
                    .top()
                    .iter()
                    .filter_map(|child| convert(*child, parser, source))
                    .collect()
            };

            Some(Node {
                name: Some(name),
                attrs,
                children,
                span,
            })
        }
        tl::Node::Raw(bytes) | tl::Node::Comment(bytes) => Some(Node {
            name: None,
            attrs: FxHashMap::default(),
            children: Vec::new(),
            span: span_of(source, bytes.as_bytes())?,
        }),
    }
}

/// Byte range of `raw` inside `source`.
///
/// tl hands out slices borrowed from the input, so the offset falls out of
/// the pointer difference. Slices that do not point into `source` yield
/// `None`.
fn span_of(source: &str, raw: &[u8]) -> Option<Range<usize>> {
    let base = source.as_ptr() as usize;
    let start = (raw.as_ptr() as usize).checked_sub(base)?;
    let end = start.checked_add(raw.len())?;
    (end <= source.len()).then_some(start..end)
}
