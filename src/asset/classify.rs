//! Image reference eligibility.
//!
//! A node is a candidate when all of these hold:
//!
//! 1. it is an `<img>` element
//! 2. its `src` is present and non-empty
//! 3. `src` contains `.svg`, `.png` or `.jpg`
//! 4. `src` resolves to an existing file under the source directory
//! 5. its start offset has not been attempted in this document yet

use std::ops::Range;
use std::path::{Path, PathBuf};

use super::AssetKind;
use crate::html::{Node, preorder};
use crate::rewrite::DocumentContext;
use crate::utils::html::unescape;
use crate::utils::path::resolve_asset_path;

/// An `<img>` node that passed every eligibility rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// `src` as written in the document.
    pub src: String,
    /// Resolved file on disk.
    pub path: PathBuf,
    pub kind: AssetKind,
    /// Span in the buffer version the node was parsed from.
    pub span: Range<usize>,
}

/// Decides which nodes are eligible image references.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    src_dir: &'a Path,
}

impl<'a> Classifier<'a> {
    pub fn new(src_dir: &'a Path) -> Self {
        Self { src_dir }
    }

    /// Check a single node against every rule.
    pub fn is_eligible(&self, node: &Node, ctx: &DocumentContext) -> bool {
        self.classify(node, ctx).is_some()
    }

    /// Candidate for `node`, or `None` if any rule fails.
    pub fn classify(&self, node: &Node, ctx: &DocumentContext) -> Option<Candidate> {
        if !node.is_tag("img") {
            return None;
        }

        let src = node.attr("src").map(unescape)?;
        if src.is_empty() {
            return None;
        }

        let kind = AssetKind::from_src(&src)?;

        if ctx.is_processed(node.span.start) {
            return None;
        }

        let path = resolve_asset_path(self.src_dir, &src);
        if !path.is_file() {
            return None;
        }

        Some(Candidate {
            src: src.into_owned(),
            path,
            kind,
            span: node.span.clone(),
        })
    }

    /// First candidate in document order.
    pub fn first_candidate(&self, nodes: &[Node], ctx: &DocumentContext) -> Option<Candidate> {
        preorder(nodes).find_map(|node| self.classify(node, ctx))
    }

    /// All candidates in document order.
    pub fn candidates(&self, nodes: &[Node], ctx: &DocumentContext) -> Vec<Candidate> {
        preorder(nodes)
            .filter_map(|node| self.classify(node, ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"data").unwrap();
        }
        dir
    }

    #[test]
    fn test_candidates_in_document_order() {
        let dir = setup(&["a.svg", "b.png", "nested/c.jpg"]);
        let classifier = Classifier::new(dir.path());
        let html = r#"<div><img src="a.svg"><p><img src="nested/c.jpg"></p></div><img src="b.png">"#;
        let nodes = parse(html).unwrap();

        let found: Vec<_> = classifier
            .candidates(&nodes, &DocumentContext::default())
            .into_iter()
            .map(|c| (c.src, c.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("a.svg".to_string(), AssetKind::Svg),
                ("nested/c.jpg".to_string(), AssetKind::Raster),
                ("b.png".to_string(), AssetKind::Raster),
            ]
        );
    }

    #[test]
    fn test_rejects_ineligible_nodes() {
        let dir = setup(&["a.svg", "a.gif"]);
        let classifier = Classifier::new(dir.path());
        let html = concat!(
            r#"<img>"#,
            r#"<img src="">"#,
            r#"<img src="a.gif">"#,
            r#"<img src="missing.svg">"#,
            r#"<a href="a.svg">x</a>"#,
            r#"<video src="a.svg"></video>"#,
        );
        let nodes = parse(html).unwrap();
        assert!(classifier
            .first_candidate(&nodes, &DocumentContext::default())
            .is_none());
    }

    #[test]
    fn test_directory_named_like_asset_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("folder.svg")).unwrap();
        let classifier = Classifier::new(dir.path());
        let nodes = parse(r#"<img src="folder.svg">"#).unwrap();
        assert!(!classifier.is_eligible(&nodes[0], &DocumentContext::default()));
    }

    #[test]
    fn test_processed_offset_is_skipped() {
        let dir = setup(&["a.svg", "b.svg"]);
        let classifier = Classifier::new(dir.path());
        let html = r#"<img src="a.svg"><img src="b.svg">"#;
        let nodes = parse(html).unwrap();

        let mut ctx = DocumentContext::default();
        let first = classifier.first_candidate(&nodes, &ctx).unwrap();
        assert_eq!(first.src, "a.svg");

        ctx.mark_processed(first.span.start);
        let second = classifier.first_candidate(&nodes, &ctx).unwrap();
        assert_eq!(second.src, "b.svg");
        assert_eq!(classifier.candidates(&nodes, &ctx).len(), 1);
    }

    #[test]
    fn test_resolves_encoded_and_rooted_src() {
        let dir = setup(&["img/my logo.svg", "a&b.png"]);
        let classifier = Classifier::new(dir.path());
        let html = r#"<img src="/img/my%20logo.svg?v=1"><img src="./a&amp;b.png">"#;
        let nodes = parse(html).unwrap();

        let found = classifier.candidates(&nodes, &DocumentContext::default());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, dir.path().join("img").join("my logo.svg"));
        assert_eq!(found[1].src, "./a&b.png");
    }
}
