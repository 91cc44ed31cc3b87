use super::*;
use crate::asset::{AssetRecord, Replacement, Transformer};
use crate::config::{ByteSize, InlineConfig, PluginConfig};
use crate::svg::SvgOptimizer;
use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;

/// Always returns `<svg>OK</svg>`, failing on inputs containing "broken".
struct StubOptimizer;

impl SvgOptimizer for StubOptimizer {
    fn optimize(&self, svg: &str, _plugins: &PluginConfig) -> anyhow::Result<String> {
        anyhow::ensure!(!svg.contains("broken"), "malformed svg");
        Ok("<svg>OK</svg>".to_string())
    }
}

/// Wraps another transformer and records every `src` it was asked about.
struct Counting<T> {
    inner: T,
    seen: RefCell<Vec<String>>,
}

impl<T> Counting<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            seen: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl<T: AssetTransform> AssetTransform for Counting<T> {
    fn transform(&self, candidate: &Candidate) -> Result<Replacement, TransformError> {
        self.seen.borrow_mut().push(candidate.src.clone());
        self.inner.transform(candidate)
    }
}

/// Fails every other call with a read error.
struct Flaky {
    calls: Cell<usize>,
}

impl AssetTransform for Flaky {
    fn transform(&self, candidate: &Candidate) -> Result<Replacement, TransformError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        if n % 2 == 0 {
            return Err(TransformError::Read {
                path: candidate.path.clone(),
                source: io::Error::other("boom"),
            });
        }
        Ok(Replacement {
            fragment: "<svg>OK</svg>".to_string(),
            record: AssetRecord {
                path: candidate.path.clone(),
                size: 0,
                mime: "image/svg+xml",
                strategy: Strategy::InlineSvg,
            },
        })
    }
}

fn setup(files: &[(&str, usize)]) -> (TempDir, InlineConfig) {
    let dir = TempDir::new().unwrap();
    let config = InlineConfig::default().with_root(dir.path());
    for (name, size) in files {
        let path = config.src_dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bytes = if name.ends_with(".svg") {
            b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec()
        } else {
            vec![0u8; *size]
        };
        fs::write(path, bytes).unwrap();
    }
    (dir, config)
}

fn engine<'a>(
    config: &'a InlineConfig,
    optimizer: &'a dyn SvgOptimizer,
) -> RewriteEngine<'a, Counting<Transformer<'a>>> {
    RewriteEngine::new(
        Classifier::new(&config.src_dir),
        Counting::new(Transformer::new(config, optimizer)),
    )
}

fn rewritten(outcome: Outcome) -> Rewrite {
    match outcome {
        Outcome::Rewritten(rewrite) => rewrite,
        Outcome::Unchanged => panic!("expected a rewrite"),
    }
}

#[test]
fn test_no_candidates_is_unchanged() {
    let (_dir, config) = setup(&[]);
    let engine = engine(&config, &StubOptimizer);
    let html = "<!DOCTYPE html>\n<html><body><img src=\"missing.svg\"><img src=\"a.gif\">\n</body></html>";

    let outcome = engine.rewrite(html).unwrap();
    assert!(matches!(outcome, Outcome::Unchanged));
    assert_eq!(outcome.into_html(html), html);
    assert_eq!(engine.transformer().calls(), 0);
}

#[test]
fn test_inline_svg_in_place() {
    let (_dir, config) = setup(&[("logo.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);

    let rewrite = rewritten(engine.rewrite(r#"<div><img src="logo.svg"></div>"#).unwrap());
    assert_eq!(rewrite.html, "<div><svg>OK</svg></div>");
    assert_eq!(rewrite.stats.inlined, 1);
    assert!(rewrite.failures.is_empty());
}

#[test]
fn test_every_svg_is_inlined() {
    let (_dir, config) = setup(&[("a.svg", 0), ("b.svg", 0), ("icons/c.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);
    let html = concat!(
        r#"<header><img src="a.svg"></header>"#,
        r#"<p>text <img src="icons/c.svg" alt="c"> more</p>"#,
        r#"<footer><img src="b.svg"><img src="a.svg"></footer>"#,
    );

    let rewrite = rewritten(engine.rewrite(html).unwrap());
    assert_eq!(rewrite.html.matches("<svg>OK</svg>").count(), 4);
    assert!(!rewrite.html.contains("<img"));
    assert_eq!(rewrite.stats.inlined, 4);
    assert_eq!(
        *engine.transformer().seen.borrow(),
        vec!["a.svg", "icons/c.svg", "b.svg", "a.svg"]
    );
}

#[test]
fn test_call_count_matches_candidates() {
    let (_dir, config) = setup(&[("a.svg", 0), ("small.png", 10), ("big.jpg", 6000)]);
    let engine = engine(&config, &StubOptimizer);
    let html = r#"<img src="a.svg"><img src="small.png"><img src="none.png"><img src="big.jpg">"#;

    let expected = Classifier::new(&config.src_dir)
        .candidates(&html::parse(html).unwrap(), &DocumentContext::new())
        .len();
    let rewrite = rewritten(engine.rewrite(html).unwrap());

    assert_eq!(expected, 3);
    assert_eq!(engine.transformer().calls(), expected);
    assert_eq!(rewrite.stats.replaced(), expected);
    assert_eq!(
        (rewrite.stats.inlined, rewrite.stats.embedded, rewrite.stats.relocated),
        (1, 1, 1)
    );
    assert!(rewrite.html.contains(r#"<img src="none.png">"#));
}

#[test]
fn test_large_raster_relocated() {
    let (_dir, config) = setup(&[("photo.png", 10000)]);
    let engine = engine(&config, &StubOptimizer);

    let rewrite = rewritten(
        engine
            .rewrite(r#"<p><img src="photo.png" alt="photo" width="40"></p>"#)
            .unwrap(),
    );
    assert_eq!(rewrite.html, r#"<p><img src="./assets/photo.png"></p>"#);
    assert!(config.dist_dir.join("assets").join("photo.png").is_file());
}

#[test]
fn test_small_raster_embedded() {
    let (_dir, config) = setup(&[("dot.jpg", 5147)]);
    let engine = engine(&config, &StubOptimizer);

    let rewrite = rewritten(engine.rewrite(r#"<img src="dot.jpg">"#).unwrap());
    assert!(rewrite.html.starts_with(r#"<img src="data:image/jpeg;base64,"#));
    assert!(!config.relocation_dir().exists());
}

#[test]
fn test_relocated_img_not_reprocessed() {
    // The relocated src also resolves to an existing file under src/, so the
    // new <img> at the same offset is only skipped because it was recorded.
    let (_dir, mut config) = setup(&[("photo.png", 100), ("assets/photo.png", 100)]);
    config.image_limit = ByteSize::new(10);
    let engine = engine(&config, &StubOptimizer);

    let rewrite = rewritten(engine.rewrite(r#"<img src="photo.png">"#).unwrap());
    assert_eq!(rewrite.html, r#"<img src="./assets/photo.png">"#);
    assert_eq!(engine.transformer().calls(), 1);
}

#[test]
fn test_failures_leave_img_and_continue() {
    let (_dir, config) = setup(&[("ok.svg", 0), ("bad.svg", 0)]);
    fs::write(config.src_dir.join("bad.svg"), "broken").unwrap();
    let engine = engine(&config, &StubOptimizer);
    let html = r#"<img src="bad.svg"><span></span><img src="ok.svg">"#;

    let rewrite = rewritten(engine.rewrite(html).unwrap());
    assert_eq!(rewrite.html, r#"<img src="bad.svg"><span></span><svg>OK</svg>"#);
    assert_eq!(rewrite.stats.failed, 1);
    assert_eq!(rewrite.failures.len(), 1);
    assert_eq!(rewrite.failures[0].src, "bad.svg");
    assert!(rewrite.failures[0].error.is_soft());
    assert_eq!(engine.transformer().calls(), 2);
}

#[test]
fn test_hard_failures_recorded() {
    let (_dir, config) = setup(&[("a.svg", 0), ("b.svg", 0), ("c.svg", 0)]);
    let engine = RewriteEngine::new(
        Classifier::new(&config.src_dir),
        Flaky {
            calls: Cell::new(0),
        },
    );

    let rewrite = rewritten(
        engine
            .rewrite(r#"<img src="a.svg"><img src="b.svg"><img src="c.svg">"#)
            .unwrap(),
    );
    assert_eq!(rewrite.html, r#"<img src="a.svg"><svg>OK</svg><img src="c.svg">"#);
    assert_eq!(rewrite.stats.failed, 2);
    assert!(matches!(rewrite.failures[0].error, TransformError::Read { .. }));
    assert_eq!(rewrite.failures[1].src, "c.svg");
}

#[test]
fn test_all_failures_still_report_rewrite() {
    let (_dir, config) = setup(&[("bad.svg", 0)]);
    fs::write(config.src_dir.join("bad.svg"), "broken").unwrap();
    let engine = engine(&config, &StubOptimizer);
    let html = r#"<img src="bad.svg">"#;

    let rewrite = rewritten(engine.rewrite(html).unwrap());
    assert_eq!(rewrite.html, html);
    assert_eq!(rewrite.stats.replaced(), 0);
}

#[test]
fn test_stub_output_is_fixed_point() {
    let (_dir, config) = setup(&[("logo.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);

    let once = rewritten(engine.rewrite(r#"<img src="logo.svg">"#).unwrap()).html;
    let twice = StubOptimizer.optimize(&once, &config.plugins()).unwrap();
    assert_eq!(once, twice);
    assert!(matches!(engine.rewrite(&once).unwrap(), Outcome::Unchanged));
}

#[test]
fn test_context_is_per_document() {
    let (_dir, config) = setup(&[("a.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);
    let html = r#"<img src="a.svg">"#;

    let first = engine.rewrite(html).unwrap().into_html(html);
    let second = engine.rewrite(html).unwrap().into_html(html);
    assert_eq!(first, second);
    assert_eq!(engine.transformer().calls(), 2);
}

#[test]
fn test_shared_context_skips_recorded_offsets() {
    let (_dir, config) = setup(&[("a.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);
    let mut ctx = DocumentContext::new();
    ctx.mark_processed(0);

    let outcome = engine.rewrite_with(r#"<img src="a.svg">"#, &mut ctx).unwrap();
    assert!(matches!(outcome, Outcome::Unchanged));
    assert_eq!(ctx.attempted(), 1);
    assert!(!ctx.mark_processed(0));
}

#[test]
fn test_stats_display_and_merge() {
    let mut total = RewriteStats {
        inlined: 1,
        ..Default::default()
    };
    total.merge(&RewriteStats {
        embedded: 2,
        failed: 1,
        ..Default::default()
    });
    assert_eq!(total.to_string(), "1 inlined, 2 embedded, 0 relocated, 1 failed");
}

#[test]
fn test_src_dir_is_root_for_lookup() {
    let (dir, config) = setup(&[("a.svg", 0)]);
    fs::write(dir.path().join("outside.svg"), "<svg/>").unwrap();
    let engine = engine(&config, &StubOptimizer);

    let html = r#"<img src="../outside.svg">"#;
    assert!(matches!(engine.rewrite(html).unwrap(), Outcome::Unchanged));
    assert!(Path::new(&config.src_dir).join("a.svg").is_file());
}

#[test]
fn test_raw_text_and_comments_are_not_rewritten() {
    let (_dir, config) = setup(&[("a.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);
    let html = concat!(
        r#"<script>var s = '<img src="a.svg">';</script>"#,
        r#"<!-- <img src="a.svg"> -->"#,
        r#"<textarea><img src="a.svg"></textarea>"#,
        r#"<style>/* <img src="a.svg"> */</style>"#,
    );

    let outcome = engine.rewrite(html).unwrap();
    assert!(matches!(outcome, Outcome::Unchanged));
    assert_eq!(engine.transformer().calls(), 0);
}

#[test]
fn test_img_after_script_still_rewritten() {
    let (_dir, config) = setup(&[("a.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);
    let html = r#"<script>let x = '<img src="a.svg">';</script><img src="a.svg">"#;

    let rewrite = rewritten(engine.rewrite(html).unwrap());
    assert_eq!(
        rewrite.html,
        r#"<script>let x = '<img src="a.svg">';</script><svg>OK</svg>"#
    );
    assert_eq!(engine.transformer().calls(), 1);
}

/// Optimizer that returns an empty document.
struct EmptyOptimizer;

impl SvgOptimizer for EmptyOptimizer {
    fn optimize(&self, _svg: &str, _plugins: &PluginConfig) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

#[test]
fn test_empty_fragment_leaves_img_and_reaches_next() {
    let (_dir, config) = setup(&[("a.svg", 0), ("b.svg", 0)]);
    let engine = engine(&config, &EmptyOptimizer);
    let html = r#"<img src="a.svg"><img src="b.svg">"#;

    let rewrite = rewritten(engine.rewrite(html).unwrap());
    assert_eq!(rewrite.html, html);
    assert_eq!(*engine.transformer().seen.borrow(), vec!["a.svg", "b.svg"]);
    assert_eq!(rewrite.stats.failed, 2);
    assert!(rewrite
        .failures
        .iter()
        .all(|f| matches!(f.error, TransformError::Empty { .. }) && f.error.is_soft()));
}

#[test]
fn test_whitespace_src_is_not_trimmed() {
    let (_dir, config) = setup(&[("logo.svg", 0)]);
    let engine = engine(&config, &StubOptimizer);

    let outcome = engine.rewrite(r#"<img src=" logo.svg ">"#).unwrap();
    assert!(matches!(outcome, Outcome::Unchanged));
}
