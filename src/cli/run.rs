//! `run` and `file` commands.
//!
//! Stand-ins for a host build: HTML already emitted under `dist_dir` is
//! captured and driven through the hook selected by `run_pre_emit`.

use anyhow::{Context, Result, bail};
use jwalk::WalkDir;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::config::InlineConfig;
use crate::log;
use crate::pipeline::{Document, Pipeline};
use crate::svg::UsvgOptimizer;

/// Rewrite every HTML file under `dist_dir`.
pub fn run_site(config: &InlineConfig) -> Result<()> {
    let dist = &config.dist_dir;
    if !dist.is_dir() {
        bail!("output directory `{}` does not exist", dist.display());
    }

    let documents = collect_documents(dist)?;
    if documents.is_empty() {
        log!("run"; "no html files under {}", dist.display());
        return Ok(());
    }

    let start = Instant::now();
    let optimizer = UsvgOptimizer;
    let pipeline = Pipeline::new(config, &optimizer).with_progress(!crate::logger::is_verbose());

    let (written, failed) = if config.run_pre_emit {
        (pre_emit_all(&pipeline, dist, &documents), 0)
    } else {
        let report = pipeline.post_emit(Some(dist), &documents)?;
        log!("inline"; "{}", report.stats);
        (report.written.len(), report.failed)
    };

    log!(
        "run";
        "{}/{} pages rewritten in {:.2?}{}",
        written,
        documents.len(),
        start.elapsed(),
        if failed > 0 { format!(", {failed} failed") } else { String::new() }
    );
    Ok(())
}

/// Rewrite one HTML file to `output`, or stdout when `output` is `None`.
pub fn run_file(config: &InlineConfig, path: &Path, output: Option<&Path>) -> Result<()> {
    let html = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path.file_name().map(Path::new).unwrap_or(path);

    let optimizer = UsvgOptimizer;
    let pipeline = Pipeline::new(config, &optimizer);
    let rewritten = pipeline.pre_emit(&Document::new(filename, html));

    match output {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(out, rewritten).with_context(|| format!("failed to write {}", out.display()))?;
            log!("run"; "wrote {}", out.display());
        }
        None => print!("{rewritten}"),
    }
    Ok(())
}

/// Pre-emit mode: rewrite in memory, then write back what the host would.
fn pre_emit_all(pipeline: &Pipeline<'_>, dist: &Path, documents: &[Document]) -> usize {
    let outputs = pipeline.run_documents(documents, |document| pipeline.pre_emit(document));

    documents
        .iter()
        .zip(outputs)
        .filter(|(document, html)| document.html != *html)
        .filter(|(document, html)| {
            let path = dist.join(&document.filename);
            match fs::write(&path, html) {
                Ok(()) => true,
                Err(e) => {
                    log!("error"; "failed to write {}: {}", path.display(), e);
                    false
                }
            }
        })
        .count()
}

/// Capture every `*.html` under `dist`, sorted by path.
fn collect_documents(dist: &Path) -> Result<Vec<Document>> {
    let mut paths: Vec<_> = WalkDir::new(dist)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let html = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let filename = path.strip_prefix(dist).unwrap_or(&path).to_path_buf();
            Ok(Document::new(filename, html))
        })
        .collect()
}
