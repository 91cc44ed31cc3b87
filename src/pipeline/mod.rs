//! Host lifecycle hooks.
//!
//! - [`Pipeline::pre_emit`]: rewrite an in-memory buffer before the host writes it
//! - [`Pipeline::post_emit`]: rewrite captured originals and overwrite the
//!   emitted files that changed
//!
//! Documents run in parallel on the rayon pool. Each one gets its own
//! [`DocumentContext`](crate::rewrite::DocumentContext); within a document
//! candidates are handled strictly in order.

use anyhow::Result;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::asset::{Classifier, Transformer};
use crate::config::InlineConfig;
use crate::logger::ProgressLine;
use crate::rewrite::{Outcome, RewriteEngine, RewriteStats};
use crate::svg::SvgOptimizer;
use crate::{debug, log};

/// A generated HTML document as captured from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the output directory.
    pub filename: PathBuf,
    pub html: String,
}

impl Document {
    pub fn new(filename: impl Into<PathBuf>, html: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            html: html.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no output directory provided, nothing was written")]
    MissingOutputDir,

    #[error("document has no filename")]
    MissingFilename,

    #[error("failed to write `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What happened to one document in [`Pipeline::post_emit`].
#[derive(Debug)]
enum Emitted {
    Written(PathBuf, RewriteStats),
    Unchanged(RewriteStats),
}

/// Totals for a [`Pipeline::post_emit`] run.
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Files overwritten with rewritten HTML.
    pub written: Vec<PathBuf>,
    /// Documents left as emitted.
    pub unchanged: usize,
    /// Documents aborted (missing filename, parse or write failure).
    pub failed: usize,
    pub stats: RewriteStats,
}

pub struct Pipeline<'a> {
    config: &'a InlineConfig,
    optimizer: &'a dyn SvgOptimizer,
    progress: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a InlineConfig, optimizer: &'a dyn SvgOptimizer) -> Self {
        Self {
            config,
            optimizer,
            progress: false,
        }
    }

    /// Show a `pages(n/total)` line while documents are processed.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn engine(&self) -> RewriteEngine<'a, Transformer<'a>> {
        RewriteEngine::new(
            Classifier::new(&self.config.src_dir),
            Transformer::new(self.config, self.optimizer),
        )
    }

    /// Rewrite one buffer with a fresh per-document context.
    pub fn rewrite(&self, html: &str) -> Result<Outcome> {
        self.engine().rewrite(html)
    }

    /// Pre-emit hook: returns the HTML the host should write.
    ///
    /// Never fails. An unparsable buffer is logged and returned as is.
    pub fn pre_emit(&self, document: &Document) -> String {
        match self.rewrite(&document.html) {
            Ok(Outcome::Unchanged) => {
                debug!("inline"; "no local images in {}", document.filename.display());
                document.html.clone()
            }
            Ok(outcome) => {
                debug!("inline"; "{}: {}", document.filename.display(), outcome.stats());
                outcome.into_html(&document.html)
            }
            Err(e) => {
                log!("error"; "{}: {:#}", document.filename.display(), e);
                document.html.clone()
            }
        }
    }

    /// Post-emit hook: rewrite each captured original and overwrite
    /// `output_dir/filename` when the result differs.
    ///
    /// A missing output directory aborts the whole invocation. Every other
    /// failure only aborts the document it belongs to.
    pub fn post_emit(&self, output_dir: Option<&Path>, documents: &[Document]) -> Result<EmitReport> {
        let Some(output_dir) = output_dir else {
            log!("error"; "{}", PipelineError::MissingOutputDir);
            return Err(PipelineError::MissingOutputDir.into());
        };

        let results = self.run_documents(documents, |document| self.emit(output_dir, document));

        let mut report = EmitReport::default();
        for (document, result) in documents.iter().zip(results) {
            match result {
                Ok(Emitted::Written(path, stats)) => {
                    report.stats.merge(&stats);
                    report.written.push(path);
                }
                Ok(Emitted::Unchanged(stats)) => {
                    report.stats.merge(&stats);
                    report.unchanged += 1;
                }
                Err(e) => {
                    log!("error"; "{}: {:#}", document.filename.display(), e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn emit(&self, output_dir: &Path, document: &Document) -> Result<Emitted> {
        if document.filename.as_os_str().is_empty() {
            return Err(PipelineError::MissingFilename.into());
        }

        let rewrite = match self.rewrite(&document.html)? {
            Outcome::Unchanged => {
                debug!("inline"; "no local images in {}", document.filename.display());
                return Ok(Emitted::Unchanged(RewriteStats::default()));
            }
            Outcome::Rewritten(rewrite) => rewrite,
        };

        if rewrite.html == document.html {
            return Ok(Emitted::Unchanged(rewrite.stats));
        }

        let path = output_dir.join(&document.filename);
        fs::write(&path, &rewrite.html).map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
        debug!("inline"; "{}: {}", document.filename.display(), rewrite.stats);

        Ok(Emitted::Written(path, rewrite.stats))
    }

    /// Run `f` over every document in parallel, preserving input order.
    pub fn run_documents<R, F>(&self, documents: &[Document], f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&Document) -> R + Sync,
    {
        let progress = (self.progress && !documents.is_empty())
            .then(|| ProgressLine::new(&[("pages", documents.len())]));

        let results = documents
            .par_iter()
            .map(|document| {
                let result = f(document);
                if let Some(p) = &progress {
                    p.inc("pages");
                }
                result
            })
            .collect();

        if let Some(p) = progress {
            p.finish();
        }
        results
    }
}
