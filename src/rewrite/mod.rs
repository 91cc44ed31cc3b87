//! Location-aware rewriting of one HTML document.
//!
//! The engine is an explicit loop over three phases:
//!
//! ```text
//!            ┌──────────── re-parse ◄────────────┐
//!            ▼                                    │
//!       Scanning ──(candidate)──► Processing ─────┘
//!            │                    record offset
//!       (none left)               transform
//!            ▼                    splice [start, end)
//!          Done
//! ```
//!
//! Every splice invalidates all spans of the tree it came from, so the
//! buffer is parsed again before the next candidate is looked up.

#[cfg(test)]
mod tests;

use anyhow::Result;
use rustc_hash::FxHashSet;
use std::error::Error;
use std::fmt;

use crate::asset::{AssetTransform, Candidate, Classifier, Strategy, TransformError};
use crate::{debug, html, log};

// ============================================================================
// per-document state
// ============================================================================

/// Start offsets already attempted in one document run.
///
/// Splices only touch text at or after the candidate being processed, and
/// every recorded offset is at or before it, so recorded offsets stay valid
/// across re-parses. Replacements are never empty, so the node after a
/// splice always starts past the recorded offset.
#[derive(Debug, Default)]
pub struct DocumentContext {
    processed: FxHashSet<usize>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_processed(&self, offset: usize) -> bool {
        self.processed.contains(&offset)
    }

    /// Returns `false` if the offset was already recorded.
    #[inline]
    pub fn mark_processed(&mut self, offset: usize) -> bool {
        self.processed.insert(offset)
    }

    /// Number of candidates attempted so far.
    pub fn attempted(&self) -> usize {
        self.processed.len()
    }
}

// ============================================================================
// outcome
// ============================================================================

/// Per-strategy counters for one document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub inlined: usize,
    pub embedded: usize,
    pub relocated: usize,
    pub failed: usize,
}

impl RewriteStats {
    fn record(&mut self, strategy: Strategy) {
        match strategy {
            Strategy::InlineSvg => self.inlined += 1,
            Strategy::Embed => self.embedded += 1,
            Strategy::Relocate => self.relocated += 1,
        }
    }

    /// Replacements that were spliced into the document.
    pub fn replaced(&self) -> usize {
        self.inlined + self.embedded + self.relocated
    }

    pub fn merge(&mut self, other: &Self) {
        self.inlined += other.inlined;
        self.embedded += other.embedded;
        self.relocated += other.relocated;
        self.failed += other.failed;
    }
}

impl fmt::Display for RewriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inlined, {} embedded, {} relocated, {} failed",
            self.inlined, self.embedded, self.relocated, self.failed
        )
    }
}

/// A candidate whose transform failed. Its `<img>` was left in place.
#[derive(Debug)]
pub struct AssetFailure {
    pub src: String,
    pub error: TransformError,
}

/// Result of a document run that found at least one candidate.
#[derive(Debug)]
pub struct Rewrite {
    pub html: String,
    pub stats: RewriteStats,
    pub failures: Vec<AssetFailure>,
}

#[derive(Debug)]
pub enum Outcome {
    /// No eligible reference was found.
    Unchanged,
    Rewritten(Rewrite),
}

impl Outcome {
    /// Final HTML, falling back to `original` when nothing was found.
    pub fn into_html(self, original: &str) -> String {
        match self {
            Self::Unchanged => original.to_string(),
            Self::Rewritten(rewrite) => rewrite.html,
        }
    }

    pub fn stats(&self) -> RewriteStats {
        match self {
            Self::Unchanged => RewriteStats::default(),
            Self::Rewritten(rewrite) => rewrite.stats,
        }
    }
}

// ============================================================================
// engine
// ============================================================================

enum Phase {
    Scanning,
    Processing(Candidate),
    Done,
}

/// Rewrites documents one candidate at a time.
pub struct RewriteEngine<'a, T> {
    classifier: Classifier<'a>,
    transformer: T,
}

impl<'a, T: AssetTransform> RewriteEngine<'a, T> {
    pub fn new(classifier: Classifier<'a>, transformer: T) -> Self {
        Self {
            classifier,
            transformer,
        }
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    /// Rewrite `html` with a fresh [`DocumentContext`].
    pub fn rewrite(&self, html: &str) -> Result<Outcome> {
        self.rewrite_with(html, &mut DocumentContext::new())
    }

    /// Rewrite `html`, recording attempts in `ctx`.
    ///
    /// Fails only if the buffer cannot be parsed. Per-asset failures are
    /// collected in [`Rewrite::failures`].
    pub fn rewrite_with(&self, html: &str, ctx: &mut DocumentContext) -> Result<Outcome> {
        let mut buffer = html.to_string();
        let mut stats = RewriteStats::default();
        let mut failures = Vec::new();
        let mut found = false;

        let mut phase = Phase::Scanning;
        loop {
            phase = match phase {
                Phase::Scanning => {
                    let nodes = html::parse(&buffer)?;
                    match self.classifier.first_candidate(&nodes, ctx) {
                        Some(candidate) => Phase::Processing(candidate),
                        None => Phase::Done,
                    }
                }
                Phase::Processing(candidate) => {
                    found = true;
                    ctx.mark_processed(candidate.span.start);

                    let result = self.transformer.transform(&candidate).and_then(|replacement| {
                        if replacement.fragment.is_empty() {
                            Err(TransformError::Empty {
                                path: replacement.record.path,
                            })
                        } else {
                            Ok(replacement)
                        }
                    });

                    match result {
                        Ok(replacement) => {
                            debug!(
                                replacement.record.strategy.as_str();
                                "{} ({} bytes)", candidate.src, replacement.record.size
                            );
                            buffer.replace_range(candidate.span.clone(), &replacement.fragment);
                            stats.record(replacement.record.strategy);
                        }
                        Err(error) => {
                            report(&candidate, &error);
                            stats.failed += 1;
                            failures.push(AssetFailure {
                                src: candidate.src,
                                error,
                            });
                        }
                    }
                    Phase::Scanning
                }
                Phase::Done => break,
            };
        }

        if !found {
            return Ok(Outcome::Unchanged);
        }
        debug!("inline"; "{} candidates attempted: {}", ctx.attempted(), stats);

        Ok(Outcome::Rewritten(Rewrite {
            html: buffer,
            stats,
            failures,
        }))
    }
}

fn report(candidate: &Candidate, error: &TransformError) {
    let mut message = format!("`{}`: {}", candidate.src, error);
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }

    if error.is_soft() {
        log!("warning"; "{}", message);
    } else {
        log!("error"; "{}", message);
    }
}
