//! SVG optimization using usvg.
//!
//! The plugin sequence is translated into usvg parse/write options plus an
//! ordered list of text passes applied to the serialized output.

use anyhow::{Context, Result};
use serde_json::Value;

use super::SvgOptimizer;
use super::bounds::{calculate_stroke_bounds, expand_viewbox_to_bounds, remove_dimensions};
use crate::config::{PluginConfig, is_enabled_value};
use crate::debug;

/// Id prefix used when `prefixIds = true`.
const DEFAULT_ID_PREFIX: &str = "svg-";

/// Post-serialization passes, run in plugin order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    ExpandViewBox,
    RemoveDimensions,
}

/// Options derived from a plugin sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    pub dpi: f32,
    pub preserve_text: bool,
    pub coordinates_precision: u8,
    pub transforms_precision: u8,
    pub indent: usvg::Indent,
    pub single_quote: bool,
    pub id_prefix: Option<String>,
    pub passes: Vec<Pass>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            preserve_text: true,
            coordinates_precision: 4,
            transforms_precision: 6,
            indent: usvg::Indent::None,
            single_quote: false,
            id_prefix: None,
            passes: Vec::new(),
        }
    }
}

impl OptimizeOptions {
    /// Translate a plugin sequence. Unknown plugins and malformed values are
    /// skipped with a debug message.
    pub fn from_plugins(plugins: &PluginConfig) -> Self {
        let mut options = Self::default();

        for (name, value) in plugins.iter() {
            let applied = match name {
                "dpi" => as_f32(value).map(|dpi| options.dpi = dpi),
                "preserveText" => value.as_bool().map(|b| options.preserve_text = b),
                "floatPrecision" => as_u8(value).map(|p| options.coordinates_precision = p),
                "transformPrecision" => as_u8(value).map(|p| options.transforms_precision = p),
                "indent" => as_indent(value).map(|i| options.indent = i),
                "singleQuote" => value.as_bool().map(|b| options.single_quote = b),
                "prefixIds" => as_prefix(value).map(|p| options.id_prefix = p),
                "expandViewBox" => Some(options.push_pass(Pass::ExpandViewBox, value)),
                "removeDimensions" => Some(options.push_pass(Pass::RemoveDimensions, value)),
                _ => {
                    debug!("svg"; "ignoring unknown plugin `{}`", name);
                    continue;
                }
            };

            if applied.is_none() {
                debug!("svg"; "ignoring plugin `{}`: unsupported value {}", name, value);
            }
        }

        options
    }

    fn push_pass(&mut self, pass: Pass, value: &Value) {
        if is_enabled_value(value) {
            self.passes.push(pass);
        }
    }

    fn write_options(&self) -> usvg::WriteOptions {
        usvg::WriteOptions {
            id_prefix: self.id_prefix.clone(),
            preserve_text: self.preserve_text,
            coordinates_precision: self.coordinates_precision,
            transforms_precision: self.transforms_precision,
            use_single_quote: self.single_quote,
            indent: self.indent,
            ..Default::default()
        }
    }
}

fn as_f32(value: &Value) -> Option<f32> {
    value.as_f64().filter(|v| *v > 0.0).map(|v| v as f32)
}

fn as_u8(value: &Value) -> Option<u8> {
    value.as_u64().and_then(|v| u8::try_from(v).ok())
}

fn as_indent(value: &Value) -> Option<usvg::Indent> {
    match value {
        Value::Bool(false) | Value::Null => Some(usvg::Indent::None),
        Value::Bool(true) => Some(usvg::Indent::Spaces(2)),
        Value::String(s) if s == "tabs" => Some(usvg::Indent::Tabs),
        Value::String(s) if s == "none" => Some(usvg::Indent::None),
        other => as_u8(other).map(usvg::Indent::Spaces),
    }
}

fn as_prefix(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Bool(false) | Value::Null => Some(None),
        Value::Bool(true) => Some(Some(DEFAULT_ID_PREFIX.to_string())),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

/// Optimizer backed by usvg: parse, normalize, re-serialize.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsvgOptimizer;

impl SvgOptimizer for UsvgOptimizer {
    fn optimize(&self, svg: &str, plugins: &PluginConfig) -> Result<String> {
        let options = OptimizeOptions::from_plugins(plugins);

        let usvg_options = usvg::Options {
            dpi: options.dpi,
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &usvg_options).context("failed to parse SVG")?;

        let mut optimized = tree.to_string(&options.write_options());

        for pass in &options.passes {
            optimized = match pass {
                Pass::ExpandViewBox => match calculate_stroke_bounds(&tree) {
                    Some(bounds) => expand_viewbox_to_bounds(&optimized, bounds),
                    None => optimized,
                },
                Pass::RemoveDimensions => remove_dimensions(&optimized),
            };
        }

        Ok(optimized)
    }
}
