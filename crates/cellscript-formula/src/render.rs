//! Canonical text and offset table for a parsed formula
//!
//! Rendering walks the AST depth first and records, for every piece of
//! output text, which node produced it. The editor uses the segment kinds as
//! style tags and the hint resolver maps a caret position back to a node
//! through the segment paths.

use crate::ast::{Ast, Call, Expression, Node, NodeKind, NodePath};
use crate::value::Value;
use lazy_regex::regex_is_match;
use std::ops::Range;

/// Which part of a node a segment covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SegmentPart {
    /// The whole text of a leaf node
    Leaf,
    /// The leading `=` of a formula
    Equals,
    /// `name(`
    Opening,
    /// `,` between arguments
    Separator,
    /// `)`
    Closing,
}

/// A run of rendered text and the node it came from
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Segment {
    pub kind: NodeKind,
    pub part: SegmentPart,
    /// Half-open range in chars
    pub range: Range<usize>,
    pub path: NodePath,
}

/// Rendered formula text with its offset table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rendered {
    pub text: String,
    /// Ordered segments tiling `0..text.chars().count()`
    pub segments: Vec<Segment>,
    /// Set when the AST could not have come from the parser
    pub failed: bool,
}

impl Rendered {
    fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    /// Segment containing the char at `index`
    pub fn segment_at(&self, index: usize) -> Option<&Segment> {
        let pos = self.segments.partition_point(|s| s.range.end <= index);
        self.segments.get(pos).filter(|s| s.range.contains(&index))
    }

    /// Text covered by a segment
    pub fn slice(&self, segment: &Segment) -> &str {
        let byte = |char_index: usize| {
            self.text
                .char_indices()
                .nth(char_index)
                .map_or(self.text.len(), |(b, _)| b)
        };
        &self.text[byte(segment.range.start)..byte(segment.range.end)]
    }
}

/// Renderer settings
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Escape `& < > " '` inside string literals (default: true)
    pub escape_markup: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            escape_markup: true,
        }
    }
}

/// Render with default options
pub fn render(ast: &Ast) -> Rendered {
    render_with(ast, &RenderOptions::default())
}

/// Render with explicit options. Never fails: a malformed AST gives an
/// empty result with `failed` set.
pub fn render_with(ast: &Ast, options: &RenderOptions) -> Rendered {
    let mut renderer = Renderer {
        options,
        text: String::new(),
        chars: 0,
        segments: Vec::new(),
    };

    match renderer.render_ast(ast) {
        Ok(()) => Rendered {
            text: renderer.text,
            segments: renderer.segments,
            failed: false,
        },
        Err(Malformed(reason)) => {
            tracing::warn!(reason, "cannot render malformed formula");
            Rendered::failed()
        }
    }
}

/// HTML-escape the markup characters
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

struct Malformed(&'static str);

struct Renderer<'o> {
    options: &'o RenderOptions,
    text: String,
    chars: usize,
    segments: Vec<Segment>,
}

impl Renderer<'_> {
    fn render_ast(&mut self, ast: &Ast) -> Result<(), Malformed> {
        match ast {
            Ast::Empty => Ok(()),
            Ast::Primitive(value) => {
                let (kind, text) = match value {
                    Value::Number(n) => (NodeKind::Number, self.number(*n)?),
                    Value::Text(s) => (NodeKind::Text, self.quoted(s)),
                    Value::Boolean(b) => (NodeKind::Boolean, b.to_string()),
                };
                self.push(kind, SegmentPart::Leaf, &text, &[]);
                Ok(())
            }
            Ast::Formula(body) => {
                self.push(NodeKind::Formula, SegmentPart::Equals, "=", &[]);
                self.render_expression(body, &mut Vec::new())
            }
        }
    }

    fn render_expression(
        &mut self,
        expr: &Expression,
        path: &mut NodePath,
    ) -> Result<(), Malformed> {
        for (i, node) in expr.items.iter().enumerate() {
            path.push(i);
            self.render_node(node, path)?;
            path.pop();
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node, path: &mut NodePath) -> Result<(), Malformed> {
        let text = match node {
            Node::Number(n) => self.number(*n)?,
            Node::Text(s) => self.quoted(s),
            Node::Boolean(b) => b.to_string(),
            Node::Reference(name) => {
                if !regex_is_match!(r"^[A-Z]+[0-9]+$", name) {
                    return Err(Malformed("invalid reference"));
                }
                name.clone()
            }
            Node::Whitespace(ws) => {
                if !regex_is_match!(r"^\s+$", ws) {
                    return Err(Malformed("invalid whitespace"));
                }
                ws.clone()
            }
            Node::Operator(op) => op.symbol().to_string(),
            Node::Partial(name) => {
                if !regex_is_match!(r"^[a-z_]+$", name) {
                    return Err(Malformed("invalid function name"));
                }
                name.clone()
            }
            Node::Function(call) => return self.render_call(call, path),
        };

        self.push(node.kind(), SegmentPart::Leaf, &text, path);
        Ok(())
    }

    fn render_call(&mut self, call: &Call, path: &mut NodePath) -> Result<(), Malformed> {
        if !regex_is_match!(r"^[a-z_]*$", &call.name) {
            return Err(Malformed("invalid function name"));
        }
        if call.is_group() && call.value_args().count() != 1 {
            return Err(Malformed("group without exactly one expression"));
        }

        let opening = format!("{}(", call.name);
        self.push(NodeKind::Function, SegmentPart::Opening, &opening, path);

        let last = call.args.len().saturating_sub(1);
        for (i, arg) in call.args.iter().enumerate() {
            path.push(i);
            self.render_expression(arg, path)?;
            path.pop();

            if i < last && !arg.is_whitespace_only() {
                self.push(NodeKind::Function, SegmentPart::Separator, ",", path);
            }
        }

        self.push(NodeKind::Function, SegmentPart::Closing, ")", path);
        Ok(())
    }

    fn number(&self, n: f64) -> Result<String, Malformed> {
        if !n.is_finite() {
            return Err(Malformed("non-finite number"));
        }
        Ok(n.to_string())
    }

    fn quoted(&self, s: &str) -> String {
        if self.options.escape_markup {
            format!("\"{}\"", escape_markup(s))
        } else {
            format!("\"{}\"", s)
        }
    }

    fn push(&mut self, kind: NodeKind, part: SegmentPart, text: &str, path: &[usize]) {
        let start = self.chars;
        self.chars += text.chars().count();
        self.text.push_str(text);
        self.segments.push(Segment {
            kind,
            part,
            range: start..self.chars,
            path: path.to_vec(),
        });
    }
}
