use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::Span;

/// Payload of a parse tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeContent {
    /// Token nodes and childless nodes carry the matched text.
    Text(String),
    Children(Vec<ParseTree>),
}

/// A node of the generic parse tree, labelled with the grammar rule that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTree {
    pub rule: Arc<str>,
    pub span: Span,
    pub content: TreeContent,
}

impl ParseTree {
    pub fn leaf(rule: Arc<str>, span: Span, text: impl Into<String>) -> Self {
        Self {
            rule,
            span,
            content: TreeContent::Text(text.into()),
        }
    }

    pub fn node(rule: Arc<str>, span: Span, children: Vec<ParseTree>) -> Self {
        Self {
            rule,
            span,
            content: TreeContent::Children(children),
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Matched text of a leaf node.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TreeContent::Text(text) => Some(text),
            TreeContent::Children(_) => None,
        }
    }

    /// Child nodes; empty for leaves.
    pub fn children(&self) -> &[ParseTree] {
        match &self.content {
            TreeContent::Children(children) => children,
            TreeContent::Text(_) => &[],
        }
    }

    /// Total number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(ParseTree::size).sum::<usize>()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(
            f,
            "{:indent$}{} {}..{}",
            "",
            self.rule,
            self.span.start,
            self.span.end,
            indent = indent
        )?;
        match &self.content {
            TreeContent::Text(text) => writeln!(f, " {:?}", text),
            TreeContent::Children(children) => {
                writeln!(f)?;
                for child in children {
                    child.write_indented(f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
