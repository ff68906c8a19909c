//! # Syntax Module
//!
//! ## Purpose
//! Turns source text into a generic, grammar-shaped parse tree. The grammar
//! is data (`GrammarDefinition`); this module knows nothing about Dhall.
//!
//! ## Invariants
//! - Spans are byte offsets into the original input
//! - A successful parse consumes the whole input
//! - Every returned tree has exactly one derivation under the grammar

pub mod engine;
pub mod tree;

pub use engine::Engine;
pub use tree::{ParseTree, TreeContent};

use serde::{Deserialize, Serialize};

/// Half-open byte range `start..end` into the parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
