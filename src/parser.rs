//! # Parser Facade
//!
//! Ties a compiled grammar, the Earley engine and the AST builder together.
//! A `Parser` is immutable after construction and can be shared across
//! threads; every call owns its output.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::ast::Expression;
use crate::builder::Builder;
use crate::errors::{ConfigError, GrammarError, ParseError, SourceContext};
use crate::grammar::GrammarDefinition;
use crate::syntax::engine::DEFAULT_MAX_TREE_DEPTH;
use crate::syntax::{Engine, ParseTree};

/// Default bound on expression nesting in the builder.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Tunables for a parse. Every field has a default, so a YAML file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum expression nesting accepted by the builder.
    pub max_depth: usize,
    /// Maximum parse tree depth accepted by the engine.
    pub max_tree_depth: usize,
    /// Reject variables that no enclosing binder introduces.
    pub reject_free_variables: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            reject_free_variables: false,
        }
    }
}

impl ParseOptions {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }
}

/// Source text to `Expression`.
#[derive(Debug)]
pub struct Parser {
    engine: Engine,
    options: ParseOptions,
}

impl Parser {
    pub fn new(grammar: GrammarDefinition) -> Result<Self, GrammarError> {
        let options = ParseOptions::default();
        let engine = Engine::new(grammar)?.with_max_tree_depth(options.max_tree_depth);
        Ok(Self { engine, options })
    }

    /// A parser for the embedded standard grammar.
    pub fn standard() -> Result<Self, GrammarError> {
        Self::new(GrammarDefinition::standard()?)
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.engine = self.engine.with_max_tree_depth(options.max_tree_depth);
        self.options = options;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn grammar(&self) -> &GrammarDefinition {
        self.engine.grammar()
    }

    pub fn parse(&self, input: &str) -> Result<Expression, ParseError> {
        self.parse_source(&SourceContext::anonymous(input))
    }

    pub fn parse_source(&self, source: &SourceContext) -> Result<Expression, ParseError> {
        let tree = self.parse_tree(source)?;
        let expression = Builder::new(self.options.clone()).build(&tree)?;
        debug!(source = %source.name, "parsed expression");
        Ok(expression)
    }

    /// The generic parse tree, for diagnostics and grammar debugging.
    pub fn parse_tree(&self, source: &SourceContext) -> Result<ParseTree, ParseError> {
        self.engine.parse_source(source, self.engine.grammar().start)
    }
}

/// Parse with the standard grammar and default options.
///
/// Each call loads the embedded artifact; build one `Parser` to parse many
/// inputs.
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    Parser::standard()?.parse(input)
}
