//! Error types for grammar compilation, parsing and AST construction.
//!
//! Every failure surfaces as a `miette` diagnostic with a stable code so the
//! CLI can render it with source context. `ParseError` is the umbrella type
//! returned by the parser facade.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

use crate::syntax::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// A named piece of source text, used both as parser input and as the
/// source attached to diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content.
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Source text that did not come from a file.
    pub fn anonymous(content: impl Into<String>) -> Self {
        Self::from_file("<input>", content)
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.content.clone())
    }

    /// 1-based line and column of a byte offset. Columns count characters.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let before = &self.content[..floor_char_boundary(&self.content, offset)];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Convert a byte span into a miette span.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), span.end.saturating_sub(span.start))
}

// ============================================================================
// GRAMMAR ERRORS
// ============================================================================

/// Problems with a grammar source or a compiled grammar artifact.
#[derive(Debug, Error, Diagnostic)]
pub enum GrammarError {
    #[error("grammar notation error: {message}")]
    #[diagnostic(code(dhall::grammar::notation))]
    Notation {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("rule `{rule}` is defined more than once")]
    #[diagnostic(code(dhall::grammar::duplicate_rule))]
    DuplicateRule { rule: String },

    #[error("rule `{rule}` references undefined nonterminal `{reference}`")]
    #[diagnostic(code(dhall::grammar::undefined))]
    UndefinedNonterminal { rule: String, reference: String },

    #[error("rule `{rule}` is not reachable from the start rule")]
    #[diagnostic(
        code(dhall::grammar::unreachable),
        help("Remove the rule or reference it from a reachable rule.")
    )]
    Unreachable { rule: String },

    #[error("rule `{rule}` has no alternatives")]
    #[diagnostic(code(dhall::grammar::empty_alternatives))]
    EmptyAlternatives { rule: String },

    #[error("start rule `{rule}` is not defined")]
    #[diagnostic(code(dhall::grammar::unknown_start))]
    UnknownStart { rule: String },

    #[error("grammar has no `%start` directive")]
    #[diagnostic(code(dhall::grammar::unknown_start))]
    MissingStart,

    #[error("rule `{rule}` excludes `{target}`, which is not a finite set of literals")]
    #[diagnostic(code(dhall::grammar::exclusion))]
    NotALiteralSet { rule: String, target: String },

    #[error("rule `{rule}` restricts on `{target}`, which is not a literal or character class")]
    #[diagnostic(code(dhall::grammar::restriction))]
    NotACharClass { rule: String, target: String },

    #[error("rule `{rule}` contains an empty literal")]
    #[diagnostic(code(dhall::grammar::empty_literal))]
    EmptyLiteral { rule: String },

    #[error("rule `{rule}` repeats an element that can match the empty string")]
    #[diagnostic(code(dhall::grammar::nullable_repetition))]
    NullableRepetition { rule: String },

    #[error("ambiguous derivation for `{rule}` at bytes {}..{}", .span.start, .span.end)]
    #[diagnostic(
        code(dhall::grammar::ambiguous),
        help("Add a follow restriction or an exclusion so that only one derivation remains.")
    )]
    Ambiguous { rule: String, span: Span },

    #[error("invalid grammar artifact: {message}")]
    #[diagnostic(code(dhall::grammar::artifact))]
    Artifact { message: String },

    #[error("grammar artifact fingerprint {found} does not match source fingerprint {expected}")]
    #[diagnostic(
        code(dhall::grammar::fingerprint),
        help("Regenerate the artifact with `compile-grammar`.")
    )]
    Fingerprint { expected: String, found: String },

    #[error("grammar artifact is not valid JSON: {0}")]
    #[diagnostic(code(dhall::grammar::json))]
    Json(#[from] serde_json::Error),

    #[error("cannot read `{}`: {source}", .path.display())]
    #[diagnostic(code(dhall::grammar::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SYNTAX ERRORS
// ============================================================================

/// The input is not in the language of the grammar.
#[derive(Debug, Error, Diagnostic)]
#[error("syntax error at line {line}, column {column}: {found}")]
#[diagnostic(code(dhall::syntax))]
pub struct SyntaxError {
    /// Furthest byte offset the recognizer reached.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// Rule names that could still have continued at `offset`, sorted.
    pub expected: Vec<String>,
    pub found: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("parsing stopped here")]
    pub span: SourceSpan,
    #[help]
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(source: &SourceContext, offset: usize, expected: Vec<String>) -> Self {
        let (line, column) = source.line_col(offset);
        let found = match source.content[floor_char_boundary(&source.content, offset)..]
            .chars()
            .next()
        {
            Some(c) => format!("unexpected {:?}", c),
            None => "unexpected end of input".to_string(),
        };
        let help = if expected.is_empty() {
            None
        } else {
            Some(format!("expected one of: {}", expected.join(", ")))
        };
        Self {
            offset,
            line,
            column,
            expected,
            found,
            src: source.to_named_source(),
            span: SourceSpan::new(offset.into(), 0),
            help,
        }
    }
}

// ============================================================================
// AST ERRORS
// ============================================================================

/// Failures while turning a parse tree into an expression.
#[derive(Debug, Error, Diagnostic)]
pub enum AstError {
    #[error("{kind} literal `{literal}` is out of range")]
    #[diagnostic(code(dhall::ast::numeric_overflow))]
    NumericOverflow {
        literal: String,
        kind: &'static str,
        span: Span,
    },

    #[error("expression nesting exceeds the limit of {limit}")]
    #[diagnostic(
        code(dhall::ast::too_deep),
        help("Raise `max_depth` in the parse options if this input is trusted.")
    )]
    TooDeep { limit: usize },

    #[error("variable `{name}@{index}` is not bound by any enclosing binder")]
    #[diagnostic(code(dhall::ast::unbound_variable))]
    UnboundVariable {
        name: String,
        index: u64,
        span: Span,
    },

    #[error("invalid escape sequence `{escape}`")]
    #[diagnostic(code(dhall::ast::invalid_escape))]
    InvalidEscape { escape: String, span: Span },

    #[error("unexpected `{rule}` node: {message}")]
    #[diagnostic(
        code(dhall::ast::unexpected_shape),
        help("The grammar and the AST builder disagree about this rule.")
    )]
    UnexpectedShape {
        rule: String,
        message: String,
        span: Span,
    },
}

impl AstError {
    /// Byte span of the offending input, where one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            AstError::NumericOverflow { span, .. }
            | AstError::UnboundVariable { span, .. }
            | AstError::InvalidEscape { span, .. }
            | AstError::UnexpectedShape { span, .. } => Some(*span),
            AstError::TooDeep { .. } => None,
        }
    }
}

// ============================================================================
// UMBRELLA
// ============================================================================

/// Everything that can go wrong between source text and an `Expression`.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ast(#[from] AstError),

    #[error("parse tree nesting exceeds the limit of {limit}")]
    #[diagnostic(
        code(dhall::syntax::too_deep),
        help("Raise `max_tree_depth` in the parse options if this input is trusted.")
    )]
    TreeTooDeep { limit: usize },
}

/// Problems loading `ParseOptions` from disk.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read `{}`: {source}", .path.display())]
    #[diagnostic(code(dhall::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid parse options: {0}")]
    #[diagnostic(code(dhall::config::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_characters() {
        let source = SourceContext::anonymous("ab\nλx y");
        assert_eq!(source.line_col(0), (1, 1));
        assert_eq!(source.line_col(3), (2, 1));
        // 'λ' is two bytes, so byte 5 is the 'x'
        assert_eq!(source.line_col(5), (2, 2));
    }

    #[test]
    fn syntax_error_mentions_expected_rules() {
        let source = SourceContext::anonymous("1 +");
        let err = SyntaxError::new(&source, 3, vec!["natural-literal".into()]);
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 4);
        assert_eq!(err.found, "unexpected end of input");
        assert_eq!(err.help.as_deref(), Some("expected one of: natural-literal"));
    }
}
