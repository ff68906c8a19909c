//! Dhall parsing front end.
//!
//! The language grammar is data: a rule set in an ABNF-like notation is
//! compiled into a [`GrammarDefinition`], a general Earley [`Engine`] turns
//! source text into a [`ParseTree`], and the builder turns that tree into a
//! typed [`Expression`] with de Bruijn indexed variables.
//!
//! ```no_run
//! let expr = dhall_syntax::parse("λ(x : Natural) → x + 1")?;
//! # Ok::<(), dhall_syntax::ParseError>(())
//! ```

pub use crate::ast::Expression;
pub use crate::errors::{AstError, ConfigError, GrammarError, ParseError, SourceContext, SyntaxError};
pub use crate::grammar::GrammarDefinition;
pub use crate::parser::{parse, ParseOptions, Parser};
pub use crate::syntax::{Engine, ParseTree, Span};

pub mod ast;
pub mod builder;
pub mod cli;
pub mod errors;
pub mod grammar;
pub mod parser;
pub mod standard;
pub mod syntax;
