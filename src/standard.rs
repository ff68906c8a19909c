//! The standard Dhall grammar as a compiled artifact.
//!
//! The build script compiles `grammar/dhall.grammar` and this module embeds
//! the resulting JSON, so loading the standard grammar never runs the
//! compiler.

use crate::errors::GrammarError;
use crate::grammar::GrammarDefinition;

/// JSON artifact of the standard grammar, written by the build script.
pub const STANDARD_ARTIFACT: &str = include_str!(concat!(env!("OUT_DIR"), "/dhall.json"));

impl GrammarDefinition {
    /// Load the embedded standard Dhall grammar.
    pub fn standard() -> Result<Self, GrammarError> {
        Self::from_json(STANDARD_ARTIFACT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{compile, STANDARD_SOURCE};

    #[test]
    fn artifact_matches_the_grammar_source() {
        let loaded = GrammarDefinition::standard().unwrap();
        loaded.verify_source(STANDARD_SOURCE).unwrap();
        assert_eq!(loaded, compile(STANDARD_SOURCE).unwrap());
    }
}
