//! Grammar-as-data.
//!
//! A `GrammarDefinition` is a plain value: nonterminals, their productions
//! and the start symbol. It is produced by [`compile`] from the textual
//! notation or loaded from a JSON artifact written by `compile-grammar`
//! (or, for the standard grammar, by the build script).
//! Nothing in here is global; parsers receive the grammar explicitly.

pub mod compiler;

pub use compiler::{compile, lint};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::GrammarError;

/// Source of the standard Dhall grammar shipped with the crate.
pub const STANDARD_SOURCE: &str = include_str!("dhall.grammar");

pub type NonterminalId = usize;
pub type ProductionId = usize;

// ============================================================================
// DATA MODEL
// ============================================================================

/// How a nonterminal shows up in the parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// One node with its children (or its text when it has none).
    Normal,
    /// Matched but omitted from the tree.
    Silent,
    /// One leaf carrying the matched text.
    Token,
    /// Children are spliced into the parent.
    Inline,
    /// Generated `R = R x / ε` helper; children are spliced into the parent.
    Repeat,
}

/// Sorted, non-overlapping inclusive code point ranges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CharClass {
    pub ranges: Vec<(char, char)>,
}

impl CharClass {
    pub fn range(lo: char, hi: char) -> Self {
        Self {
            ranges: vec![(lo, hi)],
        }
    }

    pub fn single(c: char) -> Self {
        Self::range(c, c)
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < c {
                    std::cmp::Ordering::Less
                } else if lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Union of two classes, normalized.
    pub fn union(&self, other: &CharClass) -> CharClass {
        let mut ranges: Vec<(char, char)> = self
            .ranges
            .iter()
            .chain(other.ranges.iter())
            .copied()
            .collect();
        ranges.sort();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            if let Some(last) = merged.last_mut() {
                if (lo as u32) <= (last.1 as u32).saturating_add(1) {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                    continue;
                }
            }
            merged.push((lo, hi));
        }
        CharClass { ranges: merged }
    }
}

/// A terminal matched against the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Literal(String),
    Class(CharClass),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Terminal(Terminal),
    Nonterminal(NonterminalId),
}

/// One symbol of a production's right-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// The symbol may not be immediately followed by any of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_followed_by: Vec<Terminal>,
}

impl Symbol {
    pub fn terminal(terminal: Terminal) -> Self {
        Self {
            kind: SymbolKind::Terminal(terminal),
            not_followed_by: Vec::new(),
        }
    }

    pub fn nonterminal(id: NonterminalId) -> Self {
        Self {
            kind: SymbolKind::Nonterminal(id),
            not_followed_by: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub lhs: NonterminalId,
    pub symbols: Vec<Symbol>,
    /// The matched text may not be equal to any of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonterminal {
    pub name: String,
    pub kind: NodeKind,
    pub productions: Vec<ProductionId>,
}

impl Nonterminal {
    /// Name of the rule this nonterminal was written in. Generated helpers
    /// (`rule~3`) report their owner.
    pub fn owner(&self) -> &str {
        self.name.split('~').next().unwrap_or(&self.name)
    }
}

/// A compiled context-free grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarDefinition {
    pub start: NonterminalId,
    pub nonterminals: Vec<Nonterminal>,
    pub productions: Vec<Production>,
    /// Hex SHA-256 of the source this grammar was compiled from.
    pub fingerprint: String,
}

// ============================================================================
// PUBLIC API
// ============================================================================

impl GrammarDefinition {
    /// Load a compiled artifact from JSON text.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let grammar: GrammarDefinition = serde_json::from_str(json)?;
        grammar.validate()?;
        debug!(
            nonterminals = grammar.nonterminals.len(),
            productions = grammar.productions.len(),
            "loaded grammar artifact"
        );
        Ok(grammar)
    }

    /// Load a compiled artifact from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| GrammarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, GrammarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that this artifact was compiled from `source`.
    pub fn verify_source(&self, source: &str) -> Result<(), GrammarError> {
        let expected = fingerprint(source);
        if self.fingerprint != expected {
            return Err(GrammarError::Fingerprint {
                expected,
                found: self.fingerprint.clone(),
            });
        }
        Ok(())
    }

    pub fn nonterminal_id(&self, name: &str) -> Option<NonterminalId> {
        self.nonterminals.iter().position(|nt| nt.name == name)
    }

    pub fn start_name(&self) -> &str {
        &self.nonterminals[self.start].name
    }

    /// Structural checks for artifacts that did not come from the compiler.
    pub fn validate(&self) -> Result<(), GrammarError> {
        let artifact = |message: String| GrammarError::Artifact { message };

        if self.start >= self.nonterminals.len() {
            return Err(artifact(format!("start symbol {} out of range", self.start)));
        }
        let mut names = HashSet::new();
        for (id, nt) in self.nonterminals.iter().enumerate() {
            if !names.insert(nt.name.as_str()) {
                return Err(GrammarError::DuplicateRule {
                    rule: nt.name.clone(),
                });
            }
            if nt.productions.is_empty() {
                return Err(GrammarError::EmptyAlternatives {
                    rule: nt.name.clone(),
                });
            }
            for &p in &nt.productions {
                let production = self
                    .productions
                    .get(p)
                    .ok_or_else(|| artifact(format!("`{}` lists missing production {}", nt.name, p)))?;
                if production.lhs != id {
                    return Err(artifact(format!(
                        "production {} is listed under `{}` but belongs to nonterminal {}",
                        p, nt.name, production.lhs
                    )));
                }
            }
            if nt.kind == NodeKind::Repeat {
                self.validate_repeat(id)?;
            }
        }
        for (p, production) in self.productions.iter().enumerate() {
            let owner = self
                .nonterminals
                .get(production.lhs)
                .ok_or_else(|| artifact(format!("production {} has unknown lhs", p)))?;
            if !owner.productions.contains(&p) {
                return Err(artifact(format!(
                    "production {} is not listed under `{}`",
                    p, owner.name
                )));
            }
            for symbol in &production.symbols {
                match &symbol.kind {
                    SymbolKind::Nonterminal(id) if *id >= self.nonterminals.len() => {
                        return Err(GrammarError::UndefinedNonterminal {
                            rule: owner.name.clone(),
                            reference: format!("#{}", id),
                        });
                    }
                    SymbolKind::Terminal(Terminal::Literal(text)) if text.is_empty() => {
                        return Err(GrammarError::EmptyLiteral {
                            rule: owner.name.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
        self.check_repetitions()
    }

    /// Which nonterminals derive the empty string.
    pub fn nullable(&self) -> Vec<bool> {
        let mut nullable = vec![false; self.nonterminals.len()];
        let mut changed = true;
        while changed {
            changed = false;
            for production in &self.productions {
                if nullable[production.lhs] {
                    continue;
                }
                let all_nullable = production.symbols.iter().all(|symbol| match symbol.kind {
                    SymbolKind::Nonterminal(id) => nullable[id],
                    SymbolKind::Terminal(_) => false,
                });
                if all_nullable {
                    nullable[production.lhs] = true;
                    changed = true;
                }
            }
        }
        nullable
    }

    /// Repetition of a nullable element has infinitely many derivations.
    pub(crate) fn check_repetitions(&self) -> Result<(), GrammarError> {
        let nullable = self.nullable();
        for nt in self.nonterminals.iter().filter(|nt| nt.kind == NodeKind::Repeat) {
            let repeated = nt
                .productions
                .first()
                .and_then(|&p| self.productions[p].symbols.get(1));
            if let Some(Symbol {
                kind: SymbolKind::Nonterminal(id),
                ..
            }) = repeated
            {
                if nullable[*id] {
                    return Err(GrammarError::NullableRepetition {
                        rule: nt.owner().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// A repeat helper must be exactly `R = R x / ε`.
    fn validate_repeat(&self, id: NonterminalId) -> Result<(), GrammarError> {
        let nt = &self.nonterminals[id];
        let shape_ok = match nt.productions.as_slice() {
            [rec, eps] => {
                let rec = &self.productions[*rec];
                let eps = &self.productions[*eps];
                rec.symbols.len() == 2
                    && rec.symbols[0].kind == SymbolKind::Nonterminal(id)
                    && rec.symbols[0].not_followed_by.is_empty()
                    && rec.symbols[1].not_followed_by.is_empty()
                    && rec.exclude.is_empty()
                    && eps.symbols.is_empty()
                    && eps.exclude.is_empty()
            }
            _ => false,
        };
        if !shape_ok {
            return Err(GrammarError::Artifact {
                message: format!("repeat helper `{}` is malformed", nt.name),
            });
        }
        Ok(())
    }
}

/// Hex SHA-256 of a grammar source.
pub fn fingerprint(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}
