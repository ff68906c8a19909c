//! Grammar Compiler for dhall-syntax
//!
//! Compiles a grammar source in the rule notation into the JSON artifact
//! loaded by `dhall-syntax --grammar`, and reports problems found on the way.
//!
//! ## Usage
//! ```bash
//! cargo run --bin compile-grammar -- src/grammar/dhall.grammar -o dhall.json
//! cargo run --bin compile-grammar -- --check dhall.json
//! ```
//!
//! Without a source argument the embedded standard grammar is compiled.

// ============================================================================
// 1. Module docs & imports
// ============================================================================

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use dhall_syntax::grammar::{self, GrammarDefinition, NodeKind, STANDARD_SOURCE};

// ============================================================================
// 2. Core data structures
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "compile-grammar", version, about = "Compile a grammar into a JSON artifact.")]
struct CompileArgs {
    /// Grammar source; defaults to the embedded standard grammar.
    source: Option<PathBuf>,

    /// Where to write the artifact.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verify that an existing artifact matches the source instead of writing one.
    #[arg(long, value_name = "ARTIFACT", conflicts_with = "output")]
    check: Option<PathBuf>,

    /// Log compiler progress.
    #[arg(short, long)]
    verbose: bool,
}

/// Compilation results with categorized issues and reporting functionality
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
    stats: Vec<String>,
}

// ============================================================================
// 3. Public API implementation
// ============================================================================

/// Main entry point for the compiler tool
fn main() {
    let args = CompileArgs::parse();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let (name, source) = match &args.source {
        Some(path) => match fs::read_to_string(path) {
            Ok(source) => (path.display().to_string(), source),
            Err(e) => {
                eprintln!("Failed to read {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => ("<standard grammar>".to_string(), STANDARD_SOURCE.to_string()),
    };

    println!("🔍 Compiling grammar: {}", name);

    let mut result = ValidationResult::default();
    let compiled = compile_with_report(&source, &mut result);

    if let (Some(grammar), Some(artifact)) = (&compiled, &args.check) {
        check_artifact(grammar, artifact, &source, &mut result);
    }

    result.print_report();

    let Some(grammar) = compiled else {
        process::exit(1);
    };
    if !result.is_valid() {
        process::exit(1);
    }
    if let Some(output) = &args.output {
        if let Err(e) = write_artifact(&grammar, output) {
            eprintln!("Failed to write {}: {}", output.display(), e);
            process::exit(1);
        }
        println!("📦 Wrote {}", output.display());
    }
}

/// Compiles the source, recording statistics, lint warnings and errors
fn compile_with_report(source: &str, result: &mut ValidationResult) -> Option<GrammarDefinition> {
    let grammar = match grammar::compile(source) {
        Ok(grammar) => grammar,
        Err(e) => {
            result.errors.push(format!("{:?}", miette::Report::new(e)));
            return None;
        }
    };

    let count = |kind: NodeKind| grammar.nonterminals.iter().filter(|nt| nt.kind == kind).count();
    result.stats.push(format!("start rule: {}", grammar.start_name()));
    result.stats.push(format!(
        "{} nonterminals ({} token, {} silent, {} generated)",
        grammar.nonterminals.len(),
        count(NodeKind::Token),
        count(NodeKind::Silent),
        count(NodeKind::Inline) + count(NodeKind::Repeat),
    ));
    result.stats.push(format!("{} productions", grammar.productions.len()));
    result.stats.push(format!("fingerprint: {}", grammar.fingerprint));

    match grammar::lint(source) {
        Ok(warnings) => result.warnings.extend(warnings),
        Err(e) => result.errors.push(e.to_string()),
    }
    Some(grammar)
}

fn check_artifact(
    compiled: &GrammarDefinition,
    artifact: &PathBuf,
    source: &str,
    result: &mut ValidationResult,
) {
    match GrammarDefinition::load(artifact) {
        Ok(loaded) => {
            if let Err(e) = loaded.verify_source(source) {
                result.errors.push(e.to_string());
            } else if loaded != *compiled {
                result
                    .errors
                    .push("artifact fingerprint matches but its rules differ".to_string());
            }
        }
        Err(e) => result.errors.push(e.to_string()),
    }
}

fn write_artifact(grammar: &GrammarDefinition, output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(output, grammar.to_json()?)?;
    Ok(())
}

// ============================================================================
// 4. ValidationResult implementation
// ============================================================================

impl ValidationResult {
    fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn print_report(&self) {
        self.print_section(&self.stats, "📋", "GRAMMAR STATISTICS");
        self.print_section(&self.errors, "❌", "GRAMMAR ERRORS");
        self.print_section(&self.warnings, "⚠️ ", "GRAMMAR WARNINGS");

        if self.is_valid() && self.warnings.is_empty() {
            println!("✅ Grammar compiled - no issues found");
        }
    }

    /// Print one titled section; empty sections are skipped
    fn print_section(&self, items: &[String], emoji: &str, title: &str) {
        if items.is_empty() {
            return;
        }
        eprintln!("{} {}:", emoji, title);
        for item in items {
            eprintln!("  • {}", item);
        }
        eprintln!();
    }
}
