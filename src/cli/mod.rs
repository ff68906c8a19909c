//! The `dhall-syntax` command-line interface.
//!
//! Loads the grammar and options once, then dispatches to the subcommand
//! handlers. Per-file failures are rendered as diagnostics and turn the
//! exit status into a failure without stopping the remaining files.

use miette::{IntoDiagnostic, Report, WrapErr};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cli::args::{Command, DhallArgs, GlobalArgs};
use crate::errors::{ParseError, SourceContext};
use crate::grammar::GrammarDefinition;
use crate::parser::{ParseOptions, Parser};

pub mod args;
pub mod output;

/// File extension searched for when a directory is given.
const DHALL_EXTENSION: &str = "dhall";

/// The main entry point for the CLI.
pub fn run(args: DhallArgs) -> ExitCode {
    let result = build_parser(&args.global).and_then(|parser| match &args.command {
        Command::Parse { paths } => handle_parse(&parser, paths, args.global.json),
        Command::Tree { file } => handle_tree(&parser, file, args.global.json),
        Command::Check { paths } => handle_check(&parser, paths),
    });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(report) => {
            eprintln!("{:?}", report);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// SETUP
// ============================================================================

fn build_parser(global: &GlobalArgs) -> Result<Parser, Report> {
    let grammar = match &global.grammar {
        Some(path) => {
            info!(path = %path.display(), "loading grammar artifact");
            GrammarDefinition::load(path)?
        }
        None => GrammarDefinition::standard()?,
    };
    let mut options = match &global.config {
        Some(path) => ParseOptions::load(path)?,
        None => ParseOptions::default(),
    };
    if let Some(max_depth) = global.max_depth {
        options.max_depth = max_depth;
    }
    options.reject_free_variables |= global.reject_free_variables;
    debug!(?options, "parse options");
    Ok(Parser::new(grammar)?.with_options(options))
}

/// Expand directories into their `*.dhall` files, in a stable order.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Report> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry
                .into_diagnostic()
                .wrap_err_with(|| format!("cannot walk `{}`", path.display()))?;
            let is_dhall = entry.path().extension().is_some_and(|ext| ext == DHALL_EXTENSION);
            if entry.file_type().is_file() && is_dhall {
                files.push(entry.into_path());
            }
        }
    }
    debug!(count = files.len(), "collected input files");
    Ok(files)
}

fn read_source(path: &Path) -> Result<SourceContext, Report> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read `{}`", path.display()))?;
    Ok(SourceContext::from_file(path.display().to_string(), content))
}

/// Attach the source text so builder errors render with context too.
fn report(error: ParseError, source: &SourceContext) -> Report {
    Report::new(error).with_source_code(source.to_named_source())
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_parse(parser: &Parser, paths: &[PathBuf], json: bool) -> Result<bool, Report> {
    let mut ok = true;
    for file in collect_files(paths)? {
        let source = read_source(&file)?;
        match parser.parse_source(&source) {
            Ok(expression) if json => {
                println!("{}", serde_json::to_string_pretty(&expression).into_diagnostic()?)
            }
            Ok(expression) => output::print_expression(&file, &expression),
            Err(error) => {
                ok = false;
                eprintln!("{:?}", report(error, &source));
            }
        }
    }
    Ok(ok)
}

fn handle_tree(parser: &Parser, file: &Path, json: bool) -> Result<bool, Report> {
    let source = read_source(file)?;
    let tree = match parser.parse_tree(&source) {
        Ok(tree) => tree,
        Err(error) => return Err(report(error, &source)),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&tree).into_diagnostic()?);
    } else {
        print!("{}", tree);
    }
    Ok(true)
}

fn handle_check(parser: &Parser, paths: &[PathBuf]) -> Result<bool, Report> {
    let mut passed = 0;
    let mut failed = 0;
    for file in collect_files(paths)? {
        let source = read_source(&file)?;
        match parser.parse_source(&source) {
            Ok(_) => {
                passed += 1;
                output::print_status(&file, true);
            }
            Err(error) => {
                failed += 1;
                output::print_status(&file, false);
                eprintln!("{:?}", report(error, &source));
            }
        }
    }
    output::print_summary(passed, failed);
    Ok(failed == 0)
}
