//! Compiles `src/grammar/dhall.grammar` into the JSON artifact embedded by
//! the library, so parsers load the standard grammar instead of compiling it.

#![allow(dead_code, unused_imports)]

#[path = "src/errors.rs"]
mod errors;
#[path = "src/grammar/mod.rs"]
mod grammar;
#[path = "src/syntax/mod.rs"]
mod syntax;

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/grammar");
    println!("cargo:rerun-if-changed=src/errors.rs");
    println!("cargo:rerun-if-changed=src/syntax");

    let out_dir = match env::var_os("OUT_DIR") {
        None => return Err("OUT_DIR is not set".into()),
        Some(out_dir) => PathBuf::from(out_dir),
    };

    let grammar = grammar::compile(grammar::STANDARD_SOURCE)?;
    fs::write(out_dir.join("dhall.json"), grammar.to_json()?)?;
    Ok(())
}
