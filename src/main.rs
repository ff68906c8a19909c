use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use dhall_syntax::cli::{self, args::DhallArgs};

fn main() -> ExitCode {
    let args = DhallArgs::parse();

    let level = match args.global.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("cannot install logger: {}", e);
    }

    cli::run(args)
}
