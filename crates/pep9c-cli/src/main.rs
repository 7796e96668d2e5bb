//! pep9c command-line interface.
//!
//! Reads a source file, compiles it to Pep/9 assembly on stdout (or a
//! file), and exits 1 on the first compile error.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::debug;

use pep9c::compile;
use ruff_python_parser::parse_module;

#[derive(Parser)]
#[command(name = "pep9c")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a restricted Python subset to Pep/9 assembly", long_about = None)]
struct Cli {
    /// Source file to compile (.py)
    #[arg(short = 'f', value_name = "FILE")]
    file: PathBuf,

    /// Dump the parsed AST instead of compiling
    #[arg(long)]
    ast_only: bool,

    /// Write assembly to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", cli.file.display());
            process::exit(1);
        }
    };

    debug!(file = %cli.file.display(), "parsing");
    let parsed = match parse_module(&source) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("Parse error: {err}");
            process::exit(1);
        }
    };
    let module = parsed.into_syntax();

    if cli.ast_only {
        println!("{module:#?}");
        return;
    }

    debug!("compiling");
    let input_file = cli.file.display().to_string();
    let mut buffer = Vec::new();
    if let Err(err) = compile(&module, &input_file, &mut buffer) {
        eprintln!("{}", err.render(&source));
        process::exit(1);
    }

    let result = match &cli.output {
        Some(path) => fs::write(path, &buffer),
        None => io::stdout().write_all(&buffer),
    };
    if let Err(err) = result {
        eprintln!("error: cannot write output: {err}");
        process::exit(1);
    }
}
