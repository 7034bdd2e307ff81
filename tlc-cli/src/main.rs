use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tlc_core::{CompileOptions, CoreError, compile_with_options, scan};

/// Compiles TLC programs to CIL assembly text.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    input: Option<String>,

    #[arg(short, long)]
    output: String,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "il",
        help = "Output format: il, tokens"
    )]
    emit: String,

    #[arg(long, value_name = "NAME", default_value = "program")]
    assembly_name: String,

    #[arg(long, value_name = "N", default_value_t = 100)]
    max_stack: u32,

    #[arg(
        long,
        value_name = "PATH",
        help = "Assembler to run on the written listing (e.g. ilasm)"
    )]
    assembler: Option<String>,

    #[arg(short, long, help = "Log compiler phases to stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };

    match cli.emit.as_str() {
        "il" => {
            let options = CompileOptions {
                assembly_name: cli.assembly_name.clone(),
                max_stack: cli.max_stack,
            };
            let artifact = compile_with_options(&source, &options).map_err(diagnostic)?;
            for warning in &artifact.warnings {
                eprintln!("aviso: {warning}");
            }
            write_output(&cli.output, artifact.code.as_bytes())?;
            if let Some(assembler) = &cli.assembler {
                assemble(assembler, &cli.output)?;
            }
        }
        "tokens" => {
            let tokens = scan(&source).map_err(diagnostic)?;
            let listing: String = tokens
                .iter()
                .map(|token| {
                    format!(
                        "{}\t{}\t{}\n",
                        token.line,
                        token.kind.display_name(),
                        token.lexeme
                    )
                })
                .collect();
            write_output(&cli.output, listing.as_bytes())?;
            if cli.assembler.is_some() {
                eprintln!("--assembler is ignored for token output");
            }
        }
        other => return Err(anyhow::anyhow!("unsupported emit format: {other}")),
    }

    Ok(())
}

/// Label a compiler error with its category for the terminal.
fn diagnostic(err: CoreError) -> anyhow::Error {
    let category = err.category();
    anyhow::Error::new(err).context(category)
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

fn assemble(assembler: &str, listing: &str) -> Result<()> {
    tracing::debug!(assembler, listing, "running assembler");
    let status = Command::new(assembler)
        .arg(listing)
        .status()
        .with_context(|| format!("failed to run assembler {assembler}"))?;
    if !status.success() {
        bail!("assembler {assembler} exited with {status}");
    }
    Ok(())
}
