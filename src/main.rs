use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use clap::Subcommand;
use dbmlc::ast::Token;
use dbmlc::compiler::{compile, Compilation};
use dbmlc::database::Database;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(clap::Parser)]
#[command(name = "dbmlc")]
#[command(about = "DBML schema compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one or more DBML files into the semantic database model.
    Compile(CompileCommand),
    /// Compile and print diagnostics only; exits non-zero on errors.
    Check(CheckCommand),
}

#[derive(clap::Args)]
struct CompileCommand {
    /// Path to the DBML file or directory containing DBML files.
    #[arg(value_name = "DBML_[FILE|DIR]")]
    input: PathBuf,
    /// Include the token stream in the output.
    #[arg(long)]
    include_tokens: bool,
    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args)]
struct CheckCommand {
    /// Path to the DBML file or directory containing DBML files.
    #[arg(value_name = "DBML_[FILE|DIR]")]
    input: PathBuf,
}

#[derive(Serialize)]
struct OutCompilation {
    database: Database,
    diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens: Option<Vec<Token>>,
}

fn compile_file(path: &PathBuf, include_tokens: bool) -> anyhow::Result<OutCompilation> {
    let compilation = read_and_compile(path)?;
    let diagnostics = compilation.render_diagnostics();
    Ok(OutCompilation {
        database: compilation.database,
        diagnostics,
        tokens: include_tokens.then_some(compilation.tokens),
    })
}

fn read_and_compile(path: &PathBuf) -> anyhow::Result<Compilation> {
    let source = std::fs::read_to_string(path)
        .map_err(|_| anyhow!("Failed to read DBML file {}", path.display()))?;
    Ok(compile(&source))
}

fn dbml_files(input: &PathBuf) -> anyhow::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.clone()]);
    }
    let mut files: Vec<_> = std::fs::read_dir(input)?
        .filter_map(|res| res.ok())
        .map(|entry| entry.path())
        .filter(|file| file.extension().is_some_and(|ext| ext == "dbml"))
        .collect();
    files.sort();
    Ok(files)
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    env_logger::init();
    let cli = <Cli as clap::Parser>::parse();

    let exit_code = match &cli.command {
        Commands::Compile(command) => {
            let files = dbml_files(&command.input)?;
            let out_str = if command.input.is_dir() {
                let mut outputs: IndexMap<String, OutCompilation> = IndexMap::new();
                for file in files {
                    let output = compile_file(&file, command.include_tokens)?;
                    outputs.insert(std::path::absolute(&file)?.display().to_string(), output);
                }
                if command.pretty {
                    serde_json::to_string_pretty(&outputs)?
                } else {
                    serde_json::to_string(&outputs)?
                }
            } else {
                let output = compile_file(&command.input, command.include_tokens)?;
                if command.pretty {
                    serde_json::to_string_pretty(&output)?
                } else {
                    serde_json::to_string(&output)?
                }
            };
            println!("{}", out_str);
            0
        }
        Commands::Check(command) => {
            let mut any_errors = false;
            for file in dbml_files(&command.input)? {
                let compilation = read_and_compile(&file)?;
                any_errors |= compilation.has_errors();
                for line in compilation.render_diagnostics() {
                    println!("{}: {}", file.display(), line);
                }
            }
            if any_errors { 1 } else { 0 }
        }
    };

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
