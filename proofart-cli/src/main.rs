//! Proof-of-Art CLI - generate attested artifacts and verify proofs.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (malformed hash or arguments)
  65  Proof not verified
  66  Input file not found or unreadable
  69  Service unavailable (generation, content store, ledger)
  74  Cannot write output file
  78  Configuration error (missing credentials, wrong network)";

#[derive(Parser)]
#[command(name = "proofart")]
#[command(author, version, about = "Verifiable authorship for generated artifacts", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print nothing on success
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an artifact from a prompt, store it and register its proof
    Generate {
        /// Text prompt for the generation service
        #[arg(long)]
        prompt: String,

        /// Creator address bound into the proof
        #[arg(long)]
        creator: String,

        /// Use in-memory backends instead of real services (for testing)
        #[arg(long)]
        mock: bool,

        /// Where to write the artifact (certificate goes to <OUT>.proof.json)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Print the certificate as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Look up a proof on the ledger, optionally re-deriving it from a file
    Verify {
        /// Combined hash to look up
        #[arg(long, value_name = "HASH")]
        hash: String,

        /// Artifact to re-derive the combined hash from
        #[arg(long, value_name = "FILE", requires = "prompt_hash")]
        file: Option<PathBuf>,

        /// Prompt hash from the certificate (needed with --file)
        #[arg(long, value_name = "HASH", requires = "file")]
        prompt_hash: Option<String>,

        /// Creator from the certificate (required by on-chain ledgers)
        #[arg(long, requires = "file")]
        creator: Option<String>,

        /// Binding timestamp in ms (required by on-chain ledgers)
        #[arg(long, requires = "file")]
        timestamp: Option<u64>,
    },

    /// Print the SHA-256 output hash of a file (no ledger lookup)
    Hash {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Re-derive a combined hash offline
    Bind {
        #[arg(long)]
        prompt: String,

        /// Artifact file
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        #[arg(long)]
        creator: String,

        /// Binding timestamp in milliseconds since Unix epoch
        #[arg(long)]
        timestamp: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(!matches!(cli.color, ColorChoice::Never))
        .with_writer(std::io::stderr)
        .init();

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Generate {
            prompt,
            creator,
            mock,
            out,
            json,
        } => commands::generate::execute(prompt, creator, mock, out, json, quiet).await,
        Commands::Verify {
            hash,
            file,
            prompt_hash,
            creator,
            timestamp,
        } => {
            let rederive = file.zip(prompt_hash).map(|(file, prompt_hash)| {
                commands::verify::Rederive {
                    file,
                    prompt_hash,
                    creator,
                    timestamp,
                }
            });
            commands::verify::execute(hash, rederive, quiet).await
        }
        Commands::Hash { file } => commands::hash::execute(file, quiet),
        Commands::Bind {
            prompt,
            file,
            creator,
            timestamp,
        } => commands::bind::execute(prompt, file, creator, timestamp, quiet),
    };

    if let Err(err) = result {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = exit.message {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
        std::process::exit(exit.code);
    }
}
