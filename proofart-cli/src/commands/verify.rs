//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use proofart_core::{
    ArtifactClaim, ArtifactVerification, AttestationResult, LedgerConfig, LedgerFactory, Verifier,
};
use tracing::{error, info};

use crate::exit_codes::NotVerified;
use crate::utils::{format_timestamp, read_input};

/// Certificate fields needed to re-derive the combined hash from a file.
pub struct Rederive {
    pub file: PathBuf,
    pub prompt_hash: String,
    pub creator: Option<String>,
    pub timestamp: Option<u64>,
}

/// Execute the verify command.
pub async fn execute(hash: String, rederive: Option<Rederive>, quiet: bool) -> Result<()> {
    let config = LedgerConfig::from_env();
    info!(network = %config.network_name, "Verifying against ledger");
    let verifier = Verifier::new(LedgerFactory::create(&config));

    match rederive {
        Some(rederive) => verify_artifact(&verifier, hash, rederive, quiet).await,
        None => {
            let result = verifier
                .verify_by_hash(&hash)
                .await
                .context("Failed to verify proof")?;
            report_lookup(&result, quiet)
        }
    }
}

async fn verify_artifact(
    verifier: &Verifier,
    hash: String,
    rederive: Rederive,
    quiet: bool,
) -> Result<()> {
    let artifact = read_input(&rederive.file)?;
    let claim = ArtifactClaim {
        combined_hash: hash,
        prompt_hash: rederive.prompt_hash,
        creator_address: rederive.creator,
        timestamp: rederive.timestamp,
    };

    let outcome = verifier
        .verify_artifact(&artifact, &claim)
        .await
        .context("Failed to verify artifact")?;

    match outcome {
        ArtifactVerification::Authentic { output_hash, record } => {
            info!(creator = %record.creator, "Verification successful");

            if !quiet {
                print_banner(true);
                println!("   {} {}", "Content:".dimmed(), "Matches registered proof".green());
                println!("   {} {}", "Output hash:".dimmed(), output_hash);
                println!("   {} {}", "Creator:".dimmed(), record.creator);
                println!(
                    "   {} {}",
                    "Registered:".dimmed(),
                    format_timestamp(record.timestamp)
                );
                println!("   {} {}", "Artifact id:".dimmed(), record.output_content_id);
            }
            Ok(())
        }
        ArtifactVerification::ContentMismatch { expected, actual } => {
            error!(expected = %expected, actual = %actual, "Re-derived hash differs");

            if !quiet {
                print_banner(false);
                println!(
                    "   {} {}",
                    "Content:".dimmed(),
                    "Does NOT re-derive the registered hash".red()
                );
                println!("   {} {}", "Expected:".dimmed(), expected);
                println!("   {} {}", "Got:".dimmed(), actual);
            }
            Err(NotVerified(
                "artifact or certificate fields do not match the registered proof".into(),
            )
            .into())
        }
        ArtifactVerification::NotRegistered { output_hash } => {
            if !quiet {
                print_banner(false);
                println!("   {} {}", "Ledger:".dimmed(), "No proof registered".red());
                println!("   {} {}", "Output hash:".dimmed(), output_hash);
            }
            Err(NotVerified(format!("no proof registered for {}", claim.combined_hash)).into())
        }
    }
}

fn report_lookup(result: &AttestationResult, quiet: bool) -> Result<()> {
    if !result.verified {
        if !quiet {
            print_banner(false);
            println!("   {} {}", "Ledger:".dimmed(), "No proof registered".red());
        }
        return Err(
            NotVerified(format!("no proof registered for {}", result.combined_hash)).into(),
        );
    }

    if !quiet {
        print_banner(true);
        if let Some(creator) = &result.creator {
            println!("   {} {}", "Creator:".dimmed(), creator);
        }
        if let Some(timestamp) = result.timestamp {
            println!("   {} {}", "Registered:".dimmed(), format_timestamp(timestamp));
        }
        if let Some(content_id) = &result.output_content_id {
            println!("   {} {}", "Artifact id:".dimmed(), content_id);
        }
        println!(
            "   {} {}",
            "Note:".dimmed(),
            "hash lookup only; pass --file and --prompt-hash to check the bytes".dimmed()
        );
    }
    Ok(())
}

fn print_banner(verified: bool) {
    println!();
    if verified {
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║              VERIFIED                  ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
    } else {
        println!("{}", "╔════════════════════════════════════════╗".red());
        println!(
            "{}",
            "║            NOT VERIFIED                ║".red().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".red());
    }
    println!();
}
