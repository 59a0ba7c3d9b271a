//! Bind command: offline re-derivation of a combined hash.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use proofart_core::ProofBinding;
use tracing::debug;

use crate::utils::{format_timestamp, read_input};

/// Execute the bind command. Prints the combined hash on stdout.
pub fn execute(
    prompt: String,
    file: PathBuf,
    creator: String,
    timestamp: u64,
    quiet: bool,
) -> Result<()> {
    let artifact = read_input(&file)?;
    let binding = ProofBinding::new(&prompt, &artifact, &creator, timestamp);
    debug!(
        prompt_hash = %binding.prompt_hash,
        output_hash = %binding.output_hash,
        "Binding computed"
    );

    if quiet {
        return Ok(());
    }

    println!("{}", binding.combined_hash);
    eprintln!("   {} {}", "Prompt hash:".dimmed(), binding.prompt_hash);
    eprintln!("   {} {}", "Output hash:".dimmed(), binding.output_hash);
    eprintln!("   {} {}", "Creator:".dimmed(), binding.creator_address);
    eprintln!("   {} {}", "Timestamp:".dimmed(), format_timestamp(timestamp));
    Ok(())
}
