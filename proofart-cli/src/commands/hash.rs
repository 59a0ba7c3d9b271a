//! Hash command: the output hash of a file, without a ledger lookup.

use std::path::PathBuf;

use anyhow::Result;
use proofart_core::compute_hash_only;

use crate::utils::read_input;

/// Execute the hash command.
pub fn execute(file: PathBuf, quiet: bool) -> Result<()> {
    let artifact = read_input(&file)?;
    let result = compute_hash_only(&artifact);

    if !quiet {
        println!("{}  {}", result.output_hash, file.display());
    }
    Ok(())
}
