//! Generate command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use proofart_core::{
    AttestationPipeline, AttestationRequest, Certificate, ContentStoreFactory, GenerationConfig,
    InMemoryContentStore, InMemoryLedger, LedgerConfig, LedgerFactory, MockArtifactSource,
    PipelineConfig, Registration, StoreConfig,
};
use tracing::{info, warn};

use crate::utils::{default_output_path, format_timestamp, proof_path, short_hash, write_output};

/// Execute the generate command.
pub async fn execute(
    prompt: String,
    creator: String,
    mock: bool,
    out: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let pipeline = build_pipeline(mock)?;

    let request = AttestationRequest::new(prompt, creator);
    let attestation = pipeline.attest(&request).await?;
    let certificate = &attestation.certificate;

    let artifact_path =
        out.unwrap_or_else(|| default_output_path(certificate.combined_hash(), certificate.kind));
    write_output(&artifact_path, &attestation.artifact)?;

    let certificate_json =
        serde_json::to_vec_pretty(certificate).context("Failed to serialize certificate")?;
    let certificate_path = proof_path(&artifact_path);
    write_output(&certificate_path, &certificate_json)?;

    info!(
        artifact = %artifact_path.display(),
        certificate = %certificate_path.display(),
        combined_hash = %certificate.combined_hash(),
        "Artifact attested"
    );

    if quiet {
        return Ok(());
    }

    if json {
        println!("{}", String::from_utf8_lossy(&certificate_json));
        return Ok(());
    }

    print_summary(certificate, &artifact_path, &certificate_path, mock);
    Ok(())
}

/// Mock mode wires in-memory capabilities; otherwise every capability comes
/// from the environment and missing generation credentials are fatal.
fn build_pipeline(mock: bool) -> Result<AttestationPipeline> {
    if mock {
        warn!("Using mock backends - the artifact is NOT generated by a real model");
        return Ok(AttestationPipeline::new(
            Arc::new(MockArtifactSource::default()),
            Arc::new(InMemoryContentStore::new()),
            Arc::new(InMemoryLedger::new()),
            PipelineConfig::from_env(),
        ));
    }

    let pipeline = AttestationPipeline::from_config(
        &GenerationConfig::from_env(),
        ContentStoreFactory::create(&StoreConfig::from_env()),
        LedgerFactory::create(&LedgerConfig::from_env()),
        PipelineConfig::from_env(),
    )?;
    Ok(pipeline)
}

fn print_summary(
    certificate: &Certificate,
    artifact_path: &std::path::Path,
    certificate_path: &std::path::Path,
    mock: bool,
) {
    let binding = &certificate.binding;

    println!();
    if certificate.is_degraded() {
        println!("{}", "╔════════════════════════════════════════╗".yellow());
        println!(
            "{}",
            "║       ATTESTED (PARTIALLY DEGRADED)    ║".yellow().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".yellow());
    } else {
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║              ATTESTED                  ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
    }
    println!();
    println!(
        "   {} {}",
        "Combined hash:".dimmed(),
        binding.combined_hash.to_string().cyan()
    );
    println!("   {} {}", "Prompt hash:".dimmed(), binding.prompt_hash);
    println!("   {} {}", "Output hash:".dimmed(), binding.output_hash);
    println!("   {} {}", "Creator:".dimmed(), binding.creator_address);
    println!(
        "   {} {} ({})",
        "Timestamp:".dimmed(),
        format_timestamp(binding.timestamp),
        binding.timestamp
    );
    println!(
        "   {} {}",
        "Artifact id:".dimmed(),
        certificate.record.output_content_id.as_str()
    );
    match &certificate.registration {
        Registration::Registered { tx_id } => {
            println!("   {} {}", "Ledger tx:".dimmed(), tx_id.green());
        }
        Registration::NotRegistered { reason, .. } => {
            println!("   {} {}", "Ledger:".dimmed(), reason.yellow());
        }
    }
    println!();
    println!(
        "   {} {}",
        "Artifact:".dimmed(),
        artifact_path.display().to_string().bold()
    );
    println!(
        "   {} {}",
        "Certificate:".dimmed(),
        certificate_path.display().to_string().bold()
    );

    for warning in certificate.warnings() {
        println!("   {} {}", "Warning:".yellow(), warning);
    }
    if mock {
        println!(
            "   {} mock backends were used; proof {} exists only for this run",
            "Note:".yellow(),
            short_hash(certificate.combined_hash())
        );
    }
}
