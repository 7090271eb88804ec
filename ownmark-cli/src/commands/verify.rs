//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ownmark_core::{
    build_claim, compose_check_text, normalize_media_id, verify_ownership, Digest,
    HttpExtractionClient, Preset, VerificationReport,
};
use tracing::{error, info};

use crate::config::{GlobalOpts, ParamOverrides};
use crate::utils::{describe_verdict, media_kind_for, short_digest};

pub struct VerifyArgs {
    pub file: PathBuf,
    pub claim: String,
    pub media_id: Option<String>,
    pub preset: String,
    pub video: bool,
    pub overrides: ParamOverrides,
    pub json: bool,
}

/// Execute the verify command.
pub async fn execute(ctx: &GlobalOpts, args: VerifyArgs) -> Result<()> {
    let preset: Preset = args.preset.parse()?;
    let kind = media_kind_for(&args.file, args.video);
    let params = args.overrides.apply(preset.params(kind));
    params.validate()?;

    let media = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;
    info!(path = %args.file.display(), bytes = media.len(), "Read file");

    // A bare 64-hex digest is an owner, not free text.
    let claim = match Digest::parse(&args.claim) {
        Some(owner) => {
            let media_id = args.media_id.as_deref().and_then(normalize_media_id);
            build_claim(&owner, media_id.as_ref())
        }
        None => compose_check_text(&args.claim, args.media_id.as_deref()),
    };

    if !ctx.quiet && !args.json {
        println!(
            "{}",
            format!("🔎 Extracting from {} ({preset}, {kind:?})", args.file.display()).dimmed()
        );
    }

    let client = HttpExtractionClient::with_config(ctx.service_config())?;
    let report = verify_ownership(&client, &media, kind, &claim, &params)
        .await
        .context("Extraction request failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if ctx.quiet {
        println!("{}", serde_json::to_string(&report.verdict)?.trim_matches('"'));
    } else {
        print_report(&report);
    }

    if report.verdict.is_verified() {
        info!(verdict = ?report.verdict, "Verification successful");
        Ok(())
    } else {
        error!(verdict = ?report.verdict, "Claim not verified");
        bail!("Verification failed: {:?}", report.verdict)
    }
}

pub(crate) fn print_report(report: &VerificationReport) {
    println!();
    println!("   {}", describe_verdict(report.verdict));
    println!();
    println!("   {} {}", "Claim:".dimmed(), report.claim);

    if !report.decoded.is_decoded() {
        println!("   {} {}", "Decoded owner:".dimmed(), "none".red());
    } else if let Some(owner) = &report.decoded.owner_digest {
        println!("   {} {}…", "Decoded owner:".dimmed(), short_digest(owner));
    }
    if let Some(media_id) = &report.decoded.media_id {
        println!("   {} {}", "Decoded media:".dimmed(), media_id);
    }
    println!("   {} {}", "Payload bits:".dimmed(), report.payload_bits);
    if let Some(similarity) = report.similarity {
        println!("   {} {:.3}", "Similarity:".dimmed(), similarity);
    }
    if let Some(repetition) = report.used_repetition {
        println!("   {} {}", "Repetition:".dimmed(), repetition);
    }
    if let Some(frames) = report.frames_used {
        println!("   {} {}", "Frames used:".dimmed(), frames);
    }
}
