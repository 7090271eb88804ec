//! Embed command - write an owner/media claim into an image or video.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ownmark_core::{
    embed_ownership, verify_ownership, EmbedOutcome, EmbedRequest, HttpEmbeddingClient,
    HttpExtractionClient, MediaId, MediaKind, Preset,
};
use tracing::info;

use super::verify::print_report;
use crate::config::{GlobalOpts, ParamOverrides};
use crate::utils::{media_kind_for, parse_media_id, parse_owner, short_digest};

pub struct EmbedArgs {
    pub file: PathBuf,
    pub owner: String,
    pub media_id: Option<String>,
    pub out: Option<PathBuf>,
    pub preset: String,
    pub video: bool,
    pub overrides: ParamOverrides,
    pub verify: bool,
    pub json: bool,
}

/// Execute the embed command.
///
/// A media id is generated when none is given. With `--verify` the output
/// is checked right away using the parameters the service reported.
pub async fn execute(ctx: &GlobalOpts, args: EmbedArgs) -> Result<()> {
    let owner = parse_owner(&args.owner)?;
    let media_id = match args.media_id.as_deref() {
        Some(raw) => parse_media_id(raw)?,
        None => MediaId::generate()?,
    };
    let preset: Preset = args.preset.parse()?;
    let kind = media_kind_for(&args.file, args.video);

    let mut request = EmbedRequest::new(&owner, media_id, kind, preset);
    if !args.overrides.is_empty() {
        let params = args.overrides.apply(preset.params(kind));
        params.validate()?;
        request = request.with_params(params);
    }

    let media = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;
    info!(path = %args.file.display(), bytes = media.len(), "Read file");

    if !ctx.quiet && !args.json {
        println!("{}", format!("📝 Owner: {}…", short_digest(&owner)).dimmed());
        println!("{}", format!("📝 Media: {}", request.media_id).dimmed());
        println!(
            "{}",
            format!("🖋  Embedding into {} ({preset}, {kind:?})", args.file.display()).dimmed()
        );
    }

    let client = HttpEmbeddingClient::with_config(ctx.service_config())?;
    let outcome = embed_ownership(&client, &media, &request)
        .await
        .context("Embedding request failed")?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path(&args.file, kind));
    std::fs::write(&out, &outcome.media)
        .with_context(|| format!("Failed to write file: {}", out.display()))?;
    info!(path = %out.display(), artifact = %outcome.artifact, "Wrote watermarked file");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if ctx.quiet {
        println!("{}", outcome.media_id);
    } else {
        print_outcome(&outcome, &out, &owner.to_string());
    }

    if args.verify {
        verify_output(ctx, &outcome, kind, args.json).await?;
    }
    Ok(())
}

async fn verify_output(
    ctx: &GlobalOpts,
    outcome: &EmbedOutcome,
    kind: MediaKind,
    json: bool,
) -> Result<()> {
    let client = HttpExtractionClient::with_config(ctx.service_config())?;
    let report = verify_ownership(
        &client,
        &outcome.media,
        kind,
        &outcome.claim,
        &outcome.extraction_params,
    )
    .await
    .context("Extraction request failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !ctx.quiet {
        print_report(&report);
    }

    if !report.verdict.is_verified() {
        bail!("Verification failed: {:?}", report.verdict);
    }
    Ok(())
}

/// `<stem>_wm.png` or `<stem>_wm.mp4` next to the input.
fn default_output_path(input: &Path, kind: MediaKind) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    let ext = match kind {
        MediaKind::Image => "png",
        MediaKind::Video => "mp4",
    };
    input.with_file_name(format!("{stem}_wm.{ext}"))
}

fn print_outcome(outcome: &EmbedOutcome, out: &Path, owner: &str) {
    let params = &outcome.extraction_params;
    println!();
    println!("   {}", "✅ Claim embedded".green().bold());
    println!("   {} {}", "Output:".dimmed(), out.display());
    println!("   {} {}", "Claim:".dimmed(), outcome.claim);
    println!("   {} {}", "Media id:".dimmed(), outcome.media_id);
    println!("   {} {}", "File SHA-256:".dimmed(), outcome.artifact);
    println!(
        "   {} qim {} / repetition {} / parity {}{}",
        "Parameters:".dimmed(),
        params.qim_step,
        params.repetition,
        params.ecc_parity_bytes,
        params
            .frame_step
            .map(|s| format!(" / frame step {s}"))
            .unwrap_or_default()
    );
    if let Some(psnr) = outcome.receipt.psnr_y {
        println!("   {} {:.2} dB", "PSNR (Y):".dimmed(), psnr);
    }
    println!();
    println!(
        "   {} ownmark anchor --owner {} --media-id {} --file {}",
        "Anchor with:".dimmed(),
        owner,
        outcome.media_id,
        out.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/photo.jpg"), MediaKind::Image),
            PathBuf::from("/tmp/photo_wm.png")
        );
        assert_eq!(
            default_output_path(Path::new("clip.mov"), MediaKind::Video),
            PathBuf::from("clip_wm.mp4")
        );
    }
}
