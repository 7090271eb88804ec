//! Anchor command - register an owner/media binding on the ledger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use ownmark_core::service::{ExplorerStatusClient, LedgerAnchorService};
use ownmark_core::{digest_of_file, AnchorRequest, AnchorTracker, HttpLedgerClient};
use tracing::info;

use super::track;
use crate::config::GlobalOpts;
use crate::utils::{parse_media_id, parse_owner, short_digest};

/// Execute the anchor command.
///
/// The submission is never retried; a media id that is already anchored
/// fails with the registry's reason.
pub async fn execute(
    ctx: &GlobalOpts,
    owner: String,
    media_id: String,
    file: PathBuf,
    ipfs_cid: Option<String>,
    follow: bool,
    interval: Option<u64>,
) -> Result<()> {
    let owner = parse_owner(&owner)?;
    let media_id = parse_media_id(&media_id)?;
    let artifact = digest_of_file(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    info!(path = %file.display(), artifact = %artifact, "Hashed artifact");

    if !ctx.quiet {
        println!("{}", format!("📝 Owner: {}…", short_digest(&owner)).dimmed());
        println!("{}", format!("📝 Media: {media_id}").dimmed());
        println!("{}", format!("📝 File:  {artifact}").dimmed());
        println!("{}", "🌐 Submitting anchor...".dimmed());
    }

    let request = AnchorRequest::new(owner, media_id, artifact, ipfs_cid);
    let client = HttpLedgerClient::with_config(ctx.service_config())?;
    let receipt = client
        .anchor(&request)
        .await
        .context("Anchor submission failed")?;

    let explorer = ctx.explorer_config();
    let record = receipt.into_record();
    if ctx.quiet {
        println!("{}", record.tx_hash);
    } else {
        println!();
        println!("   {}", "⚓ Anchor submitted".green().bold());
        println!("   {} {}", "Transaction:".dimmed(), record.tx_hash);
        if let Some(block) = record.block_number {
            println!("   {} {}", "Block:".dimmed(), block);
        }
        println!(
            "   {} {}",
            "Explorer:".dimmed(),
            record.explorer_url(&explorer.explorer_base)
        );
    }

    if !follow {
        return Ok(());
    }

    let source = Arc::new(ExplorerStatusClient::with_config(explorer)?);
    let tracker = AnchorTracker::new(source, ctx.tracker_config(interval));
    track::follow(ctx, tracker.track(record)).await
}
