//! Lookup command - what the ledger holds for a media id or an exact file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ownmark_core::service::LedgerAnchorService;
use ownmark_core::{digest_of_file, HttpLedgerClient, LedgerLookup};
use tracing::info;

use crate::config::GlobalOpts;
use crate::utils::{parse_media_id, parse_owner};

/// Execute the lookup command.
///
/// `--file` finds only the exact bytes that were anchored; re-encoded copies
/// are found through the media id. With `--owner`, an entry that does not
/// name that owner (or no entry at all) is a verification failure.
pub async fn execute(
    ctx: &GlobalOpts,
    media_id: Option<String>,
    file: Option<PathBuf>,
    owner: Option<String>,
    json: bool,
) -> Result<()> {
    let expected_owner = owner.as_deref().map(parse_owner).transpose()?;
    let client = HttpLedgerClient::with_config(ctx.service_config())?;

    let lookup = match (media_id, file) {
        (Some(raw), _) => {
            let media_id = parse_media_id(&raw)?;
            client
                .lookup(&media_id)
                .await
                .context("Ledger lookup failed")?
        }
        (None, Some(path)) => {
            let artifact = digest_of_file(&path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            info!(path = %path.display(), artifact = %artifact, "Hashed file");
            client
                .lookup_artifact(&artifact)
                .await
                .context("Ledger lookup failed")?
        }
        (None, None) => bail!(ownmark_core::OwnmarkError::InvalidInput(
            "a media id or --file is required".into()
        )),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
    } else if ctx.quiet {
        println!("{}", if lookup.exists { "exists" } else { "absent" });
    } else {
        print_lookup(&lookup);
    }

    if let Some(owner) = expected_owner {
        if !lookup.is_owned_by(&owner) {
            bail!("Verification failed: ledger entry does not name owner {owner}");
        }
        if !ctx.quiet && !json {
            println!("   {}", "✅ Owner matches the ledger entry".green().bold());
        }
    }
    Ok(())
}

fn print_lookup(lookup: &LedgerLookup) {
    println!();
    if !lookup.exists {
        println!("   {}", "No anchor recorded".yellow().bold());
        return;
    }
    println!("   {}", "⚓ Anchor found".green().bold());
    let or_dash = |d: Option<String>| d.unwrap_or_else(|| "-".to_string());
    println!(
        "   {} {}",
        "Owner:".dimmed(),
        or_dash(lookup.owner.as_ref().map(|d| d.to_string()))
    );
    println!(
        "   {} {}",
        "File SHA-256:".dimmed(),
        or_dash(lookup.artifact.as_ref().map(|d| d.to_string()))
    );
    println!(
        "   {} {}",
        "Anchored at:".dimmed(),
        if lookup.timestamp == 0 {
            "-".to_string()
        } else {
            format!("{} (unix)", lookup.timestamp)
        }
    );
    if let Some(cid) = &lookup.content_locator {
        println!("   {} {}", "IPFS CID:".dimmed(), cid);
    }
}
