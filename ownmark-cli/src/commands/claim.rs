//! Claim command - print the check text for an owner.

use anyhow::Result;
use colored::Colorize;
use ownmark_core::{build_claim, compose_check_text, normalize_media_id, Digest};
use tracing::warn;

use crate::config::GlobalOpts;

/// Execute the claim command.
///
/// An email or bare digest becomes a canonical claim. Text already starting
/// with `owner:` is kept as typed, including any `|media:` segment.
pub fn execute(ctx: &GlobalOpts, owner: String, media_id: Option<String>) -> Result<()> {
    let media = media_id.as_deref().and_then(normalize_media_id);
    if media_id.is_some() && media.is_none() {
        warn!(media_id = ?media_id, "Ignoring invalid media id");
        if !ctx.quiet {
            eprintln!("{}", "warning: media id is not 64 (or 32) hex, ignored".yellow());
        }
    }

    // Only a bare 64-hex digest skips free-text resolution.
    let claim = match Digest::parse(&owner) {
        Some(digest) => build_claim(&digest, media.as_ref()),
        None => compose_check_text(&owner, media.as_ref().map(|m| m.as_str())),
    };

    if claim.owner_digest().is_none() && !ctx.quiet {
        eprintln!(
            "{}",
            "warning: claim carries no owner digest and can only verify by exact text".yellow()
        );
    }

    println!("{claim}");
    Ok(())
}
