//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::Result;
use colored::{ColoredString, Colorize};
use ownmark_core::hashing::owner_digest_from_input;
use ownmark_core::{normalize_media_id, Digest, MediaId, MediaKind, OwnmarkError, Verdict};

const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "m4v", "webm", "mkv", "avi"];

/// Owner digest from an email or a 64-hex digest, or a usage error.
pub fn parse_owner(raw: &str) -> Result<Digest> {
    owner_digest_from_input(raw).ok_or_else(|| {
        OwnmarkError::InvalidInput(format!(
            "owner must be an email or a 64-hex SHA-256 digest, got {raw:?}"
        ))
        .into()
    })
}

/// Media id in canonical form, or a usage error.
pub fn parse_media_id(raw: &str) -> Result<MediaId> {
    normalize_media_id(raw).ok_or_else(|| {
        OwnmarkError::InvalidInput(format!(
            "media id must be 64 hex characters (or legacy 32), got {raw:?}"
        ))
        .into()
    })
}

/// Media kind from the `--video` flag, falling back to the file extension.
pub fn media_kind_for(path: &Path, force_video: bool) -> MediaKind {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if force_video || by_extension {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Human-readable verdict line.
pub fn describe_verdict(verdict: Verdict) -> ColoredString {
    match verdict {
        Verdict::Verified => "VERIFIED: owner matches the claim".green().bold(),
        Verdict::VerifiedLegacyTextMatch => {
            "VERIFIED: exact text match (legacy)".green().bold()
        }
        Verdict::ExtractedUnmatched => {
            "EXTRACTED: payload recovered, but the claim names no owner digest"
                .yellow()
                .bold()
        }
        Verdict::NotVerified => "NOT VERIFIED".red().bold(),
    }
}

/// First eight bytes of a digest, hex encoded, for compact display.
pub fn short_digest(digest: &Digest) -> String {
    hex::encode(&digest.to_bytes()[..8])
}
