//! Canonical claim strings.
//!
//! A claim is the exact text embedded into media and later handed back to
//! the extraction service as `check_text`:
//!
//! ```text
//! owner:<64 hex>
//! owner:<64 hex>|media:<64 hex>
//! ```
//!
//! The extractor compares bytes, so any whitespace or case drift between
//! embedding and verification breaks the match. Apart from
//! [`MediaId::generate`], everything here is deterministic and never fails:
//! unusable input degrades to `None` or to a claim that simply will not
//! verify.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OwnmarkError, Result};
use crate::hashing::{digest_of, is_lower_hex_of_len, normalize_email, strip_hex_prefix, Digest};

/// Prefix of the owner segment.
pub const OWNER_PREFIX: &str = "owner:";

/// Separator and prefix of the optional media segment.
pub const MEDIA_SEPARATOR: &str = "|media:";

/// Length of the legacy short media id form.
const LEGACY_MEDIA_ID_LEN: usize = 32;

/// Identifier of one logical media artifact: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaId(String);

impl MediaId {
    /// A fresh id from 32 bytes of system randomness.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        getrandom::fill(&mut bytes).map_err(|e| {
            OwnmarkError::Service(format!("system randomness unavailable: {e}"))
        })?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Digest> for MediaId {
    fn from(digest: Digest) -> Self {
        Self(digest.into())
    }
}

impl TryFrom<String> for MediaId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        normalize_media_id(&value).ok_or_else(|| format!("not a media id: {value:?}"))
    }
}

impl From<MediaId> for String {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

/// Normalize a user-supplied media id.
///
/// Strips an optional `0x` prefix and lower-cases. Accepts 64 hex
/// characters, or the legacy 32-character form which is left-padded with
/// zeros. Any other shape is `None`.
pub fn normalize_media_id(input: &str) -> Option<MediaId> {
    let hex = strip_hex_prefix(input.trim()).to_ascii_lowercase();
    if is_lower_hex_of_len(&hex, 64) {
        Some(MediaId(hex))
    } else if is_lower_hex_of_len(&hex, LEGACY_MEDIA_ID_LEN) {
        Some(MediaId(format!("{hex:0>64}")))
    } else {
        None
    }
}

/// The text asserted to be embedded in a piece of media.
///
/// Claims built with [`build_claim`] always have the canonical shape. Claims
/// resolved from free text keep whatever the user typed, so they are not
/// guaranteed to carry a parseable owner digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claim(String);

impl Claim {
    /// The exact bytes to send as `check_text`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The owner digest carried by the `owner:` segment, if well formed.
    pub fn owner_digest(&self) -> Option<Digest> {
        let rest = strip_prefix_ignore_case(&self.0, OWNER_PREFIX)?;
        let segment = rest.split('|').next().unwrap_or_default();
        if segment.len() != 64 {
            return None;
        }
        Digest::parse(segment)
    }

    /// The media id carried by the `|media:` segment, if well formed.
    pub fn media_id(&self) -> Option<MediaId> {
        let start = find_ignore_case(&self.0, MEDIA_SEPARATOR)?;
        let segment = &self.0[start + MEDIA_SEPARATOR.len()..];
        normalize_media_id(segment.split('|').next().unwrap_or_default())
    }

    /// Whether the claim already names a media segment.
    pub fn has_media_segment(&self) -> bool {
        find_ignore_case(&self.0, MEDIA_SEPARATOR).is_some()
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Claim {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the canonical claim for an owner and optional media id.
pub fn build_claim(owner: &Digest, media_id: Option<&MediaId>) -> Claim {
    let mut text = format!("{OWNER_PREFIX}{owner}");
    if let Some(id) = media_id {
        text.push_str(MEDIA_SEPARATOR);
        text.push_str(id.as_str());
    }
    Claim(text)
}

/// Turn whatever the user typed into a claim.
///
/// - `owner:...` is kept as typed.
/// - Anything containing `@` is treated as an email and hashed.
/// - Otherwise the trimmed text is returned unchanged; it will fail at
///   comparison time rather than here.
pub fn resolve_claim_from_free_text(raw: &str) -> Claim {
    let trimmed = raw.trim();
    if strip_prefix_ignore_case(trimmed, OWNER_PREFIX).is_some() {
        return Claim(trimmed.to_string());
    }
    if trimmed.contains('@') {
        let owner = digest_of(&normalize_email(trimmed));
        return build_claim(&owner, None);
    }
    Claim(trimmed.to_string())
}

/// Compose the check text from a free-text claim and an optional media id.
///
/// A claim that already carries `|media:` is respected verbatim and the
/// separately supplied id is ignored. An id that does not normalize is
/// dropped.
pub fn compose_check_text(raw_claim: &str, raw_media_id: Option<&str>) -> Claim {
    let claim = resolve_claim_from_free_text(raw_claim);
    if claim.is_empty() || claim.has_media_segment() {
        return claim;
    }
    match raw_media_id.and_then(normalize_media_id) {
        Some(id) => {
            let mut text = claim.0;
            text.push_str(MEDIA_SEPARATOR);
            text.push_str(id.as_str());
            Claim(text)
        }
        None => claim,
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}
