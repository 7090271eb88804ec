//! Identity hashing.
//!
//! Every identity that ends up inside a claim (an owner's email address,
//! a file's bytes) is reduced to a [`Digest`]: the SHA-256 of its normalized
//! form, rendered as 64 lowercase hexadecimal characters.
//!
//! ```
//! use ownmark_core::hashing::{digest_of, normalize_email};
//!
//! let owner = digest_of(&normalize_email(" User@Example.COM "));
//! assert_eq!(owner.as_str().len(), 64);
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::Result;

/// Length of a rendered digest in hexadecimal characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// A SHA-256 digest rendered as 64 lowercase hex characters.
///
/// Only produced by hashing or by [`Digest::parse`], so the length and
/// alphabet invariant always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse a pasted digest.
    ///
    /// Accepts 64 hex characters in any case, with or without a `0x` prefix.
    /// Anything else yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = strip_hex_prefix(input.trim()).to_ascii_lowercase();
        is_lower_hex_of_len(&hex, DIGEST_HEX_LEN).then_some(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digest with an explicit `0x` prefix, as ledger APIs expect.
    pub fn to_prefixed(&self) -> String {
        format!("0x{}", self.0)
    }

    /// Raw 32-byte form.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Invariant: self.0 is 64 lowercase hex chars.
        if let Ok(decoded) = hex::decode(&self.0) {
            out.copy_from_slice(&decoded);
        }
        out
    }

    fn from_hash(bytes: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Digest {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a 64-hex digest: {value:?}"))
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// SHA-256 of the UTF-8 encoding of `text`.
pub fn digest_of(text: &str) -> Digest {
    digest_of_bytes(text.as_bytes())
}

/// SHA-256 of raw binary content.
pub fn digest_of_bytes(bytes: &[u8]) -> Digest {
    Digest::from_hash(Sha256::digest(bytes))
}

/// SHA-256 of a file's contents.
pub fn digest_of_file(path: impl AsRef<Path>) -> Result<Digest> {
    let bytes = std::fs::read(path)?;
    Ok(digest_of_bytes(&bytes))
}

/// Trim surrounding whitespace and lower-case.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Resolve an "email or digest" input into an owner digest.
///
/// A 64-hex value is taken as an already-hashed owner; anything containing
/// `@` is normalized and hashed as an email. Everything else is unusable.
pub fn owner_digest_from_input(raw: &str) -> Option<Digest> {
    let trimmed = raw.trim();
    if let Some(digest) = Digest::parse(trimmed) {
        return Some(digest);
    }
    if trimmed.contains('@') {
        return Some(digest_of(&normalize_email(trimmed)));
    }
    None
}

pub(crate) fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

pub(crate) fn is_lower_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
