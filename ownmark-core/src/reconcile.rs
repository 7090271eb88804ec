//! Reconciliation of extracted watermark payloads against claims.
//!
//! The extraction service returns the error-corrected payload as hex. When
//! error correction succeeded, that hex is the owner digest optionally
//! followed by the media id: the structural inverse of
//! [`build_claim`](crate::claim::build_claim). [`reconcile`] turns the
//! payload and the claim it was checked against into a discrete
//! [`Verdict`].

use serde::{Deserialize, Serialize};

use crate::claim::{Claim, MediaId};
use crate::hashing::{is_lower_hex_of_len, Digest};

/// Wire shape of an extraction response.
///
/// Every field except the hex is optional on the wire; missing flags are
/// read as `false`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionResponse {
    pub payload_bitlen: Option<u32>,
    pub similarity: Option<f64>,
    pub recovered_hex: Option<String>,
    pub ecc_ok: Option<bool>,
    pub match_text_hash: Option<bool>,
    pub used_repetition: Option<u32>,
    pub frames_used: Option<u32>,
}

/// Validated result of one extraction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedPayload {
    /// Number of payload bits the extractor read.
    pub payload_bits: u32,
    /// Recovered payload, hex encoded.
    pub recovered_hex: String,
    /// Error correction repaired the payload.
    pub ecc_ok: bool,
    /// Legacy flag: the extractor matched the whole check text.
    pub match_text_hash: bool,
    /// Bit agreement with the expected codeword. Informational only.
    pub similarity: Option<f64>,
    pub used_repetition: Option<u32>,
    pub frames_used: Option<u32>,
}

impl ExtractedPayload {
    /// A payload as an extractor would report it for `recovered_hex`.
    pub fn from_recovered_hex(recovered_hex: impl Into<String>, ecc_ok: bool) -> Self {
        let recovered_hex = recovered_hex.into();
        Self {
            payload_bits: (recovered_hex.len() * 4) as u32,
            recovered_hex,
            ecc_ok,
            match_text_hash: false,
            similarity: None,
            used_repetition: None,
            frames_used: None,
        }
    }
}

impl From<ExtractionResponse> for ExtractedPayload {
    fn from(raw: ExtractionResponse) -> Self {
        let recovered_hex = raw.recovered_hex.unwrap_or_default();
        Self {
            payload_bits: raw
                .payload_bitlen
                .unwrap_or((recovered_hex.len() * 4) as u32),
            recovered_hex,
            ecc_ok: raw.ecc_ok.unwrap_or(false),
            match_text_hash: raw.match_text_hash.unwrap_or(false),
            similarity: raw.similarity,
            used_repetition: raw.used_repetition,
            frames_used: raw.frames_used,
        }
    }
}

/// Owner and media identity recovered from a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedPayload {
    pub owner_digest: Option<Digest>,
    pub media_id: Option<MediaId>,
}

impl DecodedPayload {
    pub fn is_decoded(&self) -> bool {
        self.owner_digest.is_some()
    }
}

/// Outcome of checking a payload against a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Decoded owner digest equals the claimed one.
    Verified,
    /// The extractor reported an exact whole-text match.
    VerifiedLegacyTextMatch,
    /// A payload was recovered but the claim has no owner digest to compare.
    ExtractedUnmatched,
    NotVerified,
}

impl Verdict {
    pub fn is_verified(self) -> bool {
        matches!(self, Self::Verified | Self::VerifiedLegacyTextMatch)
    }
}

/// Verdict plus the data a caller needs to render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub verdict: Verdict,
    pub decoded: DecodedPayload,
    pub similarity: Option<f64>,
    pub payload_bits: u32,
}

/// Decode the owner digest and media id from a payload.
///
/// Only trusts payloads with `ecc_ok` whose hex is exactly 64 or 128
/// characters. Anything else decodes to nothing.
pub fn decode(payload: &ExtractedPayload) -> DecodedPayload {
    if !payload.ecc_ok {
        return DecodedPayload::default();
    }

    let hex = payload.recovered_hex.to_ascii_lowercase();
    let valid = is_lower_hex_of_len(&hex, 64) || is_lower_hex_of_len(&hex, 128);
    if !valid {
        return DecodedPayload::default();
    }

    let owner_digest = Digest::parse(&hex[..64]);
    let media_id = (hex.len() == 128)
        .then(|| crate::claim::normalize_media_id(&hex[64..]))
        .flatten();

    DecodedPayload {
        owner_digest,
        media_id,
    }
}

/// Decide the verdict for `payload` checked against `claim`.
pub fn reconcile(claim: &Claim, payload: &ExtractedPayload) -> Verdict {
    verdict_for(claim, payload, &decode(payload))
}

/// Like [`reconcile`], also returning the decoded identity and surfaced metrics.
pub fn reconcile_detailed(claim: &Claim, payload: &ExtractedPayload) -> Reconciliation {
    let decoded = decode(payload);
    Reconciliation {
        verdict: verdict_for(claim, payload, &decoded),
        decoded,
        similarity: payload.similarity,
        payload_bits: payload.payload_bits,
    }
}

fn verdict_for(claim: &Claim, payload: &ExtractedPayload, decoded: &DecodedPayload) -> Verdict {
    // Legacy whole-text match takes precedence over the structured payload.
    if payload.ecc_ok && payload.match_text_hash {
        return Verdict::VerifiedLegacyTextMatch;
    }

    let Some(recovered_owner) = decoded.owner_digest.as_ref() else {
        return Verdict::NotVerified;
    };

    match claim.owner_digest() {
        Some(claimed) if claimed == *recovered_owner => Verdict::Verified,
        Some(_) => Verdict::NotVerified,
        None => Verdict::ExtractedUnmatched,
    }
}
