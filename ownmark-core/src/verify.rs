//! End-to-end ownership verification against an extraction service.

use serde::Serialize;
use tracing::{info, instrument};

use crate::claim::Claim;
use crate::error::{OwnmarkError, Result};
use crate::params::{ExtractionParams, MediaKind};
use crate::reconcile::{reconcile_detailed, DecodedPayload, Verdict};
use crate::service::ExtractionService;

/// Everything a caller needs to present one verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    /// The check text that was sent and reconciled against.
    pub claim: Claim,
    pub verdict: Verdict,
    pub decoded: DecodedPayload,
    pub similarity: Option<f64>,
    pub payload_bits: u32,
    pub used_repetition: Option<u32>,
    pub frames_used: Option<u32>,
}

/// Extract the payload from `media` and reconcile it against `claim`.
///
/// The same claim value is sent as `check_text` and used for
/// reconciliation, so a report can never pair a payload with a different
/// claim. Extraction failures are returned as errors and not retried.
#[instrument(level = "info", skip_all, fields(kind = ?kind, bytes = media.len()))]
pub async fn verify_ownership(
    service: &dyn ExtractionService,
    media: &[u8],
    kind: MediaKind,
    claim: &Claim,
    params: &ExtractionParams,
) -> Result<VerificationReport> {
    if claim.is_empty() {
        return Err(OwnmarkError::InvalidInput("claim is empty".into()));
    }
    if media.is_empty() {
        return Err(OwnmarkError::InvalidInput("media is empty".into()));
    }
    params.validate()?;

    let payload = service.extract(media, kind, claim, params).await?;
    let reconciliation = reconcile_detailed(claim, &payload);

    info!(verdict = ?reconciliation.verdict, ecc_ok = payload.ecc_ok, "Ownership checked");

    Ok(VerificationReport {
        claim: claim.clone(),
        verdict: reconciliation.verdict,
        decoded: reconciliation.decoded,
        similarity: reconciliation.similarity,
        payload_bits: reconciliation.payload_bits,
        used_repetition: payload.used_repetition,
        frames_used: payload.frames_used,
    })
}
