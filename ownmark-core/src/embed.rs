//! Embedding a claim into media.
//!
//! The embedding service writes `owner:<digest>|media:<id>` into the media
//! and answers with the watermarked bytes. The parameters it actually used
//! come back as `X-Params-*` response headers; extraction only succeeds
//! with the same parameters, so they are parsed once into an
//! [`EmbedReceipt`] and carried into the follow-up verification and anchor.

use std::collections::HashMap;

use serde::Serialize;

use crate::anchor::AnchorRequest;
use crate::claim::{build_claim, Claim, MediaId};
use crate::hashing::{digest_of_bytes, Digest};
use crate::params::{ExtractionParams, MediaKind, Preset};

pub const HEADER_PRESET: &str = "x-preset";
pub const HEADER_QIM: &str = "x-params-qim";
pub const HEADER_REPETITION: &str = "x-params-repetition";
pub const HEADER_ECC_PARITY: &str = "x-params-ecc-parity";
pub const HEADER_USE_Y: &str = "x-params-usey";
pub const HEADER_USE_ECC: &str = "x-params-useecc";
pub const HEADER_FRAME_STEP: &str = "x-params-framestep";
pub const HEADER_PAYLOAD_BITS: &str = "x-payload-bits";
pub const HEADER_PSNR_Y: &str = "x-psnr-y";
pub const HEADER_SSIM_Y: &str = "x-ssim-y";

/// Headers that may carry the SHA-256 of the output, in lookup order.
const FILE_SHA_HEADERS: [&str; 3] = ["x-file-sha256", "x-output-sha256", "x-sha256"];

/// What to embed and how.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    /// Canonical `owner:..|media:..` text written into the media.
    pub claim: Claim,
    pub media_id: MediaId,
    pub kind: MediaKind,
    pub preset: Preset,
    /// Explicit parameters. `None` lets the service apply the preset.
    pub params: Option<ExtractionParams>,
}

impl EmbedRequest {
    pub fn new(owner: &Digest, media_id: MediaId, kind: MediaKind, preset: Preset) -> Self {
        Self {
            claim: build_claim(owner, Some(&media_id)),
            media_id,
            kind,
            preset,
            params: None,
        }
    }

    pub fn with_params(mut self, params: ExtractionParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Parameters the service is expected to use when it reports none.
    pub fn expected_params(&self) -> ExtractionParams {
        self.params
            .clone()
            .unwrap_or_else(|| self.preset.params(self.kind))
    }

    /// Text fields of the embedding form, in submission order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("text", self.claim.as_str().to_string()),
            ("preset", self.preset.name().to_string()),
        ];
        match &self.params {
            Some(params) => {
                fields.push(("use_ecc", params.use_ecc.to_string()));
                fields.push(("use_y_channel", params.use_y_channel.to_string()));
                fields.push(("qim_step", params.qim_step.to_string()));
                fields.push(("repetition", params.repetition.to_string()));
                fields.push(("ecc_parity_bytes", params.ecc_parity_bytes.to_string()));
                if self.kind == MediaKind::Video {
                    if let Some(step) = params.frame_step {
                        fields.push(("frame_step", step.to_string()));
                    }
                }
            }
            None => fields.push(("use_ecc", "true".to_string())),
        }
        fields
    }
}

/// Embedding parameters reported by the service. Absent or unparseable
/// headers are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbeddedParams {
    pub qim_step: Option<f64>,
    pub repetition: Option<u32>,
    pub ecc_parity_bytes: Option<u32>,
    pub use_y_channel: Option<bool>,
    pub use_ecc: Option<bool>,
    pub frame_step: Option<u32>,
}

impl EmbeddedParams {
    /// Extraction parameters: reported values over `fallback`.
    pub fn resolve(&self, fallback: &ExtractionParams) -> ExtractionParams {
        ExtractionParams {
            use_y_channel: self.use_y_channel.unwrap_or(fallback.use_y_channel),
            use_ecc: self.use_ecc.unwrap_or(fallback.use_ecc),
            ecc_parity_bytes: self.ecc_parity_bytes.unwrap_or(fallback.ecc_parity_bytes),
            qim_step: self.qim_step.unwrap_or(fallback.qim_step),
            repetition: self.repetition.unwrap_or(fallback.repetition),
            frame_step: self.frame_step.or(fallback.frame_step),
        }
    }
}

/// Validated view of the embedding response headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedReceipt {
    /// `None` for `custom` or an unknown preset name.
    pub preset: Option<Preset>,
    pub params: EmbeddedParams,
    /// SHA-256 of the output as computed by the service.
    pub file_sha256: Option<Digest>,
    pub payload_bits: Option<u32>,
    pub psnr_y: Option<f64>,
    pub ssim_y: Option<f64>,
}

impl EmbedReceipt {
    /// Parse response headers. Names are matched case-insensitively and
    /// anything not starting with `x-` is ignored.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let headers: HashMap<String, &str> = headers
            .into_iter()
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim()))
            .filter(|(name, _)| name.starts_with("x-"))
            .collect();
        let get = |name: &str| headers.get(name).copied().filter(|v| !v.is_empty());
        let number = |name: &str| get(name).and_then(|v| v.parse::<u32>().ok());
        let float = |name: &str| {
            get(name)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        let flag = |name: &str| get(name).and_then(parse_flag);

        Self {
            preset: get(HEADER_PRESET).and_then(|v| v.parse().ok()),
            params: EmbeddedParams {
                qim_step: float(HEADER_QIM),
                repetition: number(HEADER_REPETITION),
                ecc_parity_bytes: number(HEADER_ECC_PARITY),
                use_y_channel: flag(HEADER_USE_Y),
                use_ecc: flag(HEADER_USE_ECC),
                frame_step: number(HEADER_FRAME_STEP),
            },
            file_sha256: FILE_SHA_HEADERS
                .iter()
                .find_map(|name| get(name).and_then(Digest::parse)),
            payload_bits: number(HEADER_PAYLOAD_BITS),
            psnr_y: float(HEADER_PSNR_Y),
            ssim_y: float(HEADER_SSIM_Y),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Raw answer of an embedding service.
#[derive(Debug, Clone)]
pub struct EmbeddedMedia {
    pub bytes: Vec<u8>,
    pub receipt: EmbedReceipt,
}

/// Result of embedding a claim, ready for verification and anchoring.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedOutcome {
    pub claim: Claim,
    pub media_id: MediaId,
    /// SHA-256 of the returned bytes; this is what gets anchored.
    pub artifact: Digest,
    /// Parameters to extract with, as reported by the service.
    pub extraction_params: ExtractionParams,
    pub receipt: EmbedReceipt,
    #[serde(skip)]
    pub media: Vec<u8>,
}

impl EmbedOutcome {
    pub fn new(request: &EmbedRequest, embedded: EmbeddedMedia) -> Self {
        Self {
            claim: request.claim.clone(),
            media_id: request.media_id.clone(),
            artifact: digest_of_bytes(&embedded.bytes),
            extraction_params: embedded.receipt.params.resolve(&request.expected_params()),
            receipt: embedded.receipt,
            media: embedded.bytes,
        }
    }

    /// Whether the service's own hash of the output disagrees with ours.
    pub fn artifact_mismatch(&self) -> bool {
        self.receipt
            .file_sha256
            .as_ref()
            .is_some_and(|reported| *reported != self.artifact)
    }

    /// Anchor request binding `owner` to this media id and output.
    pub fn anchor_request(&self, owner: Digest, content_locator: Option<String>) -> AnchorRequest {
        AnchorRequest::new(
            owner,
            self.media_id.clone(),
            self.artifact.clone(),
            content_locator,
        )
    }
}

#[cfg(feature = "network")]
pub use flow::embed_ownership;

#[cfg(feature = "network")]
mod flow {
    use tracing::{info, instrument, warn};

    use super::{EmbedOutcome, EmbedRequest};
    use crate::error::{OwnmarkError, Result};
    use crate::service::EmbeddingService;

    /// Embed `request.claim` into `media`.
    ///
    /// The returned parameters are what the service reported, falling back
    /// to the requested ones, so the outcome can be verified as-is.
    #[instrument(level = "info", skip_all, fields(
        kind = ?request.kind,
        preset = %request.preset,
        media_id = %request.media_id,
        bytes = media.len()
    ))]
    pub async fn embed_ownership(
        service: &dyn EmbeddingService,
        media: &[u8],
        request: &EmbedRequest,
    ) -> Result<EmbedOutcome> {
        if media.is_empty() {
            return Err(OwnmarkError::InvalidInput("media is empty".into()));
        }
        if let Some(params) = &request.params {
            params.validate()?;
        }

        let embedded = service.embed(media, request).await?;
        if embedded.bytes.is_empty() {
            return Err(OwnmarkError::Service(
                "embedding service returned no media".into(),
            ));
        }

        let outcome = EmbedOutcome::new(request, embedded);
        if outcome.artifact_mismatch() {
            warn!(
                artifact = %outcome.artifact,
                reported = ?outcome.receipt.file_sha256,
                "Service reported a different output hash"
            );
        }
        info!(
            artifact = %outcome.artifact,
            payload_bits = outcome.extraction_params.payload_bits(),
            "Claim embedded"
        );
        Ok(outcome)
    }
}
