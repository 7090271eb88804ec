//! Extraction parameters and platform presets.
//!
//! The values are opaque to this crate: they are validated for obvious
//! nonsense and passed through to the extraction service unmodified. The
//! presets mirror the settings media was embedded with for each sharing
//! platform, since extraction only succeeds with matching parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OwnmarkError, Result};

/// Payload size of an unprotected owner digest, in bits.
const RAW_PAYLOAD_BITS: u32 = 256;

/// Owner digest bytes carried in every codeword.
const DIGEST_BYTES: u32 = 32;

/// Largest parity that still fits a Reed-Solomon codeword over GF(256).
pub const MAX_ECC_PARITY_BYTES: u32 = 255 - DIGEST_BYTES;

/// Kind of media submitted for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

/// Named parameter bundles tuned for a platform's re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// No re-encoding expected.
    Original,
    #[default]
    Facebook,
    Whatsapp,
    Instagram,
    XTwitter,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Original,
        Preset::Facebook,
        Preset::Whatsapp,
        Preset::Instagram,
        Preset::XTwitter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Facebook => "facebook",
            Self::Whatsapp => "whatsapp",
            Self::Instagram => "instagram",
            Self::XTwitter => "x_twitter",
        }
    }

    /// Default extraction parameters for this preset and media kind.
    pub fn params(self, kind: MediaKind) -> ExtractionParams {
        let (qim_step, repetition, ecc_parity_bytes) = match self {
            Self::Original => (18.0, 120, 32),
            Self::Facebook | Self::Whatsapp | Self::Instagram | Self::XTwitter => (24.0, 160, 64),
        };
        let frame_step = match kind {
            MediaKind::Image => None,
            MediaKind::Video if self == Self::Whatsapp => Some(1),
            MediaKind::Video => Some(2),
        };
        ExtractionParams {
            use_y_channel: true,
            use_ecc: true,
            ecc_parity_bytes,
            qim_step,
            repetition,
            frame_step,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = OwnmarkError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| OwnmarkError::InvalidInput(format!("Unknown preset '{wanted}'")))
    }
}

/// Decoding parameters forwarded to the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParams {
    /// Read the luma channel instead of all channels.
    pub use_y_channel: bool,
    pub use_ecc: bool,
    /// Reed-Solomon parity size in bytes.
    pub ecc_parity_bytes: u32,
    /// QIM quantization step.
    pub qim_step: f64,
    /// Blocks per payload bit.
    pub repetition: u32,
    /// Frame sampling stride, video only.
    pub frame_step: Option<u32>,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Preset::default().params(MediaKind::Image)
    }
}

impl ExtractionParams {
    /// Number of payload bits the extractor will read.
    pub fn payload_bits(&self) -> u32 {
        if self.use_ecc {
            DIGEST_BYTES
                .saturating_add(self.ecc_parity_bytes)
                .saturating_mul(8)
        } else {
            RAW_PAYLOAD_BITS
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.qim_step.is_nan() || self.qim_step <= 0.0 {
            return Err(OwnmarkError::InvalidInput("qim_step must be > 0".into()));
        }
        if self.repetition == 0 {
            return Err(OwnmarkError::InvalidInput("repetition must be > 0".into()));
        }
        if self.use_ecc && self.ecc_parity_bytes == 0 {
            return Err(OwnmarkError::InvalidInput(
                "ecc_parity_bytes must be > 0 when use_ecc=true".into(),
            ));
        }
        if self.use_ecc && self.ecc_parity_bytes > MAX_ECC_PARITY_BYTES {
            return Err(OwnmarkError::InvalidInput(format!(
                "ecc_parity_bytes must be <= {MAX_ECC_PARITY_BYTES}"
            )));
        }
        if self.frame_step == Some(0) {
            return Err(OwnmarkError::InvalidInput("frame_step must be > 0".into()));
        }
        Ok(())
    }
}
