//! Ledger anchoring.
//!
//! An anchor is a ledger transaction binding an owner digest, a media id and
//! an artifact digest. Submitting it is the anchor service's job; this module
//! models the request and receipt, and [`lifecycle`] follows the submitted
//! transaction until the ledger reports it final.
//!
//! ## State machine
//!
//! ```text
//! Unknown (submitted) ──start──▶ Pending ──success──▶ Confirmed
//!                                   │ ▲
//!                                   │ └─ no answer / transport error
//!                                   └──────failure──▶ Failed
//! ```

#[cfg(feature = "network")]
pub mod lifecycle;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claim::MediaId;
use crate::error::{OwnmarkError, Result};
use crate::hashing::{is_lower_hex_of_len, strip_hex_prefix, Digest};

#[cfg(feature = "network")]
pub use lifecycle::{AnchorEvent, AnchorHandle, AnchorTracker, TrackerConfig};

/// Ledger transaction identifier, always stored as `0x` + 64 lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    /// Parse a transaction hash with or without the `0x` prefix.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = strip_hex_prefix(input.trim()).to_ascii_lowercase();
        is_lower_hex_of_len(&hex, 64).then(|| Self(format!("0x{hex}")))
    }

    /// Prefixed form, for explorer links and API calls.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn unprefixed(&self) -> &str {
        &self.0[2..]
    }

    /// `abcdef…1234` style abbreviation of the unprefixed hash.
    pub fn short(&self) -> String {
        let raw = self.unprefixed();
        format!("{}…{}", &raw[..6], &raw[raw.len() - 4..])
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TxHash {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a transaction hash: {value:?}"))
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.0
    }
}

/// Observed status of an anchoring transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    /// Submitted, not yet tracked.
    #[default]
    Unknown,
    Pending,
    Confirmed,
    Failed,
}

impl AnchorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One anchoring attempt as seen by its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: AnchorStatus,
}

impl AnchorRecord {
    pub fn new(tx_hash: TxHash, block_number: Option<u64>) -> Self {
        Self {
            tx_hash,
            block_number,
            status: AnchorStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Block explorer link for the transaction.
    pub fn explorer_url(&self, explorer_base: &str) -> String {
        format!("{}/tx/{}", explorer_base.trim_end_matches('/'), self.tx_hash)
    }
}

/// Receipt status as reported by a ledger status source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
    /// No receipt yet, or an answer we do not understand.
    Unrecognized,
}

impl ReceiptStatus {
    /// The anchor status this receipt moves a tracked record to.
    pub fn to_anchor_status(self) -> AnchorStatus {
        match self {
            Self::Success => AnchorStatus::Confirmed,
            Self::Failure => AnchorStatus::Failed,
            Self::Unrecognized => AnchorStatus::Pending,
        }
    }
}

/// Wire shape of an explorer `gettxreceiptstatus` response.
///
/// `result` is an object on success and a message string on API errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExplorerReceiptResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl ExplorerReceiptResponse {
    pub fn receipt_status(&self) -> ReceiptStatus {
        if self.status.as_deref() != Some("1") {
            return ReceiptStatus::Unrecognized;
        }
        let inner = self
            .result
            .as_ref()
            .and_then(|r| r.get("status"))
            .and_then(|s| s.as_str());
        match inner {
            Some("1") => ReceiptStatus::Success,
            Some("0") => ReceiptStatus::Failure,
            _ => ReceiptStatus::Unrecognized,
        }
    }
}

/// Request body for the anchor service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorRequest {
    pub media_id: MediaId,
    #[serde(rename = "owner_email_sha")]
    pub owner: Digest,
    #[serde(rename = "file_sha256")]
    pub artifact: Digest,
    /// Off-chain content locator (an IPFS CID in practice).
    #[serde(rename = "ipfs_cid")]
    pub content_locator: String,
}

impl AnchorRequest {
    pub fn new(
        owner: Digest,
        media_id: MediaId,
        artifact: Digest,
        content_locator: Option<String>,
    ) -> Self {
        Self {
            media_id,
            owner,
            artifact,
            content_locator: content_locator.unwrap_or_default(),
        }
    }
}

/// Wire shape of the anchor service response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnchorReceiptResponse {
    #[serde(rename = "txHash", alias = "tx_hash")]
    pub tx_hash: Option<String>,
    #[serde(rename = "blockNumber", alias = "block_number")]
    pub block_number: Option<u64>,
}

/// Transaction identifier returned for a submitted anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

impl AnchorReceipt {
    /// A fresh record for tracking this receipt.
    pub fn into_record(self) -> AnchorRecord {
        AnchorRecord::new(self.tx_hash, self.block_number)
    }
}

impl TryFrom<AnchorReceiptResponse> for AnchorReceipt {
    type Error = OwnmarkError;

    fn try_from(raw: AnchorReceiptResponse) -> Result<Self> {
        let raw_hash = raw
            .tx_hash
            .ok_or_else(|| OwnmarkError::Service("anchor response missing txHash".into()))?;
        let tx_hash = TxHash::parse(&raw_hash).ok_or_else(|| {
            OwnmarkError::Service(format!("anchor response has invalid txHash: {raw_hash}"))
        })?;
        Ok(Self {
            tx_hash,
            block_number: raw.block_number,
        })
    }
}

/// Wire shape of a ledger lookup by media id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerLookupResponse {
    pub exists: bool,
    pub owner_email_sha: Option<String>,
    pub file_sha256: Option<String>,
    pub timestamp: Option<u64>,
    pub ipfs_cid: Option<String>,
}

/// What the ledger holds for a media id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerLookup {
    pub exists: bool,
    pub owner: Option<Digest>,
    pub artifact: Option<Digest>,
    /// Anchoring time, seconds since the epoch. Zero when absent.
    pub timestamp: u64,
    pub content_locator: Option<String>,
}

impl LedgerLookup {
    /// Whether the ledger entry names `owner`.
    pub fn is_owned_by(&self, owner: &Digest) -> bool {
        self.exists && self.owner.as_ref() == Some(owner)
    }

    /// Lookup by file hash. The answer does not echo the hash, so an
    /// existing entry is stamped with the one that was queried.
    pub fn for_artifact(raw: LedgerLookupResponse, artifact: &Digest) -> Self {
        let mut lookup = Self::from(raw);
        if lookup.exists && lookup.artifact.is_none() {
            lookup.artifact = Some(artifact.clone());
        }
        lookup
    }
}

impl From<LedgerLookupResponse> for LedgerLookup {
    fn from(raw: LedgerLookupResponse) -> Self {
        Self {
            exists: raw.exists,
            owner: raw.owner_email_sha.as_deref().and_then(Digest::parse),
            artifact: raw.file_sha256.as_deref().and_then(Digest::parse),
            timestamp: raw.timestamp.unwrap_or(0),
            content_locator: raw.ipfs_cid.filter(|cid| !cid.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::normalize_media_id;
    use crate::hashing::digest_of;

    const HASH: &str = "5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[test]
    fn test_tx_hash_normalization() {
        let bare = TxHash::parse(HASH).unwrap();
        let prefixed = TxHash::parse(&format!("0x{}", HASH.to_uppercase())).unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!(bare.as_str(), format!("0x{HASH}"));
        assert_eq!(bare.unprefixed(), HASH);
        assert_eq!(bare.short(), "5c504e…2060");
    }

    #[test]
    fn test_tx_hash_rejects_bad_input() {
        assert!(TxHash::parse("").is_none());
        assert!(TxHash::parse("0x").is_none());
        assert!(TxHash::parse(&HASH[..40]).is_none());
        assert!(TxHash::parse(&"q".repeat(64)).is_none());
    }

    #[test]
    fn test_record_starts_unknown() {
        let record = AnchorRecord::new(TxHash::parse(HASH).unwrap(), Some(42));
        assert_eq!(record.status, AnchorStatus::Unknown);
        assert!(!record.is_terminal());
        assert_eq!(
            record.explorer_url("https://amoy.polygonscan.com/"),
            format!("https://amoy.polygonscan.com/tx/0x{HASH}")
        );
    }

    #[test]
    fn test_receipt_status_mapping() {
        assert_eq!(
            ReceiptStatus::Success.to_anchor_status(),
            AnchorStatus::Confirmed
        );
        assert_eq!(ReceiptStatus::Failure.to_anchor_status(), AnchorStatus::Failed);
        assert_eq!(
            ReceiptStatus::Unrecognized.to_anchor_status(),
            AnchorStatus::Pending
        );
    }

    #[test]
    fn test_explorer_response_parsing() {
        let parse = |json: &str| {
            serde_json::from_str::<ExplorerReceiptResponse>(json)
                .unwrap()
                .receipt_status()
        };

        assert_eq!(
            parse(r#"{"status":"1","message":"OK","result":{"status":"1"}}"#),
            ReceiptStatus::Success
        );
        assert_eq!(
            parse(r#"{"status":"1","message":"OK","result":{"status":"0"}}"#),
            ReceiptStatus::Failure
        );
        assert_eq!(
            parse(r#"{"status":"1","message":"OK","result":{"status":""}}"#),
            ReceiptStatus::Unrecognized
        );
        assert_eq!(
            parse(r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#),
            ReceiptStatus::Unrecognized
        );
        assert_eq!(parse("{}"), ReceiptStatus::Unrecognized);
    }

    #[test]
    fn test_anchor_request_wire_shape() {
        let request = AnchorRequest::new(
            digest_of("owner@example.com"),
            normalize_media_id(&"ab".repeat(32)).unwrap(),
            digest_of("artifact"),
            None,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["media_id"], "ab".repeat(32));
        assert_eq!(json["owner_email_sha"], digest_of("owner@example.com").as_str());
        assert_eq!(json["file_sha256"], digest_of("artifact").as_str());
        assert_eq!(json["ipfs_cid"], "");
    }

    #[test]
    fn test_artifact_lookup_stamps_queried_hash() {
        let artifact = digest_of("file bytes");
        let owner = digest_of("owner@example.com");
        let raw: LedgerLookupResponse = serde_json::from_str(&format!(
            r#"{{"exists":true,"owner_email_sha":"0x{owner}","timestamp":1700000000,"ipfs_cid":""}}"#
        ))
        .unwrap();
        let lookup = LedgerLookup::for_artifact(raw, &artifact);
        assert_eq!(lookup.artifact, Some(artifact.clone()));
        assert!(lookup.is_owned_by(&owner));
        assert_eq!(lookup.content_locator, None);

        let absent: LedgerLookupResponse =
            serde_json::from_str(r#"{"exists":false,"owner_email_sha":"0x0"}"#).unwrap();
        let lookup = LedgerLookup::for_artifact(absent, &artifact);
        assert!(!lookup.exists);
        assert!(lookup.artifact.is_none());
        assert!(lookup.owner.is_none());
    }

    #[test]
    fn test_anchor_receipt_from_response() {
        let raw: AnchorReceiptResponse =
            serde_json::from_str(&format!(r#"{{"txHash":"{HASH}","blockNumber":17}}"#)).unwrap();
        let receipt = AnchorReceipt::try_from(raw).unwrap();
        assert_eq!(receipt.tx_hash.as_str(), format!("0x{HASH}"));
        assert_eq!(receipt.block_number, Some(17));
        assert_eq!(receipt.into_record().status, AnchorStatus::Unknown);

        let missing: AnchorReceiptResponse = serde_json::from_str("{}").unwrap();
        assert!(AnchorReceipt::try_from(missing).is_err());

        let bad: AnchorReceiptResponse =
            serde_json::from_str(r#"{"txHash":"0x1234"}"#).unwrap();
        assert!(AnchorReceipt::try_from(bad).is_err());
    }

    #[test]
    fn test_ledger_lookup_from_response() {
        let owner = digest_of("owner@example.com");
        let raw: LedgerLookupResponse = serde_json::from_str(&format!(
            r#"{{"exists":true,"owner_email_sha":"0x{owner}","file_sha256":"0x{HASH}","timestamp":1700000000,"ipfs_cid":""}}"#
        ))
        .unwrap();
        let lookup = LedgerLookup::from(raw);
        assert!(lookup.is_owned_by(&owner));
        assert_eq!(lookup.artifact.as_ref().unwrap().as_str(), HASH);
        assert_eq!(lookup.timestamp, 1_700_000_000);
        assert!(lookup.content_locator.is_none());
        assert!(!lookup.is_owned_by(&digest_of("someone@else.com")));
    }
}
