//! Deterministic service doubles for tests and offline runs.
//!
//! WARNING: nothing here talks to a real extractor or ledger.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{EmbeddingService, ExtractionService, LedgerStatusSource};
use crate::anchor::{ReceiptStatus, TxHash};
use crate::claim::Claim;
use crate::embed::{EmbedReceipt, EmbedRequest, EmbeddedMedia};
use crate::hashing::digest_of_bytes;
use crate::error::{OwnmarkError, Result};
use crate::params::{ExtractionParams, MediaKind};
use crate::reconcile::ExtractedPayload;

/// One scripted answer of [`MockLedgerStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Status(ReceiptStatus),
    TransportError(String),
}

/// Status source that replays a script, then answers "no receipt yet".
pub struct MockLedgerStatus {
    script: Mutex<VecDeque<MockReply>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLedgerStatus {
    pub fn new(script: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// `pending` unrecognized answers followed by a success.
    pub fn confirm_after(pending: usize) -> Self {
        let mut script = vec![MockReply::Status(ReceiptStatus::Unrecognized); pending];
        script.push(MockReply::Status(ReceiptStatus::Success));
        Self::new(script)
    }

    /// Delay every answer, simulating a slow explorer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of queries started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of queries that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or(MockReply::Status(ReceiptStatus::Unrecognized))
    }
}

#[async_trait]
impl LedgerStatusSource for MockLedgerStatus {
    async fn receipt_status(&self, _tx_hash: &TxHash) -> Result<ReceiptStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.next_reply();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            MockReply::Status(status) => Ok(status),
            MockReply::TransportError(msg) => Err(OwnmarkError::Service(msg)),
        }
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}

/// Extractor that behaves as if the media carried `embedded`.
///
/// The payload is the hex of the embedded claim's owner digest and media id,
/// and the legacy text flag is set when the check text equals the embedded
/// claim exactly.
pub struct MockExtractor {
    embedded: Option<Claim>,
    last_check_text: Mutex<Option<Claim>>,
}

impl MockExtractor {
    pub fn embedded(claim: Claim) -> Self {
        Self {
            embedded: Some(claim),
            last_check_text: Mutex::new(None),
        }
    }

    /// Media whose watermark did not survive.
    pub fn unreadable() -> Self {
        Self {
            embedded: None,
            last_check_text: Mutex::new(None),
        }
    }

    /// The check text of the most recent request.
    pub fn last_check_text(&self) -> Option<Claim> {
        self.last_check_text.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl ExtractionService for MockExtractor {
    async fn extract(
        &self,
        _media: &[u8],
        _kind: MediaKind,
        check_text: &Claim,
        params: &ExtractionParams,
    ) -> Result<ExtractedPayload> {
        if let Ok(mut last) = self.last_check_text.lock() {
            *last = Some(check_text.clone());
        }

        let recovered = self.embedded.as_ref().and_then(|claim| {
            let owner = claim.owner_digest()?;
            let media = claim.media_id().map(String::from).unwrap_or_default();
            Some((claim, format!("{owner}{media}")))
        });

        let mut payload = match recovered {
            Some((claim, hex)) => {
                let mut payload = ExtractedPayload::from_recovered_hex(hex, true);
                payload.match_text_hash = claim == check_text;
                payload.similarity = Some(1.0);
                payload
            }
            None => {
                let mut payload = ExtractedPayload::from_recovered_hex("", false);
                payload.similarity = Some(0.5);
                payload
            }
        };
        payload.payload_bits = params.payload_bits();
        payload.used_repetition = Some(params.repetition);
        Ok(payload)
    }
}

/// Embedder that appends the claim to the media and reports parameters in
/// the same headers the real service sends.
pub struct MockEmbedder {
    reported: Option<ExtractionParams>,
    last_request: Mutex<Option<EmbedRequest>>,
}

impl MockEmbedder {
    /// Reports whatever parameters were requested.
    pub fn new() -> Self {
        Self {
            reported: None,
            last_request: Mutex::new(None),
        }
    }

    /// Reports `params` regardless of the request, like a service applying
    /// its own preset table.
    pub fn reporting(params: ExtractionParams) -> Self {
        Self {
            reported: Some(params),
            last_request: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<EmbedRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedder {
    async fn embed(&self, media: &[u8], request: &EmbedRequest) -> Result<EmbeddedMedia> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let mut bytes = media.to_vec();
        bytes.push(b'\n');
        bytes.extend_from_slice(request.claim.as_str().as_bytes());

        let params = self
            .reported
            .clone()
            .unwrap_or_else(|| request.expected_params());
        let file_sha = digest_of_bytes(&bytes);
        let mut headers = vec![
            ("X-Preset", request.preset.name().to_string()),
            ("X-Params-QIM", params.qim_step.to_string()),
            ("X-Params-Repetition", params.repetition.to_string()),
            ("X-Params-ECC-Parity", params.ecc_parity_bytes.to_string()),
            ("X-Params-UseY", params.use_y_channel.to_string()),
            ("X-Params-UseECC", params.use_ecc.to_string()),
            ("X-Payload-Bits", params.payload_bits().to_string()),
            ("X-File-SHA256", file_sha.to_string()),
        ];
        if let Some(step) = params.frame_step {
            headers.push(("X-Params-FrameStep", step.to_string()));
        }
        let receipt =
            EmbedReceipt::from_headers(headers.iter().map(|(name, value)| (*name, value.as_str())));

        Ok(EmbeddedMedia { bytes, receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::resolve_claim_from_free_text;

    #[tokio::test]
    async fn test_mock_status_replays_script() {
        let mock = MockLedgerStatus::confirm_after(1);
        let tx = TxHash::parse(&"ab".repeat(32)).unwrap();

        assert_eq!(
            mock.receipt_status(&tx).await.unwrap(),
            ReceiptStatus::Unrecognized
        );
        assert_eq!(mock.receipt_status(&tx).await.unwrap(), ReceiptStatus::Success);
        assert_eq!(
            mock.receipt_status(&tx).await.unwrap(),
            ReceiptStatus::Unrecognized
        );
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_mock_status_transport_error() {
        let mock = MockLedgerStatus::new(vec![MockReply::TransportError("boom".into())]);
        let tx = TxHash::parse(&"ab".repeat(32)).unwrap();
        assert!(mock.receipt_status(&tx).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_embedder_reports_headers() {
        let owner = crate::hashing::digest_of("user@example.com");
        let media_id = crate::claim::MediaId::generate().unwrap();
        let request = EmbedRequest::new(&owner, media_id, MediaKind::Video, crate::Preset::Whatsapp);
        let mut server_params = request.expected_params();
        server_params.qim_step = 28.0;
        server_params.repetition = 240;

        let mock = MockEmbedder::reporting(server_params.clone());
        let embedded = mock.embed(b"clip", &request).await.unwrap();

        assert!(embedded.bytes.starts_with(b"clip\n"));
        assert_eq!(embedded.receipt.params.resolve(&ExtractionParams::default()), server_params);
        assert_eq!(embedded.receipt.file_sha256, Some(digest_of_bytes(&embedded.bytes)));
        assert_eq!(mock.last_request(), Some(request));
    }

    #[tokio::test]
    async fn test_mock_extractor_records_check_text() {
        let claim = resolve_claim_from_free_text("user@example.com");
        let mock = MockExtractor::embedded(claim.clone());
        let payload = mock
            .extract(b"img", MediaKind::Image, &claim, &ExtractionParams::default())
            .await
            .unwrap();

        assert!(payload.ecc_ok);
        assert!(payload.match_text_hash);
        assert_eq!(payload.recovered_hex.len(), 64);
        assert_eq!(mock.last_check_text(), Some(claim));
    }
}
