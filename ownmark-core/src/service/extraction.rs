//! HTTP client for the watermark extraction service.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::http_client::{build_client, check_status, read_json, ServiceConfig};
use super::ExtractionService;
use crate::claim::Claim;
use crate::error::Result;
use crate::params::{ExtractionParams, MediaKind};
use crate::reconcile::{ExtractedPayload, ExtractionResponse};

const IMAGE_EXTRACT_PATH: &str = "watermark/image/extract";
const VIDEO_EXTRACT_PATH: &str = "watermark/video/extract";

/// Extraction service reached over multipart HTTP.
pub struct HttpExtractionClient {
    client: Client,
    config: ServiceConfig,
}

impl HttpExtractionClient {
    /// Create a client with configuration from the environment.
    pub fn new() -> Result<Self> {
        Self::with_config(ServiceConfig::default())
    }

    #[instrument(level = "debug", skip_all, fields(
        api_base = %config.api_base,
        timeout_ms = config.timeout.as_millis() as u64
    ))]
    pub fn with_config(config: ServiceConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        debug!("Extraction client created");
        Ok(Self { client, config })
    }

    fn url_for(&self, kind: MediaKind) -> String {
        match kind {
            MediaKind::Image => self.config.endpoint(IMAGE_EXTRACT_PATH),
            MediaKind::Video => self.config.endpoint(VIDEO_EXTRACT_PATH),
        }
    }
}

/// Text fields of the extraction form, in submission order.
pub(crate) fn form_fields(
    kind: MediaKind,
    check_text: &Claim,
    params: &ExtractionParams,
) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("use_y_channel", params.use_y_channel.to_string()),
        ("use_ecc", params.use_ecc.to_string()),
        ("ecc_parity_bytes", params.ecc_parity_bytes.to_string()),
        ("qim_step", params.qim_step.to_string()),
        ("repetition", params.repetition.to_string()),
    ];
    if kind == MediaKind::Video {
        if let Some(step) = params.frame_step {
            fields.push(("frame_step", step.to_string()));
        }
    }
    fields.push(("check_text", check_text.as_str().to_string()));
    fields
}

fn upload_name(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "upload.png",
        MediaKind::Video => "upload.mp4",
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionClient {
    #[instrument(level = "info", skip_all, fields(
        kind = ?kind,
        bytes = media.len(),
        payload_bits = params.payload_bits()
    ))]
    async fn extract(
        &self,
        media: &[u8],
        kind: MediaKind,
        check_text: &Claim,
        params: &ExtractionParams,
    ) -> Result<ExtractedPayload> {
        params.validate()?;
        let start = Instant::now();

        let mut form = Form::new().part(
            "file",
            Part::bytes(media.to_vec()).file_name(upload_name(kind)),
        );
        for (name, value) in form_fields(kind, check_text, params) {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(self.url_for(kind))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "extraction service", start).await?;
        let raw: ExtractionResponse = read_json(response, "extraction service").await?;
        let payload = ExtractedPayload::from(raw);

        info!(
            ecc_ok = payload.ecc_ok,
            recovered_len = payload.recovered_hex.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Extraction completed"
        );
        Ok(payload)
    }
}
