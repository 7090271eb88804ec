//! HTTP client for the watermark embedding service.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::http_client::{build_client, check_status, ServiceConfig};
use super::EmbeddingService;
use crate::embed::{EmbedReceipt, EmbedRequest, EmbeddedMedia};
use crate::error::Result;
use crate::params::MediaKind;

const IMAGE_EMBED_PATH: &str = "watermark/image";
const VIDEO_EMBED_PATH: &str = "watermark/video";

/// Embedding service reached over multipart HTTP.
pub struct HttpEmbeddingClient {
    client: Client,
    config: ServiceConfig,
}

impl HttpEmbeddingClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ServiceConfig::default())
    }

    #[instrument(level = "debug", skip_all, fields(api_base = %config.api_base))]
    pub fn with_config(config: ServiceConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        debug!("Embedding client created");
        Ok(Self { client, config })
    }

    fn url_for(&self, kind: MediaKind) -> String {
        match kind {
            MediaKind::Image => self.config.endpoint(IMAGE_EMBED_PATH),
            MediaKind::Video => self.config.endpoint(VIDEO_EMBED_PATH),
        }
    }
}

fn upload_name(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "upload.png",
        MediaKind::Video => "upload.mp4",
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingClient {
    #[instrument(level = "info", skip_all, fields(kind = ?request.kind, bytes = media.len()))]
    async fn embed(&self, media: &[u8], request: &EmbedRequest) -> Result<EmbeddedMedia> {
        let start = Instant::now();

        let mut form = Form::new().part(
            "file",
            Part::bytes(media.to_vec()).file_name(upload_name(request.kind)),
        );
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(self.url_for(request.kind))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "embedding service", start).await?;

        let receipt = EmbedReceipt::from_headers(
            response
                .headers()
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        );
        let bytes = response.bytes().await?.to_vec();

        info!(
            out_bytes = bytes.len(),
            preset = ?receipt.preset,
            latency_ms = start.elapsed().as_millis() as u64,
            "Embedding completed"
        );
        Ok(EmbeddedMedia { bytes, receipt })
    }
}
