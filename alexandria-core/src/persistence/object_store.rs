//! Cover image storage: decode, resize to {small, medium, large}, and
//! upload to an S3-compatible bucket (Cloudflare R2 in production, MinIO in
//! dev). The Cover queue consumer is the only caller.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use image::imageops::FilterType;
use image::ImageFormat;
use tracing::debug;

use alexandria_config::ProviderConfig;

use crate::error::{CoreError, Result};

/// Target width in pixels for each stored cover size. Height follows the
/// source aspect ratio. Chosen to match the dimensions OpenLibrary's own
/// cover CDN serves under its `S`/`M`/`L` query parameter.
const SMALL_WIDTH: u32 = 150;
const MEDIUM_WIDTH: u32 = 300;
const LARGE_WIDTH: u32 = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoverSize {
    Small,
    Medium,
    Large,
}

impl CoverSize {
    fn target_width(self) -> u32 {
        match self {
            CoverSize::Small => SMALL_WIDTH,
            CoverSize::Medium => MEDIUM_WIDTH,
            CoverSize::Large => LARGE_WIDTH,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            CoverSize::Small => "small",
            CoverSize::Medium => "medium",
            CoverSize::Large => "large",
        }
    }
}

/// The three resized variants of one cover, keyed by size, plus the public
/// URL each was stored under.
#[derive(Clone, Debug)]
pub struct StoredCover {
    pub small_url: String,
    pub medium_url: String,
    pub large_url: String,
}

#[async_trait]
pub trait CoverObjectStore: Send + Sync {
    /// Decodes `source_bytes`, resizes it to all three cover sizes, uploads
    /// each under `{isbn}/{size}.jpg`, and returns their public URLs.
    async fn store_cover(&self, isbn: &str, source_bytes: Vec<u8>) -> Result<StoredCover>;
}

pub struct S3CoverObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3CoverObjectStore {
    /// Builds an S3-compatible client from explicit R2 credentials when
    /// present, falling back to the default AWS credential chain (useful
    /// against real S3 or a locally configured profile).
    pub async fn new(config: &ProviderConfig) -> Result<Self> {
        let bucket = config
            .object_store_bucket
            .clone()
            .ok_or_else(|| CoreError::ObjectStore("OBJECT_STORE_BUCKET not configured".to_string()))?;
        let public_base_url = config
            .object_store_public_base_url
            .clone()
            .ok_or_else(|| CoreError::ObjectStore("OBJECT_STORE_PUBLIC_BASE_URL not configured".to_string()))?;

        let mut loader = aws_config::from_env();
        if let Some(endpoint) = &config.object_store_endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        if let (Some(key), Some(secret)) = (&config.object_store_access_key_id, &config.object_store_secret_access_key) {
            let credentials = aws_credential_types::Credentials::new(key.clone(), secret.clone(), None, None, "alexandria-object-store");
            loader = loader.credentials_provider(credentials);
        }
        let aws_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if config.object_store_endpoint_url.is_some() {
            // R2 and most S3-compatible stores expect path-style addressing.
            s3_config_builder = s3_config_builder.force_path_style(true);
        }
        let client = Client::from_conf(s3_config_builder.build());

        Ok(Self { client, bucket, public_base_url })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("image/jpeg")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| CoreError::ObjectStore(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CoverObjectStore for S3CoverObjectStore {
    async fn store_cover(&self, isbn: &str, source_bytes: Vec<u8>) -> Result<StoredCover> {
        let source = image::load_from_memory(&source_bytes).map_err(|e| CoreError::ObjectStore(format!("invalid image: {e}")))?;

        let mut urls = [String::new(), String::new(), String::new()];
        for (idx, size) in [CoverSize::Small, CoverSize::Medium, CoverSize::Large].into_iter().enumerate() {
            let target_width = size.target_width();
            let resized = if source.width() > target_width {
                let ratio = target_width as f64 / source.width() as f64;
                let target_height = (source.height() as f64 * ratio).round() as u32;
                source.resize(target_width, target_height.max(1), FilterType::Lanczos3)
            } else {
                source.clone()
            };

            let mut encoded = Vec::new();
            resized
                .write_to(&mut std::io::Cursor::new(&mut encoded), ImageFormat::Jpeg)
                .map_err(|e| CoreError::ObjectStore(format!("encode failed: {e}")))?;

            let key = format!("{isbn}/{}.jpg", size.suffix());
            debug!(isbn, size = size.suffix(), bytes = encoded.len(), "uploading cover variant");
            self.put(&key, encoded).await?;
            urls[idx] = self.public_url(&key);
        }

        Ok(StoredCover {
            small_url: urls[0].clone(),
            medium_url: urls[1].clone(),
            large_url: urls[2].clone(),
        })
    }
}
