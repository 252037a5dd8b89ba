//! Cover branding image sources.
//!
//! Branding is optional decoration: fetching is bounded by a timeout and
//! every failure degrades to a cover page without a logo.

use crate::error::{ReportError, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Something that can supply raw branding image bytes.
#[async_trait]
pub trait BrandingSource: Send + Sync {
    /// Human-readable location for diagnostics.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Branding image read from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileBranding {
    path: PathBuf,
}

impl FileBranding {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BrandingSource for FileBranding {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Branding image downloaded over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpBranding {
    url: String,
    client: Client,
}

impl HttpBranding {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl BrandingSource for HttpBranding {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pick a source for a configured location: `http(s)://` URLs are fetched
/// over the network, anything else is treated as a file path.
pub fn branding_from_location(location: &str) -> Arc<dyn BrandingSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpBranding::new(location))
    } else {
        Arc::new(FileBranding::new(location))
    }
}

/// A decoded branding image re-encoded as PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandingImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Fetch and decode branding within `timeout`. Never fails.
pub async fn load_branding(source: &dyn BrandingSource, timeout: Duration) -> Option<BrandingImage> {
    let location = source.describe();
    let bytes = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            warn!("Branding image unavailable ({}): {}", location, e);
            return None;
        }
        Err(_) => {
            warn!(
                "Branding image fetch timed out after {:?} ({})",
                timeout, location
            );
            return None;
        }
    };

    match decode_branding(&bytes) {
        Ok(image) => {
            debug!(
                "Loaded branding {}x{} from {}",
                image.width, image.height, location
            );
            Some(image)
        }
        Err(e) => {
            warn!("Branding image could not be decoded ({}): {}", location, e);
            None
        }
    }
}

fn decode_branding(bytes: &[u8]) -> Result<BrandingImage> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(ReportError::InvalidInput("branding image is empty".to_string()));
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(decoded.to_rgba8()).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(BrandingImage { png, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    struct SlowBranding;

    #[async_trait]
    impl BrandingSource for SlowBranding {
        fn describe(&self) -> String {
            "slow".to_string()
        }

        async fn fetch(&self) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Vec::new())
        }
    }

    fn logo_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_file_branding_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, logo_png()).unwrap();

        let image = load_branding(&FileBranding::new(&path), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!((image.width, image.height), (8, 4));
    }

    #[tokio::test]
    async fn test_missing_file_degrades_to_none() {
        let source = FileBranding::new("/definitely/not/here.png");
        assert!(load_branding(&source, Duration::from_secs(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_bytes_degrade_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(load_branding(&FileBranding::new(&path), Duration::from_secs(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        assert!(load_branding(&SlowBranding, Duration::from_millis(50)).await.is_none());
    }

    #[test]
    fn test_location_dispatch() {
        assert_eq!(branding_from_location("https://x.test/logo.png").describe(), "https://x.test/logo.png");
        assert_eq!(branding_from_location("assets/logo.png").describe(), "assets/logo.png");
    }
}
