use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use image::RgbaImage;
use image::imageops::FilterType;
use kiosk_core::LoadError;
use kiosk_core::ResourceLoader;
use reqwest::Url;
use tracing::debug;

/// A decoded image, downscaled so its longest side fits the loader's limit.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pixels: Arc<RgbaImage>,
}

impl LoadedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Fetches image bytes over HTTP and decodes them off the async runtime.
///
/// Identifiers are normally absolute URLs. Relative identifiers are resolved
/// against `base` when one is configured.
#[derive(Clone, Debug)]
pub struct HttpResourceLoader {
    client: reqwest::Client,
    base: Option<Url>,
    max_dimension: u32,
}

impl HttpResourceLoader {
    pub fn new(client: reqwest::Client, max_dimension: u32) -> Self {
        Self {
            client,
            base: None,
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Resolves relative identifiers against the listing endpoint, when it
    /// is a valid URL.
    pub fn with_endpoint_base(self, endpoint: &str) -> Self {
        match Url::parse(endpoint) {
            Ok(base) => self.with_base(base),
            Err(_) => self,
        }
    }

    fn resolve(&self, id: &str) -> Result<Url, LoadError> {
        match Url::parse(id) {
            Ok(url) => Ok(url),
            Err(err) => match &self.base {
                Some(base) => base
                    .join(id)
                    .map_err(|err| LoadError::Fetch(format!("invalid resource url {id}: {err}"))),
                None => Err(LoadError::Fetch(format!("invalid resource url {id}: {err}"))),
            },
        }
    }

    async fn fetch(&self, url: Url) -> Result<Bytes, LoadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| LoadError::Fetch(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .await
            .map_err(|err| LoadError::Fetch(err.to_string()))
    }
}

#[async_trait]
impl ResourceLoader for HttpResourceLoader {
    type Output = LoadedImage;

    async fn load(&self, id: &str) -> Result<LoadedImage, LoadError> {
        let url = self.resolve(id)?;
        let bytes = self.fetch(url).await?;
        let max_dimension = self.max_dimension;
        let pixels = tokio::task::spawn_blocking(move || decode(&bytes, max_dimension))
            .await
            .map_err(|err| LoadError::Decode(format!("decode task failed: {err}")))??;
        debug!(id, width = pixels.width(), height = pixels.height(), "image decoded");
        Ok(LoadedImage::new(pixels))
    }
}

fn decode(bytes: &[u8], max_dimension: u32) -> Result<RgbaImage, LoadError> {
    let image = image::load_from_memory(bytes).map_err(|err| LoadError::Decode(err.to_string()))?;
    Ok(downscale(image, max_dimension).into_rgba8())
}

fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, FilterType::Triangle)
}
