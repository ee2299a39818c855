pub mod arm;
mod models;

pub use arm::{ApiVersions, ArmClient};
pub use models::{
    GalleryImageMetadata, ManagedImageMetadata, MarketplaceImageMetadata, MarketplaceImageVersion,
    OsDisk, OsDiskImage, StorageProfile,
};

use anyhow::Result;
use futures::stream::BoxStream;

use crate::resource_id::ResourceIdentifier;

/// Coordinates of a marketplace image, minus the version, in one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketplaceQuery<'a> {
    pub region: &'a str,
    pub publisher: &'a str,
    pub offer: &'a str,
    pub sku: &'a str,
}

/// The read operations image resolution needs from the compute provider.
///
/// Implementations report failures as `anyhow` errors; callers in this crate
/// turn them into [`crate::ImageError::InvalidImage`].
#[async_trait::async_trait]
pub trait CloudClient: Send + Sync {
    async fn gallery_image(&self, id: &ResourceIdentifier) -> Result<GalleryImageMetadata>;

    async fn managed_image(&self, id: &ResourceIdentifier) -> Result<ManagedImageMetadata>;

    /// Published versions of a marketplace image, newest first, at most `top`.
    /// Nothing is requested until the stream is polled.
    fn marketplace_image_versions<'a>(
        &'a self,
        query: &'a MarketplaceQuery<'a>,
        top: u32,
    ) -> BoxStream<'a, Result<MarketplaceImageVersion>>;

    async fn marketplace_image(
        &self,
        query: &MarketplaceQuery<'_>,
        version: &str,
    ) -> Result<MarketplaceImageMetadata>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::anyhow;
    use futures::StreamExt;
    use futures::stream;
    use std::sync::Mutex;

    /// Canned-response client that records every call it receives.
    #[derive(Default)]
    pub(crate) struct FakeCloudClient {
        pub(crate) gallery: Option<GalleryImageMetadata>,
        pub(crate) managed: Option<ManagedImageMetadata>,
        pub(crate) versions: Vec<MarketplaceImageVersion>,
        pub(crate) marketplace: Option<MarketplaceImageMetadata>,
        pub(crate) fail_with: Option<String>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeCloudClient {
        pub(crate) fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(message) => Err(anyhow!(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CloudClient for FakeCloudClient {
        async fn gallery_image(&self, id: &ResourceIdentifier) -> Result<GalleryImageMetadata> {
            self.record(format!("gallery_image {id}"))?;
            self.gallery.clone().ok_or_else(|| anyhow!("gallery image {id} not found"))
        }

        async fn managed_image(&self, id: &ResourceIdentifier) -> Result<ManagedImageMetadata> {
            self.record(format!("managed_image {id}"))?;
            self.managed.clone().ok_or_else(|| anyhow!("image {id} not found"))
        }

        fn marketplace_image_versions<'a>(
            &'a self,
            query: &'a MarketplaceQuery<'a>,
            top: u32,
        ) -> BoxStream<'a, Result<MarketplaceImageVersion>> {
            let call = format!(
                "marketplace_image_versions {} {}:{}:{} top={top}",
                query.region, query.publisher, query.offer, query.sku
            );
            match self.record(call) {
                Ok(()) => stream::iter(
                    self.versions
                        .iter()
                        .take(top as usize)
                        .cloned()
                        .map(Ok)
                        .collect::<Vec<_>>(),
                )
                .boxed(),
                Err(err) => stream::iter(vec![Err(err)]).boxed(),
            }
        }

        async fn marketplace_image(
            &self,
            query: &MarketplaceQuery<'_>,
            version: &str,
        ) -> Result<MarketplaceImageMetadata> {
            self.record(format!(
                "marketplace_image {} {}:{}:{}:{version}",
                query.region, query.publisher, query.offer, query.sku
            ))?;
            self.marketplace
                .clone()
                .ok_or_else(|| anyhow!("marketplace image version {version} not found"))
        }
    }
}
