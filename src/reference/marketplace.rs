use futures::StreamExt;
use std::fmt;
use tracing::debug;

use super::{ImageKind, ImageSource, MARKETPLACE_IMAGE_MAX_INSTANCES, ProviderImageReference};
use crate::client::{CloudClient, MarketplaceQuery};
use crate::error::ImageError;
use crate::os::OsKind;
use crate::resource_id::ResourceIdentifier;

/// Version token the provider resolves to the newest published version.
pub const LATEST_VERSION: &str = "latest";

const SEPARATOR: char = ':';

/// A catalog image named by `publisher:offer:sku:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketplaceImageRef {
    publisher: String,
    offer: String,
    sku: String,
    version: String,
}

impl MarketplaceImageRef {
    /// Build from parts. Each part must be non-empty and free of `:`, and the
    /// joined string must not read as a resource identifier, so that the
    /// canonical string parses back to the same value.
    pub fn new(
        publisher: impl Into<String>,
        offer: impl Into<String>,
        sku: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ImageError> {
        let parts = [publisher.into(), offer.into(), sku.into(), version.into()];
        let bad: Vec<String> = ["publisher", "offer", "sku", "version"]
            .iter()
            .zip(&parts)
            .filter(|(_, value)| value.is_empty() || value.contains(SEPARATOR))
            .map(|(field, value)| {
                format!(
                    "marketplace image {field} '{value}' must be non-empty and contain no '{SEPARATOR}'"
                )
            })
            .collect();
        if !bad.is_empty() {
            return Err(ImageError::InvalidImage(bad));
        }

        let [publisher, offer, sku, version] = parts;
        let image = Self {
            publisher,
            offer,
            sku,
            version,
        };

        // The parser tries the identifier form first; a rooted publisher like
        // `/subscriptions/x` would never come back as a marketplace image.
        let canonical = image.to_string();
        if ResourceIdentifier::parse(&canonical).is_ok() {
            return Err(ImageError::invalid(format!(
                "marketplace image '{canonical}' would parse as a resource identifier"
            )));
        }
        Ok(image)
    }

    /// Split on `:` into exactly four non-empty parts. Part contents are not
    /// checked further; the provider rejects unknown images at lookup time.
    pub(crate) fn parse(raw: &str) -> Result<Self, ImageError> {
        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        match parts.as_slice() {
            [publisher, offer, sku, version] if parts.iter().all(|p| !p.is_empty()) => Ok(Self {
                publisher: publisher.to_string(),
                offer: offer.to_string(),
                sku: sku.to_string(),
                version: version.to_string(),
            }),
            _ => Err(ImageError::invalid(format!(
                "expected a resource identifier or a marketplace image in the form 'publisher:offer:sku:version', got '{raw}'"
            ))),
        }
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn offer(&self) -> &str {
        &self.offer
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Only the exact `latest` token is resolved; any other version, whatever
    /// its spelling, is passed to the provider unchanged.
    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }

    fn query<'a>(&'a self, region: &'a str) -> MarketplaceQuery<'a> {
        MarketplaceQuery {
            region,
            publisher: &self.publisher,
            offer: &self.offer,
            sku: &self.sku,
        }
    }

    /// Turn `latest` into the newest published version name; any other
    /// version is returned unchanged.
    async fn resolve_version(
        &self,
        client: &dyn CloudClient,
        query: &MarketplaceQuery<'_>,
    ) -> Result<String, ImageError> {
        if !self.is_latest() {
            return Ok(self.version.clone());
        }

        let newest = client
            .marketplace_image_versions(query, 1)
            .next()
            .await
            .transpose()
            .map_err(ImageError::from_client)?
            .ok_or_else(|| {
                ImageError::invalid(format!(
                    "no versions published for marketplace image {}:{}:{} in {}",
                    self.publisher, self.offer, self.sku, query.region
                ))
            })?;

        debug!(image = %self, version = %newest.name, "resolved latest marketplace version");
        Ok(newest.name)
    }
}

impl fmt::Display for MarketplaceImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.publisher, self.offer, self.sku, self.version
        )
    }
}

#[async_trait::async_trait]
impl ImageSource for MarketplaceImageRef {
    fn kind(&self) -> ImageKind {
        ImageKind::Marketplace
    }

    fn maximum_instance_count(&self) -> u32 {
        MARKETPLACE_IMAGE_MAX_INSTANCES
    }

    fn to_provider_reference(&self) -> ProviderImageReference {
        ProviderImageReference::Marketplace {
            publisher: self.publisher.clone(),
            offer: self.offer.clone(),
            sku: self.sku.clone(),
            version: self.version.clone(),
        }
    }

    async fn resolve_os(
        &self,
        client: &dyn CloudClient,
        region: &str,
    ) -> Result<OsKind, ImageError> {
        debug!(image = %self, region, "resolving marketplace image OS");

        let query = self.query(region);
        let version = self.resolve_version(client, &query).await?;

        let metadata = client
            .marketplace_image(&query, &version)
            .await
            .map_err(ImageError::from_client)?;

        metadata.os_disk_image.operating_system.parse()
    }
}
