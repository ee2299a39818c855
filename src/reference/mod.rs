//! Image references: the three ways of naming a VM image and what each one
//! can tell about the image it names.

mod codec;
mod gallery;
mod managed;
mod marketplace;

pub use gallery::GalleryImageRef;
pub use managed::ManagedImageRef;
pub use marketplace::{LATEST_VERSION, MarketplaceImageRef};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::client::CloudClient;
use crate::error::ImageError;
use crate::os::OsKind;
use crate::resource_id::ResourceIdentifier;

/// Instance ceiling for images built from a custom (gallery or managed) image.
pub const CUSTOM_IMAGE_MAX_INSTANCES: u32 = 600;
/// Instance ceiling for marketplace images.
pub const MARKETPLACE_IMAGE_MAX_INSTANCES: u32 = 1000;

/// Which naming scheme a reference uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Gallery,
    Managed,
    Marketplace,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Gallery => "gallery image",
            ImageKind::Managed => "managed image",
            ImageKind::Marketplace => "marketplace image",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The image reference shape the provider's own APIs take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderImageReference {
    Id {
        id: ResourceIdentifier,
    },
    Marketplace {
        publisher: String,
        offer: String,
        sku: String,
        version: String,
    },
}

/// Capabilities shared by every kind of image reference.
///
/// `Display` renders the canonical string, which [`ImageReference::parse`]
/// turns back into an equal value.
#[async_trait::async_trait]
pub trait ImageSource: fmt::Display {
    fn kind(&self) -> ImageKind;

    fn maximum_instance_count(&self) -> u32;

    fn to_provider_reference(&self) -> ProviderImageReference;

    /// Ask the provider which OS family the image carries. Client failures
    /// come back as [`ImageError::InvalidImage`].
    async fn resolve_os(&self, client: &dyn CloudClient, region: &str)
    -> Result<OsKind, ImageError>;

    fn to_canonical_string(&self) -> String {
        self.to_string()
    }
}

/// A parsed image reference of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageReference {
    Gallery(GalleryImageRef),
    Managed(ManagedImageRef),
    Marketplace(MarketplaceImageRef),
}

impl ImageReference {
    /// Classify `raw` as a resource identifier or, failing that, as a
    /// `publisher:offer:sku:version` marketplace string.
    ///
    /// The two forms are alternatives: a string that parses as an identifier
    /// is never reread as a marketplace string.
    pub fn parse(raw: &str) -> Result<Self, ImageError> {
        match ResourceIdentifier::parse(raw) {
            Ok(id) => Self::from_resource_id(id),
            Err(_) => MarketplaceImageRef::parse(raw).map(ImageReference::Marketplace),
        }
    }

    /// Parse input that has already been validated upstream.
    ///
    /// # Panics
    ///
    /// Panics with the joined error messages when `raw` does not parse.
    pub fn must_parse(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|err| panic!("{}", err.messages().join("; ")))
    }

    fn from_resource_id(id: ResourceIdentifier) -> Result<Self, ImageError> {
        let resource_type = id.resource_type();
        if resource_type.is_gallery_image() {
            Ok(ImageReference::Gallery(GalleryImageRef::from_classified(id)))
        } else if resource_type.is_managed_image() {
            Ok(ImageReference::Managed(ManagedImageRef::from_classified(id)))
        } else {
            Err(ImageError::invalid(format!(
                "unrecognized image resource type '{resource_type}'"
            )))
        }
    }

    fn as_source(&self) -> &(dyn ImageSource + Send + Sync) {
        match self {
            ImageReference::Gallery(r) => r,
            ImageReference::Managed(r) => r,
            ImageReference::Marketplace(r) => r,
        }
    }
}

#[async_trait::async_trait]
impl ImageSource for ImageReference {
    fn kind(&self) -> ImageKind {
        self.as_source().kind()
    }

    fn maximum_instance_count(&self) -> u32 {
        self.as_source().maximum_instance_count()
    }

    fn to_provider_reference(&self) -> ProviderImageReference {
        self.as_source().to_provider_reference()
    }

    async fn resolve_os(
        &self,
        client: &dyn CloudClient,
        region: &str,
    ) -> Result<OsKind, ImageError> {
        self.as_source().resolve_os(client, region).await
    }
}

/// `From<Variant> for ImageReference` and the checked way back.
macro_rules! variant_conversions {
    ($($variant:ident($ty:ty) => $kind:expr),* $(,)?) => {$(
        impl From<$ty> for ImageReference {
            fn from(value: $ty) -> Self {
                ImageReference::$variant(value)
            }
        }

        impl TryFrom<ImageReference> for $ty {
            type Error = ImageError;

            fn try_from(value: ImageReference) -> Result<Self, Self::Error> {
                match value {
                    ImageReference::$variant(inner) => Ok(inner),
                    other => Err(ImageError::invalid(format!(
                        "expected a {} reference, found a {} reference: '{}'",
                        $kind,
                        other.kind(),
                        other
                    ))),
                }
            }
        }
    )*};
}

variant_conversions! {
    Gallery(GalleryImageRef) => ImageKind::Gallery,
    Managed(ManagedImageRef) => ImageKind::Managed,
    Marketplace(MarketplaceImageRef) => ImageKind::Marketplace,
}
