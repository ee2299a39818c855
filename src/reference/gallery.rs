use std::fmt;
use tracing::debug;

use super::{CUSTOM_IMAGE_MAX_INSTANCES, ImageKind, ImageSource, ProviderImageReference};
use crate::client::CloudClient;
use crate::error::{ImageError, NO_OS_TYPE};
use crate::os::OsKind;
use crate::resource_id::ResourceIdentifier;

/// An image definition in a shared image gallery, named by its resource id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GalleryImageRef {
    id: ResourceIdentifier,
}

impl GalleryImageRef {
    /// Caller has already checked that `id` is a gallery image.
    pub(crate) fn from_classified(id: ResourceIdentifier) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &ResourceIdentifier {
        &self.id
    }
}

impl TryFrom<ResourceIdentifier> for GalleryImageRef {
    type Error = ImageError;

    fn try_from(id: ResourceIdentifier) -> Result<Self, Self::Error> {
        if id.resource_type().is_gallery_image() {
            Ok(Self::from_classified(id))
        } else {
            Err(ImageError::invalid(format!(
                "resource '{id}' is a {}, not a gallery image",
                id.resource_type()
            )))
        }
    }
}

impl fmt::Display for GalleryImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

#[async_trait::async_trait]
impl ImageSource for GalleryImageRef {
    fn kind(&self) -> ImageKind {
        ImageKind::Gallery
    }

    fn maximum_instance_count(&self) -> u32 {
        CUSTOM_IMAGE_MAX_INSTANCES
    }

    fn to_provider_reference(&self) -> ProviderImageReference {
        ProviderImageReference::Id {
            id: self.id.clone(),
        }
    }

    async fn resolve_os(
        &self,
        client: &dyn CloudClient,
        region: &str,
    ) -> Result<OsKind, ImageError> {
        debug!(image = %self.id, region, "resolving gallery image OS");

        let metadata = client
            .gallery_image(&self.id)
            .await
            .map_err(ImageError::from_client)?;
        let os_type = metadata
            .os_type
            .ok_or_else(|| ImageError::invalid(NO_OS_TYPE))?;

        os_type.parse()
    }
}
