use std::fmt;
use tracing::debug;

use super::{CUSTOM_IMAGE_MAX_INSTANCES, ImageKind, ImageSource, ProviderImageReference};
use crate::client::CloudClient;
use crate::error::{ImageError, NO_OS_TYPE};
use crate::os::OsKind;
use crate::resource_id::ResourceIdentifier;

/// A managed (custom) image, named by its resource id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedImageRef {
    id: ResourceIdentifier,
}

impl ManagedImageRef {
    pub(crate) fn from_classified(id: ResourceIdentifier) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &ResourceIdentifier {
        &self.id
    }
}

impl TryFrom<ResourceIdentifier> for ManagedImageRef {
    type Error = ImageError;

    fn try_from(id: ResourceIdentifier) -> Result<Self, Self::Error> {
        if id.resource_type().is_managed_image() {
            Ok(Self::from_classified(id))
        } else {
            Err(ImageError::invalid(format!(
                "resource '{id}' is a {}, not a managed image",
                id.resource_type()
            )))
        }
    }
}

impl fmt::Display for ManagedImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

#[async_trait::async_trait]
impl ImageSource for ManagedImageRef {
    fn kind(&self) -> ImageKind {
        ImageKind::Managed
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
        debug!(image = %self.id, region, "resolving managed image OS");

        let metadata = client
            .managed_image(&self.id)
            .await
            .map_err(ImageError::from_client)?;

        metadata
            .os_type()
            .ok_or_else(|| ImageError::invalid(NO_OS_TYPE))?
            .parse()
    }
}
