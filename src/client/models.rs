use serde::{Deserialize, Serialize};

/// Properties of a gallery image definition that the resolver reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageMetadata {
    #[serde(default)]
    pub os_type: Option<String>,
}

/// Properties of a managed image; the OS lives on the OS disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedImageMetadata {
    #[serde(default)]
    pub storage_profile: StorageProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default)]
    pub os_disk: OsDisk,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default)]
    pub os_type: Option<String>,
}

impl ManagedImageMetadata {
    pub fn os_type(&self) -> Option<&str> {
        self.storage_profile.os_disk.os_type.as_deref()
    }
}

/// One entry of a marketplace version listing. Only `name` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceImageVersion {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl MarketplaceImageVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceImageMetadata {
    #[serde(default)]
    pub os_disk_image: OsDiskImage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDiskImage {
    #[serde(default)]
    pub operating_system: String,
}

/// Every ARM resource nests the interesting fields under `properties`.
#[derive(Debug, Deserialize)]
pub(crate) struct ResourceEnvelope<T> {
    pub(crate) properties: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) message: String,
}
