//! Parse and resolve VM image references for Azure compute.
//!
//! An image can be named three ways:
//!
//! - a shared image gallery image id,
//!   `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/galleries/{g}/images/{name}`
//! - a managed image id,
//!   `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/images/{name}`
//! - a marketplace image, `publisher:offer:sku:version` (`version` may be `latest`)
//!
//! [`ImageReference::parse`] classifies a string into one of those, and the
//! [`ImageSource`] trait answers questions about it without the caller caring
//! which form was used.
//!
//! ```ignore
//! use cloud_image_refs::{ImageReference, ImageSource, client::ArmClient};
//!
//! let image = ImageReference::parse("Canonical:UbuntuServer:18.04-LTS:latest")?;
//! assert_eq!(image.maximum_instance_count(), 1000);
//!
//! let client = ArmClient::new("https://management.azure.com/", subscription, token)?;
//! let os = image.resolve_os(&client, "westeurope").await?;
//! ```

pub mod client;
pub mod endpoints;
mod error;
mod os;
pub mod reference;
pub mod resource_id;

pub use client::CloudClient;
pub use error::ImageError;
pub use os::OsKind;
pub use reference::{
    CUSTOM_IMAGE_MAX_INSTANCES, GalleryImageRef, ImageKind, ImageReference, ImageSource,
    MARKETPLACE_IMAGE_MAX_INSTANCES, ManagedImageRef, MarketplaceImageRef, ProviderImageReference,
};
pub use resource_id::{ResourceIdError, ResourceIdentifier, ResourceType};
