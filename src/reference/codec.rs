//! String and serde forms of image references.
//!
//! References travel as their canonical string, both as plain text and as a
//! bare JSON string. Decoding into a specific variant fails when the string
//! parses to a different kind of reference.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

use super::{GalleryImageRef, ImageReference, ManagedImageRef, MarketplaceImageRef};
use crate::error::ImageError;

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::Gallery(r) => fmt::Display::fmt(r, f),
            ImageReference::Managed(r) => fmt::Display::fmt(r, f),
            ImageReference::Marketplace(r) => fmt::Display::fmt(r, f),
        }
    }
}

impl FromStr for ImageReference {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageReference::parse(s)
    }
}

impl TryFrom<&str> for ImageReference {
    type Error = ImageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ImageReference::parse(value)
    }
}

fn deserialize_reference<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ImageReference, D::Error> {
    let raw = String::deserialize(deserializer)?;
    ImageReference::parse(&raw).map_err(|err| de::Error::custom(err.first_message()))
}

impl Serialize for ImageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImageReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_reference(deserializer)
    }
}

macro_rules! variant_serde {
    ($($ty:ty),* $(,)?) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let reference = deserialize_reference(deserializer)?;
                <$ty>::try_from(reference).map_err(|err| de::Error::custom(err.first_message()))
            }
        }
    )*};
}

variant_serde!(GalleryImageRef, ManagedImageRef, MarketplaceImageRef);
