use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

/// Fully qualified type of a shared image gallery image definition.
pub const GALLERY_IMAGE_TYPE: &str = "Microsoft.Compute/galleries/images";
/// Fully qualified type of a managed (custom) image.
pub const MANAGED_IMAGE_TYPE: &str = "Microsoft.Compute/images";

const SUBSCRIPTIONS_TYPE: &str = "Microsoft.Resources/subscriptions";
const RESOURCE_GROUPS_TYPE: &str = "Microsoft.Resources/resourceGroups";
const LOCATIONS_TYPE: &str = "Microsoft.Resources/locations";
const PROVIDERS_KEY: &str = "providers";
const LOCATIONS_KEY: &str = "locations";

fn scope_regex() -> &'static Regex {
    static SCOPE_RE: OnceLock<Regex> = OnceLock::new();
    SCOPE_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:/subscriptions/(?P<sub>[^/]+)(?:/resourcegroups/(?P<rg>[^/]+))?)?(?P<rest>(?:/[^/]*)*)$",
        )
        .expect("invalid resource identifier scope regex")
    })
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource identifier is empty")]
    Empty,
    #[error("resource identifier '{0}' must start with '/'")]
    NotRooted(String),
    #[error("resource identifier '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("resource identifier '{id}' has unexpected segment '{segment}'")]
    UnexpectedSegment { id: String, segment: String },
    #[error("resource identifier '{0}' names a provider without a namespace")]
    MissingNamespace(String),
    #[error("resource identifier '{id}' has no name for resource type '{resource_type}'")]
    MissingName { id: String, resource_type: String },
}

/// Declared type of a resource, e.g. `Microsoft.Compute/galleries/images`.
///
/// Comparison is case-insensitive, matching how the provider treats types.
#[derive(Debug, Clone)]
pub struct ResourceType {
    namespace: String,
    types: Vec<String>,
}

impl ResourceType {
    fn new(namespace: &str, types: Vec<String>) -> Self {
        Self {
            namespace: namespace.to_string(),
            types,
        }
    }

    fn from_full_name(full: &str) -> Self {
        let mut parts = full.split('/');
        let namespace = parts.next().unwrap_or_default();
        Self::new(namespace, parts.map(str::to_string).collect())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The last type segment, e.g. `images` for `Microsoft.Compute/galleries/images`.
    pub fn short_name(&self) -> &str {
        self.types.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is(&self, full_name: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(full_name)
    }

    pub fn is_gallery_image(&self) -> bool {
        self.is(GALLERY_IMAGE_TYPE)
    }

    pub fn is_managed_image(&self) -> bool {
        self.is(MANAGED_IMAGE_TYPE)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace)?;
        for ty in &self.types {
            write!(f, "/{ty}")?;
        }
        Ok(())
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq_ignore_ascii_case(&other.to_string())
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().to_ascii_lowercase().hash(state);
    }
}

/// Structured provider resource path:
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{child}/{name}]*`.
///
/// The original string is kept verbatim so that `Display` reproduces exactly
/// what was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    raw: String,
    subscription_id: Option<String>,
    resource_group: Option<String>,
    resource_type: ResourceType,
    name: String,
}

impl ResourceIdentifier {
    pub fn parse(raw: &str) -> Result<Self, ResourceIdError> {
        if raw.is_empty() {
            return Err(ResourceIdError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(ResourceIdError::NotRooted(raw.to_string()));
        }

        let caps = scope_regex()
            .captures(raw)
            .ok_or_else(|| ResourceIdError::NotRooted(raw.to_string()))?;
        let subscription_id = caps.name("sub").map(|m| m.as_str().to_string());
        let resource_group = caps.name("rg").map(|m| m.as_str().to_string());
        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or_default();

        let segments: Vec<&str> = rest.split('/').skip(1).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResourceIdError::EmptySegment(raw.to_string()));
        }

        // Scope-only identifiers: the subscription or the resource group itself.
        if segments.is_empty() {
            let (name, resource_type) = match (subscription_id.clone(), resource_group.clone()) {
                (Some(_), Some(rg)) => (rg, RESOURCE_GROUPS_TYPE),
                (Some(sub), None) => (sub, SUBSCRIPTIONS_TYPE),
                _ => return Err(ResourceIdError::Empty),
            };
            return Ok(Self {
                raw: raw.to_string(),
                subscription_id,
                resource_group,
                resource_type: ResourceType::from_full_name(resource_type),
                name,
            });
        }

        // Subscription-level location: `/subscriptions/{sub}/locations/{name}`.
        if let [key, location] = segments.as_slice() {
            if key.eq_ignore_ascii_case(LOCATIONS_KEY)
                && subscription_id.is_some()
                && resource_group.is_none()
            {
                let name = location.to_string();
                return Ok(Self {
                    raw: raw.to_string(),
                    subscription_id,
                    resource_group,
                    resource_type: ResourceType::from_full_name(LOCATIONS_TYPE),
                    name,
                });
            }
        }

        let (resource_type, name) = Self::walk_provider_segments(raw, &segments)?;

        Ok(Self {
            raw: raw.to_string(),
            subscription_id,
            resource_group,
            resource_type,
            name,
        })
    }

    /// Walks `providers/{namespace}/{type}/{name}...` pairs. A nested
    /// `providers` segment starts an extension resource with its own namespace.
    fn walk_provider_segments(
        raw: &str,
        segments: &[&str],
    ) -> Result<(ResourceType, String), ResourceIdError> {
        let mut namespace: Option<&str> = None;
        let mut types: Vec<String> = Vec::new();
        let mut name: Option<&str> = None;

        let mut idx = 0;
        while idx < segments.len() {
            let segment = segments[idx];

            if segment.eq_ignore_ascii_case(PROVIDERS_KEY) {
                let ns = segments
                    .get(idx + 1)
                    .ok_or_else(|| ResourceIdError::MissingNamespace(raw.to_string()))?;
                namespace = Some(*ns);
                types.clear();
                name = None;
                idx += 2;
                continue;
            }

            let Some(ns) = namespace else {
                return Err(ResourceIdError::UnexpectedSegment {
                    id: raw.to_string(),
                    segment: segment.to_string(),
                });
            };

            let Some(resource_name) = segments.get(idx + 1) else {
                return Err(ResourceIdError::MissingName {
                    id: raw.to_string(),
                    resource_type: format!("{ns}/{segment}"),
                });
            };

            types.push(segment.to_string());
            name = Some(*resource_name);
            idx += 2;
        }

        match (namespace, name) {
            (Some(ns), Some(name)) => Ok((ResourceType::new(ns, types), name.to_string())),
            (Some(ns), None) => Err(ResourceIdError::MissingName {
                id: raw.to_string(),
                resource_type: ns.to_string(),
            }),
            (None, _) => Err(ResourceIdError::MissingNamespace(raw.to_string())),
        }
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref()
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segments without the leading empty one, used to build request URLs.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('/').skip(1)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ResourceIdentifier {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ResourceIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ResourceIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}
