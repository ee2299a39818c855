use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ImageError;

/// Guest operating system family of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsKind {
    Linux,
    Windows,
}

impl OsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsKind::Linux => "Linux",
            OsKind::Windows => "Windows",
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider payloads are not consistent about casing (`Linux`, `linux`), so
/// matching ignores it. Anything else is a malformed response.
impl FromStr for OsKind {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [OsKind::Linux, OsKind::Windows]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ImageError::UnrecognizedOsType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::OsKind;
    use crate::error::ImageError;

    #[test]
    fn parse_ignores_case() {
        assert_eq!("Linux".parse::<OsKind>(), Ok(OsKind::Linux));
        assert_eq!("linux".parse::<OsKind>(), Ok(OsKind::Linux));
        assert_eq!("WINDOWS".parse::<OsKind>(), Ok(OsKind::Windows));
    }

    #[test]
    fn parse_rejects_unknown_families() {
        assert_eq!(
            "Solaris".parse::<OsKind>(),
            Err(ImageError::UnrecognizedOsType("Solaris".to_string()))
        );
        assert!("".parse::<OsKind>().is_err());
    }
}
