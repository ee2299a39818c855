/// Message used when the provider returns an image without an OS type.
pub(crate) const NO_OS_TYPE: &str = "specified image had no OS type";

/// Errors surfaced while parsing or resolving an image reference.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The reference is malformed, names an unsupported resource, or the
    /// provider could not describe it. Carries one or more messages.
    #[error("invalid image: {}", .0.join("; "))]
    InvalidImage(Vec<String>),
    /// The provider reported an operating system family we do not model.
    #[error("unrecognized operating system type '{0}'")]
    UnrecognizedOsType(String),
}

impl ImageError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ImageError::InvalidImage(vec![message.into()])
    }

    /// Wrap a cloud client failure, keeping the whole context chain.
    pub(crate) fn from_client(err: anyhow::Error) -> Self {
        ImageError::invalid(format!("{err:#}"))
    }

    pub fn messages(&self) -> Vec<String> {
        match self {
            ImageError::InvalidImage(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn first_message(&self) -> String {
        self.messages().into_iter().next().unwrap_or_default()
    }
}
