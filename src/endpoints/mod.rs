mod models;

use std::{fs, path::Path, sync::OnceLock};

pub use models::Endpoint;

/// Endpoint list loaded by the first successful `init_from_*` call.
static CACHE: OnceLock<Vec<Endpoint>> = OnceLock::new();

/// Load the endpoint list from a JSON file.
pub fn init_from_file(path: impl AsRef<Path>) -> Result<(), EndpointError> {
    let data = fs::read_to_string(path).map_err(EndpointError::Io)?;
    init_from_json_str(&data)
}

/// Load the endpoint list from JSON text; fails if already loaded.
pub fn init_from_json_str(json: &str) -> Result<(), EndpointError> {
    let parsed = parse(json)?;
    CACHE
        .set(parsed)
        .map_err(|_| EndpointError::AlreadyInitialized)?;
    Ok(())
}

/// Load the endpoint list from the JSON held in env var `var`.
pub fn init_from_env(var: &str) -> Result<(), EndpointError> {
    let s = std::env::var(var).map_err(|_| EndpointError::MissingEnv(var.to_string()))?;
    init_from_json_str(&s)
}

/// Parse endpoint definitions without touching the cache.
pub fn parse(json: &str) -> Result<Vec<Endpoint>, EndpointError> {
    let parsed: Vec<Endpoint> = serde_json::from_str(json).map_err(EndpointError::Json)?;
    if let Some(dup) = parsed
        .iter()
        .enumerate()
        .find(|(idx, e)| parsed[..*idx].iter().any(|prev| prev.name() == e.name()))
        .map(|(_, e)| e.name().to_string())
    {
        return Err(EndpointError::Duplicate(dup));
    }
    Ok(parsed)
}

/// Borrow every configured endpoint.
pub fn all() -> Result<&'static [Endpoint], EndpointError> {
    CACHE
        .get()
        .map(|v| v.as_slice())
        .ok_or(EndpointError::NotInitialized)
}

/// Find by name without cloning.
pub fn by_name(name: &str) -> Result<&'static Endpoint, EndpointError> {
    find(all()?, name)
}

/// Lookup shared by the cache and by callers holding a parsed list.
pub fn find<'a>(endpoints: &'a [Endpoint], name: &str) -> Result<&'a Endpoint, EndpointError> {
    endpoints
        .iter()
        .find(|e| e.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| EndpointError::Unknown(name.to_string()))
}

/// Failures loading or querying the endpoint configuration.
#[derive(thiserror::Error, Debug)]
pub enum EndpointError {
    #[error("endpoints are not initialized")]
    NotInitialized,
    #[error("endpoints already initialized")]
    AlreadyInitialized,
    #[error("missing env var: {0}")]
    MissingEnv(String),
    #[error("unknown endpoint '{0}'")]
    Unknown(String),
    #[error("endpoint '{0}' is defined more than once")]
    Duplicate(String),
    #[error("endpoint '{endpoint}' has invalid {key}: '{value}'")]
    InvalidParameter {
        endpoint: String,
        key: String,
        value: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
