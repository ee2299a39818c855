use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::models::{ErrorEnvelope, ResourceEnvelope};
use super::{
    CloudClient, GalleryImageMetadata, ManagedImageMetadata, MarketplaceImageMetadata,
    MarketplaceImageVersion, MarketplaceQuery,
};
use crate::endpoints::Endpoint;
use crate::resource_id::ResourceIdentifier;

const USER_AGENT: &str = concat!("cloud-image-refs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `api-version` query values, one per resource family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersions {
    pub gallery_images: String,
    pub images: String,
    pub marketplace: String,
}

impl Default for ApiVersions {
    fn default() -> Self {
        Self {
            gallery_images: "2022-03-03".to_string(),
            images: "2023-09-01".to_string(),
            marketplace: "2023-09-01".to_string(),
        }
    }
}

impl ApiVersions {
    /// Take overrides from the endpoint's parameters, keeping defaults for
    /// anything not configured.
    pub fn from_endpoint(endpoint: &Endpoint) -> Self {
        let defaults = Self::default();
        let pick = |key: &str, fallback: String| {
            endpoint
                .parameter(key)
                .map(str::to_string)
                .unwrap_or(fallback)
        };

        Self {
            gallery_images: pick("gallery_images_api_version", defaults.gallery_images),
            images: pick("images_api_version", defaults.images),
            marketplace: pick("marketplace_api_version", defaults.marketplace),
        }
    }
}

/// [`CloudClient`] over the Azure Resource Manager REST API.
///
/// The bearer token is supplied by the caller and sent as-is.
pub struct ArmClient {
    http: Client,
    base: Url,
    subscription_id: String,
    token: String,
    api_versions: ApiVersions,
}

impl ArmClient {
    pub fn new(base_url: &str, subscription_id: &str, token: &str) -> Result<Self> {
        Self::build(base_url, subscription_id, token, DEFAULT_TIMEOUT)
    }

    pub fn from_endpoint(endpoint: &Endpoint, subscription_id: &str, token: &str) -> Result<Self> {
        let timeout = endpoint.timeout()?.unwrap_or(DEFAULT_TIMEOUT);
        let client = Self::build(endpoint.url(), subscription_id, token, timeout)?;
        Ok(client.with_api_versions(ApiVersions::from_endpoint(endpoint)))
    }

    fn build(base_url: &str, subscription_id: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("parse management URL {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("management URL '{base_url}' cannot be used as a base");
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            http,
            base,
            subscription_id: subscription_id.to_string(),
            token: token.to_string(),
            api_versions: ApiVersions::default(),
        })
    }

    pub fn with_api_versions(mut self, api_versions: ApiVersions) -> Self {
        self.api_versions = api_versions;
        self
    }

    pub fn api_versions(&self) -> &ApiVersions {
        &self.api_versions
    }

    /// Append path segments (percent-encoded) and the `api-version` query.
    fn url_for<'s>(
        &self,
        segments: impl IntoIterator<Item = &'s str>,
        api_version: &str,
    ) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("management URL '{}' cannot be used as a base", self.base))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn marketplace_url(&self, query: &MarketplaceQuery<'_>, version: Option<&str>) -> Result<Url> {
        let mut segments = vec![
            "subscriptions",
            self.subscription_id.as_str(),
            "providers",
            "Microsoft.Compute",
            "locations",
            query.region,
            "publishers",
            query.publisher,
            "artifacttypes",
            "vmimage",
            "offers",
            query.offer,
            "skus",
            query.sku,
            "versions",
        ];
        if let Some(version) = version {
            segments.push(version);
        }
        self.url_for(segments, &self.api_versions.marketplace)
    }

    async fn list_versions(
        &self,
        query: &MarketplaceQuery<'_>,
        top: u32,
    ) -> Result<Vec<MarketplaceImageVersion>> {
        let mut url = self.marketplace_url(query, None)?;
        url.query_pairs_mut()
            .append_pair("$top", &top.to_string())
            .append_pair("$orderby", "name desc");
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");

        let res = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%url, %status, "request failed");
            return Err(status_error(status, &url, &body));
        }

        res.json::<T>()
            .await
            .with_context(|| format!("decode response from {url}"))
    }
}

/// Error for a non-success response. The provider's `code: message` pair is
/// appended when the body is an error envelope.
fn status_error(status: StatusCode, url: &Url, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => anyhow!(
            "HTTP {status} for {url}: {}: {}",
            envelope.error.code,
            envelope.error.message
        ),
        Err(_) => anyhow!("HTTP {status} for {url}"),
    }
}

#[async_trait::async_trait]
impl CloudClient for ArmClient {
    async fn gallery_image(&self, id: &ResourceIdentifier) -> Result<GalleryImageMetadata> {
        let url = self.url_for(id.segments(), &self.api_versions.gallery_images)?;
        let envelope: ResourceEnvelope<GalleryImageMetadata> = self.get_json(url).await?;
        Ok(envelope.properties)
    }

    async fn managed_image(&self, id: &ResourceIdentifier) -> Result<ManagedImageMetadata> {
        let url = self.url_for(id.segments(), &self.api_versions.images)?;
        let envelope: ResourceEnvelope<ManagedImageMetadata> = self.get_json(url).await?;
        Ok(envelope.properties)
    }

    fn marketplace_image_versions<'a>(
        &'a self,
        query: &'a MarketplaceQuery<'a>,
        top: u32,
    ) -> BoxStream<'a, Result<MarketplaceImageVersion>> {
        stream::once(self.list_versions(query, top))
            .map_ok(|versions| stream::iter(versions.into_iter().map(Ok::<_, anyhow::Error>)))
            .try_flatten()
            .boxed()
    }

    async fn marketplace_image(
        &self,
        query: &MarketplaceQuery<'_>,
        version: &str,
    ) -> Result<MarketplaceImageMetadata> {
        let url = self.marketplace_url(query, Some(version))?;
        let envelope: ResourceEnvelope<MarketplaceImageMetadata> = self.get_json(url).await?;
        Ok(envelope.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiVersions, ArmClient, status_error};
    use crate::client::{CloudClient, MarketplaceQuery};
    use crate::endpoints;
    use crate::resource_id::ResourceIdentifier;
    use futures::StreamExt;
    use reqwest::StatusCode;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use url::Url;

    const BASE: &str = "https://management.azure.com/";

    fn query() -> MarketplaceQuery<'static> {
        MarketplaceQuery {
            region: "westeurope",
            publisher: "Canonical",
            offer: "UbuntuServer",
            sku: "18.04-LTS",
        }
    }

    async fn read_request_head(socket: &mut TcpStream) -> String {
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&head).into_owned()
    }

    /// Answer a single request with `status` and a JSON `body`, returning the
    /// request head that was received.
    async fn serve_once(
        listener: TcpListener,
        status: &'static str,
        body: &'static str,
    ) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let head = read_request_head(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        head
    }

    async fn local_client() -> (TcpListener, ArmClient, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/", listener.local_addr().unwrap());
        // Built by hand so a proxy configured in the environment is not used.
        let client = ArmClient {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            base: Url::parse(&base).unwrap(),
            subscription_id: "sub".to_string(),
            token: "token".to_string(),
            api_versions: ApiVersions::default(),
        };
        (listener, client, base)
    }

    #[test]
    fn status_error_appends_the_provider_error() {
        let url = Url::parse("https://management.azure.com/x?api-version=1").unwrap();
        let err = status_error(
            StatusCode::NOT_FOUND,
            &url,
            r#"{ "error": { "code": "ImageNotFound", "message": "The image was not found." } }"#,
        );

        assert_eq!(
            err.to_string(),
            "HTTP 404 Not Found for https://management.azure.com/x?api-version=1: ImageNotFound: The image was not found."
        );
    }

    #[test]
    fn status_error_without_an_envelope_names_status_and_url() {
        let url = Url::parse("https://management.azure.com/x?api-version=1").unwrap();

        for body in ["", "<html>gateway timeout</html>", r#"{ "message": "nope" }"#] {
            let err = status_error(StatusCode::GATEWAY_TIMEOUT, &url, body);
            assert_eq!(
                err.to_string(),
                "HTTP 504 Gateway Timeout for https://management.azure.com/x?api-version=1"
            );
        }
    }

    #[tokio::test]
    async fn failed_lookups_carry_the_provider_error() {
        let (listener, client, base) = local_client().await;
        let server = tokio::spawn(serve_once(
            listener,
            "404 Not Found",
            r#"{ "error": { "code": "NotFound", "message": "Image 'img' was not found." } }"#,
        ));
        let id = ResourceIdentifier::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/images/img",
        )
        .unwrap();

        let err = client.managed_image(&id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "HTTP 404 Not Found for {base}subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/images/img?api-version=2023-09-01: NotFound: Image 'img' was not found."
            )
        );

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /subscriptions/sub/resourceGroups/rg/"));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer token"));
    }

    #[tokio::test]
    async fn version_listing_waits_for_the_first_poll() {
        let (listener, client, _) = local_client().await;
        let query = query();
        let mut versions = client.marketplace_image_versions(&query, 1);

        let idle = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(idle.is_err(), "a request was sent before the stream was polled");

        let server = tokio::spawn(serve_once(
            listener,
            "200 OK",
            r#"[{ "name": "18.04.202401161", "location": "westeurope" }]"#,
        ));

        let newest = versions.next().await.unwrap().unwrap();
        assert_eq!(newest.name, "18.04.202401161");
        assert!(versions.next().await.is_none());

        let head = server.await.unwrap();
        assert!(head.starts_with(
            "GET /subscriptions/sub/providers/Microsoft.Compute/locations/westeurope/publishers/Canonical/artifacttypes/vmimage/offers/UbuntuServer/skus/18.04-LTS/versions?"
        ));
        assert!(head.contains("top=1"));
    }

    #[test]
    fn resource_urls_follow_the_identifier() {
        let client = ArmClient::new(BASE, "sub", "token").unwrap();
        let id = ResourceIdentifier::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/galleries/g/images/ubuntu",
        )
        .unwrap();

        let url = client.url_for(id.segments(), "2022-03-03").unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/galleries/g/images/ubuntu?api-version=2022-03-03"
        );
    }

    #[test]
    fn marketplace_urls_include_location_and_version() {
        let client = ArmClient::new(BASE, "sub", "token").unwrap();

        let listing = client.marketplace_url(&query(), None).unwrap();
        assert_eq!(
            listing.path(),
            "/subscriptions/sub/providers/Microsoft.Compute/locations/westeurope/publishers/Canonical/artifacttypes/vmimage/offers/UbuntuServer/skus/18.04-LTS/versions"
        );

        let image = client
            .marketplace_url(&query(), Some("18.04.202401161"))
            .unwrap();
        assert!(image.path().ends_with("/versions/18.04.202401161"));
        assert_eq!(image.query(), Some("api-version=2023-09-01"));
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(ArmClient::new("mailto:ops@example.com", "sub", "token").is_err());
        assert!(ArmClient::new("not a url", "sub", "token").is_err());
    }

    #[test]
    fn api_versions_come_from_endpoint_parameters() {
        let parsed = endpoints::parse(
            r#"[{
                "name": "azure",
                "url": "https://management.azure.com/",
                "parameters": { "images_api_version": "2024-03-01", "timeout_secs": "5" }
            }]"#,
        )
        .unwrap();

        let client = ArmClient::from_endpoint(&parsed[0], "sub", "token").unwrap();
        assert_eq!(
            client.api_versions(),
            &ApiVersions {
                images: "2024-03-01".to_string(),
                ..ApiVersions::default()
            }
        );
    }
}
