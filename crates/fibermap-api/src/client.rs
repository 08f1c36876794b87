// Inventory service HTTP client
//
// Wraps `reqwest::Client` with URL construction, token auth, and status
// mapping. Endpoint groups (devices, cables) are implemented as inherent
// methods in separate files to keep this module focused on transport.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body shape used by the service: `{"detail": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Raw HTTP client for the inventory service.
///
/// All paths are resolved relative to `base_url`, which always ends in a
/// slash (e.g. `https://inventory.example.net/api/topology/`).
#[derive(Debug, Clone)]
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl InventoryClient {
    /// Create a client that authenticates every request with `token`.
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .map_err(|_| Error::Authentication {
                message: "token contains characters not allowed in a header".into(),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve `path` (e.g. `cables/12/`) against the base URL.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        self.parse_json(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON answer.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        self.parse_json(resp).await
    }

    /// Send a PATCH request with a JSON body and decode the JSON answer.
    pub(crate) async fn patch<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("PATCH {}", url);

        let resp = self
            .http
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        self.parse_json(resp).await
    }

    /// Send a PATCH request whose answer body is ignored.
    pub(crate) async fn patch_discard(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("PATCH {}", url);

        let resp = self
            .http
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        self.check_status(resp).await.map(drop)
    }

    /// Send a DELETE request.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);

        let resp = self.http.delete(url).send().await.map_err(Error::Transport)?;
        self.check_status(resp).await.map(drop)
    }

    /// Map non-success statuses into typed errors.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let path = resp.url().path().to_owned();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| body[..body.len().min(200)].to_owned());

        trace!(%status, %path, "request rejected");

        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED => Error::Authentication { message },
            reqwest::StatusCode::FORBIDDEN => Error::Forbidden { message },
            reqwest::StatusCode::NOT_FOUND => Error::NotFound { path },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Check the status, then decode the body as JSON.
    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let resp = self.check_status(resp).await?;
        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

/// `Url::join` drops the last segment unless the base ends in `/`.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
