// HTTP transport settings for the inventory client.
//
// The core maps its own TLS setting onto `TlsMode`; everything below the
// client constructor only sees a ready `reqwest::Client`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// How the server certificate is checked.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Platform trust store.
    #[default]
    System,
    /// Trust an extra CA read from a PEM file.
    CustomCa(PathBuf),
    /// Skip verification entirely (lab inventories on self-signed certs).
    DangerAcceptInvalid,
}

/// Settings shared by every request the client makes.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a client that sends `headers` on every request.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fibermap/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        let builder = match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => builder.add_root_certificate(load_ca(path)?),
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        };

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

fn load_ca(path: &Path) -> Result<reqwest::Certificate, Error> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read CA certificate {}: {e}", path.display())))?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| Error::Tls(format!("invalid CA certificate {}: {e}", path.display())))
}
