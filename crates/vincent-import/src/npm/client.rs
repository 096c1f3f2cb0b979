//! npm registry HTTP client.
//!
//! Fetches packuments and tarballs directly over HTTP; no package-manager
//! CLI is spawned, which keeps lifecycle scripts out of the process
//! entirely. Redirects are never followed automatically: each hop is
//! validated against the configured registry origin before the next
//! request is issued.

use std::time::Duration;

use futures::StreamExt;
use tracing::debug;

use vincent_core::PackageIdentity;

use super::types::{NormalizedPackage, Packument};
use crate::error::{ImportError, ImportResult};

/// Default npm registry URL.
const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Default maximum tarball size (50 MB).
const DEFAULT_MAX_TARBALL_SIZE: u64 = 50 * 1024 * 1024;

/// Default HTTP request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum redirect hops followed when talking to the registry.
const MAX_REDIRECTS: u32 = 10;

/// HTTP client for one npm registry.
pub struct RegistryClient {
    client: reqwest::Client,
    registry_url: String,
    max_tarball_size: u64,
}

impl RegistryClient {
    /// Create a client against the public npm registry with default
    /// timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Registry`] if the HTTP client cannot be
    /// built (e.g. TLS backend unavailable).
    pub fn new() -> ImportResult<Self> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            registry_url: DEFAULT_REGISTRY.to_string(),
            max_tarball_size: DEFAULT_MAX_TARBALL_SIZE,
        })
    }

    /// Point the client at a different registry.
    #[must_use]
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    /// Override the maximum tarball size in bytes.
    #[must_use]
    pub fn with_max_tarball_size(mut self, bytes: u64) -> Self {
        self.max_tarball_size = bytes;
        self
    }

    /// Override the HTTP request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Registry`] if the HTTP client cannot be
    /// rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> ImportResult<Self> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    /// Fetch and normalize the metadata of one published version.
    ///
    /// The full packument is fetched and the entry for the identity's
    /// version selected from it.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::VersionNotFound`] when the packument has no
    /// entry for the requested version, and
    /// [`ImportError::PackageLookupFailed`] for every other failure;
    /// network errors and unknown packages are indistinguishable here.
    pub async fn package_info(
        &self,
        identity: &PackageIdentity,
    ) -> ImportResult<NormalizedPackage> {
        let packument = self
            .fetch_packument(identity.package_name())
            .await
            .map_err(|e| ImportError::PackageLookupFailed {
                message: e.to_string(),
            })?;

        let info = packument.versions.get(identity.version()).cloned().ok_or_else(|| {
            ImportError::VersionNotFound {
                package: identity.package_name().to_string(),
                version: identity.version().to_string(),
            }
        })?;

        Ok(info.normalize())
    }

    /// Fetch the full packument for a package name.
    async fn fetch_packument(&self, package_name: &str) -> ImportResult<Packument> {
        let url = format!("{}/{}", self.registry_url, registry_path(package_name));
        debug!(url = %url, "fetching packument");

        let response = self.get_with_validated_redirects(&url, "packument").await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Registry {
                message: format!("registry returned {status} for {package_name}"),
            });
        }

        response
            .json::<Packument>()
            .await
            .map_err(|e| ImportError::Registry {
                message: format!("failed to parse registry response: {e}"),
            })
    }

    /// Download a tarball into memory, enforcing the size ceiling while
    /// streaming.
    pub(crate) async fn download_tarball(
        &self,
        url: &str,
        package: &str,
    ) -> ImportResult<Vec<u8>> {
        debug!(url = %url, package = %package, "downloading tarball");

        let response = self.get_with_validated_redirects(url, package).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Registry {
                message: format!("tarball download failed with status {status} for {package}"),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_tarball_size {
                return Err(ImportError::PackageTooLarge {
                    size: content_length,
                    limit: self.max_tarball_size,
                });
            }
        }

        // The running counter guards against bodies longer than their
        // declared Content-Length, and against a missing header.
        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ImportError::Registry {
                message: format!("failed to read tarball body for {package}: {e}"),
            })?;

            downloaded = downloaded.saturating_add(chunk.len() as u64);
            if downloaded > self.max_tarball_size {
                return Err(ImportError::PackageTooLarge {
                    size: downloaded,
                    limit: self.max_tarball_size,
                });
            }

            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer)
    }

    /// Require HTTPS and the registry's host/port for every URL touched.
    fn validate_registry_origin(&self, target: &str) -> ImportResult<()> {
        let target_url = url::Url::parse(target).map_err(|e| ImportError::UrlBlocked {
            url: format!("{target} (parse error: {e})"),
        })?;

        if target_url.scheme() != "https" {
            return Err(ImportError::UrlBlocked {
                url: target.to_string(),
            });
        }

        let registry = url::Url::parse(&self.registry_url).map_err(|e| ImportError::Registry {
            message: format!("invalid registry URL: {e}"),
        })?;

        if target_url.host_str() != registry.host_str()
            || target_url.port_or_known_default() != registry.port_or_known_default()
        {
            return Err(ImportError::UrlBlocked {
                url: target.to_string(),
            });
        }

        Ok(())
    }

    /// GET with manual redirect handling; every hop is origin-validated
    /// before it is followed.
    async fn get_with_validated_redirects(
        &self,
        url: &str,
        context: &str,
    ) -> ImportResult<reqwest::Response> {
        self.validate_registry_origin(url)?;

        let mut current_url = url.to_string();

        for _ in 0..MAX_REDIRECTS {
            let response =
                self.client
                    .get(&current_url)
                    .send()
                    .await
                    .map_err(|e| ImportError::Registry {
                        message: format!("failed to fetch {context}: {e}"),
                    })?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| ImportError::Registry {
                        message: format!("redirect without Location header for {context}"),
                    })?;

                let next_url = url::Url::parse(&current_url)
                    .and_then(|base| base.join(location))
                    .map_err(|e| ImportError::UrlBlocked {
                        url: format!("{location} (parse error: {e})"),
                    })?;

                self.validate_registry_origin(next_url.as_str())?;
                debug!(redirect = %next_url, context, "following validated redirect");
                current_url = next_url.into();
                continue;
            }

            return Ok(response);
        }

        Err(ImportError::Registry {
            message: format!("too many redirects for {context}"),
        })
    }
}

/// Build the underlying HTTP client. Automatic redirects are disabled so
/// every hop passes origin validation.
fn build_http_client(timeout: Duration) -> ImportResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("vincent-import/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ImportError::Registry {
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// URL path segment for a package name.
///
/// Scoped names keep the leading `@` and encode the separating slash as
/// `%2F`; every component is percent-encoded besides that.
fn registry_path(package_name: &str) -> String {
    match package_name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, name)) => {
            format!("@{}%2F{}", percent_encode(scope), percent_encode(name))
        },
        None => percent_encode(package_name),
    }
}

/// Percent-encode a URL path component.
fn percent_encode(component: &str) -> String {
    let mut encoded = String::with_capacity(component.len());
    for byte in component.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            use std::fmt::Write;
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}
