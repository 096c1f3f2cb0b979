//! Package import orchestration.
//!
//! [`TarballImporter::import_package`] is the single entry point for
//! "fetch a package's distributable content and read its generated
//! metadata". Each invocation works inside its own uniquely-named
//! temporary directory, so concurrent imports, even of the identical
//! package and version, never touch each other's files. The directory
//! is removed on every exit path; removal failures are logged and
//! suppressed, never replacing the primary outcome.
//!
//! The tarball itself arrives through the [`TarballSource`] seam: the
//! default [`HttpTarballSource`] resolves the registry's tarball URL and
//! downloads it, and tests substitute a local fake without any network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use vincent_core::contract::{
    IPFS_CID_FIELD, JSON_SCHEMA_FIELD, UI_SCHEMA_FIELD, UI_SCHEMA_PATH,
};
use vincent_core::{PackageIdentity, PackageKind};

use crate::error::{ImportError, ImportResult};
use crate::extract::extract_tarball;
use crate::integrity::verify_integrity;
use crate::npm::RegistryClient;

/// Prefix of per-import temporary directories.
const WORKDIR_PREFIX: &str = "vincent-import-";

/// File name the fetched tarball is stored under inside the work
/// directory.
const TARBALL_FILE_NAME: &str = "package.tgz";

/// Subdirectory of the work directory the tarball is extracted into.
const EXTRACT_DIR_NAME: &str = "extracted";

/// Result of a successful import.
///
/// `ui_schema`/`json_schema` are populated only for policy packages.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    /// Content identifier from the generated metadata file. Always
    /// present and non-empty; an import without it fails outright.
    pub ipfs_cid: String,
    /// Policy input UI schema.
    pub ui_schema: Option<Value>,
    /// Policy input JSON schema.
    pub json_schema: Option<Value>,
}

/// Produces the published tarball of a package version in a caller-owned
/// directory.
///
/// The concrete mechanism (registry HTTP download, package-manager CLI,
/// or a test fake) is the implementation's business; the importer only
/// sees the resulting file path.
#[async_trait]
pub trait TarballSource: Send + Sync {
    /// Fetch the tarball for `identity` into `dest`, returning the path
    /// of the written `.tgz` file.
    ///
    /// # Errors
    ///
    /// Any [`ImportError`]; the importer folds it into its
    /// download/extraction failure surface.
    async fn fetch_tarball(&self, identity: &PackageIdentity, dest: &Path)
        -> ImportResult<PathBuf>;
}

/// [`TarballSource`] backed by the npm registry over HTTP.
///
/// Resolves the packument, validates the advertised tarball URL against
/// the registry origin, streams the download under a size ceiling, and
/// verifies SRI integrity when the registry provides it.
pub struct HttpTarballSource {
    client: RegistryClient,
}

impl HttpTarballSource {
    /// Create a source against the public npm registry.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Registry`] if the HTTP client cannot be
    /// built.
    pub fn new() -> ImportResult<Self> {
        Ok(Self {
            client: RegistryClient::new()?,
        })
    }

    /// Create a source over a pre-configured client.
    #[must_use]
    pub fn with_client(client: RegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TarballSource for HttpTarballSource {
    async fn fetch_tarball(
        &self,
        identity: &PackageIdentity,
        dest: &Path,
    ) -> ImportResult<PathBuf> {
        let info = self.client.package_info(identity).await?;

        let data = self
            .client
            .download_tarball(&info.dist.tarball, identity.package_name())
            .await?;

        match &info.dist.integrity {
            Some(integrity) => {
                debug!(package = %identity, "verifying SRI integrity");
                verify_integrity(&data, integrity, identity.package_name())?;
            },
            None => {
                debug!(package = %identity, "registry provided no integrity hash");
            },
        }

        let path = dest.join(TARBALL_FILE_NAME);
        tokio::fs::write(&path, &data).await?;
        Ok(path)
    }
}

/// Orchestrates fetch, extraction, and metadata validation for one
/// package version.
pub struct TarballImporter {
    source: Arc<dyn TarballSource>,
}

impl TarballImporter {
    /// Create an importer over the default [`HttpTarballSource`].
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Registry`] if the HTTP client cannot be
    /// built.
    pub fn new() -> ImportResult<Self> {
        Ok(Self::with_source(Arc::new(HttpTarballSource::new()?)))
    }

    /// Create an importer over a custom tarball source.
    #[must_use]
    pub fn with_source(source: Arc<dyn TarballSource>) -> Self {
        Self { source }
    }

    /// Import one package version and read its generated metadata.
    ///
    /// For [`PackageKind::Policy`] the UI/JSON schema pair is read as
    /// well; ability imports never touch the schema file.
    ///
    /// # Errors
    ///
    /// [`ImportError::DownloadFailed`] when fetching or extracting the
    /// tarball fails, [`ImportError::MetadataNotFound`] /
    /// [`ImportError::MetadataInvalid`] when the extracted tree violates
    /// the generated-metadata contract.
    pub async fn import_package(
        &self,
        identity: &PackageIdentity,
        kind: PackageKind,
    ) -> ImportResult<PackageMetadata> {
        let workdir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir()
            .map_err(ImportError::Io)?;

        debug!(package = %identity, workdir = %workdir.path().display(), "importing package");
        let result = self.run(identity, kind, workdir.path()).await;

        // Cleanup runs on success and failure alike and must never
        // replace the primary outcome.
        if let Err(e) = workdir.close() {
            warn!(package = %identity, error = %e, "failed to remove import work directory");
        }

        result
    }

    async fn run(
        &self,
        identity: &PackageIdentity,
        kind: PackageKind,
        workdir: &Path,
    ) -> ImportResult<PackageMetadata> {
        let package = identity.to_string();

        let extracted = self
            .fetch_and_extract(identity, workdir)
            .await
            .map_err(|e| ImportError::DownloadFailed {
                package: package.clone(),
                message: e.to_string(),
            })?;

        let metadata = read_generated_metadata(&package, kind, &extracted).await?;

        info!(package = %package, kind = %kind, cid = %metadata.ipfs_cid, "package imported");
        Ok(metadata)
    }

    async fn fetch_and_extract(
        &self,
        identity: &PackageIdentity,
        workdir: &Path,
    ) -> ImportResult<PathBuf> {
        let tarball = self.source.fetch_tarball(identity, workdir).await?;
        let extracted = workdir.join(EXTRACT_DIR_NAME);
        extract_tarball(&tarball, &extracted)?;
        Ok(extracted)
    }
}

/// Read the kind-specific generated metadata (and, for policies, the
/// UI/JSON schema pair) from an extracted package tree.
async fn read_generated_metadata(
    package: &str,
    kind: PackageKind,
    extracted: &Path,
) -> ImportResult<PackageMetadata> {
    let metadata = read_contract_file(package, extracted, kind.metadata_path()).await?;

    let ipfs_cid = metadata
        .get(IPFS_CID_FIELD)
        .and_then(Value::as_str)
        .filter(|cid| !cid.is_empty())
        .ok_or_else(|| ImportError::MetadataInvalid {
            package: package.to_string(),
            message: format!(
                "{} is missing required field '{IPFS_CID_FIELD}'",
                kind.metadata_path()
            ),
        })?
        .to_string();

    let (ui_schema, json_schema) = match kind {
        PackageKind::Ability => (None, None),
        PackageKind::Policy => {
            let schemas = read_contract_file(package, extracted, UI_SCHEMA_PATH).await?;
            let ui = schemas.get(UI_SCHEMA_FIELD).cloned().ok_or_else(|| {
                missing_schema_field(package, UI_SCHEMA_FIELD)
            })?;
            let json = schemas.get(JSON_SCHEMA_FIELD).cloned().ok_or_else(|| {
                missing_schema_field(package, JSON_SCHEMA_FIELD)
            })?;
            (Some(ui), Some(json))
        },
    };

    Ok(PackageMetadata {
        ipfs_cid,
        ui_schema,
        json_schema,
    })
}

/// Read and parse one contract JSON file from the extracted tree.
///
/// An absent file is [`ImportError::MetadataNotFound`]; a present but
/// unreadable or unparseable file is [`ImportError::MetadataInvalid`].
async fn read_contract_file(
    package: &str,
    extracted: &Path,
    relative: &str,
) -> ImportResult<Value> {
    let path = extracted.join(relative);
    if !path.exists() {
        return Err(ImportError::MetadataNotFound {
            package: package.to_string(),
            path: relative.to_string(),
        });
    }

    let raw = tokio::fs::read(&path)
        .await
        .map_err(|e| ImportError::MetadataInvalid {
            package: package.to_string(),
            message: format!("failed to read {relative}: {e}"),
        })?;

    serde_json::from_slice(&raw).map_err(|e| ImportError::MetadataInvalid {
        package: package.to_string(),
        message: format!("failed to parse {relative}: {e}"),
    })
}

fn missing_schema_field(package: &str, field: &str) -> ImportError {
    ImportError::MetadataInvalid {
        package: package.to_string(),
        message: format!("{UI_SCHEMA_PATH} is missing required field '{field}'"),
    }
}
