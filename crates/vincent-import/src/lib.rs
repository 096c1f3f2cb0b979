//! Package import and supported-policy resolution for the Vincent
//! registry.
//!
//! Two independent operations make up this crate:
//!
//! - [`TarballImporter::import_package`]: download a published package
//!   version into an isolated temporary directory, extract it, and read
//!   the build-generated metadata (content identifier, and for policies
//!   the UI/JSON schema pair). The directory is cleaned up on every exit
//!   path.
//! - [`identify_supported_policies`]: classify a package's declared
//!   dependency map against the policy directory with two batched
//!   lookups.
//!
//! Registry metadata for a version (dependencies included) comes from
//! [`RegistryClient::package_info`], which fetches the packument and
//! normalizes conventional `package.json` shorthands.
//!
//! Nothing here retries: every failure propagates to the caller, which
//! owns retry and timeout policy.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
mod extract;
mod integrity;
pub mod import;
pub mod npm;
pub mod resolve;

pub use error::{ImportError, ImportResult};
pub use import::{HttpTarballSource, PackageMetadata, TarballImporter, TarballSource};
pub use npm::{DependencyMap, NormalizedPackage, RegistryClient};
pub use resolve::{PolicyResolution, identify_supported_policies};
