//! npm registry access: packument types and the HTTP client.

pub mod client;
pub mod types;

pub use client::RegistryClient;
pub use types::{
    DependencyMap, DistInfo, NormalizedPackage, Packument, Person, Repository, VersionInfo,
};
