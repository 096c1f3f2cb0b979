//! Supported-policy resolution.
//!
//! Classifies a package's declared dependencies against the policy
//! directory: which are registered policies at a registered version,
//! which are registered policies lacking that exact version, and which
//! are ordinary npm dependencies the registry does not track.
//!
//! Lookups are batch-shaped: one directory query per collection, never
//! one per dependency.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use vincent_store::PolicyDirectory;

use crate::error::ImportResult;
use crate::npm::DependencyMap;

/// Version-specifier characters that denote a range. A dependency whose
/// specifier contains any of these cannot name one registered policy
/// version and is excluded from resolution entirely.
const RANGE_MARKERS: &[char] = &['^', '~', '*', '>', '<'];

/// Outcome of classifying a dependency map.
///
/// A dependency name appears in at most one of the two collections. The
/// order of `policies_not_in_registry` follows dependency iteration
/// order and is not a stable contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyResolution {
    /// Registered policies whose exact declared version is registered:
    /// name → version.
    pub supported_policies: BTreeMap<String, String>,
    /// Registered policies declared at a version the registry does not
    /// know, as `"name@version"` strings.
    pub policies_not_in_registry: Vec<String>,
}

/// Whether a version specifier denotes exactly one version.
fn is_explicit_specifier(specifier: &str) -> bool {
    !specifier.contains(RANGE_MARKERS)
}

/// Classify `dependencies` against the policy directory.
///
/// Dependencies with range specifiers are silently excluded from both
/// outputs, as are dependencies with no policy record at all. When
/// nothing is left to look up, the directory is not queried.
///
/// # Errors
///
/// Propagates directory read failures unchanged.
pub async fn identify_supported_policies(
    dependencies: &DependencyMap,
    directory: &dyn PolicyDirectory,
) -> ImportResult<PolicyResolution> {
    let explicit: Vec<(&String, &String)> = dependencies
        .iter()
        .filter(|(_, specifier)| is_explicit_specifier(specifier))
        .collect();

    if explicit.is_empty() {
        return Ok(PolicyResolution::default());
    }

    let names: Vec<String> = explicit.iter().map(|(name, _)| (*name).clone()).collect();
    let policies = directory.find_policies(&names).await?;
    if policies.is_empty() {
        return Ok(PolicyResolution::default());
    }

    let registered: HashSet<&str> = policies
        .iter()
        .map(|record| record.package_name.as_str())
        .collect();

    let candidates: Vec<(String, String)> = explicit
        .iter()
        .filter(|(name, _)| registered.contains(name.as_str()))
        .map(|(name, version)| ((*name).clone(), (*version).clone()))
        .collect();

    let version_records = directory.find_policy_versions(&candidates).await?;
    let known_versions: HashSet<(&str, &str)> = version_records
        .iter()
        .map(|record| (record.package_name.as_str(), record.version.as_str()))
        .collect();

    let mut resolution = PolicyResolution::default();
    for (name, version) in &candidates {
        if known_versions.contains(&(name.as_str(), version.as_str())) {
            resolution
                .supported_policies
                .insert(name.clone(), version.clone());
        } else {
            resolution
                .policies_not_in_registry
                .push(format!("{name}@{version}"));
        }
    }

    debug!(
        supported = resolution.supported_policies.len(),
        unregistered_versions = resolution.policies_not_in_registry.len(),
        "resolved dependency map against policy directory"
    );
    Ok(resolution)
}
