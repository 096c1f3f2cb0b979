//! Package identity: validated npm name + exact version pairs.
//!
//! Validates names against npm's rules for newly published packages and
//! versions against a strict "explicit semver" rule set: the string must
//! parse, must survive a parse/re-serialize round trip unchanged, and must
//! contain no range operators. Identities are immutable once constructed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contract::{ABILITY_METADATA_PATH, POLICY_METADATA_PATH};
use crate::error::{CoreError, CoreResult};

/// Maximum npm package name length (scope + name combined).
const MAX_PACKAGE_NAME_LENGTH: usize = 214;

/// Names npm refuses for new packages regardless of syntax.
const BLOCKED_NAMES: &[&str] = &["node_modules", "favicon.ico"];

/// Characters that mark a version string as a range rather than an
/// explicit version.
const RANGE_MARKERS: &[char] = &['^', '~', '*', '>', '<', '='];

/// The category of a registrable package.
///
/// The kind decides which generated metadata file an import reads and
/// whether the UI/JSON schema pair is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// An executable ability (tool) package.
    Ability,
    /// A policy package governing ability execution.
    Policy,
}

impl PackageKind {
    /// Relative path of this kind's generated metadata file inside an
    /// extracted package tree.
    #[must_use]
    pub const fn metadata_path(self) -> &'static str {
        match self {
            Self::Ability => ABILITY_METADATA_PATH,
            Self::Policy => POLICY_METADATA_PATH,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ability => write!(f, "ability"),
            Self::Policy => write!(f, "policy"),
        }
    }
}

/// A validated (package name, exact version) pair.
///
/// Construction through [`PackageIdentity::new`] is the only way to obtain
/// one, so holding a `PackageIdentity` is proof both checks passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    package_name: String,
    version: String,
}

impl PackageIdentity {
    /// Validate `name` and `version` and construct the identity.
    ///
    /// The name is checked first so that callers passing two bad inputs
    /// see the name error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPackageName`] or
    /// [`CoreError::InvalidVersion`].
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> CoreResult<Self> {
        let package_name = name.into();
        let version = version.into();
        validate_package_name(&package_name)?;
        validate_exact_version(&version)?;
        Ok(Self {
            package_name,
            version,
        })
    }

    /// The validated package name (including scope, if any).
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// The validated exact version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package_name, self.version)
    }
}

/// Validate a package name against npm's rules for new packages.
///
/// Accepts `name` or `@scope/name`. Each component must be lowercase,
/// start with an ASCII letter or digit, and contain only `a-z`, `0-9`,
/// `.`, `_`, `-`. The combined length must not exceed 214 characters.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPackageName`] with the violated rule.
pub fn validate_package_name(name: &str) -> CoreResult<()> {
    let invalid = |reason: String| CoreError::InvalidPackageName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty".into()));
    }
    if name.len() > MAX_PACKAGE_NAME_LENGTH {
        return Err(invalid(format!(
            "exceeds maximum length of {MAX_PACKAGE_NAME_LENGTH} characters"
        )));
    }
    if BLOCKED_NAMES.contains(&name) {
        return Err(invalid("name is reserved".into()));
    }

    if let Some(without_at) = name.strip_prefix('@') {
        let Some((scope, bare)) = without_at.split_once('/') else {
            return Err(invalid("scoped name must be of the form @scope/name".into()));
        };
        validate_name_component(name, scope, "scope")?;
        validate_name_component(name, bare, "name")?;
    } else {
        validate_name_component(name, name, "name")?;
    }

    Ok(())
}

/// Validate a single name component (scope or bare name).
fn validate_name_component(full: &str, component: &str, kind: &str) -> CoreResult<()> {
    let invalid = |reason: String| CoreError::InvalidPackageName {
        name: full.to_string(),
        reason,
    };

    let mut chars = component.chars();
    let Some(first) = chars.next() else {
        return Err(invalid(format!("{kind} cannot be empty")));
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return Err(invalid(format!(
            "{kind} must start with a lowercase letter or digit"
        )));
    }
    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '.' && c != '_' && c != '-' {
            return Err(invalid(format!(
                "{kind} contains invalid character '{c}' (allowed: a-z, 0-9, '.', '_', '-')"
            )));
        }
    }
    Ok(())
}

/// Validate that a string is an explicit semantic version.
///
/// Three checks, all of which must hold:
///
/// 1. The raw string contains no range marker (`^ ~ * > < =`) and no
///    whitespace. This catches range specifiers whose prefix would still
///    parse as a version.
/// 2. The string parses as a semantic version.
/// 3. Re-serializing the parsed version reproduces the input exactly,
///    which catches leading/trailing noise such as `v1.2.3`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidVersion`] naming the failed check.
pub fn validate_exact_version(version: &str) -> CoreResult<()> {
    let invalid = |reason: String| CoreError::InvalidVersion {
        version: version.to_string(),
        reason,
    };

    if let Some(marker) = version.chars().find(|c| RANGE_MARKERS.contains(c)) {
        return Err(invalid(format!(
            "contains range marker '{marker}'; an explicit version is required"
        )));
    }
    if version.chars().any(char::is_whitespace) {
        return Err(invalid(
            "contains whitespace; an explicit version is required".into(),
        ));
    }

    let parsed = semver::Version::parse(version)
        .map_err(|e| invalid(format!("not a semantic version: {e}")))?;

    if parsed.to_string() != version {
        return Err(invalid(format!(
            "normalizes to '{parsed}'; an exact version string is required"
        )));
    }

    Ok(())
}
