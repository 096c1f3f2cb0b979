//! Serde types for npm registry JSON responses, plus the normalization
//! step that fills conventional `package.json` defaults.
//!
//! Published manifests are allowed to carry `repository` and `author` in
//! shorthand string form; [`VersionInfo::normalize`] expands both into
//! their structured shapes so callers never see the shorthand.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Declared dependencies: package name → version specifier, verbatim.
pub type DependencyMap = BTreeMap<String, String>;

/// Top-level npm registry response for a package: every published
/// version's metadata in one document.
#[derive(Debug, Clone, Deserialize)]
pub struct Packument {
    /// Package name.
    #[serde(default)]
    pub name: String,
    /// Mapping of dist-tags to version strings (e.g. `{"latest": "1.0.0"}`).
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// Per-version metadata, keyed by semver string.
    #[serde(default)]
    pub versions: HashMap<String, VersionInfo>,
}

/// Metadata for a single published version, as the registry serves it.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// Package name.
    #[serde(default)]
    pub name: String,
    /// Version string.
    #[serde(default)]
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Declared runtime dependencies.
    #[serde(default)]
    pub dependencies: DependencyMap,
    /// Repository, possibly in string shorthand.
    #[serde(default)]
    pub repository: Option<RepositoryField>,
    /// Author, possibly in `Name <email> (url)` shorthand.
    #[serde(default)]
    pub author: Option<PersonField>,
    /// Distribution info (tarball URL, integrity hashes).
    pub dist: DistInfo,
}

/// Distribution information for a published version.
#[derive(Debug, Clone, Deserialize)]
pub struct DistInfo {
    /// Tarball download URL.
    pub tarball: String,
    /// SRI integrity string (e.g. `"sha512-<base64>"`).
    #[serde(default)]
    pub integrity: Option<String>,
    /// SHA-1 hex digest (legacy fallback; never verified here).
    #[serde(default)]
    pub shasum: Option<String>,
}

/// `repository` as published: either a bare string or the full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RepositoryField {
    /// Structured form.
    Full(Repository),
    /// Shorthand such as `"github:user/repo"` or a plain URL.
    Shorthand(String),
}

/// Structured repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// VCS type, conventionally `"git"`.
    #[serde(rename = "type", default = "default_repository_type")]
    pub kind: String,
    /// Repository URL.
    pub url: String,
    /// Subdirectory within a monorepo, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn default_repository_type() -> String {
    "git".to_string()
}

/// `author` as published: either a shorthand string or the full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PersonField {
    /// Structured form.
    Full(Person),
    /// Shorthand `"Name <email> (url)"`.
    Shorthand(String),
}

/// A person reference (author, contributor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Homepage URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A version's metadata after normalization: shorthands expanded,
/// conventional defaults filled in.
#[derive(Debug, Clone)]
pub struct NormalizedPackage {
    /// Package name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Search keywords.
    pub keywords: Vec<String>,
    /// Declared runtime dependencies, verbatim.
    pub dependencies: DependencyMap,
    /// Structured repository reference.
    pub repository: Option<Repository>,
    /// Structured author reference.
    pub author: Option<Person>,
    /// Distribution info.
    pub dist: DistInfo,
}

impl VersionInfo {
    /// Expand shorthand fields into their structured shapes.
    #[must_use]
    pub fn normalize(self) -> NormalizedPackage {
        NormalizedPackage {
            name: self.name,
            version: self.version,
            description: self.description,
            keywords: self.keywords,
            dependencies: self.dependencies,
            repository: self.repository.map(RepositoryField::into_repository),
            author: self.author.map(PersonField::into_person),
            dist: self.dist,
        }
    }
}

impl RepositoryField {
    /// Expand shorthand into a structured [`Repository`].
    ///
    /// `github:user/repo` and bare `user/repo` become GitHub HTTPS URLs;
    /// anything containing a scheme passes through unchanged.
    #[must_use]
    pub fn into_repository(self) -> Repository {
        match self {
            Self::Full(repository) => repository,
            Self::Shorthand(shorthand) => {
                let url = if shorthand.contains("://") {
                    shorthand
                } else if let Some(rest) = shorthand.strip_prefix("github:") {
                    format!("https://github.com/{rest}")
                } else {
                    format!("https://github.com/{shorthand}")
                };
                Repository {
                    kind: default_repository_type(),
                    url,
                    directory: None,
                }
            },
        }
    }
}

impl PersonField {
    /// Expand `"Name <email> (url)"` shorthand into a structured
    /// [`Person`]. Every segment is optional.
    #[must_use]
    pub fn into_person(self) -> Person {
        match self {
            Self::Full(person) => person,
            Self::Shorthand(shorthand) => parse_person(&shorthand),
        }
    }
}

/// Parse the `Name <email> (url)` convention.
fn parse_person(raw: &str) -> Person {
    let mut person = Person::default();
    let mut rest = raw.trim().to_string();

    if let Some(start) = rest.find('(') {
        if let Some(end) = rest.rfind(')') {
            if end > start {
                let url = rest.get(start.saturating_add(1)..end).unwrap_or("").trim();
                if !url.is_empty() {
                    person.url = Some(url.to_string());
                }
                let mut trimmed = rest.clone();
                trimmed.replace_range(start..=end, "");
                rest = trimmed;
            }
        }
    }

    if let Some(start) = rest.find('<') {
        if let Some(end) = rest.rfind('>') {
            if end > start {
                let email = rest.get(start.saturating_add(1)..end).unwrap_or("").trim();
                if !email.is_empty() {
                    person.email = Some(email.to_string());
                }
                let mut trimmed = rest.clone();
                trimmed.replace_range(start..=end, "");
                rest = trimmed;
            }
        }
    }

    let name = rest.trim();
    if !name.is_empty() {
        person.name = Some(name.to_string());
    }
    person
}
