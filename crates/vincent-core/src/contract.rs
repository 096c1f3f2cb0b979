//! On-disk metadata contract with the package build tooling.
//!
//! Ability and policy packages generate metadata files at fixed relative
//! paths during their own build. The importer reads these paths verbatim
//! from the extracted package tree; they are an external contract shared
//! with the build tooling, so every path lives here and nowhere else.

/// Generated metadata file for ability packages.
pub const ABILITY_METADATA_PATH: &str = "dist/src/generated/vincent-ability-metadata.json";

/// Generated metadata file for policy packages.
pub const POLICY_METADATA_PATH: &str = "dist/src/generated/vincent-policy-metadata.json";

/// UI/JSON schema pair generated by policy package builds.
pub const UI_SCHEMA_PATH: &str = "dist/src/inputUiSchema.json";

/// Required field inside the generated metadata file.
pub const IPFS_CID_FIELD: &str = "ipfsCid";

/// Required fields inside the UI schema file.
pub const UI_SCHEMA_FIELD: &str = "uiSchema";
/// See [`UI_SCHEMA_FIELD`].
pub const JSON_SCHEMA_FIELD: &str = "jsonSchema";
