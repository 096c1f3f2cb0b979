//! Foundation types for the Vincent package registry.
//!
//! This crate provides the pieces every other Vincent crate builds on:
//!
//! - [`PackageIdentity`]: a validated (name, exact version) pair
//! - [`PackageKind`]: ability vs. policy, which decides what generated
//!   metadata an imported package must carry
//! - npm name and strict-semver validation
//! - The on-disk metadata contract between the registry and the build
//!   tooling of ability/policy packages ([`contract`])
//!
//! Validation is pure; nothing in this crate performs I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod contract;
pub mod error;
pub mod identity;

pub use error::{CoreError, CoreResult};
pub use identity::{
    PackageIdentity, PackageKind, validate_exact_version, validate_package_name,
};
