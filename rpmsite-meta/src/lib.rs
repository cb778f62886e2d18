//! rpmsite-meta: package metadata helpers for rpmsite
//!
//! This crate provides:
//! - RPM package discovery and filename parsing
//! - `rpmvercmp` version ordering and latest-version resolution
//! - Single-pass `{{KEY}}` template rendering
//! - File checksums for idempotent copies

pub mod checksum;
pub mod error;
pub mod package;
pub mod template;
pub mod version;

pub use error::{Error, Result};
pub use package::{PackageEntry, PackageFileName, UNKNOWN_VERSION};
pub use template::{Bindings, Template, TemplateValue};
pub use version::{
    rpmvercmp, version_lock, QueryFailurePolicy, ResolvedVersions, RpmQuery, Version,
    VersionQuery, VersionResolver,
};
