//! RPM package discovery and filename parsing

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::Result;

/// Version recorded when a package could not be queried
pub const UNKNOWN_VERSION: &str = "unknown";

/// Directory created by createrepo_c next to the packages
pub const REPODATA_DIR: &str = "repodata";

static RPM_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+)-(?P<version>[^-]+)-(?P<release>[^-]+)\.(?P<arch>[^.]+)\.rpm$")
        .expect("valid rpm filename regex")
});

/// Components of a `NAME-VERSION-RELEASE.ARCH.rpm` filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFileName {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl PackageFileName {
    /// Parse a package filename. Returns `None` for names that don't follow
    /// the usual NEVRA layout.
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = RPM_FILENAME.captures(file_name)?;
        Some(Self {
            name: caps["name"].to_string(),
            version: caps["version"].to_string(),
            release: caps["release"].to_string(),
            arch: caps["arch"].to_string(),
        })
    }
}

/// A discovered package file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub path: PathBuf,
    pub file_name: String,
    /// Best-effort package name taken from the filename
    pub name: String,
    /// Version from the package header, or [`UNKNOWN_VERSION`]
    pub version: String,
}

impl PackageEntry {
    /// Build an entry from a path; the version starts out unknown until
    /// the package header is queried.
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let name = PackageFileName::parse(&file_name)
            .map(|p| p.name)
            .unwrap_or_else(|| {
                file_name
                    .strip_suffix(".rpm")
                    .unwrap_or(&file_name)
                    .to_string()
            });

        Self {
            path: path.to_path_buf(),
            file_name,
            name,
            version: UNKNOWN_VERSION.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn has_known_version(&self) -> bool {
        self.version != UNKNOWN_VERSION
    }
}

/// Whether a path looks like an RPM package
pub fn is_package(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("rpm"))
            .unwrap_or(false)
}

/// Recursively scan a directory for package files.
///
/// Paths containing a component listed in `exclude`, a hidden component or a
/// `repodata` component are skipped. Results are sorted by path.
pub fn scan_packages(dir: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**/*.rpm");
    let pattern_str = pattern.to_string_lossy();

    let mut packages = Vec::new();

    for entry in glob::glob(&pattern_str)? {
        match entry {
            Ok(path) => {
                if !is_package(&path) {
                    continue;
                }
                let rel = path.strip_prefix(dir).unwrap_or(&path);
                if is_excluded(rel, exclude) {
                    tracing::debug!("Skipping excluded package {:?}", path);
                    continue;
                }
                packages.push(path);
            }
            Err(e) => {
                tracing::warn!("Glob error: {}", e);
            }
        }
    }

    packages.sort();
    Ok(packages)
}

/// List package files directly inside `dir` (non-recursive), sorted.
pub fn list_packages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut packages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_package(&path) {
            packages.push(path);
        }
    }
    packages.sort();
    Ok(packages)
}

/// True when any component of a relative path is hidden, `repodata`, or
/// named in `exclude`.
pub fn is_excluded(rel: &Path, exclude: &[String]) -> bool {
    let Some(parent) = rel.parent() else {
        return false;
    };
    parent.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name.starts_with('.') || name == REPODATA_DIR || exclude.iter().any(|e| *e == name)
    })
}
