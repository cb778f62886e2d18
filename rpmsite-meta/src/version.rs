//! Version ordering and resolution
//!
//! Versions are compared with RPM's `rpmvercmp` rules, so `0.8.10` sorts
//! after `0.8.9`, `1.0~rc1` before `1.0` and `1.0^git1` after it.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::package::{PackageEntry, UNKNOWN_VERSION};
use crate::{Error, Result};

/// Compare two version strings the way `rpmvercmp` does.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    let is_sep = |c: u8| !c.is_ascii_alphanumeric() && c != b'~' && c != b'^';

    loop {
        while let Some((&c, rest)) = one.split_first() {
            if !is_sep(c) {
                break;
            }
            one = rest;
        }
        while let Some((&c, rest)) = two.split_first() {
            if !is_sep(c) {
                break;
            }
            two = rest;
        }

        // Tilde sorts before everything, even the end of the string
        let tilde_one = one.first() == Some(&b'~');
        let tilde_two = two.first() == Some(&b'~');
        if tilde_one || tilde_two {
            if !tilde_one {
                return Ordering::Greater;
            }
            if !tilde_two {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        // Caret sorts after the end of the string but before anything else
        let caret_one = one.first() == Some(&b'^');
        let caret_two = two.first() == Some(&b'^');
        if caret_one || caret_two {
            if one.is_empty() {
                return Ordering::Less;
            }
            if two.is_empty() {
                return Ordering::Greater;
            }
            if !caret_one {
                return Ordering::Greater;
            }
            if !caret_two {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let take = |s: &[u8]| -> usize {
            s.iter()
                .take_while(|c| {
                    if numeric {
                        c.is_ascii_digit()
                    } else {
                        c.is_ascii_alphabetic()
                    }
                })
                .count()
        };

        let len_one = take(one);
        let len_two = take(two);
        let (seg_one, rest_one) = one.split_at(len_one);
        let (seg_two, rest_two) = two.split_at(len_two);

        // Segments of different types: numeric is newer
        if seg_two.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let seg_one = trim_leading_zeros(seg_one);
            let seg_two = trim_leading_zeros(seg_two);
            seg_one.len().cmp(&seg_two.len()).then_with(|| seg_one.cmp(seg_two))
        } else {
            seg_one.cmp(seg_two)
        };

        if ord != Ordering::Equal {
            return ord;
        }

        one = rest_one;
        two = rest_two;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let zeros = s.iter().take_while(|&&c| c == b'0').count();
    &s[zeros..]
}

/// A version string ordered by [`rpmvercmp`].
///
/// Strings that `rpmvercmp` considers equal (`1.0` and `1.00`) fall back to
/// byte order so the ordering stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(pub String);

impl Version {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        rpmvercmp(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort versions ascending and drop duplicates.
pub fn sort_versions<I, S>(versions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    versions
        .into_iter()
        .map(Version::new)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|v| v.0)
        .collect()
}

/// Derive the pinning pattern for a version by wildcarding its last
/// dot-separated segment (`0.8.1` -> `0.8.*`).
pub fn version_lock(latest: &str) -> String {
    if latest.is_empty() || latest == UNKNOWN_VERSION {
        return "*".to_string();
    }
    match latest.rsplit_once('.') {
        Some((prefix, _)) => format!("{}.*", prefix),
        None => format!("{}.*", latest),
    }
}

/// Reads the version field out of a package file
pub trait VersionQuery {
    fn query_version(&self, path: &Path) -> Result<String>;
}

impl<Q: VersionQuery + ?Sized> VersionQuery for &Q {
    fn query_version(&self, path: &Path) -> Result<String> {
        (**self).query_version(path)
    }
}

/// Queries package headers with `rpm -qp`
#[derive(Debug, Clone)]
pub struct RpmQuery {
    program: PathBuf,
}

impl RpmQuery {
    pub fn new() -> Self {
        Self::with_program("rpm")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RpmQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionQuery for RpmQuery {
    fn query_version(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["-qp", "--queryformat", "%{VERSION}"])
            .arg(path)
            .output()
            .map_err(|e| Error::VersionQuery {
                path: path.to_path_buf(),
                message: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(Error::VersionQuery {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout.lines().next().unwrap_or_default().trim().to_string();
        if version.is_empty() {
            return Err(Error::VersionQuery {
                path: path.to_path_buf(),
                message: "empty version".to_string(),
            });
        }
        Ok(version)
    }
}

/// What to do when a package version can't be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryFailurePolicy {
    /// Abort on the first failed query
    #[default]
    Fail,
    /// Record [`UNKNOWN_VERSION`] and keep going
    SubstituteSentinel,
}

/// Result of resolving a set of packages
#[derive(Debug, Clone, Default)]
pub struct ResolvedVersions {
    pub entries: Vec<PackageEntry>,
    /// Distinct known versions, ascending
    pub versions: Vec<String>,
    /// Highest known version, or [`UNKNOWN_VERSION`] when none resolved
    pub latest: String,
}

impl ResolvedVersions {
    pub fn version_lock(&self) -> String {
        version_lock(&self.latest)
    }
}

/// Extracts versions from package files and picks the latest
pub struct VersionResolver<Q> {
    query: Q,
    policy: QueryFailurePolicy,
}

impl<Q: VersionQuery> VersionResolver<Q> {
    pub fn new(query: Q, policy: QueryFailurePolicy) -> Self {
        Self { query, policy }
    }

    pub fn policy(&self) -> QueryFailurePolicy {
        self.policy
    }

    pub fn resolve<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ResolvedVersions> {
        let mut entries = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            let entry = PackageEntry::from_path(path);
            let entry = match self.query.query_version(path) {
                Ok(version) => {
                    debug!("{} -> {}", entry.file_name, version);
                    entry.with_version(version)
                }
                Err(e) => match self.policy {
                    QueryFailurePolicy::Fail => return Err(e),
                    QueryFailurePolicy::SubstituteSentinel => {
                        warn!("{}; recording version as {}", e, UNKNOWN_VERSION);
                        entry
                    }
                },
            };
            entries.push(entry);
        }

        let versions = sort_versions(
            entries
                .iter()
                .filter(|e| e.has_known_version())
                .map(|e| e.version.clone()),
        );
        let latest = versions
            .last()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

        Ok(ResolvedVersions {
            entries,
            versions,
            latest,
        })
    }
}
