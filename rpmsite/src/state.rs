//! Description of a populated destination tree

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use rpmsite_meta::package::{scan_packages, PackageEntry, REPODATA_DIR};

use crate::Result;

/// A directory of the destination tree that directly holds packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDir {
    /// Source platform name, or the relative path for directories found on
    /// disk
    pub name: String,
    /// Location relative to the destination root
    pub rel_path: PathBuf,
    pub packages: Vec<PackageEntry>,
}

impl PlatformDir {
    /// First component of the relative path (`fedora` for `fedora/39/x86_64`)
    pub fn category(&self) -> Option<String> {
        self.rel_path.components().find_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
    }
}

/// What the tree builder produced, consumed by the index generator
#[derive(Debug, Clone, Default)]
pub struct RepoState {
    pub root: PathBuf,
    /// Every directory holding packages, sorted by relative path
    pub platforms: Vec<PlatformDir>,
    /// Destination files written by this run
    pub copied: Vec<PathBuf>,
    /// Directories whose metadata was regenerated by this run
    pub metadata_dirs: Vec<PathBuf>,
}

impl RepoState {
    /// Rebuild the state of an existing destination from disk
    pub fn scan(root: &Path, exclude: &[String]) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            platforms: discover_platforms(root, exclude, &BTreeMap::new())?,
            copied: Vec::new(),
            metadata_dirs: Vec::new(),
        })
    }

    pub fn package_paths(&self) -> Vec<PathBuf> {
        self.platforms
            .iter()
            .flat_map(|p| p.packages.iter().map(|e| e.path.clone()))
            .collect()
    }

    pub fn package_count(&self) -> usize {
        self.platforms.iter().map(|p| p.packages.len()).sum()
    }

    /// Top-level directory names that hold platforms
    pub fn categories(&self) -> BTreeSet<String> {
        self.platforms.iter().filter_map(PlatformDir::category).collect()
    }

    /// Relative paths of every directory that gets an index page: the root,
    /// every platform directory with its ancestors, and `repodata` where
    /// present. The root (empty path) sorts first.
    pub fn index_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = BTreeSet::new();
        dirs.insert(PathBuf::new());

        for platform in &self.platforms {
            for ancestor in platform.rel_path.ancestors() {
                if !ancestor.as_os_str().is_empty() {
                    dirs.insert(ancestor.to_path_buf());
                }
            }
            let repodata = platform.rel_path.join(REPODATA_DIR);
            if self.root.join(&repodata).is_dir() {
                dirs.insert(repodata);
            }
        }

        dirs.into_iter().collect()
    }
}

/// Group the packages below `root` by their directory. `names` maps relative
/// paths to platform names known from the source tree.
pub(crate) fn discover_platforms(
    root: &Path,
    exclude: &[String],
    names: &BTreeMap<PathBuf, String>,
) -> Result<Vec<PlatformDir>> {
    let mut grouped: BTreeMap<PathBuf, Vec<PackageEntry>> = BTreeMap::new();

    for path in scan_packages(root, exclude)? {
        let rel_dir = path
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        grouped
            .entry(rel_dir)
            .or_default()
            .push(PackageEntry::from_path(&path));
    }

    Ok(grouped
        .into_iter()
        .map(|(rel_path, packages)| PlatformDir {
            name: names
                .get(&rel_path)
                .cloned()
                .unwrap_or_else(|| rel_path.to_string_lossy().to_string()),
            rel_path,
            packages,
        })
        .collect())
}
