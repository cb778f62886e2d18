//! Repository tree synchronization
//!
//! Mirrors per-platform package directories from a source root into the
//! destination tree and regenerates metadata for every directory that holds
//! packages.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use rpmsite_meta::checksum::copy_if_changed;
use rpmsite_meta::package::{list_packages, REPODATA_DIR};
use tracing::{debug, info, warn};

use crate::createrepo::MetadataGenerator;
use crate::state::{discover_platforms, RepoState};
use crate::{Error, Result};

/// How platform names map onto destination directories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// `dest/<platform>` verbatim
    Create,
    /// Separators in the platform name become nested directories
    /// (`fedora-39-x86_64` -> `dest/fedora/39/x86_64`)
    Merge,
}

impl LayoutMode {
    pub fn destination(&self, platform: &str, separator: char) -> PathBuf {
        match self {
            LayoutMode::Create => PathBuf::from(platform),
            LayoutMode::Merge => platform
                .split(separator)
                .filter(|part| !part.is_empty())
                .collect(),
        }
    }
}

impl LayoutMode {
    /// Path of a platform directory relative to the site root as seen by a
    /// package manager client, with `$releasever` and `$basearch` left for
    /// the client to expand (`fedora-$releasever-$basearch` for create,
    /// `fedora/$releasever/$basearch` for merge).
    pub fn repo_path(&self, category: &str, separator: char) -> String {
        let parts = [category, "$releasever", "$basearch"];
        match self {
            LayoutMode::Create => parts.join(&separator.to_string()),
            LayoutMode::Merge => parts.join("/"),
        }
    }

    /// Guess the layout of an existing tree: create when every platform sits
    /// directly below the root, merge otherwise (including an empty tree).
    pub fn detect(state: &RepoState) -> Self {
        let flat = !state.platforms.is_empty()
            && state
                .platforms
                .iter()
                .all(|p| p.rel_path.components().count() == 1);
        if flat {
            LayoutMode::Create
        } else {
            LayoutMode::Merge
        }
    }
}

impl Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutMode::Create => write!(f, "create"),
            LayoutMode::Merge => write!(f, "merge"),
        }
    }
}

/// A platform directory of the source tree
#[derive(Debug, Clone)]
pub struct SourcePlatform {
    pub name: String,
    pub path: PathBuf,
    pub packages: Vec<PathBuf>,
}

pub struct TreeBuilder<G> {
    source: PathBuf,
    dest: PathBuf,
    mode: LayoutMode,
    separator: char,
    exclude: Vec<String>,
    generator: G,
}

impl<G: MetadataGenerator> TreeBuilder<G> {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        source: P,
        dest: Q,
        mode: LayoutMode,
        generator: G,
    ) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            dest: dest.as_ref().to_path_buf(),
            mode,
            separator: '-',
            exclude: Vec::new(),
            generator,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Platform subdirectories of the source root, sorted by name.
    ///
    /// Fails with `SourceNotFound` when the root is missing and `EmptyInput`
    /// when none of the platforms holds a package.
    pub fn source_platforms(&self) -> Result<Vec<SourcePlatform>> {
        if !self.source.is_dir() {
            return Err(Error::SourceNotFound(self.source.clone()));
        }

        let mut platforms = Vec::new();
        for entry in fs::read_dir(&self.source)? {
            let path = entry?.path();
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            if !path.is_dir() || name.starts_with('.') {
                if path.extension().is_some_and(|ext| ext == "rpm") {
                    warn!("Ignoring {} outside of a platform directory", name);
                }
                continue;
            }
            let packages = list_packages(&path)?;
            if packages.is_empty() {
                debug!("Platform {} has no packages", name);
            }
            platforms.push(SourcePlatform {
                name,
                path,
                packages,
            });
        }

        if platforms.iter().all(|p| p.packages.is_empty()) {
            return Err(Error::EmptyInput(self.source.clone()));
        }

        platforms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(platforms)
    }

    /// Copy every platform into the destination and regenerate metadata.
    ///
    /// Nothing is written to the destination when validation fails.
    pub fn sync(&self) -> Result<RepoState> {
        let platforms = self.source_platforms()?;

        info!(
            "Syncing {} platform(s) from {} to {} ({} layout)",
            platforms.len(),
            self.source.display(),
            self.dest.display(),
            self.mode
        );

        fs::create_dir_all(&self.dest)?;

        let mut copied = Vec::new();
        let mut names = BTreeMap::new();

        for platform in &platforms {
            let rel = self.mode.destination(&platform.name, self.separator);
            let target = self.dest.join(&rel);
            fs::create_dir_all(&target)?;

            for package in &platform.packages {
                let Some(file_name) = package.file_name() else {
                    continue;
                };
                let dest_file = target.join(file_name);
                if copy_if_changed(package, &dest_file)? {
                    debug!("Copied {} -> {}", package.display(), dest_file.display());
                    copied.push(dest_file);
                }
            }

            copied.extend(self.mirror_repodata(&platform.path, &target)?);

            info!(
                "{}: {} package(s) -> {}",
                platform.name,
                platform.packages.len(),
                rel.display()
            );
            names.insert(rel, platform.name.clone());
        }

        let platforms = discover_platforms(&self.dest, &self.exclude, &names)?;

        let mut metadata_dirs = Vec::with_capacity(platforms.len());
        for platform in &platforms {
            let dir = self.dest.join(&platform.rel_path);
            self.generator.generate(&dir)?;
            metadata_dirs.push(dir);
        }

        Ok(RepoState {
            root: self.dest.clone(),
            platforms,
            copied,
            metadata_dirs,
        })
    }

    fn mirror_repodata(&self, platform: &Path, target: &Path) -> Result<Vec<PathBuf>> {
        let source = platform.join(REPODATA_DIR);
        if !source.is_dir() {
            return Ok(Vec::new());
        }

        let mut copied = Vec::new();
        for entry in fs::read_dir(&source)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let dest_file = target.join(REPODATA_DIR).join(file_name);
            if copy_if_changed(&path, &dest_file)? {
                copied.push(dest_file);
            }
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingGenerator {
        calls: RefCell<Vec<PathBuf>>,
    }

    impl MetadataGenerator for RecordingGenerator {
        fn generate(&self, dir: &Path) -> Result<()> {
            self.calls.borrow_mut().push(dir.to_path_buf());
            Ok(())
        }
    }

    struct FailingGenerator;

    impl MetadataGenerator for FailingGenerator {
        fn generate(&self, _dir: &Path) -> Result<()> {
            Err(Error::ExternalTool {
                tool: "createrepo_c".to_string(),
                message: "exit status: 1".to_string(),
            })
        }
    }

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn source_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("fedora-39-x86_64/tool-0.8.1-1.fc39.x86_64.rpm"), b"fc39");
        write(&root.join("fedora-39-x86_64/tool-0.8.10-1.fc39.x86_64.rpm"), b"fc39b");
        write(&root.join("el-9-aarch64/tool-0.8.1-1.el9.aarch64.rpm"), b"el9");
        write(&root.join("el-9-aarch64/repodata/repomd.xml"), b"<old/>");
        write(&root.join("el-9-aarch64/build.log"), b"log");
        dir
    }

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path.strip_prefix(root).unwrap().to_path_buf();
                    files.insert(rel, fs::read(&path).unwrap());
                }
            }
        }
        files
    }

    #[test]
    fn test_repo_path_matches_destination() {
        let create = LayoutMode::Create.repo_path("fedora", '-');
        assert_eq!(create, "fedora-$releasever-$basearch");
        let resolved = create
            .replace("$releasever", "39")
            .replace("$basearch", "x86_64");
        assert_eq!(
            PathBuf::from(resolved),
            LayoutMode::Create.destination("fedora-39-x86_64", '-')
        );

        let merge = LayoutMode::Merge.repo_path("opensuse", '_');
        assert_eq!(merge, "opensuse/$releasever/$basearch");
        let resolved = merge
            .replace("$releasever", "15.6")
            .replace("$basearch", "x86_64");
        assert_eq!(
            PathBuf::from(resolved),
            LayoutMode::Merge.destination("opensuse_15.6_x86_64", '_')
        );
    }

    #[test]
    fn test_detect_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("fedora-39-x86_64/a-1.0-1.x86_64.rpm"), b"a");
        let state = RepoState::scan(root, &[]).unwrap();
        assert_eq!(LayoutMode::detect(&state), LayoutMode::Create);

        write(&root.join("el/9/x86_64/a-1.0-1.x86_64.rpm"), b"a");
        let state = RepoState::scan(root, &[]).unwrap();
        assert_eq!(LayoutMode::detect(&state), LayoutMode::Merge);
    }

    #[test]
    fn test_layout_destination() {
        assert_eq!(
            LayoutMode::Create.destination("fedora-39-x86_64", '-'),
            PathBuf::from("fedora-39-x86_64")
        );
        assert_eq!(
            LayoutMode::Merge.destination("fedora-39-x86_64", '-'),
            PathBuf::from("fedora/39/x86_64")
        );
        assert_eq!(
            LayoutMode::Merge.destination("opensuse_tumbleweed_x86-64", '_'),
            PathBuf::from("opensuse/tumbleweed/x86-64")
        );
    }

    #[test]
    fn test_sync_create_layout() {
        let source = source_tree();
        let dest = TempDir::new().unwrap();
        let generator = RecordingGenerator::default();

        let state = TreeBuilder::new(source.path(), dest.path(), LayoutMode::Create, &generator)
            .sync()
            .unwrap();

        assert!(dest
            .path()
            .join("fedora-39-x86_64/tool-0.8.10-1.fc39.x86_64.rpm")
            .is_file());
        assert!(dest
            .path()
            .join("el-9-aarch64/tool-0.8.1-1.el9.aarch64.rpm")
            .is_file());
        assert!(!dest.path().join("el-9-aarch64/build.log").exists());
        assert_eq!(state.package_count(), 3);
        assert_eq!(state.platforms[0].name, "el-9-aarch64");

        // Source is left untouched
        assert!(source
            .path()
            .join("fedora-39-x86_64/tool-0.8.1-1.fc39.x86_64.rpm")
            .is_file());
    }

    #[test]
    fn test_sync_merge_layout_nests_platforms() {
        let source = source_tree();
        let dest = TempDir::new().unwrap();
        let generator = RecordingGenerator::default();

        let state = TreeBuilder::new(source.path(), dest.path(), LayoutMode::Merge, &generator)
            .sync()
            .unwrap();

        assert!(dest
            .path()
            .join("fedora/39/x86_64/tool-0.8.1-1.fc39.x86_64.rpm")
            .is_file());
        assert_eq!(
            fs::read(dest.path().join("el/9/aarch64/repodata/repomd.xml")).unwrap(),
            b"<old/>"
        );
        assert_eq!(state.platforms[1].rel_path, PathBuf::from("fedora/39/x86_64"));
        assert_eq!(state.platforms[1].name, "fedora-39-x86_64");
        assert_eq!(
            state.categories().into_iter().collect::<Vec<_>>(),
            vec!["el", "fedora"]
        );
    }

    #[test]
    fn test_metadata_generated_once_per_directory() {
        let source = source_tree();
        let dest = TempDir::new().unwrap();
        let generator = RecordingGenerator::default();

        TreeBuilder::new(source.path(), dest.path(), LayoutMode::Merge, &generator)
            .sync()
            .unwrap();

        let calls = generator.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], dest.path().join("el/9/aarch64"));
        assert_eq!(calls[1], dest.path().join("fedora/39/x86_64"));
    }

    #[test]
    fn test_metadata_covers_earlier_runs_and_skips_staging() {
        let source = source_tree();
        let dest = TempDir::new().unwrap();
        write(&dest.path().join("opensuse/15.5/x86_64/old-1.0-1.x86_64.rpm"), b"old");
        write(&dest.path().join("_staging/fedora/x-1.0-1.x86_64.rpm"), b"tmp");
        let generator = RecordingGenerator::default();

        let state = TreeBuilder::new(source.path(), dest.path(), LayoutMode::Merge, &generator)
            .with_exclude(vec!["_staging".to_string()])
            .sync()
            .unwrap();

        let calls = generator.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert!(calls.contains(&dest.path().join("opensuse/15.5/x86_64")));
        assert!(!calls.iter().any(|c| c.starts_with(dest.path().join("_staging"))));
        assert_eq!(state.platforms[2].name, "opensuse/15.5/x86_64");
    }

    #[test]
    fn test_sync_is_idempotent() {
        let source = source_tree();
        let dest = TempDir::new().unwrap();
        let generator = RecordingGenerator::default();
        let builder = TreeBuilder::new(source.path(), dest.path(), LayoutMode::Merge, &generator);

        let first = builder.sync().unwrap();
        let after_first = snapshot(dest.path());
        let second = builder.sync().unwrap();
        let after_second = snapshot(dest.path());

        assert_eq!(after_first, after_second);
        assert!(!first.copied.is_empty());
        assert!(second.copied.is_empty());
        assert_eq!(generator.calls.borrow().len(), 4);
    }

    #[test]
    fn test_source_not_found() {
        let dest = TempDir::new().unwrap();
        let err = TreeBuilder::new(
            "/nonexistent/rpmsite-source",
            dest.path(),
            LayoutMode::Create,
            RecordingGenerator::default(),
        )
        .sync()
        .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
        assert!(err.is_input_validation());
    }

    #[test]
    fn test_empty_input_leaves_destination_untouched() {
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("fedora-39-x86_64")).unwrap();
        write(&source.path().join("fedora-39-x86_64/README"), b"none");

        let dest = TempDir::new().unwrap();
        write(&dest.path().join("existing/index.html"), b"keep");
        let before = snapshot(dest.path());
        let generator = RecordingGenerator::default();

        let err = TreeBuilder::new(source.path(), dest.path(), LayoutMode::Merge, &generator)
            .sync()
            .unwrap_err();

        assert!(matches!(err, Error::EmptyInput(_)));
        assert!(err.is_input_validation());
        assert_eq!(snapshot(dest.path()), before);
        assert!(generator.calls.borrow().is_empty());
    }

    #[test]
    fn test_generator_failure_aborts() {
        let source = source_tree();
        let dest = TempDir::new().unwrap();
        let err = TreeBuilder::new(source.path(), dest.path(), LayoutMode::Create, FailingGenerator)
            .sync()
            .unwrap_err();
        assert!(matches!(err, Error::ExternalTool { .. }));
        assert!(!err.is_input_validation());
    }
}
