//! Site pipeline
//!
//! Ties the tree builder, version resolver and index generator together:
//! sync packages (or rescan an existing tree), resolve the latest version,
//! write the `.repo` files and stylesheets, then the index pages.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rpmsite_meta::checksum::copy_if_changed;
use rpmsite_meta::{Bindings, QueryFailurePolicy, VersionQuery, VersionResolver};
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::createrepo::MetadataGenerator;
use crate::index::{IndexGenerator, PageContext};
use crate::state::RepoState;
use crate::templates::SiteTemplates;
use crate::tree::{LayoutMode, TreeBuilder};
use crate::utils::format_generated_at;
use crate::{Error, Result};

/// Summary of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteReport {
    /// Packages present in the destination
    pub packages: usize,
    /// Files copied by this run
    pub copied: usize,
    /// Directories whose metadata was regenerated
    pub metadata_dirs: usize,
    /// Index pages written
    pub pages: usize,
    /// Distinct known versions, ascending
    pub versions: Vec<String>,
    pub latest_version: String,
    pub version_lock: String,
    pub repo_files: Vec<PathBuf>,
}

impl Display for SiteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} package(s), {} copied, {} metadata dir(s), {} page(s), latest {} ({})",
            self.packages,
            self.copied,
            self.metadata_dirs,
            self.pages,
            self.latest_version,
            self.version_lock
        )
    }
}

pub struct Site<Q> {
    config: SiteConfig,
    templates: SiteTemplates,
    query: Q,
    generated_at: Option<String>,
}

impl<Q: VersionQuery> Site<Q> {
    /// Loads the templates from `config.template_dir`, falling back to the
    /// embedded ones.
    pub fn new(config: SiteConfig, query: Q) -> Result<Self> {
        let templates = SiteTemplates::load(&config.template_dir)?;
        Ok(Self {
            config,
            templates,
            query,
            generated_at: None,
        })
    }

    /// Fix the timestamp shown on the pages instead of using the current time
    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Mirror `source` into `dest` using `mode`, then publish the site.
    ///
    /// The create layout aborts on the first failed version query; the merge
    /// layout records the failing package as unknown.
    pub fn build<G: MetadataGenerator>(
        &self,
        source: &Path,
        dest: &Path,
        mode: LayoutMode,
        generator: G,
    ) -> Result<SiteReport> {
        info!(
            "Building {} site {} -> {}",
            mode,
            source.display(),
            dest.display()
        );

        let state = TreeBuilder::new(source, dest, mode, generator)
            .with_separator(self.config.platform_separator)
            .with_exclude(self.config.exclude.clone())
            .sync()?;

        let policy = match mode {
            LayoutMode::Create => QueryFailurePolicy::Fail,
            LayoutMode::Merge => QueryFailurePolicy::SubstituteSentinel,
        };
        self.publish(&state, policy, mode)
    }

    /// Rebuild the repo files and index pages of an existing tree without
    /// touching packages or metadata.
    pub fn reindex(&self, dest: &Path) -> Result<SiteReport> {
        if !dest.is_dir() {
            return Err(Error::SourceNotFound(dest.to_path_buf()));
        }
        info!("Regenerating index pages for {}", dest.display());

        let state = RepoState::scan(dest, &self.config.exclude)?;
        let layout = LayoutMode::detect(&state);
        debug!("Detected {} layout", layout);
        self.publish(&state, QueryFailurePolicy::SubstituteSentinel, layout)
    }

    fn publish(
        &self,
        state: &RepoState,
        policy: QueryFailurePolicy,
        layout: LayoutMode,
    ) -> Result<SiteReport> {
        let resolver = VersionResolver::new(&self.query, policy);
        let resolved = resolver.resolve(&state.package_paths())?;
        let version_lock = resolved.version_lock();
        info!("Latest version: {} ({})", resolved.latest, version_lock);

        let repo_files = self.write_repo_files(&state.root, &resolved.latest, layout)?;
        self.copy_stylesheets(&state.root)?;

        let context = PageContext {
            repo_name: self.config.name.clone(),
            base_url: self.config.base_url().to_string(),
            latest_version: resolved.latest.clone(),
            version_lock: version_lock.clone(),
            versions: resolved.versions.iter().rev().cloned().collect(),
            generated_at: self
                .generated_at
                .clone()
                .unwrap_or_else(|| format_generated_at(Utc::now())),
        };
        let pages = IndexGenerator::new(&self.templates, context)
            .with_root_entries(self.config.repo_files())
            .with_root_entries(self.config.extra_categories.iter().cloned())
            .generate(state)?;

        Ok(SiteReport {
            packages: state.package_count(),
            copied: state.copied.len(),
            metadata_dirs: state.metadata_dirs.len(),
            pages: pages.len(),
            versions: resolved.versions,
            latest_version: resolved.latest,
            version_lock,
            repo_files,
        })
    }

    fn write_repo_files(
        &self,
        root: &Path,
        latest: &str,
        layout: LayoutMode,
    ) -> Result<Vec<PathBuf>> {
        let bindings = Bindings::new()
            .with("REPO_NAME", self.config.name.clone())
            .with("BASE_URL", self.config.base_url())
            .with("GPG_KEY_URL", self.config.gpg_key_url())
            .with("METADATA_EXPIRE", self.config.metadata_expire.clone())
            .with("LATEST_VERSION", latest);

        let separator = self.config.platform_separator;
        let targets = [
            (
                &self.templates.dnf_repo,
                self.config.dnf_repo_file(),
                &self.config.dnf_category,
            ),
            (
                &self.templates.zypper_repo,
                self.config.zypper_repo_file(),
                &self.config.zypper_category,
            ),
        ];

        let mut written = Vec::with_capacity(targets.len());
        for (template, file_name, category) in targets {
            let output = root.join(file_name);
            let bindings = bindings
                .clone()
                .with("REPO_PATH", layout.repo_path(category, separator));
            template.render_to_file(&output, &bindings)?;
            debug!("Wrote {}", output.display());
            written.push(output);
        }
        Ok(written)
    }

    fn copy_stylesheets(&self, root: &Path) -> Result<()> {
        for name in &self.config.stylesheets {
            let src = self.config.template_dir.join(name);
            if !src.is_file() {
                warn!("Stylesheet {} not found, skipping", src.display());
                continue;
            }
            if copy_if_changed(&src, &root.join(name))? {
                debug!("Copied {}", name);
            }
        }
        Ok(())
    }
}
