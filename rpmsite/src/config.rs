//! Site configuration
//!
//! Read from the file named by `RPMSITE_CONFIG`, else `rpmsite.yaml` in the
//! working directory, else built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

pub const CONFIG_ENV: &str = "RPMSITE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "rpmsite.yaml";
pub const DEFAULT_REPO_NAME: &str = "rpm-repo";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Repository name, used for the `.repo` files and page titles
    pub name: String,

    /// Public URL the destination root is served from
    pub base_url: String,

    /// GPG key URL written to the `.repo` files (defaults to
    /// `{base_url}/RPM-GPG-KEY-{name}`)
    pub gpg_key_url: Option<String>,

    /// `metadata_expire` value for package manager clients
    pub metadata_expire: String,

    /// Directory holding template overrides and stylesheets
    pub template_dir: PathBuf,

    /// Directory names skipped when scanning the destination
    pub exclude: Vec<String>,

    /// Separator split into nested directories by the merge layout
    pub platform_separator: char,

    /// Extra top-level names listed on the root page
    pub extra_categories: Vec<String>,

    /// Platform category the dnf/yum `.repo` file points at
    pub dnf_category: String,

    /// Platform category the zypper `.repo` file points at
    pub zypper_category: String,

    /// Metadata generator program
    pub createrepo: String,

    /// Package query program
    pub rpm: String,

    /// Stylesheets copied from `template_dir` into the destination root
    pub stylesheets: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_REPO_NAME.to_string(),
            base_url: "https://example.com/rpm".to_string(),
            gpg_key_url: None,
            metadata_expire: "300".to_string(),
            template_dir: PathBuf::from("templates"),
            exclude: vec!["_staging".to_string()],
            platform_separator: '-',
            extra_categories: Vec::new(),
            dnf_category: "fedora".to_string(),
            zypper_category: "opensuse".to_string(),
            createrepo: "createrepo_c".to_string(),
            rpm: "rpm".to_string(),
            stylesheets: vec!["style.css".to_string(), "listing.css".to_string()],
        }
    }
}

impl SiteConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Load the configuration from `RPMSITE_CONFIG` or `rpmsite.yaml`,
    /// falling back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            debug!("Loading config from {} ({})", path, CONFIG_ENV);
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            debug!("Loading config from {}", local.display());
            return Self::from_file(local);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("name must not be empty".to_string()));
        }
        if self.platform_separator == '/' {
            return Err(Error::Config(
                "platform_separator must not be '/'".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn gpg_key_url(&self) -> String {
        self.gpg_key_url
            .clone()
            .unwrap_or_else(|| format!("{}/RPM-GPG-KEY-{}", self.base_url(), self.name))
    }

    /// Repository configuration file for dnf/yum clients
    pub fn dnf_repo_file(&self) -> String {
        format!("{}.repo", self.name)
    }

    /// Repository configuration file for zypper clients
    pub fn zypper_repo_file(&self) -> String {
        format!("{}-zypper.repo", self.name)
    }

    pub fn repo_files(&self) -> [String; 2] {
        [self.dnf_repo_file(), self.zypper_repo_file()]
    }
}
