//! Plumbing shared by the `rpmsite-*` binaries

use std::fmt::Display;
use std::path::Path;
use std::sync::LazyLock;

use colored::Colorize;
use rpmsite_meta::RpmQuery;
use tracing::warn;

use crate::config::SiteConfig;
use crate::createrepo::{find_tool, CreateRepo};
use crate::site::{Site, SiteReport};
use crate::tree::LayoutMode;
use crate::Result;

static CHECK_MARK: LazyLock<colored::ColoredString> = LazyLock::new(|| "✔".bright_green().bold());
static CROSS_MARK: LazyLock<colored::ColoredString> = LazyLock::new(|| "〤".bright_red().bold());

/// Load the site configuration, overriding the repository name when given
pub fn load_config(name: Option<String>) -> Result<SiteConfig> {
    let config = SiteConfig::load()?;
    Ok(match name {
        Some(name) if !name.trim().is_empty() => config.with_name(name),
        _ => config,
    })
}

/// Sync `source` into `dest` and publish the full site
pub fn build_site(
    mode: LayoutMode,
    source: &Path,
    dest: &Path,
    name: Option<String>,
) -> Result<SiteReport> {
    let config = load_config(name)?;
    let generator = CreateRepo::locate(&config.createrepo)?;
    let query = rpm_query(&config, true)?;

    Site::new(config, query)?.build(source, dest, mode, generator)
}

/// Regenerate repo files and index pages of an existing `dest`
pub fn reindex_site(dest: &Path, name: Option<String>) -> Result<SiteReport> {
    let config = load_config(name)?;
    let query = rpm_query(&config, false)?;

    Site::new(config, query)?.reindex(dest)
}

/// Package query for `config.rpm`. When the program is not `required` and
/// cannot be found, every query fails and versions fall back to the sentinel.
pub fn rpm_query(config: &SiteConfig, required: bool) -> Result<RpmQuery> {
    match find_tool(&config.rpm) {
        Ok(path) => Ok(RpmQuery::with_program(path)),
        Err(err) if !required => {
            warn!("{}; package versions will be recorded as unknown", err);
            Ok(RpmQuery::with_program(&config.rpm))
        }
        Err(err) => Err(err),
    }
}

/// Print the outcome of a run and exit non-zero on failure
pub fn finish<T: Display>(result: Result<T>) {
    match result {
        Ok(summary) => println!("[{}] {}", &*CHECK_MARK, summary),
        Err(err) => exit_with_error(err),
    }
}

/// Print `err` as a single line on stderr and exit with status 1
pub fn exit_with_error(err: impl Display) -> ! {
    let message = err.to_string().replace('\n', " ");
    eprintln!("[{}] {}", &*CROSS_MARK, message);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpmsite_meta::VersionQuery;

    fn missing_rpm() -> SiteConfig {
        SiteConfig {
            rpm: "rpmsite-no-such-rpm".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_missing_rpm_is_fatal_when_required() {
        let err = rpm_query(&missing_rpm(), true).unwrap_err();
        assert!(err.to_string().contains("rpmsite-no-such-rpm"));
    }

    #[test]
    fn test_missing_rpm_queries_fail_when_optional() {
        let query = rpm_query(&missing_rpm(), false).unwrap();
        assert!(query
            .query_version(Path::new("tool-1.0-1.x86_64.rpm"))
            .is_err());
    }
}
