//! Directory index pages
//!
//! Writes an `index.html` into every directory named by a [`RepoState`].
//! Rows are sorted directories first, then files, each by name.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rpmsite_meta::Bindings;
use tracing::{debug, info};

use crate::state::RepoState;
use crate::templates::SiteTemplates;
use crate::utils::{format_mtime, format_size, html_escape};
use crate::Result;

pub const INDEX_FILE: &str = "index.html";

/// Page-level values shared by every generated page
#[derive(Debug, Clone)]
pub struct PageContext {
    pub repo_name: String,
    pub base_url: String,
    pub latest_version: String,
    pub version_lock: String,
    /// Known versions in display order, newest first
    pub versions: Vec<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListingEntry {
    name: String,
    is_dir: bool,
    modified: Option<SystemTime>,
    size: u64,
}

pub struct IndexGenerator<'a> {
    templates: &'a SiteTemplates,
    context: PageContext,
    root_entries: BTreeSet<String>,
}

impl<'a> IndexGenerator<'a> {
    pub fn new(templates: &'a SiteTemplates, context: PageContext) -> Self {
        Self {
            templates,
            context,
            root_entries: BTreeSet::new(),
        }
    }

    /// Names listed on the root page in addition to the platform categories
    pub fn with_root_entries<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_entries.extend(names.into_iter().map(Into::into));
        self
    }

    /// Write an index page for every directory of `state`. Returns the
    /// written paths, root first.
    pub fn generate(&self, state: &RepoState) -> Result<Vec<PathBuf>> {
        let mut allow = state.categories();
        allow.extend(self.root_entries.iter().cloned());

        let mut written = Vec::new();
        for rel in state.index_dirs() {
            let html = self.render_dir(&state.root, &rel, &allow)?;
            let output = state.root.join(&rel).join(INDEX_FILE);
            fs::write(&output, html)?;
            debug!("Wrote {}", output.display());
            written.push(output);
        }

        info!("Generated {} index page(s)", written.len());
        Ok(written)
    }

    /// Render the page for `root/rel`. On the root page only names in
    /// `allow` are listed.
    fn render_dir(&self, root: &Path, rel: &Path, allow: &BTreeSet<String>) -> Result<String> {
        let is_root = rel.as_os_str().is_empty();
        let mut entries = list_entries(&root.join(rel))?;
        if is_root {
            entries.retain(|e| allow.contains(&e.name));
        }

        let mut rows = String::new();
        if !is_root {
            rows.push_str(&self.templates.dir_entry.render(
                &Bindings::new()
                    .with("NAME", "Parent Directory")
                    .with("HREF", "../")
                    .with("MODIFIED", "")
                    .with("SIZE", "-"),
            )?);
        }
        for entry in &entries {
            rows.push_str(&self.render_row(entry)?);
        }

        let path = if is_root {
            "/".to_string()
        } else {
            format!("/{}/", rel.to_string_lossy())
        };
        let depth = rel.components().count();

        let ctx = &self.context;
        let bindings = Bindings::new()
            .with(
                "TITLE",
                if is_root {
                    html_escape(&ctx.repo_name)
                } else {
                    format!("Index of {}", html_escape(&path))
                },
            )
            .with("PATH", html_escape(&path))
            .with("ROOT", "../".repeat(depth))
            .with("ROWS", rows)
            .with("REPO_NAME", html_escape(&ctx.repo_name))
            .with("BASE_URL", html_escape(&ctx.base_url))
            .with("LATEST_VERSION", html_escape(&ctx.latest_version))
            .with("VERSION_LOCK", html_escape(&ctx.version_lock))
            .with("VERSIONS", html_escape(&ctx.versions.join(", ")))
            .with("GENERATED_AT", ctx.generated_at.clone());

        let page = if is_root {
            &self.templates.root_page
        } else {
            &self.templates.dir_page
        };
        Ok(page.render(&bindings)?)
    }

    fn render_row(&self, entry: &ListingEntry) -> Result<String> {
        let escaped = html_escape(&entry.name);
        let href = urlencoding::encode(&entry.name);
        let modified = entry.modified.map(format_mtime).unwrap_or_default();

        let (template, bindings) = if entry.is_dir {
            (
                &self.templates.dir_entry,
                Bindings::new()
                    .with("NAME", format!("{}/", escaped))
                    .with("HREF", format!("{}/", href))
                    .with("MODIFIED", modified)
                    .with("SIZE", "-"),
            )
        } else {
            (
                &self.templates.file_entry,
                Bindings::new()
                    .with("NAME", escaped)
                    .with("HREF", href)
                    .with("MODIFIED", modified)
                    .with("SIZE", format_size(entry.size)),
            )
        };
        Ok(template.render(&bindings)?)
    }
}

/// Visible entries of `dir`: everything except hidden names and a previously
/// generated index page.
fn list_entries(dir: &Path) -> Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name == INDEX_FILE || name.starts_with('.') {
            continue;
        }
        let metadata = entry.metadata()?;
        entries.push(ListingEntry {
            name,
            is_dir: metadata.is_dir(),
            modified: metadata.modified().ok(),
            size: metadata.len(),
        });
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}
