//! Site templates
//!
//! Each template is embedded in the binary and can be replaced by a file of
//! the same name in the configured template directory.

use std::path::Path;

use rpmsite_meta::Template;
use tracing::debug;

use crate::Result;

pub const ROOT_PAGE: &str = "root.html.tpl";
pub const DIR_PAGE: &str = "index.html.tpl";
pub const DIR_ENTRY: &str = "dir-entry.html.tpl";
pub const FILE_ENTRY: &str = "file-entry.html.tpl";
pub const DNF_REPO: &str = "dnf.repo.tpl";
pub const ZYPPER_REPO: &str = "zypper.repo.tpl";

const EMBEDDED: [(&str, &str); 6] = [
    (ROOT_PAGE, include_str!("../templates/root.html.tpl")),
    (DIR_PAGE, include_str!("../templates/index.html.tpl")),
    (DIR_ENTRY, include_str!("../templates/dir-entry.html.tpl")),
    (FILE_ENTRY, include_str!("../templates/file-entry.html.tpl")),
    (DNF_REPO, include_str!("../templates/dnf.repo.tpl")),
    (ZYPPER_REPO, include_str!("../templates/zypper.repo.tpl")),
];

#[derive(Debug, Clone)]
pub struct SiteTemplates {
    pub root_page: Template,
    pub dir_page: Template,
    pub dir_entry: Template,
    pub file_entry: Template,
    pub dnf_repo: Template,
    pub zypper_repo: Template,
}

impl SiteTemplates {
    /// The built-in templates
    pub fn embedded() -> Self {
        Self {
            root_page: embedded(ROOT_PAGE),
            dir_page: embedded(DIR_PAGE),
            dir_entry: embedded(DIR_ENTRY),
            file_entry: embedded(FILE_ENTRY),
            dnf_repo: embedded(DNF_REPO),
            zypper_repo: embedded(ZYPPER_REPO),
        }
    }

    /// Built-in templates, overridden by files present in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            root_page: load_or_embedded(dir, ROOT_PAGE)?,
            dir_page: load_or_embedded(dir, DIR_PAGE)?,
            dir_entry: load_or_embedded(dir, DIR_ENTRY)?,
            file_entry: load_or_embedded(dir, FILE_ENTRY)?,
            dnf_repo: load_or_embedded(dir, DNF_REPO)?,
            zypper_repo: load_or_embedded(dir, ZYPPER_REPO)?,
        })
    }
}

fn embedded(name: &str) -> Template {
    let text = EMBEDDED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| *text)
        .unwrap_or_default();
    Template::new(name, text)
}

fn load_or_embedded(dir: &Path, name: &str) -> Result<Template> {
    let path = dir.join(name);
    if path.is_file() {
        debug!("Using template override {}", path.display());
        Ok(Template::load(&path)?)
    } else {
        Ok(embedded(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_templates_have_placeholders() {
        let templates = SiteTemplates::embedded();
        assert!(templates.root_page.placeholders().contains(&"ROWS"));
        assert!(templates.dir_page.placeholders().contains(&"VERSION_LOCK"));
        assert_eq!(
            templates.dir_entry.placeholders(),
            vec!["HREF", "NAME", "MODIFIED", "SIZE"]
        );
        assert!(templates.dnf_repo.placeholders().contains(&"GPG_KEY_URL"));
        assert!(templates.zypper_repo.placeholders().contains(&"METADATA_EXPIRE"));
    }

    #[test]
    fn test_override_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DIR_ENTRY), "<li>{{NAME}}</li>\n").unwrap();

        let templates = SiteTemplates::load(dir.path()).unwrap();
        assert_eq!(templates.dir_entry.text(), "<li>{{NAME}}</li>\n");
        assert_eq!(
            templates.file_entry.text(),
            SiteTemplates::embedded().file_entry.text()
        );
    }
}
