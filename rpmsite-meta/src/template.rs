//! `{{KEY}}` template rendering
//!
//! Templates are scanned once. Each `{{KEY}}` token is replaced by its bound
//! value and the emitted text is never scanned again, so a value that itself
//! contains `{{OTHER}}` is written out verbatim.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::{Error, Result};

/// Keys ending with this suffix bind the placeholder without the suffix to
/// the contents of a file (`ROWS_FILE=/tmp/rows` fills `{{ROWS}}`).
pub const FILE_SUFFIX: &str = "_FILE";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("valid placeholder regex"));

/// Value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Literal(String),
    /// Read from this file at render time
    File(PathBuf),
}

impl TemplateValue {
    fn resolve(&self) -> Result<String> {
        match self {
            TemplateValue::Literal(s) => Ok(s.clone()),
            TemplateValue::File(path) => {
                fs::read_to_string(path).map_err(|source| Error::ReadFile {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

/// Ordered placeholder bindings
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: IndexMap<String, TemplateValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key. Keys carrying [`FILE_SUFFIX`] are treated as file
    /// references.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match key.strip_suffix(FILE_SUFFIX) {
            Some(base) if !base.is_empty() => {
                self.values
                    .insert(base.to_string(), TemplateValue::File(PathBuf::from(value)));
            }
            _ => {
                self.values.insert(key, TemplateValue::Literal(value));
            }
        }
        self
    }

    /// Bind a placeholder to the contents of a file
    pub fn insert_file(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.values
            .insert(key.into(), TemplateValue::File(path.into()));
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Parse a `KEY=VALUE` argument
    pub fn parse_assignment(&mut self, arg: &str) -> Result<&mut Self> {
        let (key, value) = arg
            .split_once('=')
            .filter(|(k, _)| is_valid_key(k))
            .ok_or_else(|| Error::InvalidBinding(arg.to_string()))?;
        Ok(self.insert(key, value))
    }

    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A text template with `{{KEY}}` placeholders
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    text: String,
}

impl Template {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Load a template from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder keys in order of first appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.text) {
            if let Some(key) = caps.get(1).map(|m| m.as_str()) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut missing: Vec<String> = Vec::new();
        let mut used: Vec<&str> = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.text) {
            let (Some(token), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&self.text[last..token.start()]);
            last = token.end();

            match bindings.get(key.as_str()) {
                Some(value) => {
                    out.push_str(&value.resolve()?);
                    if !used.contains(&key.as_str()) {
                        used.push(key.as_str());
                    }
                }
                None => {
                    if !missing.iter().any(|m| m == key.as_str()) {
                        missing.push(key.as_str().to_string());
                    }
                }
            }
        }
        out.push_str(&self.text[last..]);

        if !missing.is_empty() {
            return Err(Error::UnresolvedPlaceholder {
                template: self.name.clone(),
                keys: missing,
            });
        }

        for key in bindings.keys().filter(|k| !used.contains(k)) {
            debug!("{}: binding {} not referenced", self.name, key);
        }

        Ok(out)
    }

    /// Render into `output`, creating parent directories as needed
    pub fn render_to_file(&self, output: &Path, bindings: &Bindings) -> Result<()> {
        let rendered = self.render(bindings)?;
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output, rendered)?;
        Ok(())
    }
}

/// Load `template`, render it with `bindings` and write `output`.
pub fn render_to_file(template: &Path, output: &Path, bindings: &Bindings) -> Result<()> {
    Template::load(template)?.render_to_file(output, bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_render_preserves_literal_text() {
        let template = Template::new("t", "<h1>{{TITLE}}</h1>\n  {{BODY}} & {{TITLE}}!");
        let bindings = Bindings::new().with("TITLE", "Repo").with("BODY", "list");
        let out = template.render(&bindings).unwrap();
        assert_eq!(out, "<h1>Repo</h1>\n  list & Repo!");
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_render_no_resubstitution() {
        let template = Template::new("t", "{{A}}|{{B}}");
        let bindings = Bindings::new().with("A", "{{B}}").with("B", "b");
        assert_eq!(template.render(&bindings).unwrap(), "{{B}}|b");
    }

    #[test]
    fn test_render_unresolved() {
        let template = Template::new("page", "{{A}} {{MISSING}} {{OTHER}} {{MISSING}}");
        let err = template.render(&Bindings::new().with("A", "a")).unwrap_err();
        match err {
            Error::UnresolvedPlaceholder { template, keys } => {
                assert_eq!(template, "page");
                assert_eq!(keys, vec!["MISSING", "OTHER"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_ignores_non_placeholder_braces() {
        let template = Template::new("t", "a {{ not a key }} {b} {{X}}");
        let out = template.render(&Bindings::new().with("X", "x")).unwrap();
        assert_eq!(out, "a {{ not a key }} {b} x");
    }

    #[test]
    fn test_file_sourced_value() {
        let mut rows = NamedTempFile::new().unwrap();
        rows.write_all(b"<tr>\n<td>one</td>\n</tr>").unwrap();
        rows.flush().unwrap();

        let mut bindings = Bindings::new();
        bindings.insert("ROWS_FILE", rows.path().to_string_lossy());
        assert!(matches!(bindings.get("ROWS"), Some(TemplateValue::File(_))));

        let template = Template::new("t", "<table>{{ROWS}}</table>");
        assert_eq!(
            template.render(&bindings).unwrap(),
            "<table><tr>\n<td>one</td>\n</tr></table>"
        );
    }

    #[test]
    fn test_file_sourced_value_missing_file() {
        let mut bindings = Bindings::new();
        bindings.insert_file("ROWS", "/nonexistent/rows.html");
        let err = Template::new("t", "{{ROWS}}").render(&bindings).unwrap_err();
        assert!(matches!(err, Error::ReadFile { .. }));
    }

    #[test]
    fn test_parse_assignment() {
        let mut bindings = Bindings::new();
        bindings.parse_assignment("NAME=a=b").unwrap();
        assert_eq!(
            bindings.get("NAME"),
            Some(&TemplateValue::Literal("a=b".to_string()))
        );
        assert!(bindings.parse_assignment("no-equals").is_err());
        assert!(bindings.parse_assignment("BAD KEY=x").is_err());
    }

    #[test]
    fn test_load_missing_template() {
        let err = Template::load(Path::new("/nonexistent/index.html.tpl")).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }

    #[test]
    fn test_render_to_file() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("page.tpl");
        fs::write(&template_path, "v={{VERSION}}\n").unwrap();
        let output = dir.path().join("out/page.txt");

        render_to_file(&template_path, &output, &Bindings::new().with("VERSION", "1.0")).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "v=1.0\n");
        assert_eq!(fs::read_to_string(&template_path).unwrap(), "v={{VERSION}}\n");
    }

    #[test]
    fn test_placeholders() {
        let template = Template::new("t", "{{B}} {{A}} {{B}}");
        assert_eq!(template.placeholders(), vec!["B", "A"]);
    }
}
