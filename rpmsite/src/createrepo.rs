//! Repository metadata generation

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::{Error, Result};

/// Regenerates package manager metadata for one directory
pub trait MetadataGenerator {
    fn generate(&self, dir: &Path) -> Result<()>;
}

impl<G: MetadataGenerator + ?Sized> MetadataGenerator for &G {
    fn generate(&self, dir: &Path) -> Result<()> {
        (**self).generate(dir)
    }
}

/// Runs `createrepo_c <dir>`
#[derive(Debug, Clone)]
pub struct CreateRepo {
    program: PathBuf,
}

impl CreateRepo {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve the program on `PATH`
    pub fn locate(program: &str) -> Result<Self> {
        Ok(Self::new(find_tool(program)?))
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Resolve an external program on `PATH`
pub fn find_tool(program: &str) -> Result<PathBuf> {
    let path = which::which(program).map_err(|_| Error::ExternalTool {
        tool: program.to_string(),
        message: "not found in PATH".to_string(),
    })?;
    debug!("Using {} at {}", program, path.display());
    Ok(path)
}

impl Default for CreateRepo {
    fn default() -> Self {
        Self::new("createrepo_c")
    }
}

impl MetadataGenerator for CreateRepo {
    fn generate(&self, dir: &Path) -> Result<()> {
        info!("Generating metadata for {}", dir.display());

        let output = Command::new(&self.program)
            .arg(dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::ExternalTool {
                tool: self.tool_name(),
                message: e.to_string(),
            })?;

        debug!("{}", String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: self.tool_name(),
                message: format!(
                    "{} on {}: {}",
                    output.status,
                    dir.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}
