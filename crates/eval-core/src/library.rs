//! Name-based lookup of rubric, skill and rule documents.
//!
//! The documents are opaque markdown; this module only finds them. A name
//! `foo` resolves to the first of `<dir>/foo.md` or `<dir>/foo/SKILL.md`
//! across the configured directories, in order.

use crate::config::{Config, DomainConfig};
use crate::error::{EvalError, Result};
use std::path::{Path, PathBuf};

/// A domain ready to be judged: rubric and supporting context as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    pub name: String,
    pub rubric: String,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct ContentLibrary {
    dirs: Vec<PathBuf>,
}

impl ContentLibrary {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self::new(config.resolve_content_dirs(root))
    }

    /// Load the document called `name`.
    pub fn get(&self, name: &str) -> Result<String> {
        if !is_safe_name(name) {
            return Err(self.not_found(name));
        }
        for dir in &self.dirs {
            for candidate in [dir.join(format!("{name}.md")), dir.join(name).join("SKILL.md")] {
                if candidate.is_file() {
                    tracing::debug!(name, path = %candidate.display(), "loaded content");
                    return Ok(std::fs::read_to_string(&candidate)?);
                }
            }
        }
        Err(self.not_found(name))
    }

    /// Resolve a configured domain into its rubric and joined context.
    pub fn domain_spec(&self, domain: &DomainConfig) -> Result<DomainSpec> {
        let rubric = self.get(&domain.rubric)?;
        let mut sections = Vec::with_capacity(domain.context.len());
        for name in &domain.context {
            sections.push(format!("<!-- {name} -->\n{}", self.get(name)?.trim_end()));
        }
        Ok(DomainSpec {
            name: domain.name.clone(),
            rubric,
            context: sections.join("\n\n"),
        })
    }

    pub fn domain_specs(&self, domains: &[DomainConfig]) -> Result<Vec<DomainSpec>> {
        domains.iter().map(|d| self.domain_spec(d)).collect()
    }

    fn not_found(&self, name: &str) -> EvalError {
        let searched = self
            .dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        EvalError::ContentNotFound {
            name: name.to_string(),
            searched,
        }
    }
}

/// Names may contain `/` for grouping (`rails/models`) but never escape the
/// content directories.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.contains('\\')
        && name.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}
