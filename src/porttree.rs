// porttree.rs -- Portage tree lookup for reporting

use std::fs;
use std::path::{Path, PathBuf};

use crate::exception::ProvenanceError;

// Top-level PORTDIR directories that are not package categories.
const NON_CATEGORY_DIRS: &[&str] = &[
    "distfiles", "eclass", "licenses", "local", "metadata", "packages", "profiles", "scripts",
];

/// A package resolved to its canonical identifier and location in the
/// tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    pub category: String,
    pub package: String,
    pub path: PathBuf,
}

impl PackageLocation {
    /// Canonical "category/package" identifier.
    pub fn cp(&self) -> String {
        format!("{}/{}", self.category, self.package)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join("metadata.xml")
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.path.join("ChangeLog")
    }
}

/// Read-only view of one Portage tree rooted at PORTDIR.
#[derive(Debug)]
pub struct PortTree {
    portdir: PathBuf,
}

impl PortTree {
    pub fn new(portdir: impl Into<PathBuf>) -> Self {
        PortTree {
            portdir: portdir.into(),
        }
    }

    pub fn portdir(&self) -> &Path {
        &self.portdir
    }

    /// Resolve a "[category/]package" argument to a canonical location.
    /// A bare package name is searched across all category directories;
    /// the lexically first category wins when more than one carries the
    /// name. Unknown packages are a `NotFound` error.
    pub fn resolve(&self, spec: &str) -> Result<PackageLocation, ProvenanceError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ProvenanceError::not_found("empty package spec"));
        }

        if let Some((category, package)) = spec.split_once('/') {
            let path = self.portdir.join(category).join(package);
            if path.is_dir() {
                return Ok(PackageLocation {
                    category: category.to_string(),
                    package: package.to_string(),
                    path,
                });
            }
            return Err(ProvenanceError::not_found(spec.to_string()));
        }

        let mut candidates = Vec::new();
        for category in self.categories()? {
            let path = self.portdir.join(&category).join(spec);
            if path.is_dir() {
                candidates.push(PackageLocation {
                    category,
                    package: spec.to_string(),
                    path,
                });
            }
        }
        candidates.sort_by(|a, b| a.category.cmp(&b.category));
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProvenanceError::not_found(spec.to_string()))
    }

    /// Category directory names, sorted for deterministic resolution.
    fn categories(&self) -> Result<Vec<String>, ProvenanceError> {
        if !self.portdir.is_dir() {
            return Err(ProvenanceError::not_found(format!(
                "PORTDIR: {}",
                self.portdir.display()
            )));
        }

        let mut categories = Vec::new();
        for entry in fs::read_dir(&self.portdir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with('.') || NON_CATEGORY_DIRS.contains(&name) {
                    continue;
                }
                categories.push(name.to_string());
            }
        }
        categories.sort();
        Ok(categories)
    }
}
