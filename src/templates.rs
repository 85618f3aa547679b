//! Template catalogue backed by a read-only directory of `.xlsx` files

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{XlFillError, XlFillResult};
use crate::excel::Workbook;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A template file on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    /// File name including the `.xlsx` extension
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
}

impl Template {
    /// File name without the extension
    pub fn stem(&self) -> &str {
        self.name
            .get(..self.name.len().saturating_sub(5))
            .unwrap_or(&self.name)
    }

    /// Read an independent in-memory copy of this template
    pub fn load(&self) -> XlFillResult<Workbook> {
        let bytes = std::fs::read(&self.path)?;
        Workbook::from_bytes(&self.name, &bytes)
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical file name for a template identifier: trimmed, `.xlsx`
    /// appended when missing, and free of path components
    pub fn normalize_name(name: &str) -> XlFillResult<String> {
        let trimmed = name.trim();
        let invalid = trimmed.is_empty()
            || trimmed.starts_with('.')
            || trimmed.contains(FORBIDDEN_CHARS)
            || trimmed.chars().any(char::is_control);
        if invalid {
            return Err(XlFillError::InvalidTemplateName(name.to_string()));
        }
        if trimmed.to_ascii_lowercase().ends_with(".xlsx") {
            Ok(trimmed.to_string())
        } else {
            Ok(format!("{}.xlsx", trimmed))
        }
    }

    /// Find a template by name
    pub fn resolve(&self, name: &str) -> XlFillResult<Template> {
        let filename = Self::normalize_name(name)?;
        let path = self.root.join(&filename);
        if !path.is_file() {
            return Err(XlFillError::TemplateNotFound(filename));
        }
        describe(filename, path)
    }

    /// Load an independent in-memory copy of a template
    pub fn load_template(&self, name: &str) -> XlFillResult<Workbook> {
        self.resolve(name)?.load()
    }

    /// All templates in the catalogue, sorted by name. Office lock files
    /// (`~$name.xlsx`) and unreadable entries are skipped.
    pub fn list(&self) -> XlFillResult<Vec<Template>> {
        let mut templates = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable template entry: {}", e);
                    continue;
                }
            };
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.to_ascii_lowercase().ends_with(".xlsx")
                || filename.starts_with("~$")
                || filename.starts_with('.')
            {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match describe(filename.clone(), path) {
                Ok(template) => templates.push(template),
                Err(e) => tracing::warn!("Skipping template {}: {}", filename, e),
            }
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

fn describe(name: String, path: PathBuf) -> XlFillResult<Template> {
    let metadata = std::fs::metadata(&path)?;
    let last_modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(Template {
        name,
        path,
        last_modified,
        size_bytes: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(TemplateStore::normalize_name("template-1").unwrap(), "template-1.xlsx");
        assert_eq!(TemplateStore::normalize_name("  budget.xlsx ").unwrap(), "budget.xlsx");
        assert_eq!(TemplateStore::normalize_name("Budget.XLSX").unwrap(), "Budget.XLSX");
    }

    #[test]
    fn test_normalize_name_rejects_paths() {
        for bad in ["../secrets", "a/b", "a\\b", "C:report", "what?", "", "   ", ".hidden", "a|b"] {
            assert!(
                matches!(
                    TemplateStore::normalize_name(bad),
                    Err(XlFillError::InvalidTemplateName(_))
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_stem() {
        let template = Template {
            name: "sales_summary.xlsx".into(),
            path: PathBuf::from("sales_summary.xlsx"),
            last_modified: Utc::now(),
            size_bytes: 0,
        };
        assert_eq!(template.stem(), "sales_summary");
    }
}
