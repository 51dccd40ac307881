//! Offline reconciliation of durable cache partitions
//!
//! Racing writers can leave several rows for one URL in a partition
//! document. The `Reconciler` reports on those duplicates and rewrites a
//! document so that only the first-inserted row per URL survives.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::durable::{DOCUMENT_EXTENSION, document_path, load_rows, write_rows};
use crate::config::is_valid_partition_name;
use crate::core::error::{Result, UrlProbeError};
use crate::core::types::ValidationResult;
use crate::reporting::logging;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub total_urls: usize,
    pub unique_urls: usize,
    pub total_duplicates: usize,
    pub duplicate_groups: usize,
    /// Most-duplicated URLs first, with their row counts
    pub top_duplicates: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub success: bool,
    pub before: usize,
    pub after: usize,
    pub removed: usize,
}

pub struct Reconciler {
    dir: PathBuf,
}

impl Reconciler {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of every partition document in the store directory, sorted.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION)
            {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|stem| stem.to_str())
                && is_valid_partition_name(name)
            {
                projects.push(name.to_string());
            }
        }
        projects.sort();
        Ok(projects)
    }

    pub fn analyze_duplicates(&self, project: &str, top_n: usize) -> Result<DuplicateReport> {
        let rows = self.load_project(project)?;

        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for row in &rows {
            *counts.entry(row.url.as_str()).or_default() += 1;
        }

        let mut groups: Vec<(String, usize)> = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(url, count)| (url.to_string(), *count))
            .collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let duplicate_groups = groups.len();
        groups.truncate(top_n);

        let report = DuplicateReport {
            total_urls: rows.len(),
            unique_urls: counts.len(),
            total_duplicates: rows.len() - counts.len(),
            duplicate_groups,
            top_duplicates: groups,
        };
        logging::log_duplicate_report(project, &report);
        Ok(report)
    }

    /// Keep the first-inserted row per URL and rewrite the document.
    pub fn repair_dataset(&self, project: &str) -> Result<RepairOutcome> {
        let rows = self.load_project(project)?;
        let before = rows.len();
        let kept = first_row_per_url(rows);
        let after = kept.len();

        let path = document_path(&self.dir, project);
        if after < before {
            write_rows(&path, &kept)?;
        }

        // A concurrent writer may have appended rows since the load
        let outcome = RepairOutcome {
            success: is_repaired(&load_rows(&path)?, after),
            before,
            after,
            removed: before - after,
        };
        logging::log_repair_outcome(project, &outcome);
        Ok(outcome)
    }

    fn load_project(&self, project: &str) -> Result<Vec<ValidationResult>> {
        let path = document_path(&self.dir, project);
        if !is_valid_partition_name(project) || !path.is_file() {
            return Err(UrlProbeError::ProjectNotFound(project.to_string()));
        }
        load_rows(&path)
    }
}

/// The document holds exactly `expected` rows, one per URL
fn is_repaired(rows: &[ValidationResult], expected: usize) -> bool {
    let mut seen = FxHashSet::default();
    rows.len() == expected && rows.iter().all(|row| seen.insert(row.url.as_str()))
}

fn first_row_per_url(rows: Vec<ValidationResult>) -> Vec<ValidationResult> {
    let mut seen = FxHashSet::with_capacity_and_hasher(rows.len(), Default::default());
    let mut unique = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.url.clone()) {
            unique.push(row);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::core::types::ValidationStatus;
    use tempfile::TempDir;

    fn row(url: &str, status_code: u16) -> ValidationResult {
        let mut row = ValidationResult::pending(url);
        row.status_code = status_code;
        if status_code == 200 {
            row.succeed();
        } else {
            row.fail(ValidationStatus::Error, format!("invalid response code: {status_code}"));
        }
        row
    }

    /// Ten rows where `dup.com` appears three times
    fn seed(dir: &TempDir, project: &str) -> Result<()> {
        let mut rows = vec![row("https://dup.com/a.pdf", 200)];
        for i in 0..7 {
            rows.push(row(&format!("https://site{i}.com/doc.pdf"), 200));
        }
        rows.push(row("https://dup.com/a.pdf", 404));
        rows.push(row("https://dup.com/a.pdf", 500));
        write_rows(&document_path(dir.path(), project), &rows)
    }

    #[test]
    fn test_list_projects__sorted_documents_only() -> Result<()> {
        let dir = TempDir::new()?;
        seed(&dir, "beta")?;
        seed(&dir, "alpha")?;
        fs::write(dir.path().join("notes.txt"), "ignore me")?;

        let reconciler = Reconciler::new(dir.path());
        assert_eq!(reconciler.list_projects()?, vec!["alpha", "beta"]);
        Ok(())
    }

    #[test]
    fn test_list_projects__missing_dir_is_empty() -> Result<()> {
        let reconciler = Reconciler::new("/path/that/does/not/exist");
        assert!(reconciler.list_projects()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_analyze_duplicates__counts_groups() -> Result<()> {
        let dir = TempDir::new()?;
        seed(&dir, "default")?;

        let report = Reconciler::new(dir.path()).analyze_duplicates("default", 10)?;

        assert_eq!(report.total_urls, 10);
        assert_eq!(report.unique_urls, 8);
        assert_eq!(report.total_duplicates, 2);
        assert_eq!(report.duplicate_groups, 1);
        assert_eq!(
            report.top_duplicates,
            vec![("https://dup.com/a.pdf".to_string(), 3)]
        );
        Ok(())
    }

    #[test]
    fn test_analyze_duplicates__top_n_ordering() -> Result<()> {
        let dir = TempDir::new()?;
        let rows = vec![
            row("https://b.com", 200),
            row("https://a.com", 200),
            row("https://c.com", 200),
            row("https://b.com", 200),
            row("https://a.com", 200),
            row("https://c.com", 200),
            row("https://c.com", 200),
        ];
        write_rows(&document_path(dir.path(), "mixed"), &rows)?;

        let report = Reconciler::new(dir.path()).analyze_duplicates("mixed", 2)?;

        assert_eq!(report.duplicate_groups, 3);
        assert_eq!(
            report.top_duplicates,
            vec![
                ("https://c.com".to_string(), 3),
                ("https://a.com".to_string(), 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_repair_dataset__keeps_first_row() -> Result<()> {
        let dir = TempDir::new()?;
        seed(&dir, "default")?;
        let reconciler = Reconciler::new(dir.path());

        let outcome = reconciler.repair_dataset("default")?;
        assert_eq!(
            outcome,
            RepairOutcome {
                success: true,
                before: 10,
                after: 8,
                removed: 2,
            }
        );

        let rows = load_rows(&document_path(dir.path(), "default"))?;
        assert_eq!(rows.len(), 8);
        let kept = rows.iter().find(|r| r.url == "https://dup.com/a.pdf").unwrap();
        assert_eq!(kept.status_code, 200);

        let report = reconciler.analyze_duplicates("default", 10)?;
        assert_eq!(report.total_duplicates, 0);
        assert!(report.top_duplicates.is_empty());
        Ok(())
    }

    #[test]
    fn test_repair_dataset__clean_project_is_untouched() -> Result<()> {
        let dir = TempDir::new()?;
        write_rows(
            &document_path(dir.path(), "clean"),
            &[row("https://a.com", 200), row("https://b.com", 200)],
        )?;

        let outcome = Reconciler::new(dir.path()).repair_dataset("clean")?;
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.after, 2);
        Ok(())
    }

    #[test]
    fn test_is_repaired__detects_leftover_duplicates_and_stray_rows() {
        let clean = [row("https://a.com", 200), row("https://b.com", 200)];
        let duplicated = [row("https://a.com", 200), row("https://a.com", 404)];

        assert!(is_repaired(&clean, 2));
        assert!(!is_repaired(&duplicated, 2));
        assert!(!is_repaired(&clean, 1));
    }

    #[test]
    fn test_unknown_project__is_not_found() {
        let dir = TempDir::new().unwrap();
        let reconciler = Reconciler::new(dir.path());

        for project in ["missing", "../escape"] {
            assert!(matches!(
                reconciler.analyze_duplicates(project, 10),
                Err(UrlProbeError::ProjectNotFound(_))
            ));
            assert!(matches!(
                reconciler.repair_dataset(project),
                Err(UrlProbeError::ProjectNotFound(_))
            ));
        }
    }
}
