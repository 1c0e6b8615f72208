//! Check results: violations found in registries and templates, plus rendering.

pub mod render;
pub mod violation;

pub use render::{Format, render_report};
pub use violation::{Severity, Violation};

use serde::Serialize;

/// Violations found in one checked file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub kind: FileKind,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Registry,
    Template,
}

/// Aggregated result of a `check` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub files: Vec<FileReport>,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, kind: FileKind, violations: Vec<Violation>) {
        for v in &violations {
            match v.severity {
                Severity::Error => self.errors += 1,
                Severity::Warning => self.warnings += 1,
            }
        }
        self.files.push(FileReport {
            path: path.into(),
            kind,
            violations,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut report = CheckReport::new();
        report.push(
            "obs.yaml",
            FileKind::Registry,
            vec![
                Violation::error("DUPLICATE_NAME", "observations[1]", "dup"),
                Violation::warning("OUTPUT_COLLISION", "observations[2]", "same file"),
            ],
        );
        report.push("config.ocnanal", FileKind::Template, vec![]);

        assert_eq!(report.errors, 1);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.files.len(), 2);
        assert!(report.has_errors());
    }
}
