//! Dump-directory discovery: which raw files feed which observation space.
//!
//! Layout under the dump root:
//!
//!   <dmpdir>/<YYYYMMDDHH>/<dmpdir subdir>/<file>
//!
//! For every observation space (registry order) and every cycle in its
//! window, files whose name matches `dmpdir regex` are listed, sorted by name.

use crate::registry::ValidatedRegistry;
use crate::window::{AssimWindow, Cycle};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct StagePlan {
    pub cycle: Cycle,
    pub dmpdir: PathBuf,
    pub interval_hours: i64,
    pub spaces: Vec<StagedSpace>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedSpace {
    pub name: String,
    pub provider: String,
    pub output_file: String,
    pub pattern: String,
    pub window_first: Cycle,
    pub window_last: Cycle,
    pub files: Vec<StagedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    pub cycle: Cycle,
    pub path: PathBuf,
}

impl StagePlan {
    /// Names of observation spaces with no matching dump file.
    pub fn missing(&self) -> Vec<&str> {
        self.spaces
            .iter()
            .filter(|s| s.files.is_empty())
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.spaces.iter().map(|s| s.files.len()).sum()
    }
}

pub fn plan(
    registry: &ValidatedRegistry,
    dmpdir: &Path,
    cycle: Cycle,
    interval_hours: i64,
) -> anyhow::Result<StagePlan> {
    let mut spaces = Vec::with_capacity(registry.spaces.len());

    for (name, v) in &registry.spaces {
        let window = AssimWindow::new(cycle, interval_hours, v.space.window_or_default())
            .with_context(|| format!("window of observation space {}", name))?;

        let mut files = Vec::new();
        let cycles = window
            .cycles()
            .with_context(|| format!("window of observation space {}", name))?;
        for cyc in cycles {
            let dir = dmpdir.join(cyc.to_string()).join(&v.space.dmpdir_subdir);
            if !dir.is_dir() {
                debug!(space = %name, dir = %dir.display(), "no dump directory for cycle");
                continue;
            }

            let mut matched = Vec::new();
            for entry in fs::read_dir(&dir).with_context(|| format!("read dump dir {}", dir.display()))? {
                let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if v.pattern.is_match(file_name) {
                    matched.push(path);
                }
            }
            matched.sort();
            files.extend(matched.into_iter().map(|path| StagedFile { cycle: cyc, path }));
        }

        if files.is_empty() {
            warn!(space = %name, pattern = %v.pattern, "no dump files matched");
        } else {
            info!(space = %name, files = files.len(), "matched dump files");
        }

        spaces.push(StagedSpace {
            name: name.clone(),
            provider: v.space.provider.clone(),
            output_file: v.output_file.clone(),
            pattern: v.pattern.to_string(),
            window_first: window.first()?,
            window_last: window.last()?,
            files,
        });
    }

    Ok(StagePlan {
        cycle,
        dmpdir: dmpdir.to_path_buf(),
        interval_hours,
        spaces,
    })
}
