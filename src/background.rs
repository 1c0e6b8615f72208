//! Background state list for the pseudo model (`bkg_list.yaml`).
//!
//! Background files are hourly ocean forecast diagnostics; the first one is
//! valid one hour after the window begins and each next file one hour later.
//! The ocean model itself starts from the restart written at window begin.

use crate::pattern::DmpdirPattern;
use anyhow::Context;
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PATTERN: &str = "gdas.t*.ocnf00[4-9]";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const RESTART_FORMAT: &str = "MOM.res.%Y-%m-%d-%H-%M-%S.nc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackgroundState {
    pub date: String,
    pub basename: String,
    pub ocn_filename: String,
    pub read_from_file: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackgroundList {
    pub states: Vec<BackgroundState>,
}

/// Files directly under `dir` whose name contains a match of `pattern`,
/// sorted by name.
pub fn list_backgrounds(dir: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let glob = DmpdirPattern::parse(&format!("*{}*", pattern))
        .with_context(|| format!("bad background pattern {:?}", pattern))?;

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read background dir {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| glob.is_match(n));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn build_states(
    files: &[PathBuf],
    dir: &Path,
    window_begin: NaiveDateTime,
) -> anyhow::Result<BackgroundList> {
    let basename = format!("{}/", dir.display());
    let hour = TimeDelta::hours(1);
    let mut date = window_begin;

    let mut states = Vec::with_capacity(files.len());
    for f in files {
        let stem = f
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        date = date
            .checked_add_signed(hour)
            .with_context(|| format!("background date after {} is out of range", date))?;
        states.push(BackgroundState {
            date: date.format(DATE_FORMAT).to_string(),
            basename: basename.clone(),
            ocn_filename: format!("{}.nc", stem),
            read_from_file: 1,
        });
    }

    Ok(BackgroundList { states })
}

/// Ocean model start-up derived from the window begin: the dated restart
/// the analysis links as `MOM.res.nc`, and `ocean_solo_nml.date_init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInit {
    pub window_begin: String,
    pub restart: String,
    pub date_init: [u32; 6],
}

pub fn restart_file_name(window_begin: NaiveDateTime) -> String {
    window_begin.format(RESTART_FORMAT).to_string()
}

/// `[year, month, day, hour, minute, second]`.
pub fn date_init(window_begin: NaiveDateTime) -> anyhow::Result<[u32; 6]> {
    let year = u32::try_from(window_begin.year())
        .with_context(|| format!("year of {} is before year 0", window_begin))?;
    Ok([
        year,
        window_begin.month(),
        window_begin.day(),
        window_begin.hour(),
        window_begin.minute(),
        window_begin.second(),
    ])
}

impl ModelInit {
    pub fn new(window_begin: NaiveDateTime) -> anyhow::Result<Self> {
        Ok(Self {
            window_begin: window_begin.format(DATE_FORMAT).to_string(),
            restart: restart_file_name(window_begin),
            date_init: date_init(window_begin)?,
        })
    }
}

impl BackgroundList {
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
