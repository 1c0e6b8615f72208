use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level registry document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub observations: Vec<ObsSpaceEntry>,

    /// Other top-level keys, kept so re-serialization is lossless.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// One list item: `- obs space: {...}` plus whatever sits beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsSpaceEntry {
    #[serde(rename = "obs space")]
    pub obs_space: ObsSpace,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// One observation data source.
///
/// Optional blocks are simply omitted in YAML; their presence is the only
/// signal that they apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsSpace {
    pub name: String,

    pub provider: String,

    #[serde(rename = "output file", default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,

    #[serde(rename = "dmpdir subdir")]
    pub dmpdir_subdir: String,

    #[serde(rename = "dmpdir regex")]
    pub dmpdir_regex: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binning: Option<Binning>,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// Physical validity range used for quality filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub units: String,
    pub min: f64,
    pub max: f64,
}

/// Spatial aggregation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binning {
    pub stride: i64,
    #[serde(rename = "min number of obs")]
    pub min_number_of_obs: i64,
}

/// Assimilation window in cycles before/after the analysis cycle.
///
/// Signed on purpose: negative counts are reported by validation instead of
/// failing the whole parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub back: i64,
    pub forward: i64,
}

impl ObsSpace {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        dmpdir_subdir: impl Into<String>,
        dmpdir_regex: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            output_file: None,
            window: None,
            dmpdir_subdir: dmpdir_subdir.into(),
            dmpdir_regex: dmpdir_regex.into(),
            bounds: None,
            binning: None,
            extra: IndexMap::new(),
        }
    }

    /// Explicit `output file`, or `<name>.nc` when the record omits it.
    pub fn output_file_name(&self) -> String {
        match &self.output_file {
            Some(f) => f.clone(),
            None => format!("{}.nc", self.name),
        }
    }

    /// The record's window, or the single analysis cycle when absent.
    pub fn window_or_default(&self) -> Window {
        self.window.unwrap_or(Window {
            back: 0,
            forward: 0,
        })
    }
}

impl From<ObsSpace> for ObsSpaceEntry {
    fn from(obs_space: ObsSpace) -> Self {
        Self {
            obs_space,
            extra: IndexMap::new(),
        }
    }
}

impl FromIterator<ObsSpace> for Registry {
    fn from_iter<I: IntoIterator<Item = ObsSpace>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().map(ObsSpaceEntry::from).collect(),
            extra: IndexMap::new(),
        }
    }
}
