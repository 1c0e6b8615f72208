use crate::registry::Registry;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when reading or writing a registry file.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write registry {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML or a missing required field.
    #[error("failed to parse registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl Registry {
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(yaml: &str) -> RegistryResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize back to YAML. Record order and unknown keys are kept.
    pub fn to_yaml(&self) -> RegistryResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> RegistryResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_yaml()?).map_err(|source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Binning, Bounds, Window};
    use pretty_assertions::assert_eq;

    const TWO_SPACES: &str = r#"
observations:
- obs space:
    name: rads_adt_3a
    provider: RADS
    output file: rads_adt_3a.ioda.nc
    window:
      back: 4
      forward: 4
    dmpdir subdir: ADT
    dmpdir regex: 'rads_adt_3a_*.nc'
    bounds:
      units: m
      min: -4.0
      max: 4.0
    binning:
      stride: 15
      min number of obs: 10
- obs space:
    name: argo_wod
    provider: WOD
    dmpdir subdir: insitu
    dmpdir regex: 'wod_pfl_*.nc'
"#;

    #[test]
    fn parses_all_fields_in_order() {
        let reg = Registry::from_yaml(TWO_SPACES).unwrap();
        assert_eq!(reg.names(), vec!["rads_adt_3a", "argo_wod"]);

        let adt = reg.get("rads_adt_3a").unwrap();
        assert_eq!(adt.provider, "RADS");
        assert_eq!(adt.output_file.as_deref(), Some("rads_adt_3a.ioda.nc"));
        assert_eq!(adt.window, Some(Window { back: 4, forward: 4 }));
        assert_eq!(adt.dmpdir_subdir, "ADT");
        assert_eq!(adt.dmpdir_regex, "rads_adt_3a_*.nc");
        assert_eq!(
            adt.bounds,
            Some(Bounds {
                units: "m".to_string(),
                min: -4.0,
                max: 4.0
            })
        );
        assert_eq!(
            adt.binning,
            Some(Binning {
                stride: 15,
                min_number_of_obs: 10
            })
        );

        let argo = reg.get("argo_wod").unwrap();
        assert_eq!(argo.output_file, None);
        assert_eq!(argo.window, None);
        assert_eq!(argo.bounds, None);
        assert_eq!(argo.binning, None);
        assert_eq!(argo.output_file_name(), "argo_wod.nc");
        assert_eq!(argo.window_or_default(), Window { back: 0, forward: 0 });
    }

    #[test]
    fn round_trip_keeps_records_fields_and_order() {
        let reg = Registry::from_yaml(TWO_SPACES).unwrap();
        let yaml = reg.to_yaml().unwrap();
        let again = Registry::from_yaml(&yaml).unwrap();
        assert_eq!(reg, again);

        // Omitted optional blocks stay omitted.
        let argo_at = yaml.find("name: argo_wod").unwrap();
        assert!(!yaml[argo_at..].contains("bounds"));
        assert!(!yaml[argo_at..].contains("output file"));
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let yaml = r#"
version: 2
observations:
- obs space:
    name: sss_smap
    provider: SMAP
    dmpdir subdir: SSS
    dmpdir regex: 'SMAP_L2B_SSS_*.h5'
    qc flag: strict
  obs filters: []
"#;
        let reg = Registry::from_yaml(yaml).unwrap();
        assert_eq!(reg.extra.get("version"), Some(&serde_yaml::Value::from(2)));
        assert!(reg.observations[0].extra.contains_key("obs filters"));
        assert_eq!(
            reg.observations[0].obs_space.extra.get("qc flag"),
            Some(&serde_yaml::Value::from("strict"))
        );

        let again = Registry::from_yaml(&reg.to_yaml().unwrap()).unwrap();
        assert_eq!(reg, again);
    }

    #[test]
    fn missing_required_field_is_a_yaml_error() {
        let yaml = r#"
observations:
- obs space:
    name: no_regex
    provider: RADS
    dmpdir subdir: ADT
"#;
        let result = Registry::from_yaml(yaml);
        assert!(
            matches!(result, Err(RegistryError::Yaml(_))),
            "expected Yaml error, got {:?}",
            result
        );
    }

    #[test]
    fn negative_window_parses_for_later_validation() {
        let yaml = r#"
observations:
- obs space:
    name: late
    provider: X
    window: {back: -1, forward: 2}
    dmpdir subdir: d
    dmpdir regex: '*.nc'
"#;
        let reg = Registry::from_yaml(yaml).unwrap();
        assert_eq!(reg.get("late").unwrap().window, Some(Window { back: -1, forward: 2 }));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs_list.yaml");

        let reg = Registry::from_yaml(TWO_SPACES).unwrap();
        reg.save(&path).unwrap();
        assert_eq!(Registry::load(&path).unwrap(), reg);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Registry::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, RegistryError::Read { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }
}
