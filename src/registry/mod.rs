//! Observation-space registry.
//!
//! YAML shape:
//!
//! ```yaml
//! observations:
//! - obs space:
//!     name: rads_adt_3a
//!     provider: RADS
//!     output file: rads_adt_3a.ioda.nc
//!     window:
//!       back: 4
//!       forward: 4
//!     dmpdir subdir: ADT
//!     dmpdir regex: 'rads_adt_3a_*.nc'
//!     bounds:
//!       units: m
//!       min: -4.0
//!       max: 4.0
//!     binning:
//!       stride: 15
//!       min number of obs: 10
//! ```
//!
//! Three layers, as for the other inputs:
//! - `record`: serde-friendly raw records (order and unknown keys preserved)
//! - `load`: file and string I/O
//! - `validate`: structural checks and the validated, name-keyed view

pub mod load;
pub mod record;
pub mod validate;

pub use load::{RegistryError, RegistryResult};
pub use record::{Binning, Bounds, ObsSpace, ObsSpaceEntry, Registry, Window};
pub use validate::{ValidatedObsSpace, ValidatedRegistry};

impl Registry {
    /// Observation spaces in file order.
    pub fn spaces(&self) -> impl Iterator<Item = &ObsSpace> {
        self.observations.iter().map(|e| &e.obs_space)
    }

    pub fn names(&self) -> Vec<&str> {
        self.spaces().map(|s| s.name.as_str()).collect()
    }

    /// First observation space with the given name.
    pub fn get(&self, name: &str) -> Option<&ObsSpace> {
        self.spaces().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
