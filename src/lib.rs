//! Observation-space registry and environment-template toolkit for the
//! marine/atmosphere analysis workflow.
//!
//! - `registry`: typed `obs space` records, YAML load/save, structural checks
//! - `template`: `export NAME=VALUE` fragments with `@TOKEN@` placeholders
//! - `stage` / `background`: dump-file discovery and background state lists

pub mod background;
pub mod pattern;
pub mod registry;
pub mod report;
pub mod stage;
pub mod template;
pub mod window;

pub type Result<T> = anyhow::Result<T>;
