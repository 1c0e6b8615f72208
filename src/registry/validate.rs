use crate::pattern::DmpdirPattern;
use crate::registry::{ObsSpace, Registry};
use crate::report::Violation;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// An observation space that passed validation, with its compiled pattern.
#[derive(Debug, Clone)]
pub struct ValidatedObsSpace {
    pub space: ObsSpace,
    pub pattern: DmpdirPattern,
    pub output_file: String,
}

/// Validated registry keyed by name, in file order.
#[derive(Debug, Clone)]
pub struct ValidatedRegistry {
    pub spaces: IndexMap<String, ValidatedObsSpace>,
}

fn location(idx: usize, space: &ObsSpace) -> String {
    if space.name.is_empty() {
        format!("observations[{}]", idx)
    } else {
        format!("observations[{}] ({})", idx, space.name)
    }
}

impl Registry {
    /// Run every structural check and collect all violations:
    /// - non-empty, unique names
    /// - non-empty provider and dmpdir subdir
    /// - dmpdir regex is a valid single-component glob
    /// - output file, when given, is a plain non-empty file name
    /// - bounds finite with min < max
    /// - window back/forward non-negative
    /// - binning stride >= 1, min number of obs >= 0
    /// - no two spaces writing the same output file (warning)
    pub fn validate(&self) -> Vec<Violation> {
        let mut out = Vec::new();

        if self.is_empty() {
            out.push(Violation::warning(
                "EMPTY_REGISTRY",
                "observations",
                "registry lists no observation spaces",
            ));
        }

        let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
        let mut outputs: BTreeMap<String, usize> = BTreeMap::new();

        for (idx, space) in self.spaces().enumerate() {
            let loc = location(idx, space);

            if space.name.trim().is_empty() {
                out.push(Violation::error("EMPTY_NAME", &loc, "name is empty"));
            } else if let Some(prev) = first_seen.insert(space.name.as_str(), idx) {
                // Keep pointing at the first occurrence for later duplicates.
                first_seen.insert(space.name.as_str(), prev);
                out.push(Violation::error(
                    "DUPLICATE_NAME",
                    &loc,
                    format!(
                        "name '{}' already used by observations[{}]",
                        space.name, prev
                    ),
                ));
            }

            if space.provider.trim().is_empty() {
                out.push(Violation::error("EMPTY_PROVIDER", &loc, "provider is empty"));
            }
            if space.dmpdir_subdir.trim().is_empty() {
                out.push(Violation::error(
                    "EMPTY_DMPDIR_SUBDIR",
                    &loc,
                    "dmpdir subdir is empty",
                ));
            }

            if let Err(e) = DmpdirPattern::parse(&space.dmpdir_regex) {
                out.push(Violation::error(
                    "BAD_DMPDIR_REGEX",
                    format!("{}.dmpdir regex", loc),
                    format!("'{}': {}", space.dmpdir_regex, e),
                ));
            }

            if let Some(file) = &space.output_file {
                if file.trim().is_empty() {
                    out.push(Violation::error(
                        "BAD_OUTPUT_FILE",
                        format!("{}.output file", loc),
                        "output file is empty",
                    ));
                } else if file.contains('/') {
                    out.push(Violation::error(
                        "BAD_OUTPUT_FILE",
                        format!("{}.output file", loc),
                        format!("'{}' must be a file name, not a path", file),
                    ));
                }
            }
            let output = space.output_file_name();
            if let Some(prev) = outputs.get(&output) {
                out.push(Violation::warning(
                    "OUTPUT_COLLISION",
                    &loc,
                    format!(
                        "output file '{}' also written by observations[{}]",
                        output, prev
                    ),
                ));
            } else {
                outputs.insert(output, idx);
            }

            if let Some(b) = &space.bounds {
                let bloc = format!("{}.bounds", loc);
                if !b.min.is_finite() || !b.max.is_finite() {
                    out.push(Violation::error(
                        "BOUNDS_NOT_FINITE",
                        &bloc,
                        format!("min {} / max {} must be finite", b.min, b.max),
                    ));
                } else if b.min >= b.max {
                    out.push(Violation::error(
                        "BOUNDS_ORDER",
                        &bloc,
                        format!("min {} is not below max {}", b.min, b.max),
                    ));
                }
                if b.units.trim().is_empty() {
                    out.push(Violation::warning("BOUNDS_UNITS", &bloc, "units are empty"));
                }
            }

            if let Some(w) = &space.window {
                let wloc = format!("{}.window", loc);
                if w.back < 0 {
                    out.push(Violation::error(
                        "WINDOW_NEGATIVE",
                        &wloc,
                        format!("back is {}", w.back),
                    ));
                }
                if w.forward < 0 {
                    out.push(Violation::error(
                        "WINDOW_NEGATIVE",
                        &wloc,
                        format!("forward is {}", w.forward),
                    ));
                }
            }

            if let Some(bin) = &space.binning {
                let bloc = format!("{}.binning", loc);
                if bin.stride < 1 {
                    out.push(Violation::error(
                        "BINNING_STRIDE",
                        &bloc,
                        format!("stride must be at least 1, got {}", bin.stride),
                    ));
                }
                if bin.min_number_of_obs < 0 {
                    out.push(Violation::error(
                        "BINNING_MIN_OBS",
                        &bloc,
                        format!(
                            "min number of obs must be non-negative, got {}",
                            bin.min_number_of_obs
                        ),
                    ));
                }
            }
        }

        out
    }

    /// Validate and build the name-keyed view used for staging.
    ///
    /// Fails with every error-level violation; warnings are logged.
    pub fn validate_and_build(&self) -> anyhow::Result<ValidatedRegistry> {
        use anyhow::{Context, bail};

        let violations = self.validate();
        let errors: Vec<String> = violations
            .iter()
            .filter(|v| v.is_error())
            .map(|v| v.to_string())
            .collect();
        for v in violations.iter().filter(|v| !v.is_error()) {
            tracing::warn!(code = v.code, location = %v.location, "{}", v.message);
        }
        if !errors.is_empty() {
            bail!(
                "registry has {} error(s):\n  {}",
                errors.len(),
                errors.join("\n  ")
            );
        }

        let mut spaces = IndexMap::new();
        for space in self.spaces() {
            let pattern = DmpdirPattern::parse(&space.dmpdir_regex)
                .with_context(|| format!("compile dmpdir regex of {}", space.name))?;
            spaces.insert(
                space.name.clone(),
                ValidatedObsSpace {
                    output_file: space.output_file_name(),
                    space: space.clone(),
                    pattern,
                },
            );
        }

        Ok(ValidatedRegistry { spaces })
    }
}
