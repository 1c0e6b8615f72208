use crate::report::CheckReport;
use clap::ValueEnum;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Render a check report for stdout.
///
/// Text output is one `path: severity[CODE] location: message` line per
/// violation followed by a summary line; JSON is the serialized report.
pub fn render_report(report: &CheckReport, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(report)?),
        Format::Text => {
            let mut out = String::new();
            for file in &report.files {
                for v in &file.violations {
                    writeln!(out, "{}: {}", file.path, v)?;
                }
            }
            writeln!(
                out,
                "checked {} file(s): {} error(s), {} warning(s)",
                report.files.len(),
                report.errors,
                report.warnings
            )?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FileKind, Violation};
    use pretty_assertions::assert_eq;

    fn sample() -> CheckReport {
        let mut report = CheckReport::new();
        report.push(
            "parm/soca/obs/obs_list.yaml",
            FileKind::Registry,
            vec![Violation::error(
                "BOUNDS_ORDER",
                "observations[0].bounds",
                "min 5 is not below max 1",
            )],
        );
        report
    }

    #[test]
    fn text_lists_each_violation_then_summary() {
        let text = render_report(&sample(), Format::Text).unwrap();
        assert_eq!(
            text,
            "parm/soca/obs/obs_list.yaml: error[BOUNDS_ORDER] observations[0].bounds: min 5 is not below max 1\n\
             checked 1 file(s): 1 error(s), 0 warning(s)\n"
        );
    }

    #[test]
    fn json_carries_counts_and_codes() {
        let json = render_report(&sample(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["errors"], 1);
        assert_eq!(value["files"][0]["kind"], "registry");
        assert_eq!(value["files"][0]["violations"][0]["code"], "BOUNDS_ORDER");
        assert_eq!(value["files"][0]["violations"][0]["severity"], "error");
    }
}
