use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use obsprep::Result;
use obsprep::background::{self, ModelInit};
use obsprep::registry::Registry;
use obsprep::report::{CheckReport, FileKind, Format, Violation, render_report};
use obsprep::stage;
use obsprep::template::{Mode, Template};
use obsprep::window::{self, Cycle};

#[derive(Parser)]
#[command(name = "obsprep")]
#[command(about = "Observation-space registry and environment template toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate registries and templates; exits non-zero if any error is found.
    Check {
        #[arg(long = "registry")]
        registries: Vec<PathBuf>,

        #[arg(long = "template")]
        templates: Vec<PathBuf>,

        /// Treat templates as already rendered: leftover placeholders are errors.
        #[arg(long)]
        resolved: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Re-serialize a registry (record order and unknown keys kept).
    Normalize {
        #[arg(long)]
        registry: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// List placeholders and externally supplied variables of templates.
    Placeholders {
        #[arg(long = "template", required = true)]
        templates: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Match dump files to observation spaces for one analysis cycle.
    Stage {
        #[arg(long)]
        registry: PathBuf,

        #[arg(long, env = "DMPDIR")]
        dmpdir: PathBuf,

        #[arg(long, env = "CDATE")]
        cdate: String,

        #[arg(long, default_value_t = 6)]
        interval_hours: i64,

        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = PlanFormat::Yaml)]
        format: PlanFormat,
    },

    /// Write the background state list for the pseudo model.
    BkgList {
        #[arg(long, env = "COMIN_GES")]
        bkg_dir: PathBuf,

        #[arg(long, env = "CDATE")]
        cdate: String,

        #[arg(long, env = "assim_freq", default_value_t = 6)]
        assim_freq: i64,

        #[arg(long, default_value = background::DEFAULT_PATTERN)]
        pattern: String,

        #[arg(short = 'o', long, default_value = "bkg_list.yaml")]
        out: PathBuf,
    },

    /// Print the ocean model start-up: window begin, restart file, `date_init`.
    ModelInit {
        #[arg(long, env = "CDATE")]
        cdate: String,

        #[arg(long, env = "assim_freq", default_value_t = 6)]
        assim_freq: i64,

        #[arg(long, value_enum, default_value_t = PlanFormat::Yaml)]
        format: PlanFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlanFormat {
    Yaml,
    Json,
}

/// Logs go to stderr; `RUST_LOG` filters, `OBSPREP_LOG_FORMAT` picks
/// `compact` (default), `pretty` or `json`.
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("obsprep=info"));
    let log_format = std::env::var("OBSPREP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let subscriber = tracing_subscriber::registry().with(env_filter);
    match log_format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "pretty" => subscriber
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        _ => subscriber
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli.cmd)
}

fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Check {
            registries,
            templates,
            resolved,
            format,
        } => {
            if registries.is_empty() && templates.is_empty() {
                bail!("nothing to check: pass --registry and/or --template");
            }
            let mode = if resolved { Mode::Resolved } else { Mode::Raw };
            let report = check_files(&registries, &templates, mode);

            print!("{}", render_report(&report, format)?);
            if report.has_errors() {
                bail!("check failed with {} error(s)", report.errors);
            }
        }

        Commands::Normalize { registry, out } => {
            let reg = Registry::load(&registry)?;
            reg.save(&out)?;
            info!(records = reg.len(), "normalized {}", registry.display());
            println!("Wrote {}", out.display());
        }

        Commands::Placeholders { templates, format } => {
            print!("{}", render_placeholders(&templates, format)?);
        }

        Commands::Stage {
            registry,
            dmpdir,
            cdate,
            interval_hours,
            out,
            format,
        } => {
            let reg = Registry::load(&registry)?;
            let validated = reg
                .validate_and_build()
                .with_context(|| format!("validate {}", registry.display()))?;
            let cycle = Cycle::parse(&cdate)?;

            let plan = stage::plan(&validated, &dmpdir, cycle, interval_hours)?;
            info!(
                cycle = %cycle,
                spaces = plan.spaces.len(),
                files = plan.file_count(),
                missing = plan.missing().len(),
                "stage plan ready"
            );

            let text = match format {
                PlanFormat::Yaml => serde_yaml::to_string(&plan)?,
                PlanFormat::Json => serde_json::to_string_pretty(&plan)?,
            };
            match out {
                Some(out) => {
                    std::fs::write(&out, text)
                        .with_context(|| format!("write stage plan {}", out.display()))?;
                    println!("Wrote {}", out.display());
                }
                None => print!("{}", text),
            }
        }

        Commands::BkgList {
            bkg_dir,
            cdate,
            assim_freq,
            pattern,
            out,
        } => {
            let cycle = Cycle::parse(&cdate)?;
            let begin = window::window_begin(cycle, assim_freq)?;
            let files = background::list_backgrounds(&bkg_dir, &pattern)?;
            if files.is_empty() {
                warn!(
                    pattern = %pattern,
                    dir = %bkg_dir.display(),
                    "no background files matched, writing an empty state list"
                );
            }

            let list = background::build_states(&files, &bkg_dir, begin)?;
            std::fs::write(&out, list.to_yaml()?)
                .with_context(|| format!("write background list {}", out.display()))?;
            info!(states = list.states.len(), window_begin = %begin, "background list ready");
            println!("Wrote {}", out.display());
        }

        Commands::ModelInit {
            cdate,
            assim_freq,
            format,
        } => {
            let cycle = Cycle::parse(&cdate)?;
            let init = ModelInit::new(window::window_begin(cycle, assim_freq)?)?;
            match format {
                PlanFormat::Yaml => print!("{}", serde_yaml::to_string(&init)?),
                PlanFormat::Json => println!("{}", serde_json::to_string_pretty(&init)?),
            }
        }
    }

    Ok(())
}

fn render_placeholders(templates: &[PathBuf], format: Format) -> Result<String> {
    let mut inventories = Vec::new();
    for path in templates {
        let t = Template::load(path)?;
        inventories.push(t.inventory(path.display().to_string()));
    }
    Ok(match format {
        Format::Json => format!("{}\n", serde_json::to_string_pretty(&inventories)?),
        Format::Text => {
            let mut out = String::new();
            for inv in &inventories {
                out.push_str(&format!("{}\n", inv.path));
                out.push_str(&format!("  placeholders: {}\n", inv.placeholders.join(", ")));
                out.push_str(&format!(
                    "  external:     {}\n",
                    inv.external_references.join(", ")
                ));
            }
            out
        }
    })
}

/// Check every file, turning load failures into violations so one bad file
/// does not hide problems in the others.
fn check_files(registries: &[PathBuf], templates: &[PathBuf], mode: Mode) -> CheckReport {
    let mut report = CheckReport::new();

    for path in registries {
        let shown = path.display().to_string();
        let violations = match Registry::load(path) {
            Ok(reg) => {
                info!(path = %shown, records = reg.len(), "checking registry");
                reg.validate()
            }
            Err(e) => {
                error!(path = %shown, "{}", e);
                vec![Violation::error("PARSE_ERROR", &shown, e.to_string())]
            }
        };
        report.push(shown, FileKind::Registry, violations);
    }

    for path in templates {
        let shown = path.display().to_string();
        let violations = match Template::load(path) {
            Ok(t) => {
                info!(path = %shown, exports = t.exports().count(), "checking template");
                t.validate(mode)
            }
            Err(e) => {
                error!(path = %shown, "{}", e);
                vec![Violation::error("SYNTAX_ERROR", &shown, e.to_string())]
            }
        };
        report.push(shown, FileKind::Template, violations);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn parm(rel: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("parm").join(rel)
    }

    const TEMPLATES: [&str; 3] = [
        "config/config.atmanl",
        "config/config.ocnanal",
        "config/config.ocnanalrun",
    ];

    #[test]
    fn shipped_registry_is_clean() {
        let reg = Registry::load(parm("soca/obs/obs_list.yaml")).unwrap();
        assert_eq!(reg.validate(), Vec::<Violation>::new());
        assert!(reg.len() > 10);

        let again = Registry::from_yaml(&reg.to_yaml().unwrap()).unwrap();
        assert_eq!(reg, again);
    }

    #[test]
    fn shipped_templates_parse_and_keep_placeholders() {
        for rel in TEMPLATES {
            let path = parm(rel);
            let text = std::fs::read_to_string(&path).unwrap();
            let t = Template::parse(&text).unwrap_or_else(|e| panic!("{}: {}", rel, e));
            assert_eq!(t.validate(Mode::Raw), Vec::<Violation>::new(), "{}", rel);
            assert_eq!(t.render(), text, "{}", rel);
            assert!(!t.placeholders().is_empty(), "{} has no placeholders", rel);
        }
    }

    #[test]
    fn shipped_templates_are_not_deployable_as_is() {
        let report = check_files(
            &[],
            &TEMPLATES.iter().map(|r| parm(r)).collect::<Vec<_>>(),
            Mode::Resolved,
        );
        assert!(report.has_errors());
        assert!(
            report
                .files
                .iter()
                .flat_map(|f| &f.violations)
                .all(|v| v.code == "UNRESOLVED_PLACEHOLDER")
        );
    }

    #[test]
    fn atmanl_inventory() {
        let t = Template::load(parm("config/config.atmanl")).unwrap();
        assert_eq!(
            t.placeholders(),
            vec![
                "CASE_ANL",
                "ATMRES_ANL",
                "LAYOUT_X_ATMANL",
                "LAYOUT_Y_ATMANL",
                "IO_LAYOUT_X",
                "IO_LAYOUT_Y"
            ]
        );
        assert_eq!(t.external_references(), vec!["HOMEgfs"]);
    }

    #[test]
    fn check_reports_parse_failures_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad_reg = dir.path().join("bad.yaml");
        std::fs::write(&bad_reg, "observations: [ {obs space: {name: x}} ]\n").unwrap();
        let bad_tpl = dir.path().join("config.bad");
        std::fs::write(&bad_tpl, "export A=1\necho hi\n").unwrap();

        let report = check_files(
            &[bad_reg, parm("soca/obs/obs_list.yaml")],
            &[bad_tpl],
            Mode::Raw,
        );
        let codes: Vec<Vec<&str>> = report
            .files
            .iter()
            .map(|f| f.violations.iter().map(|v| v.code).collect())
            .collect();
        assert_eq!(codes, vec![vec!["PARSE_ERROR"], vec![], vec!["SYNTAX_ERROR"]]);
        assert!(report.files[2].violations[0].message.starts_with("line 2:"));
    }

    fn run_args(args: &[&str]) -> Result<()> {
        let cli = Cli::try_parse_from(std::iter::once("obsprep").chain(args.iter().copied()))?;
        run(cli.cmd)
    }

    /// Top-level keys of each record, in written order.
    fn record_keys(yaml: &str) -> Vec<Vec<String>> {
        let doc: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        doc["observations"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|r| {
                r["obs space"]
                    .as_mapping()
                    .unwrap()
                    .keys()
                    .map(|k| k.as_str().unwrap().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn normalize_keeps_records_and_key_layout() {
        let dir = tempfile::tempdir().unwrap();
        let src = parm("soca/obs/obs_list.yaml");
        let out = dir.path().join("obs_list.yaml");
        run_args(&[
            "normalize",
            "--registry",
            src.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(Registry::load(&out).unwrap(), Registry::load(&src).unwrap());
        let written = std::fs::read_to_string(&out).unwrap();
        let shipped = std::fs::read_to_string(&src).unwrap();
        assert_eq!(record_keys(&written), record_keys(&shipped));
    }

    #[test]
    fn placeholders_reports_each_template() {
        let paths = vec![parm("config/config.atmanl"), parm("config/config.ocnanal")];

        let json: serde_json::Value =
            serde_json::from_str(&render_placeholders(&paths, Format::Json).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["placeholders"][0], "CASE_ANL");
        assert_eq!(json[0]["external_references"], serde_json::json!(["HOMEgfs"]));

        let text = render_placeholders(&paths[..1], Format::Text).unwrap();
        assert!(text.contains("  external:     HOMEgfs\n"), "{}", text);
        assert!(text.contains("CASE_ANL, ATMRES_ANL"), "{}", text);

        let missing = Path::new("/nonexistent/config.x").to_path_buf();
        assert!(render_placeholders(&[missing], Format::Text).is_err());
    }

    #[test]
    fn bkg_list_writes_hourly_states() {
        let bkg = tempfile::tempdir().unwrap();
        for n in ["gdas.t06z.ocnf004.nc", "gdas.t06z.ocnf005.nc", "gdas.t06z.ocnf003.nc"] {
            std::fs::write(bkg.path().join(n), b"").unwrap();
        }
        let out = bkg.path().join("bkg_list.yaml");
        run_args(&[
            "bkg-list",
            "--bkg-dir",
            bkg.path().to_str().unwrap(),
            "--cdate",
            "2021070112",
            "--assim-freq",
            "6",
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();

        let doc: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let states = doc["states"].as_sequence().unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0]["date"], "2021-07-01T10:00:00Z");
        assert_eq!(states[1]["ocn_filename"], "gdas.t06z.ocnf005.nc");
    }

    #[test]
    fn bkg_list_without_matches_writes_empty_states() {
        let bkg = tempfile::tempdir().unwrap();
        let out = bkg.path().join("bkg_list.yaml");
        run_args(&[
            "bkg-list",
            "--bkg-dir",
            bkg.path().to_str().unwrap(),
            "--cdate",
            "2021070112",
            "--assim-freq",
            "6",
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "states: []\n");
    }

    #[test]
    fn bkg_list_rejects_out_of_range_assim_freq() {
        let bkg = tempfile::tempdir().unwrap();
        let out = bkg.path().join("bkg_list.yaml");
        let err = run_args(&[
            "bkg-list",
            "--bkg-dir",
            bkg.path().to_str().unwrap(),
            "--cdate",
            "2021070112",
            "--assim-freq",
            "1000000000000",
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
        assert!(!out.exists());
    }

    #[test]
    fn model_init_runs_for_valid_cycle() {
        run_args(&["model-init", "--cdate", "2021070112", "--assim-freq", "6"]).unwrap();
        assert!(run_args(&["model-init", "--cdate", "2021073212"]).is_err());
    }

    #[test]
    fn cli_parses_stage_arguments() {
        let cli = Cli::try_parse_from([
            "obsprep",
            "stage",
            "--registry",
            "obs.yaml",
            "--dmpdir",
            "/dmp",
            "--cdate",
            "2021070100",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Stage {
                interval_hours,
                format,
                out,
                ..
            } => {
                assert_eq!(interval_hours, 6);
                assert_eq!(format, PlanFormat::Json);
                assert_eq!(out, None);
            }
            _ => panic!("expected stage"),
        }
    }
}
