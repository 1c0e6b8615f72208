use crate::report::Violation;
use crate::template::{Template, line};
use std::collections::BTreeMap;

/// What stage of deployment the template is checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// As stored in the repository: placeholders expected.
    #[default]
    Raw,
    /// After the templating step: any remaining placeholder is an error.
    Resolved,
}

impl Template {
    pub fn validate(&self, mode: Mode) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut first_export: BTreeMap<&str, usize> = BTreeMap::new();

        for e in self.exports() {
            let loc = format!("line {}", e.line);

            if let Some(prev) = first_export.get(e.name.as_str()) {
                out.push(Violation::warning(
                    "DUPLICATE_EXPORT",
                    &loc,
                    format!("{} already exported on line {}", e.name, prev),
                ));
            } else {
                first_export.insert(e.name.as_str(), e.line);
            }

            for p in &e.placeholders {
                if !line::is_upper_snake(p) {
                    out.push(Violation::warning(
                        "PLACEHOLDER_CASE",
                        &loc,
                        format!("@{}@ is not an @UPPER_SNAKE_CASE@ placeholder", p),
                    ));
                } else if mode == Mode::Resolved {
                    out.push(Violation::error(
                        "UNRESOLVED_PLACEHOLDER",
                        &loc,
                        format!("{} still holds @{}@", e.name, p),
                    ));
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const OCNANAL: &str = "\
#!/bin/bash
# ocean analysis
export SOCA_INPUT_FIX_DIR=${HOMEgfs}/fix/gdas/soca/@OCNRES@
export SOCA_NINNER=@SOCA_NINNER@
export SOCA_VARS=tocn,socn,ssh
export SOCA_NINNER=50
export MOM6_LEVS=@mom6_levs@
";

    fn codes(t: &Template, mode: Mode) -> Vec<&'static str> {
        t.validate(mode).iter().map(|v| v.code).collect()
    }

    #[test]
    fn raw_mode_accepts_placeholders() {
        let t = Template::parse(OCNANAL).unwrap();
        assert_eq!(codes(&t, Mode::Raw), vec!["DUPLICATE_EXPORT", "PLACEHOLDER_CASE"]);
    }

    #[test]
    fn resolved_mode_flags_leftovers() {
        let t = Template::parse(OCNANAL).unwrap();
        let v = t.validate(Mode::Resolved);
        assert_eq!(
            v.iter().map(|v| v.code).collect::<Vec<_>>(),
            vec![
                "UNRESOLVED_PLACEHOLDER",
                "UNRESOLVED_PLACEHOLDER",
                "DUPLICATE_EXPORT",
                "PLACEHOLDER_CASE"
            ]
        );
        assert_eq!(v[0].location, "line 3");
        assert_eq!(v[0].message, "SOCA_INPUT_FIX_DIR still holds @OCNRES@");
        assert_eq!(v[2].message, "SOCA_NINNER already exported on line 4");
    }

    #[test]
    fn resolved_template_is_clean() {
        let t = Template::parse("export CASE_ANL=C384\nexport X=${CASE_ANL}\n").unwrap();
        assert_eq!(t.validate(Mode::Resolved), Vec::<Violation>::new());
    }
}
