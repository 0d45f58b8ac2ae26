//! Offline commands: `resqplan decode` and `resqplan grid`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use resqplan_core::grid::{BuildStats, dedup_relaxed};
use resqplan_core::{DecodedKey, FILTER_ALL, ScheduleGrid, decode};

/// One line per key: grammar, label, day and slot.
pub fn render_decoded(keys: &[String]) -> String {
    let mut out = String::new();
    for key in keys {
        let (grammar, assignment) = match decode(key) {
            DecodedKey::Tuple(a) => ("tuple", a),
            DecodedKey::Token(a) => ("token", a),
            DecodedKey::Unparsable => {
                let _ = writeln!(out, "{key}\tunparsable");
                continue;
            }
        };
        let _ = writeln!(
            out,
            "{key}\t{grammar}\t{}\tday {}\tslot {}",
            assignment.label(),
            assignment.day,
            assignment.slot
        );
    }
    out
}

pub fn run_decode(keys: &[String]) -> Result<()> {
    print!("{}", render_decoded(keys));
    Ok(())
}

/// A solution file: either the bare `{key: value}` map or a saved optimize
/// response with `solution` and `relaxed_constraints`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SolutionFile {
    Response {
        solution: BTreeMap<String, f64>,
        #[serde(default)]
        relaxed_constraints: Vec<String>,
    },
    Values(BTreeMap<String, f64>),
}

impl SolutionFile {
    fn into_parts(self) -> (BTreeMap<String, f64>, Vec<String>) {
        match self {
            Self::Response {
                solution,
                relaxed_constraints,
            } => (solution, relaxed_constraints),
            Self::Values(values) => (values, Vec::new()),
        }
    }
}

/// Grid table, filter choices, relaxed constraints and drop count as shown
/// by both `grid` and `optimize`.
pub fn render_schedule(
    grid: &ScheduleGrid,
    filter: &str,
    relaxed: &[String],
    stats: BuildStats,
) -> Result<String> {
    if filter != FILTER_ALL && !grid.filter_candidates().any(|c| c == filter) {
        let choices: Vec<&str> = grid.filter_candidates().collect();
        bail!(
            "unknown filter {filter:?}; choose {FILTER_ALL} or one of: {}",
            choices.join(", ")
        );
    }

    let mut out = grid.render(filter).to_text_table();
    let choices: Vec<&str> = grid.filter_candidates().collect();
    let _ = writeln!(out);
    let _ = writeln!(out, "Filter: {filter} (choices: {FILTER_ALL}, {})", choices.join(", "));
    if stats.dropped > 0 {
        let _ = writeln!(
            out,
            "Skipped {} of {} active key(s) that could not be decoded.",
            stats.dropped, stats.active
        );
    }
    if !relaxed.is_empty() {
        let _ = writeln!(out, "Relaxed constraints:");
        for text in relaxed {
            let _ = writeln!(out, "  - {text}");
        }
    }
    Ok(out)
}

pub fn run_grid(path: &Path, filter: &str, threshold: f64) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read solution file {}", path.display()))?;
    let file: SolutionFile = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a solution map", path.display()))?;
    let (values, relaxed) = file.into_parts();

    let (grid, stats) = ScheduleGrid::build_with_stats(&values, threshold);
    print!("{}", render_schedule(&grid, filter, &dedup_relaxed(&relaxed), stats)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(pairs: &[(&str, f64)]) -> (ScheduleGrid, BuildStats) {
        let values: BTreeMap<String, f64> =
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        ScheduleGrid::build_with_stats(&values, 0.5)
    }

    #[test]
    fn decoded_lines() {
        let out = render_decoded(&[
            "x(0, 1, 0)".to_string(),
            "x_Ana_Luis_2_3".to_string(),
            "y".to_string(),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "x(0, 1, 0)\ttuple\t0\tday 1\tslot 0");
        assert_eq!(lines[1], "x_Ana_Luis_2_3\ttoken\tAna / Luis\tday 2\tslot 3");
        assert_eq!(lines[2], "y\tunparsable");
    }

    #[test]
    fn solution_file_accepts_both_shapes() {
        let bare: SolutionFile = serde_json::from_str(r#"{"x_A_0_0": 1.0}"#).unwrap();
        let (values, relaxed) = bare.into_parts();
        assert_eq!(values.len(), 1);
        assert!(relaxed.is_empty());

        let response: SolutionFile = serde_json::from_str(
            r#"{"solution": {"x_A_0_0": 1.0}, "relaxed_constraints": ["a"]}"#,
        )
        .unwrap();
        let (values, relaxed) = response.into_parts();
        assert_eq!(values.len(), 1);
        assert_eq!(relaxed, vec!["a"]);
    }

    #[test]
    fn schedule_lists_filter_choices_and_relaxed() {
        let (grid, stats) = grid(&[("x_Ana_0_0", 1.0), ("x_Bea_1_0", 1.0), ("bogus", 1.0)]);
        let out = render_schedule(&grid, "Ana", &["no nights".to_string()], stats).unwrap();

        assert!(out.starts_with("Slot \\ Day | Day 1 | Day 2\n"), "got:\n{out}");
        assert!(out.contains("Slot 0     | Ana   | rest"), "got:\n{out}");
        assert!(out.contains("Filter: Ana (choices: ALL, Ana, Bea)"));
        assert!(out.contains("Skipped 1 of 3 active key(s)"));
        assert!(out.contains("  - no nights"));
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let (grid, stats) = grid(&[("x_Ana_0_0", 1.0)]);
        let err = render_schedule(&grid, "Zoe", &[], stats).unwrap_err();
        assert!(err.to_string().contains("choose ALL or one of: Ana"));
    }
}
