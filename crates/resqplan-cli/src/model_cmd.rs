//! `resqplan model check <state.json>`.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use resqplan_core::{DanglingPolicy, StateEquivalence, from_state, to_state};
use resqplan_store::ModelState;

use crate::project_cmds::read_text;

/// Absolute tolerance for bounds, rhs and coefficients.
const TOLERANCE: f64 = 1e-9;

/// Accept a bare `ModelState` or an exported project carrying one under
/// `gurobiState`.
fn parse_state(raw: &str) -> Result<ModelState> {
    let value: Value = serde_json::from_str(raw).context("not valid JSON")?;
    let state = match value.get("gurobiState") {
        Some(inner) => inner.clone(),
        None => value,
    };
    serde_json::from_value(state).context("not a stored model state")
}

/// Rebuild the model, serialize it again and compare with the input.
pub fn check_state(state: &ModelState, policy: DanglingPolicy) -> Result<(bool, String)> {
    let model = from_state(state, policy).context("model does not rebuild")?;
    let again = to_state(&model);
    let equivalent = state.is_equivalent(&again, TOLERANCE);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Variables: {}  Constraints: {}  Objective terms: {} ({})",
        model.num_variables(),
        model.num_constraints(),
        model.objective().terms.len(),
        model.objective().sense
    );
    if equivalent {
        let _ = writeln!(out, "Round trip: equivalent");
    } else {
        let _ = writeln!(out, "Round trip: NOT equivalent");
        for (before, after) in state.cons.iter().zip(&again.cons) {
            if before.expr != after.expr {
                let _ = writeln!(out, "  {:?} -> {:?}", before.expr, after.expr);
            }
        }
        if state.objective.expr != again.objective.expr {
            let _ = writeln!(
                out,
                "  objective {:?} -> {:?}",
                state.objective.expr, again.objective.expr
            );
        }
    }
    Ok((equivalent, out))
}

pub fn run_model_check(path: &Path, policy: DanglingPolicy) -> Result<()> {
    let state = parse_state(&read_text(path)?)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let (equivalent, report) = check_state(&state, policy)?;
    print!("{report}");
    if !equivalent {
        bail!("{} does not survive a round trip", path.display());
    }
    Ok(())
}
