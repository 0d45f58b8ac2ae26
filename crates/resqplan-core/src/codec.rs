//! Conversion between a live [`LinearModel`] and its flat [`ModelState`].
//!
//! Reconstruction always creates every variable before parsing any
//! expression. Parsing a constraint against a partially built variable map
//! would silently drop terms that reference variables declared later.

use std::collections::{BTreeMap, BTreeSet};

use resqplan_store::{ConsEntry, ModelState, ObjectiveEntry, VarEntry};
use thiserror::Error;
use tracing::debug;

use crate::expr::{DanglingPolicy, ExprError, parse_terms};
use crate::model::{LinearExpr, LinearModel, ModelError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("{location}: {source}")]
    Expr {
        location: String,
        #[source]
        source: ExprError,
    },
}

/// Flatten `model` into its storage form.
pub fn to_state(model: &LinearModel) -> ModelState {
    let vars = model
        .variables()
        .map(|(_, v)| VarEntry {
            name: v.name.clone(),
            lb: v.lb,
            ub: v.ub,
            kind: v.kind,
        })
        .collect();

    let cons = model
        .constraints()
        .iter()
        .map(|c| ConsEntry {
            expr: model.render_expr(&c.terms),
            sense: c.sense,
            rhs: c.rhs,
            name: c.name.clone(),
        })
        .collect();

    let objective = ObjectiveEntry {
        expr: model.render_expr(&model.objective().terms),
        sense: model.objective().sense,
    };

    ModelState {
        vars,
        cons,
        objective,
    }
}

/// Rebuild a live model from `state`.
///
/// An empty state yields an empty model. A constraint whose terms all drop
/// out is still created, with an empty left-hand side.
pub fn from_state(state: &ModelState, policy: DanglingPolicy) -> Result<LinearModel, CodecError> {
    let mut model = LinearModel::new();

    for var in &state.vars {
        model.add_variable(var.name.clone(), var.lb, var.ub, var.kind)?;
    }

    for (index, con) in state.cons.iter().enumerate() {
        let expr = lower_expr(&model, &con.expr, policy).map_err(|source| CodecError::Expr {
            location: match &con.name {
                Some(name) => format!("constraint {index} ({name})"),
                None => format!("constraint {index}"),
            },
            source,
        })?;
        model.add_constraint(expr, con.sense, con.rhs, con.name.clone())?;
    }

    let objective =
        lower_expr(&model, &state.objective.expr, policy).map_err(|source| CodecError::Expr {
            location: "objective".to_string(),
            source,
        })?;
    model.set_objective(objective, state.objective.sense)?;

    debug!(
        component = "codec",
        operation = "from_state",
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        "model reconstructed"
    );
    Ok(model)
}

fn lower_expr(
    model: &LinearModel,
    text: &str,
    policy: DanglingPolicy,
) -> Result<LinearExpr, ExprError> {
    let terms = parse_terms(text, |name| model.variable_id(name).is_some(), policy)?;
    Ok(terms
        .into_iter()
        .filter_map(|t| model.variable_id(&t.variable).map(|id| (id, t.coefficient)))
        .collect::<Vec<_>>()
        .into())
}

/// Round-trip comparison of stored models.
pub trait StateEquivalence {
    /// Same variables (names, kinds, bounds), same number of constraints with
    /// the same sense and rhs in the same order, and expressions equal as
    /// summed term multisets. Numbers compare within `tol`.
    fn is_equivalent(&self, other: &Self, tol: f64) -> bool;
}

impl StateEquivalence for ModelState {
    fn is_equivalent(&self, other: &Self, tol: f64) -> bool {
        let vars_match = self.vars.len() == other.vars.len()
            && self.vars.iter().zip(&other.vars).all(|(a, b)| {
                a.name == b.name
                    && a.kind == b.kind
                    && close(a.lb, b.lb, tol)
                    && close(a.ub, b.ub, tol)
            });
        if !vars_match {
            return false;
        }

        let cons_match = self.cons.len() == other.cons.len()
            && self.cons.iter().zip(&other.cons).all(|(a, b)| {
                a.sense == b.sense
                    && close(a.rhs, b.rhs, tol)
                    && same_terms(&a.expr, &b.expr, tol)
            });

        cons_match
            && self.objective.sense == other.objective.sense
            && same_terms(&self.objective.expr, &other.objective.expr, tol)
    }
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol
}

fn summed_terms(text: &str) -> BTreeMap<String, f64> {
    let mut sums = BTreeMap::new();
    // Every name is treated as known, so lenient parsing cannot fail.
    let terms = parse_terms(text, |_| true, DanglingPolicy::Lenient).unwrap_or_default();
    for term in terms {
        *sums.entry(term.variable).or_insert(0.0) += term.coefficient;
    }
    sums
}

fn same_terms(a: &str, b: &str, tol: f64) -> bool {
    let a = summed_terms(a);
    let b = summed_terms(b);
    let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    names.into_iter().all(|name| {
        close(
            a.get(name).copied().unwrap_or(0.0),
            b.get(name).copied().unwrap_or(0.0),
            tol,
        )
    })
}
