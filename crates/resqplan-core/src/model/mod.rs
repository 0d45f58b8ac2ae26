//! Live linear model.
//!
//! The in-memory counterpart of [`resqplan_store::ModelState`]: variables are
//! addressed by [`VariableId`] handles, expressions are stored as normalized
//! `(VariableId, coefficient)` lists, and names exist only for lookup and
//! rendering.

mod error;
pub mod ids;

use std::collections::{BTreeMap, HashMap};

use resqplan_store::{ConstraintSense, ObjectiveSense, VarKind};
use tracing::debug;

use crate::expr::render_terms;

pub use error::ModelError;
pub use ids::{ConstraintId, VariableId};

/// A decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub lb: f64,
    pub ub: f64,
    pub kind: VarKind,
}

/// A linear expression under construction: terms plus a constant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpr {
    pub terms: Vec<(VariableId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VariableId, coefficient: f64) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }
}

impl From<Vec<(VariableId, f64)>> for LinearExpr {
    fn from(terms: Vec<(VariableId, f64)>) -> Self {
        Self {
            terms,
            constant: 0.0,
        }
    }
}

/// `terms sense rhs`, with terms normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: Option<String>,
    pub terms: Vec<(VariableId, f64)>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub terms: Vec<(VariableId, f64)>,
}

/// A linear or mixed-integer model.
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    variables: Vec<Variable>,
    by_name: HashMap<String, VariableId>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl LinearModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lb: f64,
        ub: f64,
        kind: VarKind,
    ) -> Result<VariableId, ModelError> {
        let name = name.into();
        validate_name(&name)?;
        if self.by_name.contains_key(&name) {
            return Err(ModelError::DuplicateVariable { name });
        }
        if lb.is_nan() || ub.is_nan() || lb > ub {
            return Err(ModelError::InvalidBounds {
                name,
                lower: lb,
                upper: ub,
            });
        }

        let id = VariableId::new(self.variables.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.variables.push(Variable { name, lb, ub, kind });
        Ok(id)
    }

    /// Add a constraint. The expression constant moves to the right-hand side.
    pub fn add_constraint(
        &mut self,
        expr: impl Into<LinearExpr>,
        sense: ConstraintSense,
        rhs: f64,
        name: Option<String>,
    ) -> Result<ConstraintId, ModelError> {
        let expr = expr.into();
        let terms = self.normalize_terms(expr.terms)?;
        let rhs = rhs - expr.constant;
        if !rhs.is_finite() {
            return Err(ModelError::NonFinite {
                what: "right-hand side",
                value: rhs,
            });
        }

        let id = ConstraintId::new(self.constraints.len() as u32);
        debug!(
            component = "model",
            operation = "add_constraint",
            constraint_id = id.inner(),
            terms = terms.len(),
            "constraint added"
        );
        self.constraints.push(Constraint {
            name,
            terms,
            sense,
            rhs,
        });
        Ok(id)
    }

    /// Replace the objective. A constant part of `expr` is ignored.
    pub fn set_objective(
        &mut self,
        expr: impl Into<LinearExpr>,
        sense: ObjectiveSense,
    ) -> Result<(), ModelError> {
        let expr = expr.into();
        if expr.constant != 0.0 {
            debug!(constant = expr.constant, "ignoring objective constant");
        }
        let terms = self.normalize_terms(expr.terms)?;
        self.objective = Objective { sense, terms };
        Ok(())
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.by_name.get(name).copied()
    }

    /// Variables in creation order.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (VariableId::new(i as u32), v))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Render normalized terms in the `coef*name + ...` text form.
    pub fn render_expr(&self, terms: &[(VariableId, f64)]) -> String {
        render_terms(
            terms
                .iter()
                .filter_map(|(id, coef)| self.variable(*id).map(|v| (*coef, v.name.as_str()))),
        )
    }

    /// Sum duplicates, drop zeros, order by variable creation.
    fn normalize_terms(
        &self,
        terms: Vec<(VariableId, f64)>,
    ) -> Result<Vec<(VariableId, f64)>, ModelError> {
        let mut merged: BTreeMap<VariableId, f64> = BTreeMap::new();
        for (id, coef) in terms {
            if self.variable(id).is_none() {
                return Err(ModelError::InvalidVariableId(id));
            }
            if !coef.is_finite() {
                return Err(ModelError::NonFinite {
                    what: "coefficient",
                    value: coef,
                });
            }
            *merged.entry(id).or_insert(0.0) += coef;
        }
        Ok(merged.into_iter().filter(|(_, c)| *c != 0.0).collect())
    }
}

fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.is_empty() {
        return Err(ModelError::EmptyName);
    }
    if name.chars().any(|c| c.is_whitespace() || c == '+' || c == '*') {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_vars() -> (LinearModel, VariableId, VariableId) {
        let mut model = LinearModel::new();
        let x = model.add_variable("x", 0.0, 10.0, VarKind::Continuous).unwrap();
        let y = model.add_variable("y", 0.0, 1.0, VarKind::Binary).unwrap();
        (model, x, y)
    }

    #[test]
    fn variables_keep_creation_order() {
        let (model, x, y) = two_vars();
        let names: Vec<&str> = model.variables().map(|(_, v)| v.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(model.variable_id("y"), Some(y));
        assert_eq!(model.variable(x).unwrap().ub, 10.0);
    }

    #[test]
    fn rejects_bad_names_and_bounds() {
        let mut model = LinearModel::new();
        assert_eq!(
            model.add_variable("", 0.0, 1.0, VarKind::Binary),
            Err(ModelError::EmptyName)
        );
        assert!(matches!(
            model.add_variable("a b", 0.0, 1.0, VarKind::Binary),
            Err(ModelError::InvalidName { .. })
        ));
        assert!(matches!(
            model.add_variable("a*b", 0.0, 1.0, VarKind::Binary),
            Err(ModelError::InvalidName { .. })
        ));
        assert!(matches!(
            model.add_variable("x", 2.0, 1.0, VarKind::Continuous),
            Err(ModelError::InvalidBounds { .. })
        ));
        model.add_variable("x", 0.0, 1.0, VarKind::Binary).unwrap();
        assert!(matches!(
            model.add_variable("x", 0.0, 1.0, VarKind::Binary),
            Err(ModelError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn infinite_bounds_are_allowed() {
        let mut model = LinearModel::new();
        model
            .add_variable("free", f64::NEG_INFINITY, f64::INFINITY, VarKind::Continuous)
            .unwrap();
    }

    #[test]
    fn constraint_terms_are_normalized() {
        let (mut model, x, y) = two_vars();
        let expr = LinearExpr::new()
            .term(y, 2.0)
            .term(x, 1.0)
            .term(y, -2.0)
            .term(x, 3.0)
            .constant(5.0);
        model
            .add_constraint(expr, ConstraintSense::LessEqual, 8.0, None)
            .unwrap();

        let c = &model.constraints()[0];
        assert_eq!(c.terms, vec![(x, 4.0)]);
        assert_eq!(c.rhs, 3.0);
        assert_eq!(model.render_expr(&c.terms), "4*x");
    }

    #[test]
    fn empty_constraint_is_valid() {
        let (mut model, _, _) = two_vars();
        model
            .add_constraint(LinearExpr::new(), ConstraintSense::GreaterEqual, 0.0, None)
            .unwrap();
        assert_eq!(model.render_expr(&model.constraints()[0].terms), "");
    }

    #[test]
    fn unknown_variable_id_is_rejected() {
        let (mut model, _, _) = two_vars();
        let err = model
            .add_constraint(
                vec![(VariableId::new(99), 1.0)],
                ConstraintSense::Equal,
                0.0,
                None,
            )
            .unwrap_err();
        assert_eq!(err, ModelError::InvalidVariableId(VariableId::new(99)));
    }

    #[test]
    fn objective_is_replaced() {
        let (mut model, x, y) = two_vars();
        model
            .set_objective(vec![(x, 1.0)], ObjectiveSense::Minimize)
            .unwrap();
        model
            .set_objective(vec![(y, -1.0), (x, 2.0)], ObjectiveSense::Maximize)
            .unwrap();
        assert_eq!(model.objective().sense, ObjectiveSense::Maximize);
        assert_eq!(model.render_expr(&model.objective().terms), "2*x + -1*y");
    }
}
