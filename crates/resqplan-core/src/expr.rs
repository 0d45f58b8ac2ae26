//! Linear expressions in flat `coef*name + coef*name` text form.
//!
//! This is the textual form stored in [`resqplan_store::ModelState`]. The
//! parser expects sum-of-signed-terms normal form: subtraction is already
//! folded into negative coefficients, so `+` is the only term separator.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

/// One `coefficient * variable` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTerm {
    pub coefficient: f64,
    pub variable: String,
}

impl LinearTerm {
    pub fn new(coefficient: f64, variable: impl Into<String>) -> Self {
        Self {
            coefficient,
            variable: variable.into(),
        }
    }
}

/// What to do with a term that names a variable the model does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DanglingPolicy {
    /// Drop the term; it contributes zero.
    #[default]
    Lenient,
    /// Fail the parse with [`ExprError::DanglingReference`].
    Strict,
}

impl fmt::Display for DanglingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for DanglingPolicy {
    type Err = DanglingPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(DanglingPolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingPolicyParseError(pub String);

impl fmt::Display for DanglingPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid dangling policy: {:?} (expected lenient or strict)", self.0)
    }
}

impl std::error::Error for DanglingPolicyParseError {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("expression references unknown variable {name:?}")]
    DanglingReference { name: String },
}

/// Parse `expr` into terms, left to right.
///
/// Whitespace is ignored. A term without `*`, with an empty or nested name,
/// or with a coefficient that is not a finite number is malformed and always
/// dropped. A term naming a variable for which `is_known` returns `false` is
/// dropped or rejected according to `policy`. Duplicate names are kept as
/// separate terms.
pub fn parse_terms<F>(
    expr: &str,
    is_known: F,
    policy: DanglingPolicy,
) -> Result<Vec<LinearTerm>, ExprError>
where
    F: Fn(&str) -> bool,
{
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut terms = Vec::new();

    for raw in compact.split('+').filter(|t| !t.is_empty()) {
        let Some((coef_text, name)) = raw.split_once('*') else {
            debug!(term = raw, "dropping term without '*'");
            continue;
        };
        if name.is_empty() || name.contains('*') {
            debug!(term = raw, "dropping term with malformed variable name");
            continue;
        }
        let coefficient = match coef_text.parse::<f64>() {
            Ok(c) if c.is_finite() => c,
            _ => {
                debug!(term = raw, "dropping term with non-numeric coefficient");
                continue;
            }
        };

        if !is_known(name) {
            match policy {
                DanglingPolicy::Lenient => {
                    debug!(variable = name, "dropping dangling reference");
                    continue;
                }
                DanglingPolicy::Strict => {
                    return Err(ExprError::DanglingReference {
                        name: name.to_string(),
                    });
                }
            }
        }

        terms.push(LinearTerm::new(coefficient, name));
    }

    Ok(terms)
}

/// Render terms back into the text form accepted by [`parse_terms`].
///
/// Coefficients use `f64`'s `Display`, which is the shortest representation
/// that round-trips and never switches to exponent notation.
pub fn render_terms<'a, I>(terms: I) -> String
where
    I: IntoIterator<Item = (f64, &'a str)>,
{
    terms
        .into_iter()
        .map(|(coef, name)| format!("{coef}*{name}"))
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn known(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn parse(expr: &str, names: &[&str]) -> Vec<LinearTerm> {
        let set = known(names);
        parse_terms(expr, |n| set.contains(n), DanglingPolicy::Lenient).unwrap()
    }

    #[test]
    fn parses_simple_sum() {
        assert_eq!(
            parse("2*x+3*y", &["x", "y"]),
            vec![LinearTerm::new(2.0, "x"), LinearTerm::new(3.0, "y")]
        );
    }

    #[test]
    fn drops_dangling_terms_when_lenient() {
        assert_eq!(parse("2*x+3*z", &["x"]), vec![LinearTerm::new(2.0, "x")]);
    }

    #[test]
    fn strict_policy_rejects_dangling_terms() {
        let set = known(&["x"]);
        let err = parse_terms("2*x + 3*z", |n| set.contains(n), DanglingPolicy::Strict)
            .unwrap_err();
        assert_eq!(
            err,
            ExprError::DanglingReference {
                name: "z".to_string()
            }
        );
    }

    #[test]
    fn whitespace_and_negative_coefficients() {
        assert_eq!(
            parse(" 1.5 * x_A_0_0 +  -1 * load ", &["x_A_0_0", "load"]),
            vec![
                LinearTerm::new(1.5, "x_A_0_0"),
                LinearTerm::new(-1.0, "load")
            ]
        );
    }

    #[test]
    fn malformed_terms_are_dropped_even_when_strict() {
        let set = known(&["x", "y"]);
        let terms = parse_terms(
            "abc*x + y + 2* + 4*y + NaN*x + 2*x*y",
            |n| set.contains(n),
            DanglingPolicy::Strict,
        )
        .unwrap();
        assert_eq!(terms, vec![LinearTerm::new(4.0, "y")]);
    }

    #[test]
    fn duplicates_are_not_fused() {
        assert_eq!(parse("1*x + 2*x", &["x"]).len(), 2);
    }

    #[test]
    fn empty_expression_has_no_terms() {
        assert!(parse("", &["x"]).is_empty());
        assert!(parse("   ", &["x"]).is_empty());
    }

    #[test]
    fn render_is_reparsable() {
        let text = render_terms([(2.0, "x"), (-0.25, "y"), (1e-7, "z")]);
        assert_eq!(text, "2*x + -0.25*y + 0.0000001*z");
        assert_eq!(
            parse(&text, &["x", "y", "z"]),
            vec![
                LinearTerm::new(2.0, "x"),
                LinearTerm::new(-0.25, "y"),
                LinearTerm::new(1e-7, "z"),
            ]
        );
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("Strict".parse::<DanglingPolicy>().unwrap(), DanglingPolicy::Strict);
        assert_eq!("lenient".parse::<DanglingPolicy>().unwrap(), DanglingPolicy::Lenient);
        assert!("loose".parse::<DanglingPolicy>().is_err());
    }
}
