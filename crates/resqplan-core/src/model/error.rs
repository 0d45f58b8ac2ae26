//! Model error types.

use thiserror::Error;

use super::ids::VariableId;

/// Errors raised while building a [`super::LinearModel`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("variable name is empty")]
    EmptyName,

    /// The name would not survive the `coef*name + ...` text form.
    #[error("variable name {name:?} contains whitespace, '+' or '*'")]
    InvalidName { name: String },

    #[error("variable {name:?} already exists")]
    DuplicateVariable { name: String },

    #[error("bounds of {name:?} invalid: lower ({lower}) > upper ({upper})")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    #[error("variable id {} does not exist", .0.inner())]
    InvalidVariableId(VariableId),

    #[error("{what} is not a finite number: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

impl ModelError {
    /// Stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::EmptyName => "VARIABLE_EMPTY_NAME",
            ModelError::InvalidName { .. } => "VARIABLE_INVALID_NAME",
            ModelError::DuplicateVariable { .. } => "VARIABLE_DUPLICATE",
            ModelError::InvalidBounds { .. } => "VARIABLE_INVALID_BOUNDS",
            ModelError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            ModelError::NonFinite { .. } => "VALUE_NOT_FINITE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_code() {
        let err = ModelError::InvalidBounds {
            name: "x".into(),
            lower: 2.0,
            upper: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "bounds of \"x\" invalid: lower (2) > upper (1)"
        );
        assert_eq!(
            ModelError::InvalidVariableId(VariableId::new(4)).to_string(),
            "variable id 4 does not exist"
        );
        assert_eq!(err.code(), "VARIABLE_INVALID_BOUNDS");
    }
}
