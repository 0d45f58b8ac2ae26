//! Project and constraint lookup from command-line arguments.
//!
//! - [`resolve_project_id`] accepts either a project id or an exact project
//!   name, and fails on ambiguous names.
//! - [`select_constraint`] accepts either a constraint's text or its
//!   1-based position in `resqplan constraint list`.

use anyhow::{Result, bail};

use resqplan_core::ConstraintSet;
use resqplan_store::{ProjectStore, validate_id};

/// Turn `input` into a stored project id.
pub async fn resolve_project_id(store: &dyn ProjectStore, input: &str) -> Result<String> {
    if validate_id(input).is_ok() && store.get(input).await?.is_some() {
        return Ok(input.to_string());
    }

    let matches: Vec<_> = store
        .list()
        .await?
        .into_iter()
        .filter(|p| p.name == input)
        .collect();
    match matches.as_slice() {
        [] => bail!("no project with id or name {input:?}"),
        [one] => Ok(one.id.clone()),
        many => {
            let ids: Vec<&str> = many.iter().map(|p| p.id.as_str()).collect();
            bail!(
                "{} projects are named {input:?}; use one of the ids: {}",
                many.len(),
                ids.join(", ")
            )
        }
    }
}

/// Turn `selector` into the text of an existing constraint.
///
/// Exact text wins over position, so a constraint literally named "2" is
/// still reachable.
pub fn select_constraint(set: &ConstraintSet, selector: &str) -> Result<String> {
    if let Some(record) = set.get(selector) {
        return Ok(record.text.clone());
    }
    if let Ok(position) = selector.trim().parse::<usize>() {
        return match position
            .checked_sub(1)
            .and_then(|i| set.records().get(i))
        {
            Some(record) => Ok(record.text.clone()),
            None => bail!(
                "constraint #{position} does not exist ({} constraint(s))",
                set.len()
            ),
        };
    }
    bail!("no constraint with text {selector:?}")
}
