//! The open-project context.
//!
//! A [`ProjectSession`] holds at most one [`ActiveProject`]: its stored
//! record, its constraint set and its reconstructed live model. Every
//! mutating operation goes through the session, so nothing else keeps a
//! "current project" around.

use std::sync::Arc;

use chrono::Utc;
use resqplan_store::{NewProject, ProjectRecord, ProjectStore, ProjectSummary, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError};
use crate::codec::{CodecError, from_state, to_state};
use crate::constraints::{ConstraintError, ConstraintSet};
use crate::expr::DanglingPolicy;
use crate::model::LinearModel;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no project is open")]
    NoActiveProject,

    #[error("project {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot rebuild model of project {project_id}: {source}")]
    Codec {
        project_id: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The backend answered but declined the operation.
    #[error("backend refused: {0}")]
    Refused(String),
}

/// An open project.
#[derive(Debug, Clone)]
pub struct ActiveProject {
    /// The record as last loaded or saved. Its `manual_constraints` and
    /// `gurobi_state` are refreshed from `constraints` and `model` on save.
    pub record: ProjectRecord,
    pub constraints: ConstraintSet,
    pub model: LinearModel,
}

impl ActiveProject {
    fn load(record: ProjectRecord, policy: DanglingPolicy) -> Result<Self, SessionError> {
        let model = from_state(&record.gurobi_state, policy).map_err(|source| {
            SessionError::Codec {
                project_id: record.id.clone(),
                source,
            }
        })?;
        let constraints = ConstraintSet::from_records(record.manual_constraints.iter().cloned());
        Ok(Self {
            record,
            constraints,
            model,
        })
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Active constraint texts, as sent to the solver.
    pub fn active_constraints(&self) -> Vec<String> {
        self.constraints.active_texts()
    }

    /// The record as it would be persisted now.
    pub fn snapshot(&self) -> ProjectRecord {
        ProjectRecord {
            manual_constraints: self.constraints.records().to_vec(),
            gurobi_state: to_state(&self.model),
            ..self.record.clone()
        }
    }
}

/// Project lifecycle plus constraint operations on the open project.
pub struct ProjectSession {
    store: Arc<dyn ProjectStore>,
    backend: Arc<dyn Backend>,
    policy: DanglingPolicy,
    active: Option<ActiveProject>,
}

impl ProjectSession {
    pub fn new(store: Arc<dyn ProjectStore>, backend: Arc<dyn Backend>) -> Self {
        Self {
            store,
            backend,
            policy: DanglingPolicy::default(),
            active: None,
        }
    }

    pub fn with_dangling_policy(mut self, policy: DanglingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn active(&self) -> Option<&ActiveProject> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveProject> {
        self.active.as_mut()
    }

    fn require_active(&mut self) -> Result<&mut ActiveProject, SessionError> {
        self.active.as_mut().ok_or(SessionError::NoActiveProject)
    }

    pub async fn list(&self) -> Result<Vec<ProjectSummary>, SessionError> {
        Ok(self.store.list().await?)
    }

    /// Create a project and open it.
    pub async fn create(&mut self, project: NewProject) -> Result<&ActiveProject, SessionError> {
        self.flush_outgoing().await;
        let record = self.store.create(project).await?;
        info!(project_id = %record.id, name = %record.name, "project created");
        let active = ActiveProject::load(record, self.policy)?;
        Ok(self.active.insert(active))
    }

    /// Open a project, first flushing whichever project was open.
    pub async fn open(&mut self, id: &str) -> Result<&ActiveProject, SessionError> {
        self.flush_outgoing().await;
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let active = ActiveProject::load(record, self.policy)?;
        debug!(
            project_id = %active.id(),
            constraints = active.constraints.len(),
            variables = active.model.num_variables(),
            "project opened"
        );
        Ok(self.active.insert(active))
    }

    /// Persist the open project.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        let store = Arc::clone(&self.store);
        let active = self.require_active()?;
        let mut record = active.snapshot();
        record.saved_at = Some(Utc::now());
        store.update(&record).await?;
        debug!(project_id = %record.id, "project saved");
        active.record = record;
        Ok(())
    }

    /// Save and close the open project. On save failure it stays open.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            self.save().await?;
            self.active = None;
        }
        Ok(())
    }

    /// Delete a project. If it is the open one it is closed without saving.
    pub async fn delete(&mut self, id: &str) -> Result<bool, SessionError> {
        if self.active.as_ref().is_some_and(|a| a.id() == id) {
            self.active = None;
        }
        let deleted = self.store.delete(id).await?;
        info!(project_id = %id, deleted, "project delete");
        Ok(deleted)
    }

    /// Best-effort save of the open project before switching away from it.
    async fn flush_outgoing(&mut self) {
        if self.active.is_none() {
            return;
        }
        if let Err(e) = self.save().await {
            let id = self.active.as_ref().map(|a| a.id().to_string()).unwrap_or_default();
            warn!(project_id = %id, error = %e, "failed to save project before switching");
        }
        self.active = None;
    }

    /// Send a new scheduling context to the backend and store the extracted
    /// variables on the open project.
    pub async fn set_context(&mut self, context: &str) -> Result<&serde_json::Value, SessionError> {
        let backend = Arc::clone(&self.backend);
        let active = self.require_active()?;
        let variables = backend.translate(context).await?;

        active.record.context = context.to_string();
        if let Some(detected) = detected_constraints(&variables) {
            active.record.detected_constraints = detected;
        }
        active.record.variables = variables;
        Ok(&active.record.variables)
    }

    /// Replace a constraint's text. The backend must agree before the local
    /// set changes.
    pub async fn edit_constraint(&mut self, old: &str, new: &str) -> Result<(), SessionError> {
        let backend = Arc::clone(&self.backend);
        let active = self.require_active()?;

        let mut edited = active.constraints.clone();
        edited.edit(old, new)?;

        let resp = backend.edit_constraint(old.trim(), new.trim()).await?;
        if !resp.success {
            return Err(SessionError::Refused(
                resp.error.unwrap_or_else(|| "edit rejected".to_string()),
            ));
        }
        active.constraints = edited;
        Ok(())
    }

    /// Delete a constraint, backend first.
    pub async fn delete_constraint(&mut self, text: &str) -> Result<(), SessionError> {
        let backend = Arc::clone(&self.backend);
        let active = self.require_active()?;
        if active.constraints.get(text).is_none() {
            return Err(ConstraintError::NotFound(text.to_string()).into());
        }

        let resp = backend.delete_constraint(text.trim()).await?;
        if !resp.success {
            return Err(SessionError::Refused(
                resp.error.unwrap_or_else(|| "delete rejected".to_string()),
            ));
        }
        active.constraints.delete(text)?;
        Ok(())
    }

    /// Switch a constraint on or off. Local only.
    pub fn toggle_constraint(&mut self, text: &str) -> Result<bool, SessionError> {
        Ok(self.require_active()?.constraints.toggle(text)?)
    }

    /// Solver code generated for a constraint.
    pub async fn view_constraint(&self, text: &str) -> Result<String, SessionError> {
        Ok(self.backend.view_constraint(text.trim()).await?.code)
    }
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession")
            .field("store", &self.store.kind())
            .field("backend", &self.backend.name())
            .field("policy", &self.policy)
            .field("active", &self.active.as_ref().map(ActiveProject::id))
            .finish()
    }
}

/// `detected_constraints` (or `constraints`) from a translate response, when
/// it is a list of strings.
fn detected_constraints(variables: &serde_json::Value) -> Option<Vec<String>> {
    let list = variables
        .get("detected_constraints")
        .or_else(|| variables.get("constraints"))?
        .as_array()?;
    list.iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detected_constraints_from_translate_response() {
        assert_eq!(
            detected_constraints(&json!({"detected_constraints": ["a", "b"]})),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            detected_constraints(&json!({"constraints": ["c"]})),
            Some(vec!["c".to_string()])
        );
        assert_eq!(detected_constraints(&json!({"constraints": [1]})), None);
        assert_eq!(detected_constraints(&json!({"variables": {}})), None);
    }

    #[test]
    fn snapshot_reflects_live_state() {
        let record = ProjectRecord::new(
            "p1",
            NewProject {
                name: "ward".into(),
                context: String::new(),
            },
        );
        let mut active = ActiveProject::load(record, DanglingPolicy::Lenient).unwrap();
        active.constraints.insert_if_absent("no nights").unwrap();
        active
            .model
            .add_variable("x_A_0_0", 0.0, 1.0, resqplan_store::VarKind::Binary)
            .unwrap();

        let snap = active.snapshot();
        assert_eq!(snap.id, "p1");
        assert_eq!(snap.manual_constraints.len(), 1);
        assert_eq!(snap.gurobi_state.vars.len(), 1);
        assert_eq!(active.active_constraints(), vec!["no nights"]);
    }
}
