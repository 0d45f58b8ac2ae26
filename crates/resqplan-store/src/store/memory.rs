use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ProjectStore, StoreError};
use crate::models::{NewProject, ProjectRecord, ProjectSummary, sort_summaries};

/// Volatile store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: Mutex<BTreeMap<String, ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_projects(records: impl IntoIterator<Item = ProjectRecord>) -> Self {
        let projects = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            projects: Mutex::new(projects),
        }
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let projects = self.projects.lock().await;
        let mut out: Vec<ProjectSummary> = projects.values().map(ProjectSummary::from).collect();
        sort_summaries(&mut out);
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.projects.lock().await.get(id).cloned())
    }

    async fn create(&self, project: NewProject) -> Result<ProjectRecord, StoreError> {
        let record = ProjectRecord::new(Uuid::new_v4().to_string(), project);
        self.projects
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        let mut projects = self.projects.lock().await;
        match projects.get_mut(&project.id) {
            Some(slot) => {
                *slot = project.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(project.id.clone())),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.projects.lock().await.remove(id).is_some())
    }
}
