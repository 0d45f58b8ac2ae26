//! [`ProjectStore`] backed by the server's `/api/projects` endpoints.

use async_trait::async_trait;
use resqplan_store::{
    NewProject, ProjectRecord, ProjectStore, ProjectSummary, StoreError, validate_id,
};
use resqplan_store::models::sort_summaries;

use super::http::{HttpClient, HttpConfig};
use super::types::BackendError;

#[derive(Debug, Clone)]
pub struct HttpProjectStore {
    client: HttpClient,
}

impl HttpProjectStore {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            client: HttpClient::new(config),
        }
    }

    fn project_path(id: &str) -> Result<String, StoreError> {
        validate_id(id)?;
        Ok(format!("/api/projects/{id}"))
    }
}

fn remote(err: BackendError) -> StoreError {
    StoreError::Remote(err.to_string())
}

fn is_not_found(err: &BackendError) -> bool {
    matches!(err, BackendError::Status { code: 404, .. })
}

#[async_trait]
impl ProjectStore for HttpProjectStore {
    fn kind(&self) -> &str {
        "api"
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut out: Vec<ProjectSummary> = self
            .client
            .json("GET", "/api/projects", None)
            .await
            .map_err(remote)?;
        sort_summaries(&mut out);
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        let path = Self::project_path(id)?;
        match self.client.json("GET", &path, None).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(remote(e)),
        }
    }

    async fn create(&self, project: NewProject) -> Result<ProjectRecord, StoreError> {
        let body = serde_json::to_value(&project)?;
        self.client
            .json("POST", "/api/projects", Some(body))
            .await
            .map_err(remote)
    }

    async fn update(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        let path = Self::project_path(&project.id)?;
        let body = serde_json::to_value(project)?;
        match self.client.send("PUT", &path, Some(body)).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(StoreError::NotFound(project.id.clone())),
            Err(e) => Err(remote(e)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let path = Self::project_path(id)?;
        match self.client.send("DELETE", &path, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(remote(e)),
        }
    }
}
