use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ProjectStore, StoreError, validate_id};
use crate::config::StoreConfig;
use crate::models::{NewProject, ProjectRecord, ProjectSummary, sort_summaries};

/// One pretty-printed JSON file per project under a data directory.
///
/// Writes go through a temporary file and a rename so a crash mid-save never
/// leaves a truncated project behind.
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    dir: PathBuf,
}

impl FileProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.data_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })
    }

    async fn write_record(&self, record: &ProjectRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.id)?;
        self.ensure_dir().await?;

        let contents = serde_json::to_vec_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &contents)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(project_id = %record.id, path = %path.display(), "project written");
        Ok(())
    }

    async fn read_record(path: &Path) -> Result<Option<ProjectRecord>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    fn kind(&self) -> &str {
        "file"
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut out = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Io {
                        path: self.dir.clone(),
                        source,
                    });
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // One unreadable file must not hide the rest of the listing.
            match Self::read_record(&path).await {
                Ok(Some(record)) => out.push(ProjectSummary::from(&record)),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable project file"),
            }
        }

        sort_summaries(&mut out);
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        let path = self.path_for(id)?;
        Self::read_record(&path).await
    }

    async fn create(&self, project: NewProject) -> Result<ProjectRecord, StoreError> {
        let record = ProjectRecord::new(Uuid::new_v4().to_string(), project);
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn update(&self, project: &ProjectRecord) -> Result<(), StoreError> {
        let path = self.path_for(&project.id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound(project.id.clone()));
        }
        self.write_record(project).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
