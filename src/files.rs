use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use metrics::counter;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Storage for uploaded attachments
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` and returns the handle to record on the document.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, ServiceError>;

    /// Removes a previously saved file. Missing files are not an error.
    async fn delete(&self, handle: &str) -> Result<(), ServiceError>;
}

/// Files on local disk under a single root directory
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, handle: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(handle);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(relative)),
            _ => Err(ServiceError::BadRequest(format!(
                "invalid attachment handle '{}'",
                handle
            ))),
        }
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize_file_name(name: &str) -> Result<String, ServiceError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        return Err(ServiceError::BadRequest("file name is required".to_string()));
    }
    Ok(cleaned)
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let handle = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name)?);
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&handle), bytes).await?;
        info!(%handle, size = bytes.len(), "stored attachment");
        Ok(handle)
    }

    async fn delete(&self, handle: &str) -> Result<(), ServiceError> {
        let path = self.resolve(handle)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%handle, "removed attachment");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Deletes an attachment whose document is already gone. Failures are logged
/// and reported as orphans rather than returned.
pub async fn discard_attachment(store: &dyn FileStore, events: &EventSender, handle: &str) {
    if let Err(e) = store.delete(handle).await {
        error!(%handle, error = %e, "failed to delete attachment");
        counter!("firecrm.files.orphaned", 1);
        events
            .send_or_log(Event::AttachmentOrphaned {
                path: handle.to_string(),
                reason: e.to_string(),
            })
            .await;
    }
}
