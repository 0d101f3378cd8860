//! Snapshot catalog: lists persisted snapshot files, newest-first.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::backup::archive::{PLAIN_EXT, SEALED_EXT};
use crate::errors::AppError;
use crate::models::SnapshotFile;

/// List persisted snapshots, newest-first by filesystem modification time.
/// Covers both plaintext and encrypted extensions. The snapshot directory is
/// created idempotently on first use.
pub async fn list_snapshots(dir: &Path) -> Result<Vec<SnapshotFile>, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files: Vec<(SystemTime, SnapshotFile)> = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if !matches!(ext, Some(PLAIN_EXT) | Some(SEALED_EXT)) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;

        files.push((
            modified,
            SnapshotFile {
                path: path.display().to_string(),
                created_at: DateTime::<Utc>::from(modified).to_rfc3339(),
                size_bytes: metadata.len(),
            },
        ));
    }

    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, file)| file).collect())
}
