//! Archive output
//!
//! One job produces one flat ZIP container. [`ArchiveStore`] creates the
//! per-job container; [`JobArchive`] appends named entries and seals the
//! container exactly once. Entry names are unique within an archive: the
//! first writer wins and later writers fail with
//! [`ArchiveError::DuplicateEntry`].

use crate::error::ArchiveError;
use crate::types::JobId;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Creates one archive per job
pub trait ArchiveStore: Send + Sync {
    /// Create the container for `id`, truncating any previous one
    fn create(&self, id: JobId) -> Result<Arc<dyn JobArchive>, ArchiveError>;
}

/// One job's output container
pub trait JobArchive: Send + Sync {
    /// Append a named entry holding `payload`
    ///
    /// Fails with [`ArchiveError::DuplicateEntry`] when the name was already
    /// written and [`ArchiveError::Finalized`] after the container is sealed.
    fn add_entry(&self, name: &str, payload: &[u8]) -> Result<(), ArchiveError>;

    /// Seal the container and return its result location
    ///
    /// Must be called exactly once, after every entry is settled. Safe with
    /// zero entries; a second call fails with [`ArchiveError::Finalized`].
    fn finalize(&self) -> Result<String, ArchiveError>;
}

/// ZIP-backed archive store writing `{archive_dir}/{job_id}.zip`
pub struct ZipArchiveStore {
    archive_dir: PathBuf,
}

impl ZipArchiveStore {
    /// Create a store rooted at `archive_dir`, creating the directory if needed
    pub fn new(archive_dir: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let archive_dir = archive_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&archive_dir)?;
        Ok(Self { archive_dir })
    }
}

impl ArchiveStore for ZipArchiveStore {
    fn create(&self, id: JobId) -> Result<Arc<dyn JobArchive>, ArchiveError> {
        let file_name = format!("{}.zip", id);
        let path = self.archive_dir.join(&file_name);
        let file = File::create(&path)?;

        tracing::debug!(job_id = %id, path = %path.display(), "Created archive container");

        Ok(Arc::new(ZipJobArchive {
            location: format!("/archives/{}", file_name),
            inner: Mutex::new(ArchiveInner {
                writer: Some(ZipWriter::new(file)),
                names: HashSet::new(),
            }),
        }))
    }
}

struct ArchiveInner {
    /// Taken on finalize; `None` marks the container sealed
    writer: Option<ZipWriter<File>>,
    names: HashSet<String>,
}

/// One ZIP container, serialized behind a mutex
///
/// Concurrent fetch tasks race to append entries; the mutex makes each
/// append atomic and the name set makes the first-writer-wins policy
/// deterministic as a rule (which writer is first follows completion order).
pub struct ZipJobArchive {
    location: String,
    inner: Mutex<ArchiveInner>,
}

impl ZipJobArchive {
    fn lock(&self) -> MutexGuard<'_, ArchiveInner> {
        // A poisoned lock means a writer panicked mid-entry; the zip writer
        // state is still usable for the remaining entries.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobArchive for ZipJobArchive {
    fn add_entry(&self, name: &str, payload: &[u8]) -> Result<(), ArchiveError> {
        let mut inner = self.lock();

        if inner.writer.is_none() {
            return Err(ArchiveError::Finalized);
        }

        if !inner.names.insert(name.to_string()) {
            return Err(ArchiveError::DuplicateEntry {
                name: name.to_string(),
            });
        }

        let writer = inner.writer.as_mut().ok_or(ArchiveError::Finalized)?;
        writer.start_file(name, FileOptions::default())?;
        writer.write_all(payload)?;

        Ok(())
    }

    fn finalize(&self) -> Result<String, ArchiveError> {
        let mut inner = self.lock();
        let mut writer = inner.writer.take().ok_or(ArchiveError::Finalized)?;
        writer.finish()?;

        Ok(self.location.clone())
    }
}
