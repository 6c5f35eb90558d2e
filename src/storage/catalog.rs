//! On-disk file store: `root/<dataset_id>/<file_id>/<filename>`.
//!
//! File ids are assigned per dataset in upload order, so the highest id is
//! the most recent upload.

use crate::error::{ProcessingError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub dataset_id: u64,
    pub file_id: u64,
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Read-side view of stored uploads
pub trait FileStore: Send + Sync {
    fn resolve(&self, dataset_id: u64, file_id: u64) -> Result<StoredFile>;

    fn list_files(&self, dataset_id: u64) -> Result<Vec<StoredFile>>;

    /// Most recently uploaded file, i.e. the highest file id
    fn latest_file(&self, dataset_id: u64) -> Result<StoredFile> {
        self.list_files(dataset_id)?
            .into_iter()
            .max_by_key(|f| f.file_id)
            .ok_or_else(|| ProcessingError::not_found("file for dataset", dataset_id))
    }

    /// A named file, or the latest one when `file_id` is absent
    fn resolve_or_latest(&self, dataset_id: u64, file_id: Option<u64>) -> Result<StoredFile> {
        match file_id {
            Some(id) => self.resolve(dataset_id, id),
            None => self.latest_file(dataset_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    max_file_size: u64,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    fn dataset_dir(&self, dataset_id: u64) -> PathBuf {
        self.root.join(dataset_id.to_string())
    }

    /// Copy `source` into the dataset under the next file id. The dataset
    /// directory is created on first upload.
    pub fn store_file(&self, dataset_id: u64, source: &Path) -> Result<StoredFile> {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ProcessingError::InvalidInput(format!("Not a file path: {}", source.display()))
            })?;
        let bytes = fs::read(source)
            .map_err(|e| ProcessingError::read_failure(source, e))?;
        self.store_bytes(dataset_id, &filename, &bytes)
    }

    pub fn store_bytes(&self, dataset_id: u64, filename: &str, bytes: &[u8]) -> Result<StoredFile> {
        let safe_name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProcessingError::InvalidInput(format!("Invalid filename '{}'", filename)))?;

        if bytes.len() as u64 > self.max_file_size {
            return Err(ProcessingError::InvalidInput(format!(
                "File is {} bytes, above the {} byte upload limit",
                bytes.len(),
                self.max_file_size
            )));
        }

        let dataset_dir = self.dataset_dir(dataset_id);
        fs::create_dir_all(&dataset_dir)?;

        let mut next_id = self
            .file_ids(&dataset_dir)?
            .into_iter()
            .max()
            .map_or(1, |id| id + 1);

        // Claiming the id directory is the reservation; a concurrent upload
        // that got there first pushes us to the next id.
        let file_dir = loop {
            let candidate = dataset_dir.join(next_id.to_string());
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => next_id += 1,
                Err(e) => return Err(e.into()),
            }
        };
        let path = file_dir.join(&safe_name);
        fs::write(&path, bytes)?;

        info!(
            "Stored {} as dataset {} file {} ({} bytes)",
            safe_name,
            dataset_id,
            next_id,
            bytes.len()
        );

        Ok(StoredFile {
            dataset_id,
            file_id: next_id,
            filename: safe_name,
            path,
            size: bytes.len() as u64,
        })
    }

    fn file_ids(&self, dataset_dir: &Path) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dataset_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn file_in(&self, dataset_id: u64, file_id: u64, file_dir: &Path) -> Result<Option<StoredFile>> {
        for entry in fs::read_dir(file_dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                return Ok(Some(StoredFile {
                    dataset_id,
                    file_id,
                    filename: entry.file_name().to_string_lossy().into_owned(),
                    path: entry.path(),
                    size: metadata.len(),
                }));
            }
        }
        Ok(None)
    }
}

impl FileStore for DirectoryCatalog {
    fn resolve(&self, dataset_id: u64, file_id: u64) -> Result<StoredFile> {
        let dataset_dir = self.dataset_dir(dataset_id);
        if !dataset_dir.is_dir() {
            return Err(ProcessingError::not_found("dataset", dataset_id));
        }

        let file_dir = dataset_dir.join(file_id.to_string());
        if !file_dir.is_dir() {
            return Err(ProcessingError::not_found(
                "file",
                format!("{} in dataset {}", file_id, dataset_id),
            ));
        }

        self.file_in(dataset_id, file_id, &file_dir)?.ok_or_else(|| {
            ProcessingError::not_found("file", format!("{} in dataset {}", file_id, dataset_id))
        })
    }

    fn list_files(&self, dataset_id: u64) -> Result<Vec<StoredFile>> {
        let dataset_dir = self.dataset_dir(dataset_id);
        if !dataset_dir.is_dir() {
            return Err(ProcessingError::not_found("dataset", dataset_id));
        }

        let mut ids = self.file_ids(&dataset_dir)?;
        ids.sort_unstable();

        let mut files = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(file) = self.file_in(dataset_id, id, &dataset_dir.join(id.to_string()))? {
                files.push(file);
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ids_increase_and_latest_wins() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = DirectoryCatalog::new(dir.path(), 1024);

        let first = catalog.store_bytes(1, "a.csv", b"x\n1\n")?;
        let second = catalog.store_bytes(1, "b.csv", b"x\n2\n")?;
        let other = catalog.store_bytes(2, "c.csv", b"x\n3\n")?;

        assert_eq!((first.file_id, second.file_id, other.file_id), (1, 2, 1));
        assert_eq!(catalog.latest_file(1)?.filename, "b.csv");
        assert_eq!(catalog.resolve(1, 1)?.filename, "a.csv");
        assert_eq!(catalog.list_files(1)?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_dataset_and_file() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = DirectoryCatalog::new(dir.path(), 1024);
        catalog.store_bytes(1, "a.csv", b"x\n")?;

        assert!(matches!(
            catalog.resolve(9, 1),
            Err(ProcessingError::NotFound { entity: "dataset", .. })
        ));
        assert!(matches!(
            catalog.resolve(1, 5),
            Err(ProcessingError::NotFound { entity: "file", .. })
        ));
        assert!(catalog.latest_file(9).is_err());
        Ok(())
    }

    #[test]
    fn test_upload_size_limit() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = DirectoryCatalog::new(dir.path(), 4);

        let err = catalog.store_bytes(1, "big.csv", b"0123456789").unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidInput(_)));
        Ok(())
    }

    #[test]
    fn test_filename_cannot_escape_dataset() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = DirectoryCatalog::new(dir.path(), 1024);

        let stored = catalog.store_bytes(1, "../../evil.csv", b"x\n")?;
        assert_eq!(stored.filename, "evil.csv");
        assert!(stored.path.starts_with(dir.path()));
        Ok(())
    }

    #[test]
    fn test_concurrent_uploads_get_distinct_ids() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = DirectoryCatalog::new(dir.path(), 1024);
        catalog.store_bytes(1, "seed.csv", b"x\n0\n")?;

        let mut ids: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let catalog = &catalog;
                    scope.spawn(move || {
                        catalog.store_bytes(1, &format!("cast_{}.csv", i), b"x\n1\n")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap().file_id)
                .collect()
        });
        ids.sort_unstable();

        assert_eq!(ids, (2..=9).collect::<Vec<u64>>());
        assert_eq!(catalog.list_files(1)?.len(), 9);
        Ok(())
    }
}
