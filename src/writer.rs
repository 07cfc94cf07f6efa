//! Atomic file write-back.
//!
//! Content goes to a temporary file next to the target which is then renamed
//! over it, so a target is either fully rewritten or left as it was.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{} already exists", .0.display())]
    Exists(PathBuf),

    #[error("{} is read-only", .0.display())]
    ReadOnly(PathBuf),

    #[error("cannot write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl WriteError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> WriteError + '_ {
        move |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Refuse to replace an existing file.
    CreateNew,
    /// Replace an existing file.
    Overwrite,
}

#[derive(Debug, Clone, Default)]
pub struct SafeFileWriter {
    /// Copy the previous content to a `.bak` file before overwriting.
    pub create_backups: bool,
    /// Where backups go; next to the target when unset.
    pub backup_dir: Option<PathBuf>,
}

impl SafeFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.create_backups = enabled;
        self
    }

    pub fn with_backup_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.backup_dir = dir;
        self
    }

    pub fn write(&self, path: &Path, content: &str, mode: WriteMode) -> Result<(), WriteError> {
        let existing = match fs::metadata(path) {
            Ok(metadata) => Some(metadata),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => return Err(WriteError::io(path)(error)),
        };

        if let Some(metadata) = &existing {
            if mode == WriteMode::CreateNew {
                return Err(WriteError::Exists(path.to_path_buf()));
            }
            if metadata.permissions().readonly() {
                return Err(WriteError::ReadOnly(path.to_path_buf()));
            }
            if self.create_backups {
                self.create_backup(path)?;
            }
        }

        self.atomic_write(path, content, existing.as_ref())
    }

    fn backup_path(&self, path: &Path) -> PathBuf {
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".bak");
        match &self.backup_dir {
            Some(dir) => dir.join(file_name),
            None => path.with_file_name(file_name),
        }
    }

    fn create_backup(&self, path: &Path) -> Result<PathBuf, WriteError> {
        if let Some(dir) = &self.backup_dir {
            fs::create_dir_all(dir).map_err(WriteError::io(dir))?;
        }
        let backup = self.backup_path(path);
        fs::copy(path, &backup).map_err(WriteError::io(&backup))?;
        tracing::debug!(backup = %backup.display(), "created backup");
        Ok(backup)
    }

    fn atomic_write(
        &self,
        path: &Path,
        content: &str,
        existing: Option<&fs::Metadata>,
    ) -> Result<(), WriteError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(WriteError::io(parent))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(WriteError::io(path))?;
        temp.write_all(content.as_bytes())
            .map_err(WriteError::io(path))?;
        temp.flush().map_err(WriteError::io(path))?;
        if let Some(metadata) = existing {
            fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(WriteError::io(path))?;
        }
        temp.persist(path)
            .map_err(|error| WriteError::io(path)(error.error))?;
        Ok(())
    }
}
