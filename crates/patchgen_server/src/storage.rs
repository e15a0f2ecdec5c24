//! Storage for generated patch files.
//!
//! File names are derived from (style, complexity), so concurrent requests can
//! target the same name. [`FsStorage`] writes to a uniquely named temp file in
//! the destination directory and renames it into place, so readers only ever
//! see complete files and the last writer wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use patchgen_core::engine::PATCH_FILE_EXTENSION;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid file name '{0}'")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait PatchStorage: Send + Sync {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn list(&self) -> Result<Vec<String>, StorageError>;
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;
}

/// Accept a single path component made of `[A-Za-z0-9._-]` that does not
/// start with a dot.
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// `acid_simple.vcv` -> `acid_simple-1f0c9a2e.vcv`
pub fn with_unique_suffix(name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-{}.{}", stem, suffix, ext),
        None => format!("{}-{}", name, suffix),
    }
}

/// Patch files stored flat in one directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }
}

impl PatchStorage for FsStorage {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let dest = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));
        if let Err(err) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, &dest)) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let is_patch = Path::new(&name)
                .extension()
                .is_some_and(|ext| ext == PATCH_FILE_EXTENSION);
            if is_patch && validate_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::Io(err),
        })
    }
}
