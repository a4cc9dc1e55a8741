use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use super::{KeyValueBackend, Result, StorageError};

const FILE_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Stores each key as `<key>.json` inside a single directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    root: PathBuf,
}

impl JsonFileBackend {
    /// Uses `root` as the store directory, creating it when missing.
    ///
    /// A directory that cannot be created leaves the backend unavailable
    /// rather than failing construction.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if let Err(err) = fs::create_dir_all(&root) {
            debug!(path = %root.display(), error = %err, "store directory unavailable");
        }
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_path(&self, key: &str) -> Result<PathBuf> {
        let file_stem = file_stem_for(key)?;
        Ok(self
            .root
            .join(format!("{}.{}", file_stem, FILE_EXTENSION)))
    }
}

impl KeyValueBackend for JsonFileBackend {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        write_atomic(&path, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION) {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Keys map to file names verbatim; anything that could escape the store
/// directory is rejected.
fn file_stem_for(key: &str) -> Result<String> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(key.to_string())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Stages `data` next to `path` and renames it into place. A failed attempt
/// leaves no staged file behind.
pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    if let Err(err) = stage_and_rename(&tmp, path, data) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            if cleanup.kind() != ErrorKind::NotFound {
                debug!(path = %tmp.display(), error = %cleanup, "could not remove staged file");
            }
        }
        return Err(err.into());
    }
    Ok(())
}

fn stage_and_rename(tmp: &Path, path: &Path, data: &str) -> std::io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    drop(file);
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (JsonFileBackend, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let backend = JsonFileBackend::new(temp.path().join("store"));
        (backend, temp)
    }

    #[test]
    fn write_then_read_uses_one_file_per_key() {
        let (backend, _guard) = backend();
        backend.write("finance-tracker-budgets", "[]").unwrap();
        let path = backend.key_path("finance-tracker-budgets").unwrap();
        assert!(path.ends_with("finance-tracker-budgets.json"));
        assert_eq!(
            backend.read("finance-tracker-budgets").unwrap().as_deref(),
            Some("[]")
        );
        assert!(!tmp_path(&path).exists(), "temp file must be renamed away");
    }

    #[test]
    fn missing_key_reads_as_none_and_deletes_cleanly() {
        let (backend, _guard) = backend();
        assert_eq!(backend.read("absent").unwrap(), None);
        backend.delete("absent").unwrap();
    }

    #[test]
    fn clear_removes_only_json_documents() {
        let (backend, _guard) = backend();
        backend.write("a", "1").unwrap();
        backend.write("b", "2").unwrap();
        let keep = backend.root().join("notes.txt");
        fs::write(&keep, "keep me").unwrap();
        backend.clear().unwrap();
        assert_eq!(backend.read("a").unwrap(), None);
        assert!(keep.exists());
    }

    #[test]
    fn rejects_keys_that_escape_the_directory() {
        let (backend, _guard) = backend();
        let err = backend.write("../outside", "x").unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let (backend, _guard) = backend();
        backend.write("stable", "\"original\"").unwrap();
        let path = backend.key_path("stable").unwrap();
        fs::create_dir_all(tmp_path(&path)).unwrap();
        assert!(backend.write("stable", "\"replacement\"").is_err());
        assert_eq!(
            backend.read("stable").unwrap().as_deref(),
            Some("\"original\"")
        );
    }

    #[test]
    fn failed_rename_removes_the_staged_file() {
        let (backend, _guard) = backend();
        let path = backend.key_path("blocked").unwrap();
        fs::create_dir_all(path.join("occupied")).unwrap();
        assert!(backend.write("blocked", "\"value\"").is_err());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn unusable_root_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain-file");
        fs::write(&file, "occupied").unwrap();
        let backend = JsonFileBackend::new(file.join("store"));
        assert!(!backend.is_available());
    }
}
