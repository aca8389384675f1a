use std::{
    error::Error,
    fmt,
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use tempfile::NamedTempFile;
use word_ooxml::{Package, PackageError};

const DOCX_EXTENSION: &str = "docx";

#[derive(Debug)]
pub enum StoreError {
    NotFound(PathBuf),
    Locked { path: PathBuf, reason: String },
    InvalidPath(String),
    Io(std::io::Error),
    Package(PackageError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Document {} does not exist", path.display()),
            Self::Locked { path, reason } => write!(
                f,
                "Document {} is not accessible; it may be open in another application ({reason})",
                path.display()
            ),
            Self::InvalidPath(message) => write!(f, "invalid path: {message}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Package(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<PackageError> for StoreError {
    fn from(err: PackageError) -> Self {
        Self::Package(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Resolves document names against a root directory and performs package I/O.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A store rooted at the process working directory.
    #[must_use]
    pub fn current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a document filename, appending `.docx` when it has no such extension.
    ///
    /// # Errors
    /// Returns `InvalidPath` for an empty filename.
    pub fn resolve(&self, filename: &str) -> StoreResult<PathBuf> {
        let trimmed = filename.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidPath("filename is required".to_string()));
        }
        let mut path = self.resolve_any(trimmed);
        let has_docx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCX_EXTENSION));
        if !has_docx {
            let mut name = path.as_os_str().to_os_string();
            name.push(".docx");
            path = PathBuf::from(name);
        }
        Ok(path)
    }

    /// Resolves any path (images, PDF output, directories) without touching its extension.
    #[must_use]
    pub fn resolve_any(&self, name: &str) -> PathBuf {
        let path = Path::new(name.trim());
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        normalize(&joined)
    }

    /// Reads and unpacks a document.
    ///
    /// # Errors
    /// Returns `NotFound` when the file is absent, `Locked` when it exists but
    /// cannot be read, and `Package` when it is not a valid `.docx`.
    pub async fn load(&self, path: &Path) -> StoreResult<Package> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StoreError::InvalidPath(format!(
                    "{} is not a file",
                    path.display()
                )));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            Err(err) => return Err(StoreError::Io(err)),
        }
        let bytes = tokio::fs::read(path).await.map_err(|err| StoreError::Locked {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(Package::from_bytes(&bytes)?)
    }

    /// Checks that `path` can be written: its directory exists and any existing
    /// file is not read-only.
    ///
    /// # Errors
    /// Returns `InvalidPath` or `Locked` describing why the file cannot be written.
    pub async fn check_writable(&self, path: &Path) -> StoreResult<()> {
        let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            match tokio::fs::metadata(dir).await {
                Ok(meta) if meta.is_dir() => {}
                _ => {
                    return Err(StoreError::InvalidPath(format!(
                        "directory {} does not exist",
                        dir.display()
                    )));
                }
            }
        }
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.permissions().readonly() => Err(StoreError::Locked {
                path: path.to_path_buf(),
                reason: "file is read-only".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Writes a package atomically: temp file in the target directory, then rename.
    ///
    /// # Errors
    /// Returns `StoreError` if the destination is not writable or the write fails.
    pub async fn save(&self, path: &Path, package: &Package) -> StoreResult<()> {
        self.check_writable(path).await?;
        let bytes = package.to_bytes()?;
        self.write_bytes(path, bytes).await
    }

    /// Atomically writes raw bytes to `path`.
    ///
    /// # Errors
    /// Returns `StoreError` if the temporary file cannot be written or renamed.
    pub async fn write_bytes(&self, path: &Path, bytes: Vec<u8>) -> StoreResult<()> {
        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|err| StoreError::Io(std::io::Error::other(err)))?
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| StoreError::Locked {
        path: path.to_path_buf(),
        reason: err.error.to_string(),
    })?;
    Ok(())
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_appends_extension_and_joins_root() {
        let store = DocumentStore::new("/srv/docs");
        assert_eq!(
            store.resolve("report").expect("resolves"),
            PathBuf::from("/srv/docs/report.docx")
        );
        assert_eq!(
            store.resolve("sub/../Final.DOCX").expect("resolves"),
            PathBuf::from("/srv/docs/Final.DOCX")
        );
        assert_eq!(
            store.resolve("/tmp/a.docx").expect("resolves"),
            PathBuf::from("/tmp/a.docx")
        );
        assert!(matches!(store.resolve("  "), Err(StoreError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn load_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());
        let path = store.resolve("missing").expect("resolves");
        assert!(matches!(store.load(&path).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());
        let path = store.resolve("fresh").expect("resolves");
        let package = Package::new_blank("Fresh", "Tester");
        store.save(&path, &package).await.expect("saved");
        let loaded = store.load(&path).await.expect("loaded");
        assert_eq!(
            loaded.part_names().collect::<Vec<_>>(),
            package.part_names().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn save_rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());
        let path = store.resolve("nope/inner").expect("resolves");
        let result = store.save(&path, &Package::new_blank("", "")).await;
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }
}
