use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard, RwLock};

/// Configuration for the per-document lock registry.
#[derive(Debug, Clone)]
pub struct DocumentRegistryConfig {
    pub ttl: Option<Duration>,
    pub sweep_interval: Duration,
    pub max_entries: Option<usize>,
}

impl Default for DocumentRegistryConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            sweep_interval: Duration::from_secs(60),
            max_entries: None,
        }
    }
}

impl DocumentRegistryConfig {
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub const fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

#[derive(Debug)]
pub enum RegistryError {
    CapacityReached { max: usize },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityReached { max } => {
                write!(f, "document registry capacity reached (max {max} open documents)")
            }
        }
    }
}

impl Error for RegistryError {}

/// Lock handle for a single document path.
#[derive(Debug)]
pub struct DocumentHandle {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl DocumentHandle {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for exclusive access to the document.
    pub async fn lock(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }

    fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// Registry of per-document locks keyed by canonical path.
#[derive(Clone)]
pub struct DocumentRegistry {
    inner: Arc<DocumentRegistryInner>,
}

/// Internal registry state shared across clones.
struct DocumentRegistryInner {
    entries: RwLock<HashMap<PathBuf, Arc<DocumentEntry>>>,
    config: DocumentRegistryConfig,
}

/// Cache entry that tracks a document handle and last access time.
struct DocumentEntry {
    handle: OnceCell<Arc<DocumentHandle>>,
    last_used_ms: AtomicU64,
}

impl DocumentEntry {
    fn new() -> Self {
        Self {
            handle: OnceCell::new(),
            last_used_ms: AtomicU64::new(now_ms()),
        }
    }

    fn touch(&self) {
        self.last_used_ms.store(now_ms(), Ordering::Relaxed);
    }

    fn idle_for(&self, now_ms: u64) -> Duration {
        let last = self.last_used_ms.load(Ordering::Relaxed);
        Duration::from_millis(now_ms.saturating_sub(last))
    }

    fn is_busy(&self) -> bool {
        self.handle.get().is_some_and(|handle| handle.is_busy())
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new(DocumentRegistryConfig::default())
    }
}

impl DocumentRegistry {
    #[must_use]
    pub fn new(config: DocumentRegistryConfig) -> Self {
        Self {
            inner: Arc::new(DocumentRegistryInner {
                entries: RwLock::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Returns the handle for `path`, creating it at most once per key.
    ///
    /// # Errors
    /// Returns `CapacityReached` when a new entry would exceed `max_entries`.
    pub async fn get_or_init(&self, path: &Path) -> Result<Arc<DocumentHandle>, RegistryError> {
        let key = canonical_path(path).await;
        let entry = {
            let map = self.inner.entries.read().await;
            map.get(&key).cloned()
        };

        let entry = match entry {
            Some(entry) => entry,
            None => {
                let mut map = self.inner.entries.write().await;
                if let Some(entry) = map.get(&key).cloned() {
                    entry
                } else {
                    if let Some(max_entries) = self.inner.config.max_entries
                        && map.len() >= max_entries
                    {
                        return Err(RegistryError::CapacityReached { max: max_entries });
                    }
                    let entry = Arc::new(DocumentEntry::new());
                    map.insert(key.clone(), entry.clone());
                    entry
                }
            }
        };

        entry.touch();
        let handle = entry
            .handle
            .get_or_init(|| async move { Arc::new(DocumentHandle::new(key)) })
            .await;
        Ok(handle.clone())
    }

    /// Acquires the document lock for `path`.
    ///
    /// # Errors
    /// Returns `CapacityReached` when the registry is full.
    pub async fn lock(&self, path: &Path) -> Result<OwnedMutexGuard<()>, RegistryError> {
        let handle = self.get_or_init(path).await?;
        Ok(handle.lock().await)
    }

    pub async fn tracked_documents(&self) -> Vec<PathBuf> {
        let map = self.inner.entries.read().await;
        map.keys().cloned().collect()
    }

    /// Drops entries idle longer than the TTL. Locked entries are kept.
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.inner.config.ttl else {
            return 0;
        };
        let now = now_ms();
        let mut map = self.inner.entries.write().await;
        let before = map.len();
        map.retain(|_, entry| entry.is_busy() || entry.idle_for(now) <= ttl);
        before.saturating_sub(map.len())
    }

    #[must_use]
    pub fn spawn_sweeper(self) -> Option<tokio::task::JoinHandle<()>> {
        let _ttl = self.inner.config.ttl?;
        let interval = self.inner.config.sweep_interval;
        let registry = self;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "evicted idle document locks");
                }
            }
        }))
    }
}

/// The path locks are keyed by: symlinks and relative segments resolved when
/// the file exists, the path unchanged otherwise.
pub async fn canonical_path(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

fn now_ms() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_single_flight() {
        let registry = DocumentRegistry::default();
        let r1 = registry.clone();
        let r2 = registry.clone();
        let path = Path::new("/tmp/word-mcp-registry-test.docx");
        let (left, right) = tokio::join!(r1.get_or_init(path), r2.get_or_init(path));
        let left = left.expect("left handle");
        let right = right.expect("right handle");
        assert!(Arc::ptr_eq(&left, &right));
        assert_eq!(registry.tracked_documents().await.len(), 1);
    }

    #[tokio::test]
    async fn registry_evicts_idle_entries() {
        let registry = DocumentRegistry::new(
            DocumentRegistryConfig::default()
                .with_ttl(Duration::from_millis(1))
                .with_sweep_interval(Duration::from_millis(1)),
        );
        let _ = registry
            .get_or_init(Path::new("/tmp/a.docx"))
            .await
            .expect("handle");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.evict_idle().await, 1);
    }

    #[tokio::test]
    async fn registry_keeps_locked_entries() {
        let registry = DocumentRegistry::new(
            DocumentRegistryConfig::default().with_ttl(Duration::from_millis(1)),
        );
        let guard = registry
            .lock(Path::new("/tmp/b.docx"))
            .await
            .expect("lock");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.evict_idle().await, 0);
        drop(guard);
        assert_eq!(registry.evict_idle().await, 1);
    }

    #[tokio::test]
    async fn registry_enforces_capacity() {
        let registry =
            DocumentRegistry::new(DocumentRegistryConfig::default().with_max_entries(1));
        registry
            .get_or_init(Path::new("/tmp/one.docx"))
            .await
            .expect("first fits");
        let err = registry
            .get_or_init(Path::new("/tmp/two.docx"))
            .await
            .expect_err("second exceeds capacity");
        assert!(matches!(err, RegistryError::CapacityReached { max: 1 }));
    }
}
