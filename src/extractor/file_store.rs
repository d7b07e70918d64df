use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>;

/// The local mirror tree. Every extracted source lives under `root`, and the
/// files on disk are the baseline for change detection on the next run.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    dry_run: bool,
    locks: LockMap,
}

impl LocalFileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// In dry-run mode `write_text` becomes a no-op.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Joins a source-relative path onto the mirror root. Root, `.` and `..`
    /// components are dropped so the result never leaves the root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let mut path = self.root.clone();
        for component in Path::new(relative).components() {
            if let Component::Normal(part) = component {
                path.push(part);
            }
        }
        path
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Raw bytes; mirror files are not required to be valid UTF-8.
    pub async fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    pub async fn modified_time(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let metadata = tokio::fs::metadata(path).await?;
        let mtime = FileTime::from_last_modification_time(&metadata);
        DateTime::from_timestamp(mtime.unix_seconds(), mtime.nanoseconds()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("modification time out of range for {}", path.display()),
            )
        })
    }

    /// Creates missing parent directories, then replaces the file atomically
    /// (temp file in the same directory, then rename).
    pub async fn write_text(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.dry_run {
            return Ok(());
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;

        let target = path.to_path_buf();
        let content = content.to_owned();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut temp = tempfile::Builder::new()
                .prefix(".mapmirror-")
                .tempfile_in(&parent)?;
            temp.write_all(content.as_bytes())?;
            temp.flush()?;
            temp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    /// Exclusive access to one local path. Held across compare-and-write so
    /// two jobs targeting the same file cannot interleave.
    pub async fn lock_path(&self, path: &Path) -> PathLockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        PathLockGuard {
            guard: Some(lock.lock_owned().await),
            path: path.to_path_buf(),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn tracked_paths(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Held lock on one local path. The last holder to release it also removes
/// the path's entry from the lock table.
pub struct PathLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    path: PathBuf,
    locks: LockMap,
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters hold their own clone, so a count of 1 means only the table is left
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.path)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());
        let path = store.resolve("deeply/nested/dir/app.js");

        assert!(!store.exists(&path).await);
        store.write_text(&path, "const x=1;\n").await.unwrap();

        assert!(store.exists(&path).await);
        assert_eq!(store.read_bytes(&path).await.unwrap(), b"const x=1;\n");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());
        let path = store.resolve("a.css");

        store.write_text(&path, "body{}").await.unwrap();
        store.write_text(&path, "p{}").await.unwrap();
        assert_eq!(store.read_bytes(&path).await.unwrap(), b"p{}");

        // No temp files left behind
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path()).with_dry_run(true);
        let path = store.resolve("src/app.js");

        store.write_text(&path, "x").await.unwrap();
        assert!(!store.exists(&path).await);
    }

    #[tokio::test]
    async fn test_modified_time() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());
        let path = store.resolve("old.js");
        store.write_text(&path, "old").await.unwrap();

        let three_days_ago = Utc::now() - chrono::Duration::days(3);
        filetime::set_file_mtime(&path, FileTime::from_unix_time(three_days_ago.timestamp(), 0))
            .unwrap();

        let mtime = store.modified_time(&path).await.unwrap();
        assert_eq!(mtime.timestamp(), three_days_ago.timestamp());

        assert!(store.modified_time(&store.resolve("missing.js")).await.is_err());
    }

    #[test]
    fn test_resolve_stays_under_root() {
        let store = LocalFileStore::new(".");
        assert_eq!(store.resolve("src/app.js"), PathBuf::from("./src/app.js"));
        assert_eq!(store.resolve("/src/app.js"), PathBuf::from("./src/app.js"));
        assert_eq!(store.resolve("./src/app.js"), PathBuf::from("./src/app.js"));
        assert_eq!(
            store.resolve("../node_modules/lib/index.js"),
            PathBuf::from("./node_modules/lib/index.js")
        );
    }

    #[tokio::test]
    async fn test_path_lock_serializes_holders() {
        let store = LocalFileStore::new(".");
        let path = PathBuf::from("./same.js");

        let guard = store.lock_path(&path).await;
        let store_clone = store.clone();
        let path_clone = path.clone();
        let waiter = tokio::spawn(async move {
            let _guard = store_clone.lock_path(&path_clone).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();

        // A different path is never blocked
        let _a = store.lock_path(&path).await;
        let _b = store.lock_path(Path::new("./other.js")).await;
    }

    #[tokio::test]
    async fn test_released_locks_leave_the_table() {
        let store = LocalFileStore::new(".");
        let path = PathBuf::from("./shared.js");

        let first = store.lock_path(&path).await;
        let store_clone = store.clone();
        let path_clone = path.clone();
        let waiter = tokio::spawn(async move {
            let _guard = store_clone.lock_path(&path_clone).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The waiter still needs the entry after the first holder lets go
        drop(first);
        assert!(store.tracked_paths() <= 1);
        waiter.await.unwrap();

        assert_eq!(store.tracked_paths(), 0);
        {
            let _a = store.lock_path(Path::new("./a.js")).await;
            let _b = store.lock_path(Path::new("./b.js")).await;
            assert_eq!(store.tracked_paths(), 2);
        }
        assert_eq!(store.tracked_paths(), 0);
    }

    #[tokio::test]
    async fn test_read_bytes_accepts_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(temp_dir.path());
        let path = store.resolve("broken.js");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert_eq!(store.read_bytes(&path).await.unwrap(), vec![0xff, 0xfe, 0x00]);
    }
}
