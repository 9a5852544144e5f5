//! Filesystem access used by the file handler
//!
//! Every stat, directory read and file open goes through [`FileSystem`], so
//! the handler never touches `tokio::fs` directly.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

use crate::http::ByteRange;

/// Readable handle returned by [`FileSystem::open_read`]
pub type FileReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata needed to answer one request, fetched fresh every time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStat {
    pub ino: u64,
    pub size: u64,
    pub modified: SystemTime,
    pub is_dir: bool,
    pub is_file: bool,
    /// Unix permission bits (`st_mode`), zero where unavailable
    pub mode: u32,
}

impl ResourceStat {
    fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            ino: inode(meta),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            mode: mode(meta),
        }
    }
}

#[cfg(unix)]
fn inode(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
const fn inode(_meta: &std::fs::Metadata) -> u64 {
    0
}

#[cfg(unix)]
fn mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
const fn mode(_meta: &std::fs::Metadata) -> u32 {
    0
}

/// Returns true for the errors that mean "nothing lives at this path"
pub fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn stat(&self, path: &Path) -> io::Result<ResourceStat>;

    /// Names of the entries in a directory, in no particular order
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Open a file for reading, optionally bounded to an inclusive byte range
    async fn open_read(&self, path: &Path, range: Option<ByteRange>) -> io::Result<FileReader>;

    /// Read at most `limit` bytes from the start of a file
    async fn read_prefix(&self, path: &Path, limit: u64) -> io::Result<Vec<u8>> {
        let reader = self.open_read(path, None).await?;
        let mut buf = Vec::new();
        reader.take(limit).read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// [`FileSystem`] backed by the local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
    async fn stat(&self, path: &Path) -> io::Result<ResourceStat> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(ResourceStat::from_metadata(&meta))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut dir = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn open_read(&self, path: &Path, range: Option<ByteRange>) -> io::Result<FileReader> {
        let mut file = tokio::fs::File::open(path).await?;
        match range {
            Some(range) => {
                file.seek(io::SeekFrom::Start(range.start)).await?;
                Ok(Box::pin(file.take(range.len())))
            }
            None => Ok(Box::pin(file)),
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Filesystem doubles: one counts every call, used to prove that
    //! rejected requests never reach the disk; the other injects failures.

    use super::{ByteRange, FileReader, FileSystem, LocalFs, ResourceStat};
    use async_trait::async_trait;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    pub struct CountingFs {
        calls: AtomicUsize,
    }

    impl CountingFs {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn bump(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FileSystem for CountingFs {
        async fn stat(&self, path: &Path) -> io::Result<ResourceStat> {
            self.bump();
            LocalFs.stat(path).await
        }

        async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
            self.bump();
            LocalFs.read_dir(path).await
        }

        async fn open_read(
            &self,
            path: &Path,
            range: Option<ByteRange>,
        ) -> io::Result<FileReader> {
            self.bump();
            LocalFs.open_read(path, range).await
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        Stat,
        ReadDir,
        Open,
    }

    /// Local disk, except that one operation on one path fails with
    /// `PermissionDenied`
    #[derive(Debug)]
    pub struct FailingFs {
        op: Op,
        path: PathBuf,
        message: String,
    }

    impl FailingFs {
        pub fn new(op: Op, path: impl Into<PathBuf>, message: &str) -> Self {
            Self {
                op,
                path: path.into(),
                message: message.to_string(),
            }
        }

        fn check(&self, op: Op, path: &Path) -> io::Result<()> {
            if op == self.op && path == self.path {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    self.message.clone(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FileSystem for FailingFs {
        async fn stat(&self, path: &Path) -> io::Result<ResourceStat> {
            self.check(Op::Stat, path)?;
            LocalFs.stat(path).await
        }

        async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
            self.check(Op::ReadDir, path)?;
            LocalFs.read_dir(path).await
        }

        async fn open_read(
            &self,
            path: &Path,
            range: Option<ByteRange>,
        ) -> io::Result<FileReader> {
            self.check(Op::Open, path)?;
            LocalFs.open_read(path, range).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stat_file_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let file = LocalFs.stat(&dir.path().join("a.txt")).await.unwrap();
        assert_eq!(file.size, 5);
        assert!(file.is_file);
        assert!(!file.is_dir);

        let root = LocalFs.stat(dir.path()).await.unwrap();
        assert!(root.is_dir);
    }

    #[tokio::test]
    async fn test_missing_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let err = LocalFs.stat(&dir.path().join("nope")).await.unwrap_err();
        assert!(is_missing(&err));

        // a file used as a directory
        let err = LocalFs
            .stat(&dir.path().join("a.txt").join("child"))
            .await
            .unwrap_err();
        assert!(is_missing(&err));
    }

    #[tokio::test]
    async fn test_open_read_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digits");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut reader = LocalFs
            .open_read(&path, Some(ByteRange { start: 2, end: 5 }))
            .await
            .unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"2345");

        assert_eq!(LocalFs.read_prefix(&path, 2).await.unwrap(), b"01");
    }

    #[tokio::test]
    async fn test_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();

        let mut names = LocalFs.read_dir(dir.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
