//! Pre-compressed sidecar selection

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::ServerConfig;
use crate::fs::{FileSystem, ResourceStat};
use crate::http::encoding;
use crate::http::ContentEncoding;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// The file actually read for a logical request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFile {
    pub path: PathBuf,
    /// Set when a sidecar was chosen and must be declared as Content-Encoding
    pub encoding: Option<ContentEncoding>,
    /// Stat of the chosen sidecar, already fetched while probing for it
    pub stat: Option<ResourceStat>,
}

impl NegotiatedFile {
    fn original(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding: None,
            stat: None,
        }
    }
}

/// Pick brotli, then gzip, then the original file
///
/// Probe failures of any kind fall through to the next candidate; only the
/// final stat of the chosen file decides the response.
pub async fn negotiate(
    fs: &dyn FileSystem,
    config: &ServerConfig,
    file: &Path,
    accept_encoding: Option<&str>,
) -> NegotiatedFile {
    if config.brotli && encoding::accepts(accept_encoding, ContentEncoding::Brotli) {
        let sidecar = sidecar_path(file, ContentEncoding::Brotli);
        if let Ok(stat) = fs.stat(&sidecar).await {
            if stat.is_file {
                return NegotiatedFile {
                    path: sidecar,
                    encoding: Some(ContentEncoding::Brotli),
                    stat: Some(stat),
                };
            }
        }
    }

    if config.gzip && encoding::accepts(accept_encoding, ContentEncoding::Gzip) {
        let sidecar = sidecar_path(file, ContentEncoding::Gzip);
        if let Ok(stat) = fs.stat(&sidecar).await {
            if stat.is_file && has_gzip_magic(fs, &sidecar).await {
                return NegotiatedFile {
                    path: sidecar,
                    encoding: Some(ContentEncoding::Gzip),
                    stat: Some(stat),
                };
            }
            tracing::debug!("Ignoring {}: not a gzip stream", sidecar.display());
        }
    }

    NegotiatedFile::original(file)
}

fn sidecar_path(file: &Path, encoding: ContentEncoding) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(encoding.suffix());
    PathBuf::from(name)
}

async fn has_gzip_magic(fs: &dyn FileSystem, path: &Path) -> bool {
    fs.read_prefix(path, GZIP_MAGIC.len() as u64)
        .await
        .is_ok_and(|prefix| prefix == GZIP_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesConfig;
    use crate::fs::LocalFs;

    fn setup(gzip: bool, brotli: bool) -> (tempfile::TempDir, ServerConfig) {
        let dir = tempfile::tempdir().unwrap();
        let files = FilesConfig {
            root: dir.path().to_string_lossy().into_owned(),
            gzip,
            brotli,
            ..FilesConfig::default()
        };
        let cfg = ServerConfig::from_files_config(&files).unwrap();
        (dir, cfg)
    }

    #[tokio::test]
    async fn test_prefers_brotli() {
        let (_dir, cfg) = setup(true, true);
        let file = cfg.root.join("app.js");
        std::fs::write(&file, b"plain").unwrap();
        std::fs::write(cfg.root.join("app.js.br"), b"br-bytes").unwrap();
        std::fs::write(cfg.root.join("app.js.gz"), [0x1F, 0x8B, 0x08]).unwrap();

        let chosen = negotiate(&LocalFs, &cfg, &file, Some("gzip, deflate, br")).await;
        assert_eq!(chosen.encoding, Some(ContentEncoding::Brotli));
        assert_eq!(chosen.path, cfg.root.join("app.js.br"));
        assert_eq!(chosen.stat.map(|s| s.size), Some(8));

        let chosen = negotiate(&LocalFs, &cfg, &file, Some("gzip")).await;
        assert_eq!(chosen.encoding, Some(ContentEncoding::Gzip));
    }

    #[tokio::test]
    async fn test_gzip_requires_magic_bytes() {
        let (_dir, cfg) = setup(true, false);
        let file = cfg.root.join("report.csv");
        std::fs::write(&file, b"a,b\n").unwrap();
        std::fs::write(cfg.root.join("report.csv.gz"), b"not gzip").unwrap();

        let chosen = negotiate(&LocalFs, &cfg, &file, Some("gzip")).await;
        assert_eq!(chosen, NegotiatedFile::original(&file));
    }

    #[tokio::test]
    async fn test_disabled_or_not_accepted() {
        let (_dir, cfg) = setup(false, false);
        let file = cfg.root.join("a.txt");
        std::fs::write(cfg.root.join("a.txt.gz"), [0x1F, 0x8B]).unwrap();
        let chosen = negotiate(&LocalFs, &cfg, &file, Some("gzip")).await;
        assert_eq!(chosen.encoding, None);

        let (_dir, cfg) = setup(true, true);
        let file = cfg.root.join("a.txt");
        std::fs::write(cfg.root.join("a.txt.gz"), [0x1F, 0x8B]).unwrap();
        assert_eq!(negotiate(&LocalFs, &cfg, &file, None).await.encoding, None);
        assert_eq!(
            negotiate(&LocalFs, &cfg, &file, Some("identity")).await.encoding,
            None
        );
        assert_eq!(
            negotiate(&LocalFs, &cfg, &file, Some("*")).await.encoding,
            Some(ContentEncoding::Gzip)
        );
    }

    #[tokio::test]
    async fn test_sidecar_directory_is_ignored() {
        let (_dir, cfg) = setup(false, true);
        let file = cfg.root.join("data");
        std::fs::create_dir(cfg.root.join("data.br")).unwrap();
        let chosen = negotiate(&LocalFs, &cfg, &file, Some("br")).await;
        assert_eq!(chosen.encoding, None);
    }
}
