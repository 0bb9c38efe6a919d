//! Download module
//!
//! Artifact cache and fetcher. Every artifact has a canonical cache path
//! derived from `(model, version, role)`; a non-trivial file at that path is
//! reused without touching the network, otherwise it is downloaded,
//! decompressed when transport-compressed, and size-checked.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config;
use crate::decompress::{decompress_zstd, needs_decompression};
use crate::error::{Error, Result};
use crate::transport::{resolve_url, Transport};
use crate::utils::{with_suffix, ProgressTracker};
use crate::{log_debug, log_error, log_info, log_warn};

const MODULE: &str = "download";

/// Directory of artifacts shared by every model and version
const SHARED_DIR: &str = "resources";

/// Logical purpose of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Bootloader,
    Partitions,
    /// Shared OTA data initialiser, independent of the firmware version
    BootStub,
    Application,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Bootloader => "bootloader",
            Role::Partitions => "partitions",
            Role::BootStub => "boot_stub",
            Role::Application => "application",
        }
    }

    /// File name inside the nested cache layout
    fn file_name(&self) -> &'static str {
        match self {
            Role::Bootloader => "bootloader.bin",
            Role::Partitions => "partitions.bin",
            Role::BootStub => "boot_app0.bin",
            Role::Application => "firmware.bin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache naming scheme of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// `{model}_{version}.bin`
    Combined,
    /// `{model}/{version}/{role}.bin`
    Split,
}

/// Everything needed to materialise one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub model: String,
    pub version: String,
    pub role: Role,
    pub kind: ImageKind,
    /// Absolute URL, `/rooted` or relative path below the base URL
    pub locator: String,
}

impl ArtifactRequest {
    pub fn new(
        model: impl Into<String>,
        version: impl Into<String>,
        role: Role,
        kind: ImageKind,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            version: version.into(),
            role,
            kind,
            locator: locator.into(),
        }
    }

    /// Request for the shared boot stub
    pub fn boot_stub(locator: impl Into<String>) -> Self {
        Self::new("", "", Role::BootStub, ImageKind::Split, locator)
    }

    /// Canonical cache path below `root`
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        match (self.role, self.kind) {
            (Role::BootStub, _) => root.join(SHARED_DIR).join(Role::BootStub.file_name()),
            (_, ImageKind::Combined) => root.join(format!(
                "{}_{}.bin",
                sanitize(&self.model),
                sanitize(&self.version)
            )),
            (role, ImageKind::Split) => root
                .join(sanitize(&self.model))
                .join(sanitize(&self.version))
                .join(role.file_name()),
        }
    }
}

/// Keep manifest identifiers from escaping the cache directory
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Anything that can turn an artifact request into a local file
pub trait ArtifactSource {
    fn fetch(&mut self, request: &ArtifactRequest) -> Result<PathBuf>;
}

/// Artifact cache backed by a [`Transport`]
pub struct Fetcher<'a> {
    transport: &'a dyn Transport,
    cache_dir: PathBuf,
    base_url: String,
    min_size: u64,
    force: bool,
}

impl<'a> Fetcher<'a> {
    pub fn new(transport: &'a dyn Transport, config: &config::Config) -> Self {
        Self {
            transport,
            cache_dir: config.cache_dir.clone(),
            base_url: config.base_url.clone(),
            min_size: config.min_artifact_size,
            force: false,
        }
    }

    /// Ignore cached files and download again
    pub fn force_redownload(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Fetch an artifact. `accept_undersized` decides whether a freshly
    /// downloaded file at or below the minimum size is kept anyway.
    pub fn fetch_with(
        &mut self,
        request: &ArtifactRequest,
        accept_undersized: &mut dyn FnMut(&Path, u64) -> bool,
    ) -> Result<PathBuf> {
        let path = request.cache_path(&self.cache_dir);

        if let Some(cached) = self.reuse(&path)? {
            return Ok(cached);
        }

        let url = resolve_url(&self.base_url, &request.locator);
        log_info!(MODULE, "Downloading {} for {}: {}", request.role, request.model, url);
        log_debug!(MODULE, "Cache path: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::cache(parent, e))?;
        }

        let partial = with_suffix(&path, config::download::PARTIAL_SUFFIX);
        if let Err(e) = self.download_to(&url, &partial) {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }

        self.materialize(&request.locator, &partial, &path)?;
        self.check_size(&path, accept_undersized)?;

        log_info!(MODULE, "Artifact ready: {}", path.display());
        Ok(path)
    }

    /// Return the cached file if it is valid; clear stale entries
    fn reuse(&self, path: &Path) -> Result<Option<PathBuf>> {
        let size = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => return Ok(None),
        };

        if size > self.min_size && !self.force {
            log_info!(MODULE, "Using cached artifact: {} ({} bytes)", path.display(), size);
            return Ok(Some(path.to_path_buf()));
        }

        if self.force {
            // replaced only once the new download is materialised
            log_info!(MODULE, "Re-download requested for {}", path.display());
            return Ok(None);
        }

        log_warn!(
            MODULE,
            "Cached artifact {} is too small ({} bytes), downloading again",
            path.display(),
            size
        );
        std::fs::remove_file(path).map_err(|e| Error::cache(path, e))?;
        Ok(None)
    }

    fn download_to(&self, url: &str, target: &Path) -> Result<u64> {
        let download = self.transport.open(url)?;
        let total_size = download.content_length.unwrap_or(0);
        let mut body = download.body;

        let mut file = File::create(target).map_err(|e| Error::cache(target, e))?;
        let mut buffer = vec![0u8; config::download::CHUNK_SIZE];
        let mut tracker = ProgressTracker::new(
            "Download",
            MODULE,
            total_size,
            config::logging::DOWNLOAD_LOG_INTERVAL_MB,
        );

        loop {
            let bytes_read = body.read(&mut buffer).map_err(|e| {
                log_error!(MODULE, "Download error: {}", e);
                Error::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?;
            if bytes_read == 0 {
                break;
            }
            file.write_all(&buffer[..bytes_read])
                .map_err(|e| Error::cache(target, e))?;
            tracker.update(bytes_read as u64);
        }

        file.flush().map_err(|e| Error::cache(target, e))?;
        Ok(tracker.finish())
    }

    /// Move the downloaded intermediate into its final place
    fn materialize(&self, locator: &str, partial: &Path, path: &Path) -> Result<()> {
        if !needs_decompression(locator) {
            return std::fs::rename(partial, path).map_err(|e| Error::cache(path, e));
        }

        let decoded = with_suffix(path, config::download::DECODING_SUFFIX);
        let result = decompress_zstd(partial, &decoded);
        let _ = std::fs::remove_file(partial);
        if let Err(e) = result {
            log_error!(MODULE, "Decompression failed: {}", e);
            let _ = std::fs::remove_file(&decoded);
            return Err(e);
        }
        std::fs::rename(&decoded, path).map_err(|e| Error::cache(path, e))
    }

    fn check_size(
        &self,
        path: &Path,
        accept_undersized: &mut dyn FnMut(&Path, u64) -> bool,
    ) -> Result<()> {
        let size = std::fs::metadata(path)
            .map_err(|e| Error::cache(path, e))?
            .len();
        if size > self.min_size {
            return Ok(());
        }

        log_warn!(MODULE, "Downloaded artifact {} is too small ({} bytes)", path.display(), size);
        if accept_undersized(path, size) {
            log_warn!(MODULE, "Keeping undersized artifact at user request");
            return Ok(());
        }

        let _ = std::fs::remove_file(path);
        Err(Error::ArtifactTooSmall {
            path: path.to_path_buf(),
            size,
            min_size: self.min_size,
        })
    }
}

impl ArtifactSource for Fetcher<'_> {
    /// Fetch, rejecting undersized payloads
    fn fetch(&mut self, request: &ArtifactRequest) -> Result<PathBuf> {
        self.fetch_with(request, &mut |_, _| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::decompress::compress_zstd;
    use crate::transport::testing::MemoryTransport;

    const BASE: &str = "https://host/root";

    fn config(cache_dir: &Path) -> Config {
        Config {
            cache_dir: cache_dir.to_path_buf(),
            base_url: BASE.to_string(),
            ..Config::default()
        }
    }

    fn combined(locator: &str) -> ArtifactRequest {
        ArtifactRequest::new("A", "25w47a", Role::Application, ImageKind::Combined, locator)
    }

    #[test]
    fn test_cache_paths() {
        let root = Path::new("/cache");
        assert_eq!(
            combined("x").cache_path(root),
            PathBuf::from("/cache/A_25w47a.bin")
        );
        let split = ArtifactRequest::new("A", "25w47a", Role::Application, ImageKind::Split, "x");
        assert_eq!(split.cache_path(root), PathBuf::from("/cache/A/25w47a/firmware.bin"));
        let bootloader = ArtifactRequest::new("A", "1.0", Role::Bootloader, ImageKind::Split, "x");
        assert_eq!(
            bootloader.cache_path(root),
            PathBuf::from("/cache/A/1.0/bootloader.bin")
        );
        assert_eq!(
            ArtifactRequest::boot_stub("resources/boot_app0.bin").cache_path(root),
            PathBuf::from("/cache/resources/boot_app0.bin")
        );
    }

    #[test]
    fn test_cache_path_components_are_sanitized() {
        let root = Path::new("/cache");
        let request = ArtifactRequest::new("../A", "..", Role::Partitions, ImageKind::Split, "x");
        let path = request.cache_path(root);
        assert!(path.starts_with(root));
        assert_eq!(path, PathBuf::from("/cache/.._A/_/partitions.bin"));
    }

    #[test]
    fn test_fetch_downloads_relative_locator() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with("https://host/root/fw/A/25w47a.bin", b"image".to_vec());
        let mut fetcher = Fetcher::new(&transport, &config(dir.path()));

        let path = fetcher.fetch(&combined("fw/A/25w47a.bin")).unwrap();
        assert_eq!(path, dir.path().join("A_25w47a.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), b"image");
        assert_eq!(transport.requests(), ["https://host/root/fw/A/25w47a.bin"]);
        assert!(!with_suffix(&path, "downloading").exists());
    }

    #[test]
    fn test_cache_reuse_transfers_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with("https://host/root/fw/a.bin", b"image".to_vec());
        let config = config(dir.path());

        let first = Fetcher::new(&transport, &config).fetch(&combined("/fw/a.bin")).unwrap();
        let second = Fetcher::new(&transport, &config).fetch(&combined("/fw/a.bin")).unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_force_redownload_transfers_again() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with("https://host/root/a.bin", b"image".to_vec());
        let config = config(dir.path());

        Fetcher::new(&transport, &config).fetch(&combined("a.bin")).unwrap();
        Fetcher::new(&transport, &config)
            .force_redownload(true)
            .fetch(&combined("a.bin"))
            .unwrap();
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_failed_redownload_keeps_cached_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let online = MemoryTransport::new().with("https://host/root/a.bin", b"image".to_vec());
        let offline = MemoryTransport::new();

        let path = Fetcher::new(&online, &config).fetch(&combined("a.bin")).unwrap();
        let err = Fetcher::new(&offline, &config)
            .force_redownload(true)
            .fetch(&combined("a.bin"))
            .unwrap_err();
        assert!(matches!(err, Error::FetchFailed { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"image");
        assert!(!with_suffix(&path, "downloading").exists());
    }

    #[test]
    fn test_corrupt_redownload_keeps_cached_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A_25w47a.bin"), b"old image").unwrap();
        let transport =
            MemoryTransport::new().with("https://host/root/a.bin.zst", b"garbage".to_vec());

        let err = Fetcher::new(&transport, &config(dir.path()))
            .force_redownload(true)
            .fetch(&combined("a.bin.zst"))
            .unwrap_err();
        assert!(matches!(err, Error::DecompressionFailed { .. }));
        assert_eq!(
            std::fs::read(dir.path().join("A_25w47a.bin")).unwrap(),
            b"old image"
        );
    }

    #[test]
    fn test_redownload_replaces_cached_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(dir.path().join("A_25w47a.bin"), b"old image").unwrap();
        let transport = MemoryTransport::new().with("https://host/root/a.bin", b"new".to_vec());

        let path = Fetcher::new(&transport, &config)
            .force_redownload(true)
            .fetch(&combined("a.bin"))
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }

    #[test]
    fn test_stale_empty_cache_entry_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A_25w47a.bin"), b"").unwrap();
        let transport = MemoryTransport::new().with("https://host/root/a.bin", b"image".to_vec());

        let path = Fetcher::new(&transport, &config(dir.path()))
            .fetch(&combined("a.bin"))
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"image");
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_empty_download_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with("https://host/root/a.bin", Vec::new());

        let err = Fetcher::new(&transport, &config(dir.path()))
            .fetch(&combined("a.bin"))
            .unwrap_err();
        assert!(matches!(err, Error::ArtifactTooSmall { size: 0, .. }));
        assert!(!dir.path().join("A_25w47a.bin").exists());
    }

    #[test]
    fn test_empty_download_kept_when_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with("https://host/root/a.bin", Vec::new());
        let mut asked = 0;

        let path = Fetcher::new(&transport, &config(dir.path()))
            .fetch_with(&combined("a.bin"), &mut |_, size| {
                asked += 1;
                size == 0
            })
            .unwrap();
        assert_eq!(asked, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_missing_remote_is_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new();

        let err = Fetcher::new(&transport, &config(dir.path()))
            .fetch(&combined("a.bin"))
            .unwrap_err();
        assert!(matches!(err, Error::FetchFailed { ref url, .. } if url == "https://host/root/a.bin"));
        assert!(!dir.path().join("A_25w47a.bin.downloading").exists());
    }

    #[test]
    fn test_compressed_artifact_is_decompressed() {
        let dir = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let raw = staging.path().join("firmware.bin");
        let packed = staging.path().join("firmware.bin.zst");
        std::fs::write(&raw, vec![0xA5u8; 4096]).unwrap();
        compress_zstd(&raw, &packed, 3).unwrap();

        let transport = MemoryTransport::new().with(
            "https://host/root/fw/A/25w47a/firmware.bin.zst",
            std::fs::read(&packed).unwrap(),
        );
        let request = ArtifactRequest::new(
            "A",
            "25w47a",
            Role::Application,
            ImageKind::Split,
            "fw/A/25w47a/firmware.bin.zst",
        );

        let path = Fetcher::new(&transport, &config(dir.path()))
            .fetch(&request)
            .unwrap();
        assert_eq!(path, dir.path().join("A/25w47a/firmware.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xA5u8; 4096]);
        assert!(!with_suffix(&path, "downloading").exists());
    }

    #[test]
    fn test_corrupt_compressed_artifact_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            MemoryTransport::new().with("https://host/root/a.bin.zst", b"garbage".to_vec());

        let err = Fetcher::new(&transport, &config(dir.path()))
            .fetch(&combined("a.bin.zst"))
            .unwrap_err();
        assert!(matches!(err, Error::DecompressionFailed { .. }));
        assert!(!dir.path().join("A_25w47a.bin").exists());
        assert!(!dir.path().join("A_25w47a.bin.downloading").exists());
        assert!(!dir.path().join("A_25w47a.bin.decoding").exists());
    }
}
