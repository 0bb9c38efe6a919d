//! Manifest module
//!
//! Loads the device/version manifest and resolves products, channels and
//! versions from it.

mod filters;
mod models;
mod version;

pub use filters::{
    eligible_products, find_product, find_version, latest_index, versions_for_channel, Channel,
};
pub use models::{ImageShape, Manifest, Product, VersionEntry};

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::transport::{is_absolute_url, Transport};
use crate::{log_error, log_info};

const MODULE: &str = "manifest";

/// Load the manifest from a URL or a local file
pub fn load(source: &str, transport: &dyn Transport) -> Result<Manifest> {
    log_info!(MODULE, "Loading manifest from {}", source);

    let bytes = if is_absolute_url(source) {
        fetch_remote(source, transport)?
    } else {
        std::fs::read(Path::new(source)).map_err(|e| {
            log_error!(MODULE, "Failed to read manifest file: {}", e);
            Error::ManifestUnavailable {
                source_name: source.to_string(),
                reason: e.to_string(),
            }
        })?
    };

    let manifest = parse(&bytes)?;
    log_info!(
        MODULE,
        "Loaded manifest with {} product(s)",
        manifest.product.len()
    );
    Ok(manifest)
}

fn fetch_remote(url: &str, transport: &dyn Transport) -> Result<Vec<u8>> {
    let unavailable = |reason: String| Error::ManifestUnavailable {
        source_name: url.to_string(),
        reason,
    };

    let mut download = transport.open(url).map_err(|e| match e {
        Error::FetchFailed { reason, .. } => unavailable(reason),
        other => unavailable(other.to_string()),
    })?;

    let mut bytes = Vec::new();
    download
        .body
        .read_to_end(&mut bytes)
        .map_err(|e| unavailable(e.to_string()))?;
    Ok(bytes)
}

/// Parse a manifest document
pub fn parse(bytes: &[u8]) -> Result<Manifest> {
    serde_json::from_slice(bytes).map_err(|e| {
        log_error!(MODULE, "Failed to parse manifest: {}", e);
        Error::ManifestMalformed(e.to_string())
    })
}
