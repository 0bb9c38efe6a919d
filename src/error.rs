//! Error types
//!
//! One error enum for the whole resolution pipeline, so callers can tell a
//! retryable fetch failure apart from a fatal manifest failure.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::Role;
use crate::manifest::Channel;

/// Errors raised while resolving, fetching and flashing firmware
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest source could not be reached or read
    #[error("manifest unavailable at {source_name}: {reason}")]
    ManifestUnavailable { source_name: String, reason: String },

    /// The manifest was read but does not match the schema
    #[error("manifest could not be parsed: {0}")]
    ManifestMalformed(String),

    /// No product in the manifest has at least one version
    #[error("no product in the manifest has any version available")]
    NoEligibleProduct,

    /// Channel filtering left nothing to choose from
    #[error("no versions available in the {channel} channel")]
    NoVersionsInChannel { channel: Channel },

    /// Network or transport failure while retrieving an artifact
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The artifact is empty or truncated
    #[error("{} is too small ({size} bytes, minimum is more than {min_size})", path.display())]
    ArtifactTooSmall {
        path: PathBuf,
        size: u64,
        min_size: u64,
    },

    /// A transport-compressed artifact could not be decoded
    #[error("failed to decompress {}: {reason}", path.display())]
    DecompressionFailed { path: PathBuf, reason: String },

    /// The product has no base path and no explicit URL is available
    #[error("product {model} declares no path and version {version} has no url")]
    MissingBasePath { model: String, version: String },

    /// A declared split-image role could not be fetched
    #[error("cannot assemble split image: {role} unavailable: {source}")]
    IncompleteArtifactSet {
        role: Role,
        #[source]
        source: Box<Error>,
    },

    /// No serial port was detected to offer
    #[error("no serial port detected")]
    NoSerialPorts,

    /// The external flashing tool failed
    #[error("device programmer failed: {0}")]
    DeviceProgrammerFailed(String),

    /// Local filesystem failure inside the artifact cache
    #[error("cache error at {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A user-supplied local image cannot be used
    #[error("invalid local image {}: {reason}", path.display())]
    LocalImage { path: PathBuf, reason: String },

    /// A model or version named on the command line does not exist
    #[error("{kind} '{name}' not found in the manifest")]
    NotFound { kind: &'static str, name: String },

    /// Settings file or flash layout is invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The user quit a prompt
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Build a cache error from an I/O failure on `path`
    pub fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Cache {
            path: path.into(),
            source,
        }
    }

    /// Fetch-stage errors the user may retry or accept
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::FetchFailed { .. } | Error::ArtifactTooSmall { .. } => true,
            Error::IncompleteArtifactSet { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Actionable hint shown next to the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::ManifestUnavailable { .. } => {
                Some("Check the network connection or the manifest location.")
            }
            Error::FetchFailed { .. } => Some("Check the network connection and retry."),
            Error::DeviceProgrammerFailed(_) => Some(
                "Check the serial port, and hold the BOOT button while resetting the device \
                 to enter the bootloader.",
            ),
            Error::NoSerialPorts => {
                Some("Check the USB cable and the serial driver, or pass --port.")
            }
            Error::MissingBasePath { .. } => Some("The manifest entry for this product is incomplete."),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
