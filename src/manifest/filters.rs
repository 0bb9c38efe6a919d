//! Product and version selection
//!
//! Eligibility, channel filtering and latest-first ordering of the
//! manifest contents.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::models::{Manifest, Product, VersionEntry};
use super::version::VersionKey;
use crate::log_warn;

const MODULE: &str = "manifest::filters";

/// Release maturity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    /// Only versions tagged `Release`
    #[default]
    Release,
    /// Pre-releases and releases
    All,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Release, Channel::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Release => "Release",
            Channel::All => "All",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Channel::Release => "release versions only",
            Channel::All => "pre-release and release versions",
        }
    }

    pub fn admits(&self, entry: &VersionEntry) -> bool {
        match self {
            Channel::Release => entry.is_release(),
            Channel::All => true,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "release" => Ok(Channel::Release),
            "all" => Ok(Channel::All),
            other => Err(format!("unknown channel '{}' (expected Release or All)", other)),
        }
    }
}

/// Products that have at least one version, in manifest order
pub fn eligible_products(manifest: &Manifest) -> Result<Vec<&Product>> {
    let products: Vec<&Product> = manifest
        .product
        .iter()
        .filter(|p| p.is_selectable())
        .collect();

    if products.is_empty() {
        return Err(Error::NoEligibleProduct);
    }
    Ok(products)
}

/// Find an eligible product by model identifier
pub fn find_product<'a>(products: &[&'a Product], model: &str) -> Option<&'a Product> {
    products.iter().copied().find(|p| p.model == model)
}

/// Keep only the entries admitted by `channel`, preserving order
pub fn filter_channel<'a, I>(versions: I, channel: Channel) -> Vec<&'a VersionEntry>
where
    I: IntoIterator<Item = &'a VersionEntry>,
{
    versions
        .into_iter()
        .filter(|v| channel.admits(v))
        .collect()
}

/// Stable ascending sort by version key; ties keep manifest order
pub fn sort_versions(versions: &mut [&VersionEntry]) {
    versions.sort_by_cached_key(|v| {
        let key = VersionKey::parse(&v.version);
        if !key.is_well_formed() {
            log_warn!(MODULE, "Unrecognised version identifier '{}', listed first", v.version);
        }
        key
    });
}

/// Channel-filtered, ascending versions of a product. The latest entry is last.
pub fn versions_for_channel(product: &Product, channel: Channel) -> Result<Vec<&VersionEntry>> {
    let mut versions = filter_channel(&product.versions, channel);
    if versions.is_empty() {
        return Err(Error::NoVersionsInChannel { channel });
    }
    sort_versions(&mut versions);
    Ok(versions)
}

/// Default selection: the latest version
pub fn latest_index(versions: &[&VersionEntry]) -> usize {
    versions.len().saturating_sub(1)
}

/// Position of a version identifier in a resolved list
pub fn find_version(versions: &[&VersionEntry], version: &str) -> Option<usize> {
    versions.iter().position(|v| v.version == version)
}
