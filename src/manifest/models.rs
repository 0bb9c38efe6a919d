//! Manifest data models
//!
//! Types mirroring the published `firmware.json` document.

use serde::{Deserialize, Serialize};

/// Channel tag of stable versions
pub const RELEASE_TAG: &str = "Release";

/// Root manifest document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub product: Vec<Product>,
}

/// One selectable device model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base location of the artifacts, relative to the base URL or absolute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Artifacts derived from `path` are published as `.bin.zst`
    #[serde(default)]
    pub compressed: bool,
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

/// One published firmware version of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootloader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitions: Option<String>,
}

/// How a version's firmware is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape<'a> {
    /// One merged image written at the combined offset
    Combined { url: Option<&'a str> },
    /// Separate images; absent roles are left untouched on the device
    Split {
        bootloader: Option<&'a str>,
        partitions: Option<&'a str>,
        url: Option<&'a str>,
    },
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Product {
    /// Display label, falling back to the model identifier
    pub fn display_name(&self) -> &str {
        non_empty(&self.name).unwrap_or(&self.model)
    }

    /// Base path without trailing slashes, if declared
    pub fn base_path(&self) -> Option<&str> {
        non_empty(&self.path)
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
    }

    pub fn is_selectable(&self) -> bool {
        !self.versions.is_empty()
    }
}

impl VersionEntry {
    pub fn channel_tag(&self) -> &str {
        self.channel.as_deref().unwrap_or("")
    }

    pub fn is_release(&self) -> bool {
        self.channel_tag() == RELEASE_TAG
    }

    /// Split when any split-only component is declared
    pub fn shape(&self) -> ImageShape<'_> {
        let url = non_empty(&self.url);
        let bootloader = non_empty(&self.bootloader);
        let partitions = non_empty(&self.partitions);

        if bootloader.is_none() && partitions.is_none() {
            ImageShape::Combined { url }
        } else {
            ImageShape::Split {
                bootloader,
                partitions,
                url,
            }
        }
    }
}
