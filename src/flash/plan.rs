//! Flash plan builder
//!
//! Maps a resolved version entry to the ordered `(address, file)` pairs the
//! programmer writes. The programmer writes sequentially and assumes no
//! overlap, so plans are always sorted by address and addresses are unique.

use std::path::PathBuf;

use crate::config::{self, FlashLayout};
use crate::download::{ArtifactRequest, ArtifactSource, ImageKind, Role};
use crate::error::{Error, Result};
use crate::manifest::{ImageShape, Product, VersionEntry};
use crate::utils::format_address;
use crate::{log_debug, log_info};

const MODULE: &str = "flash::plan";

/// One artifact at one flash offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub address: u32,
    pub role: Role,
    pub path: PathBuf,
}

/// Ordered flash plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashPlan {
    entries: Vec<PlanEntry>,
}

impl FlashPlan {
    /// Sort entries by address; duplicate addresses are rejected
    pub fn new(mut entries: Vec<PlanEntry>) -> Result<Self> {
        entries.sort_by_key(|e| e.address);
        if let Some(pair) = entries.windows(2).find(|w| w[0].address == w[1].address) {
            return Err(Error::Config(format!(
                "{} and {} both target {}",
                pair[0].role,
                pair[1].role,
                format_address(pair[0].address)
            )));
        }
        Ok(Self { entries })
    }

    /// Plan writing one local image
    pub fn single(address: u32, path: PathBuf) -> Self {
        Self {
            entries: vec![PlanEntry {
                address,
                role: Role::Application,
                path,
            }],
        }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(hex address, path)` pairs in write order
    pub fn segments(&self) -> Vec<(String, PathBuf)> {
        self.entries
            .iter()
            .map(|e| (format_address(e.address), e.path.clone()))
            .collect()
    }
}

/// What to fetch and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArtifact {
    pub address: u32,
    pub request: ArtifactRequest,
}

/// Builds flash plans for one flash layout
pub struct PlanBuilder<'a> {
    layout: &'a FlashLayout,
    boot_stub_locator: &'a str,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(layout: &'a FlashLayout) -> Self {
        Self {
            layout,
            boot_stub_locator: config::esp32::BOOT_STUB_LOCATOR,
        }
    }

    /// Resolve the artifacts a version needs, in ascending address order,
    /// without fetching anything
    pub fn artifacts(&self, product: &Product, entry: &VersionEntry) -> Result<Vec<PlannedArtifact>> {
        // only split images are published transport-compressed
        let derived = |relative: &str, split: bool| -> Result<String> {
            let base = product.base_path().ok_or_else(|| Error::MissingBasePath {
                model: product.model.clone(),
                version: entry.version.clone(),
            })?;
            let suffix = if split && product.compressed {
                config::download::COMPRESSED_SUFFIX
            } else {
                ""
            };
            Ok(format!("{}/{}{}", base, relative, suffix))
        };

        let model = product.model.as_str();
        let version = entry.version.as_str();

        let mut planned = match entry.shape() {
            ImageShape::Combined { url } => {
                let locator = match url {
                    Some(url) => url.to_string(),
                    None => derived(&format!("{}.bin", version), false)?,
                };
                vec![PlannedArtifact {
                    address: self.layout.combined,
                    request: ArtifactRequest::new(
                        model,
                        version,
                        Role::Application,
                        ImageKind::Combined,
                        locator,
                    ),
                }]
            }
            ImageShape::Split {
                bootloader,
                partitions,
                url,
            } => {
                let mut planned = Vec::with_capacity(4);

                if let Some(sub) = bootloader {
                    planned.push(PlannedArtifact {
                        address: self.layout.bootloader,
                        request: ArtifactRequest::new(
                            model,
                            sub,
                            Role::Bootloader,
                            ImageKind::Split,
                            derived(&format!("bootloader/{}.bin", sub), true)?,
                        ),
                    });
                }

                if let Some(sub) = partitions {
                    planned.push(PlannedArtifact {
                        address: self.layout.partitions,
                        request: ArtifactRequest::new(
                            model,
                            sub,
                            Role::Partitions,
                            ImageKind::Split,
                            derived(&format!("partitions/{}.bin", sub), true)?,
                        ),
                    });
                    // the stub initialises the OTA data slot of the partition table
                    planned.push(PlannedArtifact {
                        address: self.layout.boot_stub,
                        request: ArtifactRequest::boot_stub(self.boot_stub_locator),
                    });
                }

                let locator = match url {
                    Some(url) => url.to_string(),
                    None => derived(&format!("{}/firmware.bin", version), true)?,
                };
                planned.push(PlannedArtifact {
                    address: self.layout.application,
                    request: ArtifactRequest::new(
                        model,
                        version,
                        Role::Application,
                        ImageKind::Split,
                        locator,
                    ),
                });
                planned
            }
        };

        planned.sort_by_key(|p| p.address);
        Ok(planned)
    }

    /// Fetch every artifact of `entry` and assemble the plan
    pub fn build(
        &self,
        product: &Product,
        entry: &VersionEntry,
        source: &mut dyn ArtifactSource,
    ) -> Result<FlashPlan> {
        let planned = self.artifacts(product, entry)?;
        log_info!(
            MODULE,
            "Building plan for {} {} ({} artifact(s))",
            product.model,
            entry.version,
            planned.len()
        );

        let mut entries = Vec::with_capacity(planned.len());
        for artifact in planned {
            let role = artifact.request.role;
            let path = source.fetch(&artifact.request).map_err(|e| match role {
                Role::Application => e,
                _ => Error::IncompleteArtifactSet {
                    role,
                    source: Box::new(e),
                },
            })?;

            log_debug!(
                MODULE,
                "{} @ {}: {}",
                role,
                format_address(artifact.address),
                path.display()
            );
            entries.push(PlanEntry {
                address: artifact.address,
                role,
                path,
            });
        }

        FlashPlan::new(entries)
    }
}
