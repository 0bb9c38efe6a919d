//! Catalog selection
//!
//! Resolves product, channel and version from the manifest, either from
//! command-line arguments or through the selection surface.

use crate::error::{Error, Result};
use crate::manifest::{
    eligible_products, find_product, find_version, latest_index, versions_for_channel, Channel,
    Manifest, Product, VersionEntry,
};
use crate::ui::{select_item, Interaction};

/// Preselected values; anything missing is asked for
#[derive(Debug, Clone, Default)]
pub struct SelectionArgs {
    pub model: Option<String>,
    pub channel: Option<Channel>,
    pub version: Option<String>,
}

/// A fully resolved selection
#[derive(Debug, Clone, Copy)]
pub struct Selection<'m> {
    pub product: &'m Product,
    pub channel: Channel,
    pub version: &'m VersionEntry,
}

pub fn product_label(product: &Product) -> String {
    format!(
        "{} ({}) - {} version(s)",
        product.display_name(),
        product.model,
        product.versions.len()
    )
}

pub fn version_label(entry: &VersionEntry, latest: bool) -> String {
    let mut label = entry.version.clone();
    let tag = entry.channel_tag();
    if !tag.is_empty() {
        label.push_str(&format!(" [{}]", tag));
    }
    if latest {
        label.push_str(" (latest)");
    }
    label
}

pub fn select_product<'m>(
    ui: &mut dyn Interaction,
    manifest: &'m Manifest,
    model: Option<&str>,
) -> Result<&'m Product> {
    let products = eligible_products(manifest)?;

    if let Some(model) = model {
        return find_product(&products, model).ok_or_else(|| Error::NotFound {
            kind: "model",
            name: model.to_string(),
        });
    }

    select_item(ui, "Available models:", &products, 0, |_, p| product_label(p)).copied()
}

pub fn select_channel(ui: &mut dyn Interaction, channel: Option<Channel>) -> Result<Channel> {
    if let Some(channel) = channel {
        return Ok(channel);
    }

    select_item(ui, "Update channel:", &Channel::ALL, 0, |_, c| {
        format!("{} - {}", c, c.description())
    })
    .copied()
}

pub fn select_version<'m>(
    ui: &mut dyn Interaction,
    product: &'m Product,
    channel: Channel,
    version: Option<&str>,
) -> Result<&'m VersionEntry> {
    let versions = versions_for_channel(product, channel)?;
    let latest = latest_index(&versions);

    if let Some(version) = version {
        return find_version(&versions, version)
            .map(|i| versions[i])
            .ok_or_else(|| Error::NotFound {
                kind: "version",
                name: version.to_string(),
            });
    }

    let title = format!(
        "Available versions ({}, channel: {}):",
        product.display_name(),
        channel
    );
    select_item(ui, &title, &versions, latest, |i, v| {
        version_label(v, i == latest)
    })
    .copied()
}

/// Resolve the full selection in order: product, channel, version
pub fn resolve<'m>(
    ui: &mut dyn Interaction,
    manifest: &'m Manifest,
    args: &SelectionArgs,
) -> Result<Selection<'m>> {
    let product = select_product(ui, manifest, args.model.as_deref())?;
    let channel = select_channel(ui, args.channel)?;
    let version = select_version(ui, product, channel, args.version.as_deref())?;
    Ok(Selection {
        product,
        channel,
        version,
    })
}

/// One line per product and version, latest first within a product
pub fn render_catalog(manifest: &Manifest) -> Vec<String> {
    let mut lines = Vec::new();
    for product in &manifest.product {
        lines.push(product_label(product));
        if let Ok(versions) = versions_for_channel(product, Channel::All) {
            let latest = latest_index(&versions);
            for (i, entry) in versions.iter().enumerate().rev() {
                lines.push(format!("    {}", version_label(entry, i == latest)));
            }
        }
    }
    lines
}
