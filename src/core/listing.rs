//! Fund codes handed over by the upstream discovery step.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundListing {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl FundListing {
    pub fn new(code: &str) -> Self {
        FundListing {
            code: code.trim().to_string(),
            name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingFile {
    Entries(Vec<FundListing>),
    Names(BTreeMap<String, String>),
}

/// Reads a YAML or JSON listing: a list of `{code, name}` entries or a
/// `{code: name}` mapping.
pub fn load_listing<P: AsRef<Path>>(path: P) -> Result<Vec<FundListing>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read listing file: {}", path.display()))?;
    let file: ListingFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse listing file: {}", path.display()))?;

    let listings = match file {
        ListingFile::Entries(entries) => entries,
        ListingFile::Names(names) => names
            .into_iter()
            .map(|(code, name)| FundListing {
                code,
                name: Some(name),
            })
            .collect(),
    };
    debug!("Loaded {} listings from {}", listings.len(), path.display());
    Ok(listings)
}

/// Trims codes, drops blanks and keeps the first occurrence of each code.
pub fn dedup_listings(listings: impl IntoIterator<Item = FundListing>) -> Vec<FundListing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .map(|listing| FundListing {
            code: listing.code.trim().to_string(),
            ..listing
        })
        .filter(|listing| !listing.code.is_empty() && seen.insert(listing.code.clone()))
        .collect()
}
