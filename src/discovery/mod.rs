pub mod owners;
pub mod search;

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};

pub use owners::list_owner_urls;
pub use search::{search_term_urls, search_variants};

/// Splits a comma-separated argument, trimming entries and dropping empty ones.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Removes repeated entries, keeping the first occurrence.
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Writes a JSON array of URLs.
pub fn write_url_list(path: &Path, urls: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(urls)?)?;
    tracing::info!("Wrote {} URLs to {}", urls.len(), path.display());
    Ok(())
}

/// Reads a JSON array of URLs.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        Error::InvalidInput(format!(
            "{} must be a JSON array of URL strings: {}",
            path.display(),
            e
        ))
    })
}
