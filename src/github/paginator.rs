use serde::de::DeserializeOwned;
use serde_json::Deserializer;

use crate::error::{Error, Result};

/// Decodes the output of `gh api --paginate`, which prints one JSON array
/// per page back to back (`[...][...]`), into a single list.
pub fn collect_pages<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut all_items = Vec::new();

    for page in Deserializer::from_slice(bytes).into_iter::<Vec<T>>() {
        let items =
            page.map_err(|e| Error::ParseError(format!("Invalid paginated response: {}", e)))?;
        all_items.extend(items);
    }

    Ok(all_items)
}

/// Counts entries across all pages without decoding them.
pub fn count_items(bytes: &[u8]) -> Result<u64> {
    let items: Vec<serde::de::IgnoredAny> = collect_pages(bytes)?;
    Ok(items.len() as u64)
}
