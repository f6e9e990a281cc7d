use std::collections::HashSet;

use crate::category::Category;

/// One playable channel of a run, keyed by canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub canonical_name: String,
    pub url: String,
}

impl OutputRecord {
    /// Builds a record from a source URL, or `None` when nothing playable
    /// remains after [`clean_url`].
    pub fn new(canonical_name: impl Into<String>, raw_url: &str) -> Option<Self> {
        let url = clean_url(raw_url);
        if url.is_empty() {
            return None;
        }
        Some(Self {
            canonical_name: canonical_name.into(),
            url: url.to_string(),
        })
    }

    pub fn category(&self) -> Category {
        Category::of(&self.canonical_name)
    }
}

/// Drops the `$label` suffix many lists append to stream URLs.
pub fn clean_url(url: &str) -> &str {
    url.split('$').next().unwrap_or_default().trim()
}

/// Keeps the first record seen for every canonical name, in arrival order.
pub fn dedup<I>(records: I) -> Vec<OutputRecord>
where
    I: IntoIterator<Item = OutputRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.canonical_name.clone()))
        .collect()
}
