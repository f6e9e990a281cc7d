pub mod alias_table;
pub mod category;
pub mod channels;
pub mod dedup;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod playlist;
pub mod resolver;
pub mod settings;

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use category::Category;
use dedup::{dedup, OutputRecord};
pub use error::FreetvError;
use resolver::AliasTable;
use settings::{FetchSettings, Settings};

/// Counts reported by a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources_configured: usize,
    pub sources_succeeded: usize,
    pub entries: usize,
    pub skipped_lines: usize,
    /// Entries whose name could not denote a channel.
    pub unresolved: usize,
    pub channels: usize,
    pub channels_created: usize,
    pub records: Vec<(Category, usize)>,
}

/// Result of resolving every entry of the fetched sources.
#[derive(Debug, Default)]
pub struct ResolvePass {
    pub records: Vec<OutputRecord>,
    pub entries: usize,
    pub skipped_lines: usize,
    pub unresolved: usize,
    pub channels_created: usize,
}

pub fn build_client(fetch: &FetchSettings) -> Result<reqwest::Client, FreetvError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .user_agent(fetch.user_agent.as_str())
        .build()
        .map_err(FreetvError::HttpClient)
}

/// Local path behind a source, if it is not a remote URL.
fn local_path(source: &str) -> Option<&Path> {
    if let Some(path) = source.strip_prefix("file://") {
        return Some(Path::new(path));
    }
    (!source.contains(channels::SCHEME_MARKER)).then(|| Path::new(source))
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> reqwest::Result<String> {
    client.get(url).send().await?.error_for_status()?.text().await
}

/// Body of one source. Remote sources get `max_attempts` tries with a fixed
/// delay in between; local files are read once.
pub async fn fetch_source(
    client: &reqwest::Client,
    source: &str,
    fetch: &FetchSettings,
) -> Result<String, FreetvError> {
    if let Some(path) = local_path(source) {
        return tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FreetvError::SourceUnavailable {
                url: source.to_string(),
                attempts: 1,
                reason: e.to_string(),
            });
    }

    let attempts = fetch.max_attempts.max(1);
    let mut reason = String::new();
    for attempt in 1..=attempts {
        info!("Fetching ({}/{}) {}", attempt, attempts, source);
        match fetch_once(client, source).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!("Fetch attempt {}/{} for {} failed: {}", attempt, attempts, source, e);
                reason = e.to_string();
            }
        }
        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(fetch.retry_delay_ms)).await;
        }
    }

    Err(FreetvError::SourceUnavailable {
        url: source.to_string(),
        attempts,
        reason,
    })
}

/// Fetches up to `concurrency` sources at once. The returned list is in the
/// order of `sources`, whatever order the fetches complete in.
pub async fn fetch_sources(
    sources: &[String],
    fetch: &FetchSettings,
) -> Result<Vec<(String, Result<String, FreetvError>)>, FreetvError> {
    let client = build_client(fetch)?;
    let client = &client;

    let results: Vec<_> = stream::iter(sources.iter().cloned())
        .map(|source| async move {
            let body = fetch_source(client, &source, fetch).await;
            (source, body)
        })
        .buffered(fetch.concurrency.max(1))
        .collect()
        .await;
    Ok(results)
}

/// Parses and resolves source bodies in the order given. Every entry whose
/// name resolves yields a record; deduplication happens later.
pub fn resolve_sources<'a, I>(table: &mut AliasTable, bodies: I) -> ResolvePass
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pass = ResolvePass::default();

    for (source, body) in bodies {
        let parsed = channels::parse_source(body);
        info!(
            "{}: {} entries, {} lines skipped ({:?})",
            source,
            parsed.entries.len(),
            parsed.skipped,
            parsed.format
        );
        pass.entries += parsed.entries.len();
        pass.skipped_lines += parsed.skipped;

        for entry in parsed.entries {
            let Some(resolution) = table.resolve(&entry.name) else {
                pass.unresolved += 1;
                continue;
            };
            if resolution.created {
                pass.channels_created += 1;
            }
            let canonical = table.channel(resolution.id).name();
            if let Some(record) = OutputRecord::new(canonical, &entry.url) {
                pass.records.push(record);
            }
        }
    }
    pass
}

/// One full run: load the alias table, fetch and resolve every source, write
/// the playlists and rewrite the alias table.
///
/// Nothing is written unless at least one entry resolves to a channel.
pub async fn run(settings: &Settings) -> Result<RunSummary, FreetvError> {
    let alias_path = settings.output.alias_table_path();
    let mut table = alias_table::load(&alias_path)?;

    let sources = settings.source_list();
    info!("Processing {} sources", sources.len());
    let fetched = fetch_sources(&sources, &settings.fetch).await?;

    let mut bodies: Vec<(&str, &str)> = Vec::new();
    for (source, result) in &fetched {
        match result {
            Ok(body) if !body.trim().is_empty() => {
                metrics::SOURCES_FETCHED.with_label_values(&["ok"]).inc();
                bodies.push((source.as_str(), body.as_str()));
            }
            Ok(_) => {
                metrics::SOURCES_FETCHED.with_label_values(&["empty"]).inc();
                warn!("{}: empty body, skipped", source);
            }
            Err(e) => {
                metrics::SOURCES_FETCHED.with_label_values(&["failed"]).inc();
                error!("{}", e);
            }
        }
    }
    let sources_succeeded = bodies.len();

    let pass = resolve_sources(&mut table, bodies);
    metrics::LINES_EXTRACTED.inc_by(pass.entries as u64);
    metrics::LINES_SKIPPED.inc_by(pass.skipped_lines as u64);
    metrics::CHANNELS_CREATED.inc_by(pass.channels_created as u64);

    if pass.entries == 0 {
        error!("No channel entries in any source, nothing written");
        return Err(FreetvError::EmptyResult {
            sources: sources.len(),
        });
    }
    if pass.records.is_empty() {
        error!(
            "None of {} entries resolved to a channel, nothing written",
            pass.entries
        );
        return Err(FreetvError::NoChannels);
    }

    let records: Vec<OutputRecord> = dedup(pass.records)
        .into_iter()
        .filter(|r| settings.filter.allows(&r.canonical_name))
        .collect();

    let counts = playlist::write_playlists(&settings.output, &records, Utc::now())?;
    for (category, count) in &counts {
        metrics::RECORDS_EMITTED
            .with_label_values(&[category.slug()])
            .set(*count as i64);
    }
    info!(
        "Categorized: CCTV {}, satellite {}, other {}",
        count_of(&counts, Category::Cctv),
        count_of(&counts, Category::Satellite),
        count_of(&counts, Category::Other)
    );

    alias_table::save(&table, &alias_path)?;
    metrics::ALIAS_KEYS.set(table.key_count() as i64);

    if let Some(metrics_file) = &settings.output.metrics_file {
        let text = metrics::gather_metrics();
        if let Err(e) = alias_table::write_atomic(Path::new(metrics_file), &text) {
            warn!("Metrics file not updated: {}", e);
        }
    }

    let summary = RunSummary {
        sources_configured: sources.len(),
        sources_succeeded,
        entries: pass.entries,
        skipped_lines: pass.skipped_lines,
        unresolved: pass.unresolved,
        channels: table.len(),
        channels_created: pass.channels_created,
        records: counts,
    };
    info!(
        "Run complete: {}/{} sources, {} entries, {} canonical channels ({} new)",
        summary.sources_succeeded,
        summary.sources_configured,
        summary.entries,
        summary.channels,
        summary.channels_created
    );
    Ok(summary)
}

fn count_of(counts: &[(Category, usize)], category: Category) -> usize {
    counts
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, n)| *n)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_detection() {
        assert_eq!(local_path("file:///srv/list.txt"), Some(Path::new("/srv/list.txt")));
        assert_eq!(local_path("data/list.m3u"), Some(Path::new("data/list.m3u")));
        assert_eq!(local_path("https://example.com/list.txt"), None);
    }

    #[test]
    fn test_resolve_sources_keeps_source_order() {
        let mut table = AliasTable::new();
        let a = "CCTV3,http://a\n";
        let b = "#EXTM3U\n#EXTINF:-1,CCTV-3 综艺\nhttp://b\n#EXTINF:-1,X\nhttp://x\n";
        let pass = resolve_sources(&mut table, [("a", a), ("b", b)]);

        assert_eq!(pass.entries, 3);
        assert_eq!(pass.unresolved, 1);
        assert_eq!(pass.channels_created, 1);
        assert_eq!(pass.records.len(), 2);

        let kept = dedup(pass.records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].canonical_name, "CCTV3");
        assert_eq!(kept[0].url, "http://a");
    }

    #[test]
    fn test_resolve_sources_strips_url_markers() {
        let mut table = AliasTable::new();
        let pass = resolve_sources(&mut table, [("s", "湖南卫视,http://h/live$高清\n")]);
        assert_eq!(pass.records[0].url, "http://h/live");
        assert_eq!(pass.records[0].canonical_name, "湖南卫视");
    }
}
