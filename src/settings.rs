use std::path::{Path, PathBuf};

use config::Config;
use serde::de::Deserializer;
use serde::Deserialize;
use tracing::{info, warn};

use crate::category::Category;

const DEFAULT_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/xiaoran67/update/refs/heads/main/output/Collection/LiveSource2025.txt",
    "https://raw.githubusercontent.com/xiaoran67/update/refs/heads/main/output/Collection/LiveSource2026.txt",
    "https://raw.githubusercontent.com/develop202/migu_video/refs/heads/main/interface.txt",
    "https://raw.githubusercontent.com/kakaxi-1/IPTV/refs/heads/main/iptv.txt",
    "https://freetv.fun/test_channels_original_new.txt",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sources: SourceSettings,
    pub fetch: FetchSettings,
    pub output: OutputSettings,
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    #[serde(alias = "url", deserialize_with = "deserialize_one_or_many")]
    pub urls: Vec<String>,
    /// One source per line; supersedes `urls` when the file exists.
    pub subscription_file: Option<PathBuf>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            urls: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            subscription_file: None,
        }
    }
}

fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Sources fetched at once; results are still consumed in configured order.
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 2,
            retry_delay_ms: 1000,
            concurrency: 4,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: String,
    /// Relative paths are taken from `dir`.
    pub alias_table: String,
    pub complete: String,
    pub cctv: String,
    pub satellite: String,
    pub other: String,
    /// Group line of the text playlists.
    pub group: String,
    pub metrics_file: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            alias_table: "corrections_name.txt".to_string(),
            complete: "直播源".to_string(),
            cctv: "央视频道".to_string(),
            satellite: "卫视频道".to_string(),
            other: "其他频道".to_string(),
            group: "freetv".to_string(),
            metrics_file: None,
        }
    }
}

impl OutputSettings {
    pub fn alias_table_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.alias_table)
    }

    pub fn file_for(&self, category: Category) -> &str {
        match category {
            Category::Cctv => &self.cctv,
            Category::Satellite => &self.satellite,
            Category::Other => &self.other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Canonical names to emit; empty emits everything.
    pub allow: Vec<String>,
}

impl FilterSettings {
    pub fn allows(&self, canonical_name: &str) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|n| n == canonical_name)
    }
}

impl Settings {
    /// Defaults, then the optional TOML file, then `FREETV_*` variables
    /// (`FREETV_OUTPUT__DIR=...`).
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("FREETV").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Sources in configured order.
    pub fn source_list(&self) -> Vec<String> {
        if let Some(path) = &self.sources.subscription_file {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let sources = parse_subscription(&content);
                    info!("Loaded {} sources from {}", sources.len(), path.display());
                    return sources;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("Subscription file {} not found, using configured sources", path.display());
                }
                Err(e) => {
                    warn!("Failed to read subscription file {}: {}, using configured sources", path.display(), e);
                }
            }
        }
        self.sources.urls.clone()
    }
}

const SUBSCRIPTION_SCHEMES: &[&str] = &["http://", "https://", "file://"];

/// One source per line; blank lines and `#` comments skipped. Only HTTP(S)
/// URLs and local paths are kept.
pub fn parse_subscription(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let supported = !line.contains("://")
                || SUBSCRIPTION_SCHEMES.iter().any(|scheme| line.starts_with(scheme));
            if !supported {
                warn!("Unsupported subscription source skipped: {}", line);
            }
            supported
        })
        .map(str::to_string)
        .collect()
}
