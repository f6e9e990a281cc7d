//! Channel identity resolution.
//!
//! [`AliasTable`] owns every known [`CanonicalChannel`] together with the
//! alias index that maps each spelling (the canonical name included) to its
//! owner. [`AliasTable::resolve`] decides which channel a raw label denotes,
//! creating the channel on first sight and recording the label for later
//! exact lookups.
//!
//! Known scaling limit: a label that misses the exact index is compared
//! against the matching key of every indexed alias, recomputed on each
//! comparison. Cost is linear in the alias count per unseen label, which is
//! fine for a few thousand aliases. The scan walks aliases in insertion order
//! and the first hit wins, so the index keeps that order explicitly.

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::category::{Category, CCTV_PREFIX, SATELLITE_MARKER};
use crate::normalize::{display_name, normalize};

/// Longest canonical name synthesized from free text, in characters.
pub const MAX_CANONICAL_CHARS: usize = 30;

/// Shortest raw label accepted as a channel, in characters.
pub const MIN_RAW_CHARS: usize = 2;

/// Provinces, municipalities and the few city/broadcaster tokens that run a
/// satellite channel. Checked in this order.
pub const REGIONS: &[&str] = &[
    "北京", "天津", "河北", "山西", "内蒙古", "辽宁", "吉林", "黑龙江", "东方", "江苏",
    "浙江", "安徽", "福建", "江西", "山东", "河南", "湖北", "湖南", "广东", "广西",
    "海南", "重庆", "四川", "贵州", "云南", "西藏", "陕西", "甘肃", "青海", "宁夏",
    "新疆", "深圳", "厦门", "东南", "兵团",
];

/// CCTV channel numbers and the programme-type names sources append to them.
pub const CCTV_TYPES: &[(&str, &[&str])] = &[
    ("1", &["综合"]),
    ("2", &["财经"]),
    ("3", &["综艺"]),
    ("4", &["国际", "中文国际"]),
    ("5", &["体育"]),
    ("5+", &["体育", "体育赛事"]),
    ("6", &["电影"]),
    ("7", &["国防军事", "军农"]),
    ("8", &["电视剧"]),
    ("9", &["纪录", "纪录片"]),
    ("10", &["科教"]),
    ("11", &["戏曲"]),
    ("12", &["社会与法"]),
    ("13", &["新闻"]),
    ("14", &["少儿"]),
    ("15", &["音乐"]),
    ("16", &["奥林匹克"]),
    ("17", &["农业农村"]),
];

lazy_static! {
    static ref CCTV_NUMBER: Regex = Regex::new(r"(?i)CCTV[-_\s]*(\d+\+?)").unwrap();
    static ref CCTV_SUFFIX: Regex = Regex::new(r"^\d+\+?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalChannel {
    name: String,
    aliases: BTreeSet<String>,
}

impl CanonicalChannel {
    fn new(name: String) -> Self {
        Self {
            name,
            aliases: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aliases in lexicographic order, the canonical name excluded.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn category(&self) -> Category {
        Category::of(&self.name)
    }
}

/// Outcome of resolving one raw label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub id: ChannelId,
    /// The label introduced a channel that did not exist before.
    pub created: bool,
}

#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    channels: Vec<CanonicalChannel>,
    index: HashMap<String, ChannelId>,
    /// Index keys in insertion order; drives the fallback scan.
    order: Vec<String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of canonical channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of index keys, canonical names included.
    pub fn key_count(&self) -> usize {
        self.order.len()
    }

    pub fn channel(&self, id: ChannelId) -> &CanonicalChannel {
        &self.channels[id.0]
    }

    pub fn channels(&self) -> impl Iterator<Item = &CanonicalChannel> {
        self.channels.iter()
    }

    /// Index keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Exact lookup of an alias or canonical name.
    pub fn owner(&self, alias: &str) -> Option<ChannelId> {
        self.index.get(alias).copied()
    }

    pub fn lookup(&self, alias: &str) -> Option<&CanonicalChannel> {
        self.owner(alias).map(|id| self.channel(id))
    }

    /// Map a raw label to its canonical channel, creating the channel if no
    /// existing alias matches. Returns `None` for labels that cannot name a
    /// channel.
    pub fn resolve(&mut self, raw: &str) -> Option<Resolution> {
        if raw.chars().count() < MIN_RAW_CHARS || !is_recordable(raw) {
            return None;
        }

        if let Some(id) = self.find(raw) {
            self.insert_alias(id, raw);
            return Some(Resolution { id, created: false });
        }

        let canonical = synthesize_name(raw)?;
        let (id, created) = self.channel_for_name(&canonical);
        if created {
            debug!("New channel: {} -> {}", raw, canonical);
            for alias in base_aliases(&canonical) {
                self.insert_alias(id, &alias);
            }
        }
        self.insert_alias(id, raw);
        Some(Resolution { id, created })
    }

    /// Exact index hit, then the normalized scan over every key.
    fn find(&self, raw: &str) -> Option<ChannelId> {
        if let Some(id) = self.owner(raw) {
            return Some(id);
        }

        let key = normalize(raw);
        if key.is_empty() {
            return None;
        }
        self.order
            .iter()
            .find(|alias| normalize(alias) == key)
            .and_then(|alias| self.owner(alias))
    }

    /// The channel that `name` already denotes, or a fresh one under that
    /// name. The flag tells whether a channel was created.
    pub(crate) fn channel_for_name(&mut self, name: &str) -> (ChannelId, bool) {
        if let Some(id) = self.owner(name) {
            return (id, false);
        }
        let id = ChannelId(self.channels.len());
        self.channels.push(CanonicalChannel::new(name.to_string()));
        self.index.insert(name.to_string(), id);
        self.order.push(name.to_string());
        (id, true)
    }

    /// Record `alias` for `id`. An alias already indexed keeps its first
    /// owner, which keeps alias sets disjoint. Returns whether it was added.
    pub(crate) fn insert_alias(&mut self, id: ChannelId, alias: &str) -> bool {
        if alias.is_empty() || !is_recordable(alias) || self.index.contains_key(alias) {
            return false;
        }
        self.index.insert(alias.to_string(), id);
        self.order.push(alias.to_string());
        self.channels[id.0].aliases.insert(alias.to_string());
        true
    }
}

/// Whether a name survives a round trip through the alias table file.
fn is_recordable(name: &str) -> bool {
    !name.contains([',', '\n', '\r']) && !name.starts_with('#') && name.trim() == name
}

/// Canonical name for a label that matched nothing.
pub fn synthesize_name(raw: &str) -> Option<String> {
    if let Some(caps) = CCTV_NUMBER.captures(raw) {
        return Some(format!("{}{}", CCTV_PREFIX, caps[1].to_uppercase()));
    }

    if raw.contains(SATELLITE_MARKER) {
        if let Some(region) = REGIONS.iter().find(|region| raw.contains(*region)) {
            return Some(format!("{}{}", region, SATELLITE_MARKER));
        }
    }

    let cleaned = display_name(raw);
    if cleaned.is_empty() || cleaned.starts_with('#') {
        return None;
    }
    let truncated: String = cleaned.chars().take(MAX_CANONICAL_CHARS).collect();
    Some(truncated.trim_end().to_string())
}

/// Spellings derived mechanically from a canonical name, seeded into the
/// index when the channel is created. Never contains the name itself.
pub fn base_aliases(canonical: &str) -> Vec<String> {
    let mut aliases = Vec::new();

    if let Some(num) = canonical
        .strip_prefix(CCTV_PREFIX)
        .filter(|num| CCTV_SUFFIX.is_match(num))
    {
        let lower = num.to_lowercase();
        aliases.extend([
            format!("CCTV-{num}"),
            format!("CCTV {num}"),
            format!("CCTV{num:0>2}"),
            canonical.to_lowercase(),
            format!("cctv-{lower}"),
            format!("cctv {lower}"),
        ]);

        if let Some((_, types)) = CCTV_TYPES.iter().find(|(n, _)| *n == num) {
            for kind in types.iter() {
                aliases.extend([
                    format!("{canonical}{kind}"),
                    format!("CCTV-{num}{kind}"),
                    format!("CCTV {num} {kind}"),
                ]);
            }
        }
    } else if let Some(base) = canonical
        .strip_suffix(SATELLITE_MARKER)
        .filter(|base| !base.is_empty())
    {
        aliases.extend([
            format!("{base}电视台"),
            format!("{base}台"),
            canonical.to_lowercase(),
        ]);
    }

    let mut seen = BTreeSet::new();
    aliases.retain(|alias| alias != canonical && seen.insert(alias.clone()));
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_name(table: &mut AliasTable, raw: &str) -> Option<String> {
        table
            .resolve(raw)
            .map(|r| table.channel(r.id).name().to_string())
    }

    #[test]
    fn test_cctv_variants_share_one_channel() {
        let mut table = AliasTable::new();
        for raw in ["CCTV-1", "CCTV 1 综合", "cctv1"] {
            assert_eq!(resolve_name(&mut table, raw).as_deref(), Some("CCTV1"));
        }
        assert_eq!(table.len(), 1);

        let channel = table.lookup("CCTV1").unwrap();
        let aliases: Vec<&str> = channel.aliases().collect();
        for raw in ["CCTV-1", "CCTV 1 综合", "cctv1"] {
            assert!(aliases.contains(&raw), "missing {raw}");
        }
        assert!(!aliases.contains(&"CCTV1"));
    }

    #[test]
    fn test_satellite_generated_alias_matches() {
        let mut table = AliasTable::new();
        let first = table.resolve("湖南卫视").unwrap();
        assert!(first.created);
        let second = table.resolve("湖南电视台").unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(table.channel(second.id).name(), "湖南卫视");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rejects_short_and_comma_labels() {
        let mut table = AliasTable::new();
        assert_eq!(table.resolve(""), None);
        assert_eq!(table.resolve("X"), None);
        assert_eq!(table.resolve("a,b"), None);
        assert_eq!(table.resolve("#comment"), None);
        assert_eq!(table.resolve(" padded "), None);
        assert_eq!(table.resolve("[HD]"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_normalized_match_records_raw_alias() {
        let mut table = AliasTable::new();
        let first = table.resolve("Phoenix Info").unwrap();
        let second = table.resolve("phoenix-info [HD]").unwrap();
        assert_eq!(first.id, second.id);
        assert!(!second.created);
        assert_eq!(table.owner("phoenix-info [HD]"), Some(first.id));
    }

    #[test]
    fn test_scan_tie_breaks_on_insertion_order() {
        let mut table = AliasTable::new();
        let (a, _) = table.channel_for_name("Alpha");
        let (b, _) = table.channel_for_name("Beta");
        assert!(table.insert_alias(a, "Star-TV"));
        assert!(table.insert_alias(b, "star tv"));

        // Both aliases share the key "startv"; the earlier one wins.
        let hit = table.resolve("STAR TV").unwrap();
        assert_eq!(hit.id, a);
    }

    #[test]
    fn test_alias_sets_stay_disjoint() {
        let mut table = AliasTable::new();
        let (a, _) = table.channel_for_name("Alpha");
        let (b, _) = table.channel_for_name("Beta");
        assert!(table.insert_alias(a, "shared"));
        assert!(!table.insert_alias(b, "shared"));
        assert!(!table.insert_alias(b, "Alpha"));
        assert_eq!(table.owner("shared"), Some(a));
        assert_eq!(table.channel(b).aliases().count(), 0);
    }

    #[test]
    fn test_synthesized_name_reuses_existing_channel() {
        let mut table = AliasTable::new();
        let first = table.resolve("CCTV5").unwrap();
        // Normalizes to "cctv5赛事直播", which nothing matches, but the
        // synthesized name is the existing channel.
        let second = table.resolve("CCTV5 赛事直播").unwrap();
        assert_eq!(first.id, second.id);
        assert!(!second.created);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_synthesize_name_rules() {
        assert_eq!(synthesize_name("CCTV-5+ 体育赛事").as_deref(), Some("CCTV5+"));
        assert_eq!(synthesize_name("cctv_13 新闻").as_deref(), Some("CCTV13"));
        assert_eq!(synthesize_name("湖南卫视 HD").as_deref(), Some("湖南卫视"));
        assert_eq!(synthesize_name("[推荐] 黑龙江卫视").as_deref(), Some("黑龙江卫视"));
        // Region without the satellite marker is free text.
        assert_eq!(synthesize_name("湖南都市").as_deref(), Some("湖南都市"));
        assert_eq!(synthesize_name("凤凰中文 (高清)").as_deref(), Some("凤凰中文"));

        let long = "A".repeat(45);
        assert_eq!(synthesize_name(&long).unwrap().chars().count(), MAX_CANONICAL_CHARS);
        assert_eq!(synthesize_name("(x)"), None);
        assert_eq!(synthesize_name("[x] #tag"), None);
        let spaced = format!("{} tail", "B".repeat(29));
        assert_eq!(synthesize_name(&spaced).unwrap(), "B".repeat(29));
    }

    #[test]
    fn test_base_aliases_cctv() {
        let aliases = base_aliases("CCTV5");
        for expected in ["CCTV-5", "CCTV 5", "CCTV05", "cctv5", "cctv-5", "cctv 5", "CCTV5体育", "CCTV-5体育", "CCTV 5 体育"] {
            assert!(aliases.contains(&expected.to_string()), "missing {expected}");
        }
        assert!(!aliases.contains(&"CCTV5".to_string()));

        let plus = base_aliases("CCTV5+");
        assert!(plus.contains(&"CCTV5+体育赛事".to_string()));
        assert!(!plus.contains(&"CCTV5+".to_string()));

        assert!(base_aliases("CCTV News").is_empty());
    }

    #[test]
    fn test_base_aliases_satellite() {
        assert_eq!(base_aliases("湖南卫视"), vec!["湖南电视台", "湖南台"]);
        assert!(base_aliases("卫视").is_empty());
        assert!(base_aliases("翡翠台").is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let labels = ["CCTV-3", "江苏卫视", "Star Movies HD", "cctv3", "江苏台", "star movies"];
        let run = || {
            let mut table = AliasTable::new();
            labels
                .iter()
                .map(|raw| resolve_name(&mut table, raw))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
        assert_eq!(
            run(),
            vec![
                Some("CCTV3".to_string()),
                Some("江苏卫视".to_string()),
                Some("Star Movies".to_string()),
                Some("CCTV3".to_string()),
                Some("江苏卫视".to_string()),
                Some("Star Movies".to_string()),
            ]
        );
    }
}
