/// One candidate channel line pulled from a source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub url: String,
}

/// Section lines in plain-text lists (`央视频道,#genre#`).
pub const GENRE_MARKER: &str = "#genre#";
pub const SCHEME_MARKER: &str = "://";

const EXTM3U: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    M3u,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSource {
    pub format: SourceFormat,
    pub entries: Vec<RawEntry>,
    /// Non-empty lines that did not contribute to an entry.
    pub skipped: usize,
}

/// A source is M3U when its first non-empty line carries the `#EXTM3U` marker.
pub fn detect_format(content: &str) -> SourceFormat {
    let first = content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty());
    match first {
        Some(line) if line.starts_with(EXTM3U) => SourceFormat::M3u,
        _ => SourceFormat::Plain,
    }
}

/// `name,url` split at the first comma.
pub fn extract_plain(line: &str) -> Option<RawEntry> {
    let line = line.trim();
    if line.starts_with('#') || line.contains(GENRE_MARKER) || !line.contains(SCHEME_MARKER) {
        return None;
    }
    let (name, url) = line.split_once(',')?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || !url.contains(SCHEME_MARKER) {
        return None;
    }
    Some(RawEntry {
        name: name.to_string(),
        url: url.to_string(),
    })
}

/// Display name of an `#EXTINF:` line: everything after the last comma.
pub fn extract_extinf_name(line: &str) -> Option<String> {
    let info = line.trim().strip_prefix(EXTINF)?;
    if info.contains(GENRE_MARKER) {
        return None;
    }
    let (_, name) = info.rsplit_once(',')?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub fn parse_source(content: &str) -> ParsedSource {
    let content = content.trim_start_matches('\u{feff}');
    let format = detect_format(content);
    let mut entries = Vec::new();
    let mut skipped = 0;

    match format {
        SourceFormat::Plain => {
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match extract_plain(line) {
                    Some(entry) => entries.push(entry),
                    None => skipped += 1,
                }
            }
        }
        SourceFormat::M3u => {
            // Name of the last #EXTINF still waiting for its playback line.
            let mut current_name: Option<String> = None;

            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                if line.starts_with(EXTINF) {
                    if current_name.is_some() {
                        skipped += 1;
                    }
                    current_name = extract_extinf_name(line);
                    if current_name.is_none() {
                        skipped += 1;
                    }
                } else if line.starts_with('#') {
                    skipped += 1;
                } else if let Some(name) = current_name.take() {
                    if line.contains(SCHEME_MARKER) {
                        entries.push(RawEntry {
                            name,
                            url: line.to_string(),
                        });
                    } else {
                        skipped += 2;
                    }
                } else {
                    skipped += 1;
                }
            }
            if current_name.is_some() {
                skipped += 1;
            }
        }
    }

    ParsedSource {
        format,
        entries,
        skipped,
    }
}
