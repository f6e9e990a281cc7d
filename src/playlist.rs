use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use crate::alias_table::write_atomic;
use crate::category::Category;
use crate::channels::GENRE_MARKER;
use crate::dedup::OutputRecord;
use crate::error::FreetvError;
use crate::settings::OutputSettings;

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;
const STAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// Update stamp in Beijing time (UTC+8).
pub fn update_stamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(BEIJING_OFFSET_SECS) {
        Some(beijing) => now.with_timezone(&beijing).format(STAMP_FORMAT).to_string(),
        None => now.format(STAMP_FORMAT).to_string(),
    }
}

/// Plain-text list: an update-time section, then one group with the records
/// sorted by line.
pub fn render_txt(records: &[OutputRecord], group: &str, stamp: &str) -> String {
    let mut lines: Vec<String> = records
        .iter()
        .map(|r| format!("{},{}", r.canonical_name, r.url))
        .collect();
    lines.sort();

    let mut out = format!("更新时间,{GENRE_MARKER}\n{stamp},url\n\n{group},{GENRE_MARKER}\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

pub fn render_m3u(records: &[OutputRecord]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for record in records {
        out.push_str(&format!(
            "#EXTINF:-1 group-title=\"{}\",{}\n{}\n",
            record.category().label(),
            record.canonical_name,
            record.url
        ));
    }
    out
}

fn write_pair(dir: &Path, base: &str, txt: &str, m3u: &str) -> Result<(), FreetvError> {
    write_atomic(&dir.join(format!("{base}.txt")), txt)?;
    write_atomic(&dir.join(format!("{base}.m3u")), m3u)
}

/// Writes the complete list and one list per non-empty category. Returns the
/// record count per category.
pub fn write_playlists(
    output: &OutputSettings,
    records: &[OutputRecord],
    now: DateTime<Utc>,
) -> Result<Vec<(Category, usize)>, FreetvError> {
    let dir = Path::new(&output.dir);
    let stamp = update_stamp(now);

    write_pair(
        dir,
        &output.complete,
        &render_txt(records, &output.group, &stamp),
        &render_m3u(records),
    )?;
    info!("Saved {}: {} channels", output.complete, records.len());

    let mut counts = Vec::new();
    for category in Category::all() {
        let subset: Vec<OutputRecord> = records
            .iter()
            .filter(|r| r.category() == category)
            .cloned()
            .collect();
        counts.push((category, subset.len()));
        if subset.is_empty() {
            continue;
        }

        let base = output.file_for(category);
        let group = format!("{}_{}", output.group, category.slug());
        write_pair(dir, base, &render_txt(&subset, &group, &stamp), &render_m3u(&subset))?;
        info!("Saved {}: {} channels", base, subset.len());
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn records() -> Vec<OutputRecord> {
        vec![
            OutputRecord::new("湖南卫视", "http://h").unwrap(),
            OutputRecord::new("CCTV1", "http://c1").unwrap(),
            OutputRecord::new("翡翠台", "http://f").unwrap(),
        ]
    }

    #[test]
    fn test_update_stamp_is_beijing_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 20, 30, 0).unwrap();
        assert_eq!(update_stamp(now), "20261020 04:30:00");

        let new_year = Utc.with_ymd_and_hms(2026, 12, 31, 16, 0, 0).unwrap();
        assert_eq!(update_stamp(new_year), "20270101 00:00:00");
    }

    #[test]
    fn test_render_txt() {
        let text = render_txt(&records(), "freetv", "20261019 12:00:00");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "更新时间,#genre#",
                "20261019 12:00:00,url",
                "",
                "freetv,#genre#",
                "CCTV1,http://c1",
                "湖南卫视,http://h",
                "翡翠台,http://f",
            ]
        );
    }

    #[test]
    fn test_render_m3u_keeps_record_order() {
        let text = render_m3u(&records());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXTINF:-1 group-title=\"卫视频道\",湖南卫视");
        assert_eq!(lines[2], "http://h");
        assert_eq!(lines[3], "#EXTINF:-1 group-title=\"央视频道\",CCTV1");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_write_playlists() {
        let dir = std::env::temp_dir().join(format!("freetv-playlist-{}", std::process::id()));
        let output = OutputSettings {
            dir: dir.to_string_lossy().into_owned(),
            ..OutputSettings::default()
        };

        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let counts = write_playlists(&output, &records(), now).unwrap();
        assert_eq!(
            counts,
            vec![(Category::Cctv, 1), (Category::Satellite, 1), (Category::Other, 1)]
        );
        for base in ["直播源", "央视频道", "卫视频道", "其他频道"] {
            assert!(dir.join(format!("{base}.txt")).exists(), "{base}.txt");
            assert!(dir.join(format!("{base}.m3u")).exists(), "{base}.m3u");
        }
        let cctv = std::fs::read_to_string(dir.join("央视频道.txt")).unwrap();
        assert!(cctv.contains("freetv_cctv,#genre#"));
        assert!(cctv.contains("CCTV1,http://c1"));
        assert!(!cctv.contains("湖南卫视"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
