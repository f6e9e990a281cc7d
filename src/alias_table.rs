//! Text form of the alias table.
//!
//! ```text
//! # comment lines and blank lines are ignored
//! # 央视频道
//! CCTV1,CCTV 1,CCTV-1,cctv1
//! ```
//!
//! One channel per line, canonical name first, aliases sorted. Sections
//! follow [`Category::all`] and are sorted by canonical name. Commas are
//! never escaped; the resolver refuses labels that contain one.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::category::Category;
use crate::error::FreetvError;
use crate::resolver::{AliasTable, CanonicalChannel};

const HEADER: &[&str] = &[
    "# 这是频道名称的别名名单，用于获取接口时将多种名称映射为一个名称的结果，可以提升获取量与准确率",
    "# 格式：模板频道名称,别名1,别名2,别名3",
    "# Alias list for channel names: every spelling on a line maps to the first name.",
    "# Format: CanonicalName,Alias1,Alias2,Alias3",
];

pub fn render(table: &AliasTable) -> String {
    let mut out = String::new();
    for line in HEADER {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');

    for category in Category::all() {
        let mut channels: Vec<&CanonicalChannel> = table
            .channels()
            .filter(|c| c.category() == category)
            .collect();
        if channels.is_empty() {
            continue;
        }
        channels.sort_by(|a, b| a.name().cmp(b.name()));

        out.push_str("# ");
        out.push_str(category.label());
        out.push('\n');
        for channel in channels {
            out.push_str(channel.name());
            for alias in channel.aliases() {
                out.push(',');
                out.push_str(alias);
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Rebuilds a table from its text form. Hand edits that would give one
/// alias two owners are reported and the first owner kept.
pub fn parse(content: &str) -> AliasTable {
    let mut table = AliasTable::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(',').map(str::trim).filter(|f| !f.is_empty());
        let Some(canonical) = fields.next() else {
            continue;
        };

        if let Some(owner) = table.lookup(canonical) {
            if owner.name() != canonical {
                warn!(
                    "Alias table line {}: {} is already an alias of {}, line skipped",
                    lineno + 1,
                    canonical,
                    owner.name()
                );
                continue;
            }
        }
        let (id, _) = table.channel_for_name(canonical);

        for alias in fields {
            if !table.insert_alias(id, alias) && table.owner(alias) != Some(id) {
                let owner = table.lookup(alias).map(|c| c.name()).unwrap_or_default();
                warn!(
                    "Alias table line {}: {} already belongs to {}, kept there",
                    lineno + 1,
                    alias,
                    owner
                );
            }
        }
    }
    table
}

/// Loads the table at `path`; a missing file is an empty table.
pub fn load(path: &Path) -> Result<AliasTable, FreetvError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let table = parse(&content);
            info!(
                "Loaded alias table {}: {} channels, {} names",
                path.display(),
                table.len(),
                table.key_count()
            );
            Ok(table)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No alias table at {}, starting empty", path.display());
            Ok(AliasTable::new())
        }
        Err(source) => Err(FreetvError::AliasTableLoad {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn save(table: &AliasTable, path: &Path) -> Result<(), FreetvError> {
    write_atomic(path, &render(table))?;
    info!(
        "Saved alias table {}: {} channels, {} names",
        path.display(),
        table.len(),
        table.key_count()
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Writes a sibling temp file and renames it over `path`, so readers see
/// either the old content or the new one.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), FreetvError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| FreetvError::persistence(path, e))?;
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, contents).map_err(|e| FreetvError::persistence(path, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(FreetvError::persistence(path, e));
    }
    Ok(())
}
