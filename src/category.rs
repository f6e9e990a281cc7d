/// Marker token carried by every provincial satellite channel name.
pub const SATELLITE_MARKER: &str = "卫视";

pub const CCTV_PREFIX: &str = "CCTV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Cctv,
    Satellite,
    Other,
}

impl Category {
    /// Derived from the canonical name alone.
    pub fn of(name: &str) -> Self {
        if name.starts_with(CCTV_PREFIX) {
            Category::Cctv
        } else if name.contains(SATELLITE_MARKER) {
            Category::Satellite
        } else {
            Category::Other
        }
    }

    /// Section header used in the alias table and the playlist group title.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Cctv => "央视频道",
            Category::Satellite => "卫视频道",
            Category::Other => "其他频道",
        }
    }

    /// Short tag appended to the playlist group name.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Cctv => "cctv",
            Category::Satellite => "ws",
            Category::Other => "other",
        }
    }

    /// Write order for every grouped output.
    pub fn all() -> [Category; 3] {
        [Category::Cctv, Category::Satellite, Category::Other]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize() {
        assert_eq!(Category::of("CCTV5+"), Category::Cctv);
        assert_eq!(Category::of("CCTV13"), Category::Cctv);
        assert_eq!(Category::of("湖南卫视"), Category::Satellite);
        assert_eq!(Category::of("凤凰卫视中文台"), Category::Satellite);
        assert_eq!(Category::of("翡翠台"), Category::Other);
        assert_eq!(Category::of("cctv5"), Category::Other);
    }

    #[test]
    fn test_write_order() {
        let mut all = Category::all().to_vec();
        all.sort();
        assert_eq!(all, Category::all().to_vec());
    }
}
