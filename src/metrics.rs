use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, TextEncoder,
};

lazy_static! {
    pub static ref SOURCES_FETCHED: IntCounterVec = register_int_counter_vec!(
        "freetv_sources_fetched_total",
        "Sources fetched, by outcome (ok, empty, failed)",
        &["outcome"]
    )
    .unwrap();
    pub static ref LINES_EXTRACTED: IntCounter = register_int_counter!(
        "freetv_lines_extracted_total",
        "Channel entries extracted from source lines"
    )
    .unwrap();
    pub static ref LINES_SKIPPED: IntCounter = register_int_counter!(
        "freetv_lines_skipped_total",
        "Non-empty source lines that were not channel entries"
    )
    .unwrap();
    pub static ref CHANNELS_CREATED: IntCounter = register_int_counter!(
        "freetv_channels_created_total",
        "Canonical channels created from unseen labels"
    )
    .unwrap();
    pub static ref ALIAS_KEYS: IntGauge = register_int_gauge!(
        "freetv_alias_keys",
        "Names in the alias index after the last run, canonical names included"
    )
    .unwrap();
    pub static ref RECORDS_EMITTED: IntGaugeVec = register_int_gauge_vec!(
        "freetv_records_emitted",
        "Deduplicated playlist records of the last run, by category",
        &["category"]
    )
    .unwrap();
}

/// Text exposition of every registered metric.
pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_registered_metrics() {
        LINES_EXTRACTED.inc();
        RECORDS_EMITTED.with_label_values(&["cctv"]).set(3);
        let text = gather_metrics();
        assert!(text.contains("freetv_lines_extracted_total"));
        assert!(text.contains("freetv_records_emitted{category=\"cctv\"} 3"));
    }
}
