//! Output formatting and persistence for pipeline statistics.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use tracing::{debug, info};

use crate::stats::PipelineStats;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs pipeline statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &PipelineStats) {
    debug!("{:#?}", stats);
}

/// Logs pipeline statistics as pretty-printed JSON.
pub fn print_json(stats: &PipelineStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Appends a [`PipelineStats`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, stats: &PipelineStats) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(stats)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Coordinates, DisasterEvent, EventKind, EventStatus, Severity,
    };
    use crate::stats::PipelineStats;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn quake(id: &str, severity: Severity, population: u64) -> DisasterEvent {
        let now = Utc::now();
        DisasterEvent {
            id: id.to_string(),
            name: "quake".to_string(),
            event_type: EventKind::Earthquake,
            location: "somewhere".to_string(),
            coordinates: Coordinates { lat: 1.0, lng: 2.0 },
            severity,
            status: EventStatus::Active,
            magnitude: Some("6.0".to_string()),
            estimated_affected_population: Some(population),
            estimated_economic_impact_usd: None,
            description: String::new(),
            source: "USGS".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot_row(events: &[DisasterEvent], round: u64) -> PipelineStats {
        PipelineStats::from_collections(events, &[]).with_round(round)
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&snapshot_row(&[quake("usgs-a", Severity::High, 500)], 1));
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&snapshot_row(&[quake("usgs-a", Severity::High, 500)], 1)).unwrap();
    }

    #[test]
    fn test_append_record_round_trips_counts() {
        let path = temp_path("disastro_pipeline_test_roundtrip.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        let events = [
            quake("usgs-a", Severity::Critical, 1_000),
            quake("usgs-b", Severity::Moderate, 250),
        ];
        append_record(&path, &snapshot_row(&events, 3)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row: HashMap<String, String> = reader
            .deserialize()
            .next()
            .expect("one data row")
            .unwrap();

        assert_eq!(row["round"], "3");
        assert_eq!(row["total_events"], "2");
        assert_eq!(row["earthquakes"], "2");
        assert_eq!(row["critical"], "1");
        assert_eq!(row["moderate"], "1");
        assert_eq!(row["affected_population"], "1250");
        assert_eq!(row["error_type"], "");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once_across_rounds() {
        let path = temp_path("disastro_pipeline_test_header.csv");
        let _ = fs::remove_file(&path);

        // Two monitor rounds appending into the same daily file
        append_record(&path, &snapshot_row(&[quake("usgs-a", Severity::High, 100)], 1)).unwrap();
        append_record(
            &path,
            &snapshot_row(
                &[
                    quake("usgs-a", Severity::High, 100),
                    quake("usgs-c", Severity::Moderate, 50),
                ],
                2,
            ),
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content
            .lines()
            .filter(|l| l.starts_with("timestamp"))
            .count();
        assert_eq!(header_count, 1);

        // Both rounds landed, with their own counts
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<HashMap<String, String>> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["total_events"], "1");
        assert_eq!(rows[1]["total_events"], "2");
        assert_eq!(rows[1]["round"], "2");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_error_row_appends_alongside_snapshots() {
        let path = temp_path("disastro_pipeline_test_error_row.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &snapshot_row(&[quake("usgs-a", Severity::High, 100)], 1)).unwrap();
        append_record(
            &path,
            &PipelineStats::from_error("poll_error", "connection refused").with_round(2),
        )
        .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<HashMap<String, String>> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["error_type"], "poll_error");
        assert_eq!(rows[1]["error_message"], "connection refused");
        assert_eq!(rows[1]["total_events"], "0");

        fs::remove_file(&path).unwrap();
    }
}
