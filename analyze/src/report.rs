//! Writing per-series statistics in the segment statistics CSV schema.
//!
//! The column names follow the statistics plugin naming that downstream
//! merging and existing notebooks expect, with one labelmap and one
//! scalar-volume column family. Both families are computed on the
//! acquisition grid here, so their counts coincide.
use std::path::Path;

use crate::stats::SegmentStats;

/// Output column set, in order.
pub const COLUMNS: [&str; 12] = [
    "Segment",
    "LabelmapSegmentStatisticsPlugin.voxel_count",
    "LabelmapSegmentStatisticsPlugin.volume_mm3",
    "LabelmapSegmentStatisticsPlugin.volume_cm3",
    "ScalarVolumeSegmentStatisticsPlugin.voxel_count",
    "ScalarVolumeSegmentStatisticsPlugin.volume_mm3",
    "ScalarVolumeSegmentStatisticsPlugin.volume_cm3",
    "ScalarVolumeSegmentStatisticsPlugin.min",
    "ScalarVolumeSegmentStatisticsPlugin.max",
    "ScalarVolumeSegmentStatisticsPlugin.mean",
    "ScalarVolumeSegmentStatisticsPlugin.median",
    "ScalarVolumeSegmentStatisticsPlugin.stdev",
];

fn float_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn record(stats: &SegmentStats) -> Vec<String> {
    let count = stats.voxel_count.to_string();
    let mm3 = stats.volume_mm3.to_string();
    let cm3 = stats.volume_cm3.to_string();
    vec![
        stats.name.clone(),
        count.clone(),
        mm3.clone(),
        cm3.clone(),
        count,
        mm3,
        cm3,
        float_cell(stats.min),
        float_cell(stats.max),
        float_cell(stats.mean),
        float_cell(stats.median),
        float_cell(stats.stdev),
    ]
}

/// Write one row per segment to a CSV file.
pub fn write_csv(path: impl AsRef<Path>, rows: &[SegmentStats]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COLUMNS)?;
    for stats in rows {
        writer.write_record(record(stats))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(name: &str) -> SegmentStats {
        SegmentStats {
            name: name.to_string(),
            voxel_count: 4,
            volume_mm3: 2.,
            volume_cm3: 0.002,
            min: Some(-30.),
            max: Some(30.),
            mean: Some(0.),
            median: Some(0.5),
            stdev: Some(21.2),
        }
    }

    #[test]
    fn writes_schema_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("P001_20230101_ax.csv");
        write_csv(&path, &[stats("Segment_100"), stats("esml_fat")]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), COLUMNS.len());
        assert_eq!(&headers[0], "Segment");
        assert_eq!(&headers[1], "LabelmapSegmentStatisticsPlugin.voxel_count");
        assert_eq!(&headers[11], "ScalarVolumeSegmentStatisticsPlugin.stdev");

        let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Segment_100");
        assert_eq!(&records[0][1], "4");
        assert_eq!(&records[1][0], "esml_fat");
        // labelmap and scalar-volume families agree on the grid
        assert_eq!(&records[0][1], &records[0][4]);
    }

    #[test]
    fn empty_intensity_cells_stay_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("P001_20230101_ax.csv");
        let empty = SegmentStats {
            name: "Segment_92".to_string(),
            voxel_count: 0,
            volume_mm3: 0.,
            volume_cm3: 0.,
            min: None,
            max: None,
            mean: None,
            median: None,
            stdev: None,
        };
        write_csv(&path, &[empty]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(&records[0][7], "");
        assert_eq!(&records[0][11], "");
    }
}
