//! Accumulating per-series tables into one combined table.
//!
//! Each appended file contributes its rows tagged with the identifying
//! triple parsed from its filename. Known statistics columns are renamed
//! to the analysis column set; unknown columns pass through unchanged.
//! Columns are unioned across files in first-seen order.
use std::path::{Path, PathBuf};

use ctmuscle_core::ResultName;
use snafu::{ResultExt, Snafu};

/// Renames applied to the statistics plugin column names.
pub const COLUMN_RENAMES: [(&str, &str); 12] = [
    ("Segment", "segment"),
    ("LabelmapSegmentStatisticsPlugin.voxel_count", "voxels1"),
    ("LabelmapSegmentStatisticsPlugin.volume_mm3", "volmm3_1"),
    ("LabelmapSegmentStatisticsPlugin.volume_cm3", "volcm3_1"),
    ("ScalarVolumeSegmentStatisticsPlugin.voxel_count", "voxels2"),
    ("ScalarVolumeSegmentStatisticsPlugin.volume_mm3", "volmm3_2"),
    ("ScalarVolumeSegmentStatisticsPlugin.volume_cm3", "volcm3_2"),
    ("ScalarVolumeSegmentStatisticsPlugin.min", "hfu_min"),
    ("ScalarVolumeSegmentStatisticsPlugin.max", "hfu_max"),
    ("ScalarVolumeSegmentStatisticsPlugin.mean", "hfu_mean"),
    ("ScalarVolumeSegmentStatisticsPlugin.median", "hfu_median"),
    ("ScalarVolumeSegmentStatisticsPlugin.stdev", "hfu_sd"),
];

/// Rename a known statistics column; unknown names pass through.
pub fn rename_column(name: &str) -> &str {
    COLUMN_RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
        .unwrap_or(name)
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read table {}", path.display()))]
    ReadTable { path: PathBuf, source: csv::Error },

    #[snafu(display("Could not write combined table {}", path.display()))]
    WriteTable { path: PathBuf, source: csv::Error },
}

/// The combined table under construction.
#[derive(Debug)]
pub struct CombinedTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

const TAG_COLUMNS: [&str; 3] = ["ID_MERGE", "time_rdt", "series_name"];

impl CombinedTable {
    pub fn new() -> CombinedTable {
        CombinedTable {
            columns: TAG_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Append all rows of one per-series CSV file,
    /// tagged with its filename triple.
    ///
    /// Returns the number of rows appended.
    pub fn append_file(&mut self, path: &Path, name: &ResultName) -> Result<usize, Error> {
        let mut reader = csv::Reader::from_path(path).context(ReadTableSnafu { path })?;
        let headers = reader.headers().context(ReadTableSnafu { path })?.clone();

        // map each input column to its (possibly new) combined column index
        let indices: Vec<usize> = headers
            .iter()
            .map(|h| self.column_index(rename_column(h)))
            .collect();

        let mut appended = 0;
        for record in reader.records() {
            let record = record.context(ReadTableSnafu { path })?;
            let mut row = vec![String::new(); self.columns.len()];
            row[0] = name.id.clone();
            row[1] = name.date.format("%Y-%m-%d").to_string();
            row[2] = name.series.clone();
            for (value, index) in record.iter().zip(&indices) {
                row[*index] = value.to_string();
            }
            self.rows.push(row);
            appended += 1;
        }
        Ok(appended)
    }

    /// Write the combined table to a CSV file.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut writer = csv::Writer::from_path(path).context(WriteTableSnafu { path })?;
        writer
            .write_record(&self.columns)
            .context(WriteTableSnafu { path })?;
        for row in &self.rows {
            let mut record = row.clone();
            // rows appended before later columns appeared are padded out
            record.resize(self.columns.len(), String::new());
            writer
                .write_record(&record)
                .context(WriteTableSnafu { path })?;
        }
        writer.flush().map_err(csv::Error::from).context(WriteTableSnafu { path })?;
        Ok(())
    }

    fn column_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.columns.iter().position(|c| c == name) {
            return index;
        }
        self.columns.push(name.to_string());
        self.columns.len() - 1
    }
}
