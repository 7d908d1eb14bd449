//! The generated study configuration file.
//!
//! `organize` writes this file once; `analyze` and `merge` read it back.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::plan::AnalysisPlan;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not open configuration file {}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not parse configuration file {}", path.display()))]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Could not create configuration file {}", path.display()))]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not write configuration file {}", path.display()))]
    Write {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The series chosen for analysis from one patient's study folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSelection {
    /// Study folder name (`<PatientID>_<StudyDate>`)
    pub patient: String,
    /// Selected series folder names within the study folder
    pub series: Vec<String>,
}

/// The study configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Directory holding the patient study folders
    pub main_directory: PathBuf,
    /// Directory where per-series result CSV files are written
    pub output_directory: PathBuf,
    /// Per-patient series selections
    pub selections: Vec<PatientSelection>,
    /// Segment analysis plan override
    /// (when absent, the built-in plan is used)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<AnalysisPlan>,
}

impl StudyConfig {
    /// Read a configuration record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<StudyConfig, Error> {
        let path = path.as_ref();
        let file = File::open(path).context(OpenSnafu { path })?;
        serde_json::from_reader(BufReader::new(file)).context(ParseSnafu { path })
    }

    /// Write this configuration record to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).context(CreateSnafu { path })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).context(WriteSnafu { path })
    }
}
