//! Folder and result-file naming conventions.
//!
//! Study folders are named `<PatientID>_<StudyDate>` and series folders
//! `<Modality>_<StudyDate>_<SeriesDescription>`, all components sanitized.
//! Result CSV files are named `<id>_<YYYYMMDD>_<series>.csv`.
use chrono::NaiveDate;

/// Replace spaces with underscores and strip parentheses.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Derived name for a study folder.
pub fn study_folder_name(patient_id: &str, study_date: &str) -> String {
    sanitize(&format!("{}_{}", patient_id.trim(), study_date.trim()))
}

/// Derived name for a series folder.
pub fn series_folder_name(modality: &str, study_date: &str, series_description: &str) -> String {
    sanitize(&format!(
        "{}_{}_{}",
        modality.trim(),
        study_date.trim(),
        series_description.trim()
    ))
}

/// Split a study folder name into `(patient_id, study_date)`.
pub fn split_study_folder(name: &str) -> Option<(&str, &str)> {
    let (id, date) = name.split_once('_')?;
    if id.is_empty() || date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((id, date))
}

/// Split a series folder name into `(modality, study_date, description)`.
pub fn split_series_folder(name: &str) -> Option<(&str, &str, &str)> {
    let (modality, rest) = name.split_once('_')?;
    let (date, description) = rest.split_once('_')?;
    if modality.is_empty()
        || description.is_empty()
        || date.len() != 8
        || !date.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some((modality, date, description))
}

/// The identifying triple carried by a result CSV filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultName {
    /// Patient identifier (first underscore-delimited token)
    pub id: String,
    /// Study date (8 digits following the identifier)
    pub date: NaiveDate,
    /// Series name (remainder before the extension)
    pub series: String,
}

impl ResultName {
    /// Parse a filename following the `<id>_<YYYYMMDD>_<series>.csv` convention.
    ///
    /// Returns `None` for filenames that do not match the convention.
    pub fn parse(file_name: &str) -> Option<ResultName> {
        let stem = file_name.strip_suffix(".csv")?;
        let (id, rest) = stem.split_once('_')?;
        if id.is_empty() || rest.len() < 8 || !rest.bytes().take(8).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (date, series) = rest.split_at(8);
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
        // tolerate a missing separator between date and series name
        let series = series.strip_prefix('_').unwrap_or(series);
        if series.is_empty() {
            return None;
        }
        Some(ResultName {
            id: id.to_string(),
            date,
            series: series.to_string(),
        })
    }

    /// The canonical filename for this triple.
    pub fn to_file_name(&self) -> String {
        format!("{}_{}_{}.csv", self.id, self.date.format("%Y%m%d"), self.series)
    }
}
