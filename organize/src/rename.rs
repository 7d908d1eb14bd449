//! Renaming study and series folders from DICOM metadata.
//!
//! Folders that are empty, hold no readable DICOM file, or lack a series
//! description are skipped. Renames to the already-correct name are
//! no-ops, so a second pass performs no further renames.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ctmuscle_core::naming;
use dicom_dictionary_std::tags;
use dicom_object::OpenFileOptions;
use tracing::{debug, info, warn};

struct SeriesMeta {
    patient_id: String,
    study_date: String,
    modality: String,
    series_description: String,
}

/// Rename every series folder to `<Modality>_<StudyDate>_<SeriesDescription>`
/// and every study folder to `<PatientID>_<StudyDate>`, based on the first
/// readable DICOM file of each series.
///
/// Returns the number of folders renamed.
pub fn rename_pass(main_dir: &Path) -> io::Result<usize> {
    let mut renames = 0;
    for study_dir in subdirectories(main_dir)? {
        let mut study_identity: Option<(String, String)> = None;
        for series_dir in subdirectories(&study_dir)? {
            let Some(meta) = read_series_metadata(&series_dir) else {
                debug!(
                    "Skipping folder '{}': no usable DICOM metadata",
                    series_dir.display()
                );
                continue;
            };
            let new_name = naming::series_folder_name(
                &meta.modality,
                &meta.study_date,
                &meta.series_description,
            );
            renames += rename_to(&series_dir, &new_name)?;
            if study_identity.is_none() {
                study_identity = Some((meta.patient_id, meta.study_date));
            }
        }
        if let Some((patient_id, study_date)) = study_identity {
            let new_name = naming::study_folder_name(&patient_id, &study_date);
            renames += rename_to(&study_dir, &new_name)?;
        }
    }
    Ok(renames)
}

/// Replace spaces and parentheses in series folder names.
///
/// Returns the number of folders renamed.
pub fn sanitize_pass(main_dir: &Path) -> io::Result<usize> {
    let mut renames = 0;
    for study_dir in subdirectories(main_dir)? {
        for series_dir in subdirectories(&study_dir)? {
            if let Some(name) = series_dir.file_name().and_then(|n| n.to_str()) {
                renames += rename_to(&series_dir, &naming::sanitize(name))?;
            }
        }
    }
    Ok(renames)
}

/// Immediate subdirectories of a directory, sorted by name.
pub fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn rename_to(path: &Path, new_name: &str) -> io::Result<usize> {
    if path.file_name().and_then(|n| n.to_str()) == Some(new_name) {
        return Ok(0);
    }
    let new_path = path.with_file_name(new_name);
    if new_path.exists() {
        warn!(
            "Not renaming '{}' to '{}': target already exists",
            path.display(),
            new_name
        );
        return Ok(0);
    }
    fs::rename(path, &new_path)?;
    info!("Renamed '{}' to '{}'", path.display(), new_path.display());
    Ok(1)
}

/// Read the identifying metadata from the first readable DICOM file
/// of a series folder, stopping before the pixel data.
fn read_series_metadata(series_dir: &Path) -> Option<SeriesMeta> {
    let obj = fs::read_dir(series_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .find_map(|path| {
            OpenFileOptions::new()
                .read_until(tags::PIXEL_DATA)
                .open_file(&path)
                .ok()
        })?;

    let element = |tag: dicom_core::Tag| -> Option<String> {
        let value = obj.element(tag).ok()?.to_str().ok()?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    };

    Some(SeriesMeta {
        patient_id: element(tags::PATIENT_ID)?,
        study_date: element(tags::STUDY_DATE)?,
        modality: element(tags::MODALITY)?,
        series_description: element(tags::SERIES_DESCRIPTION)?,
    })
}
