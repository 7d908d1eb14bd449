//! Organize patient DICOM study folders by metadata-derived names
//! and interactively select the series to analyze.
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use ctmuscle_core::{PatientSelection, StudyConfig};
use dialoguer::{Confirm, MultiSelect};
use snafu::{prelude::*, Report, Whatever};
use tracing::{error, info, warn, Level};

mod rename;

/// Rename study and series folders from DICOM metadata, choose which
/// series to analyze per patient, and write the study configuration
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// directory where patient data is stored
    main_dir: PathBuf,
    /// directory where analysis results will be stored
    output_dir: PathBuf,
    /// path of the configuration file to write
    #[arg(short = 'c', long = "config", default_value = "config.json")]
    config: PathBuf,
    /// verbose mode
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    /// Could not save study configuration
    SaveConfig {
        source: ctmuscle_core::config::Error,
    },

    #[snafu(whatever, display("{}", message))]
    Other {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + 'static>, Some)))]
        source: Option<Box<dyn std::error::Error + 'static>>,
    },
}

fn main() {
    run().unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-2);
    });
}

fn run() -> Result<(), Error> {
    let App {
        main_dir,
        output_dir,
        config,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    if !main_dir.is_dir() {
        whatever!("Main directory {} does not exist", main_dir.display());
    }
    if !output_dir.is_dir() {
        whatever!("Output directory {} does not exist", output_dir.display());
    }

    let renamed = rename::rename_pass(&main_dir)
        .whatever_context("Could not rename study folders")?;
    let sanitized = rename::sanitize_pass(&main_dir)
        .whatever_context("Could not sanitize series folder names")?;
    info!("Renamed {} folders ({} sanitized)", renamed + sanitized, sanitized);

    let mut selections: Vec<PatientSelection> = Vec::new();
    let mut not_selected: Vec<PathBuf> = Vec::new();

    for patient_dir in rename::subdirectories(&main_dir)
        .whatever_context("Could not list patient folders")?
    {
        let Some(patient) = patient_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let series_dirs = rename::subdirectories(&patient_dir)
            .whatever_context("Could not list series folders")?;
        let series_names: Vec<String> = series_dirs
            .iter()
            .filter_map(|dir| dir.file_name().and_then(|n| n.to_str()))
            .map(|name| name.to_string())
            .collect();
        if series_names.is_empty() {
            warn!("Patient '{}' has no series folders", patient);
            continue;
        }

        let chosen = MultiSelect::new()
            .with_prompt(format!(
                "Select the series to analyze from patient '{}' (space to select)",
                patient
            ))
            .items(&series_names)
            .interact()
            .whatever_context("Series selection aborted")?;

        for (i, dir) in series_dirs.iter().enumerate() {
            if !chosen.contains(&i) {
                not_selected.push(dir.clone());
            }
        }
        selections.push(PatientSelection {
            patient: patient.to_string(),
            series: chosen.iter().map(|i| series_names[*i].clone()).collect(),
        });
    }

    if !not_selected.is_empty() {
        // destructive and unrecoverable, default to keeping the data
        let remove = Confirm::new()
            .with_prompt(format!(
                "Remove {} unselected series folder(s)?",
                not_selected.len()
            ))
            .default(false)
            .interact()
            .whatever_context("Removal confirmation aborted")?;
        if remove {
            for dir in &not_selected {
                match fs::remove_dir_all(dir) {
                    Ok(()) => info!("Removed '{}'", dir.display()),
                    Err(e) => warn!("Could not remove '{}': {}", dir.display(), e),
                }
            }
        }
    }

    let study_config = StudyConfig {
        main_directory: main_dir,
        output_directory: output_dir,
        selections,
        plan: None,
    };
    study_config.save(&config).context(SaveConfigSnafu)?;
    info!("Wrote configuration to '{}'", config.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::App;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }
}
