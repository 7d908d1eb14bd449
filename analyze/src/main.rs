//! Compute per-segment volumetric and intensity statistics
//! for the CT series selected in a study configuration.
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use ctmuscle_core::{naming, AnalysisPlan, ResultName, StudyConfig};
use ctmuscle_volume::{check_same_grid, labelmap, Labelmap, ScalarVolume};
use indicatif::{ProgressBar, ProgressStyle};
use snafu::{prelude::*, Report, Whatever};
use tracing::{error, info, warn, Level};

mod report;
mod segments;
mod stats;

/// Analyze selected CT series: load each series and its segmentation,
/// derive child segments by HU thresholding, and store one statistics
/// CSV per series
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// path to the study configuration file
    #[arg(short = 'c', long = "config", default_value = "config.json")]
    config: PathBuf,
    /// verbose mode
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    /// Could not load study configuration
    LoadConfig {
        source: ctmuscle_core::config::Error,
    },

    #[snafu(whatever, display("{}", message))]
    Other {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + 'static>, Some)))]
        source: Option<Box<dyn std::error::Error + 'static>>,
    },
}

#[derive(Debug, Snafu)]
enum SeriesError {
    /// Could not load the series volume
    LoadVolume {
        source: ctmuscle_volume::scalar::Error,
    },

    #[snafu(display("No segmentation file found for series '{}'", series))]
    MissingSegmentation { series: String },

    /// Could not load the segmentation labelmap
    LoadSegmentation {
        source: ctmuscle_volume::labelmap::Error,
    },

    /// Segmentation does not lie on the series grid
    Grid { source: ctmuscle_volume::GridMismatch },

    #[snafu(display("No study date recoverable from folder name '{}'", name))]
    NoStudyDate { name: String },

    #[snafu(display("Could not write results to {}", path.display()))]
    WriteResults {
        path: PathBuf,
        source: csv::Error,
    },
}

fn main() {
    run().unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-2);
    });
}

fn run() -> Result<(), Error> {
    let App { config, verbose } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    let config = StudyConfig::load(&config).context(LoadConfigSnafu)?;
    let plan = config.plan.clone().unwrap_or_default();

    fs::create_dir_all(&config.output_directory)
        .whatever_context("Could not create output directory")?;

    let total: u64 = config.selections.iter().map(|s| s.series.len() as u64).sum();

    let progress_bar;
    if !verbose {
        progress_bar = Some(ProgressBar::new(total));
        if let Some(pb) = progress_bar.as_ref() {
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}")
                    .expect("Invalid progress bar template"),
            );
            pb.enable_steady_tick(Duration::new(0, 480_000_000));
        };
    } else {
        progress_bar = None;
    }

    let mut skipped: Vec<(String, String)> = Vec::new();

    for selection in &config.selections {
        info!("Analyzing patient '{}'", selection.patient);
        for series in &selection.series {
            if let Some(pb) = &progress_bar {
                pb.set_message(series.clone());
            }
            match analyze_series(&config, &plan, &selection.patient, series) {
                Ok(path) => {
                    info!("Stored results to '{}'", path.display());
                }
                Err(e) => {
                    warn!(
                        "Skipping series '{}' of patient '{}': {}",
                        series,
                        selection.patient,
                        Report::from_error(e)
                    );
                    skipped.push((selection.patient.clone(), series.clone()));
                }
            }
            if let Some(pb) = progress_bar.as_ref() {
                pb.inc(1)
            };
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done")
    };

    if skipped.is_empty() {
        info!(
            "Stored all results to '{}'",
            config.output_directory.display()
        );
    } else {
        warn!("Skipped series: {:?}", skipped);
    }
    Ok(())
}

/// Analyze a single series and write its statistics CSV.
///
/// Returns the path of the written file.
fn analyze_series(
    config: &StudyConfig,
    plan: &AnalysisPlan,
    patient: &str,
    series: &str,
) -> Result<PathBuf, SeriesError> {
    let study_dir = config.main_directory.join(patient);
    let series_dir = study_dir.join(series);

    let volume = ScalarVolume::from_dicom_dir(&series_dir).context(LoadVolumeSnafu)?;
    let seg_path = labelmap::segmentation_path(&study_dir, series)
        .context(MissingSegmentationSnafu { series })?;
    let labels = Labelmap::from_nifti_file(&seg_path).context(LoadSegmentationSnafu)?;
    check_same_grid(&volume, &labels).context(GridSnafu)?;

    let name = result_name(patient, series)?;
    let out_path = config.output_directory.join(name.to_file_name());

    let table = segments::build_segments(plan, &volume, &labels);
    let rows: Vec<_> = table.iter().map(|s| stats::compute(s, &volume)).collect();

    if let Err(source) = report::write_csv(&out_path, &rows) {
        // do not leave a partially written table behind
        let _ = fs::remove_file(&out_path);
        return Err(SeriesError::WriteResults {
            path: out_path,
            source,
        });
    }
    Ok(out_path)
}

/// Derive the result filename triple from the study and series folder names.
fn result_name(patient: &str, series: &str) -> Result<ResultName, SeriesError> {
    let id = naming::split_study_folder(patient)
        .map(|(id, _)| id)
        .unwrap_or(patient);
    let (date, series_name) = match naming::split_series_folder(series) {
        Some((_, date, description)) => (date, description),
        // fall back to the study folder's date for unorganized series names
        None => match naming::split_study_folder(patient) {
            Some((_, date)) => (date, series),
            None => return NoStudyDateSnafu { name: series }.fail(),
        },
    };
    let date = NaiveDate::parse_from_str(date, "%Y%m%d")
        .ok()
        .context(NoStudyDateSnafu { name: series })?;
    Ok(ResultName {
        id: id.to_string(),
        date,
        series: series_name.to_string(),
    })
}
