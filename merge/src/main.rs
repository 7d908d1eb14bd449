//! Merge the per-series statistics CSV files of a study
//! into one combined table.
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use ctmuscle_core::{ResultName, StudyConfig};
use snafu::{prelude::*, Report, Whatever};
use tracing::{error, info, warn, Level};

mod combine;

use combine::CombinedTable;

/// Merge per-series statistics CSV files into one combined CSV,
/// tagging each row with the identifier, date, and series name
/// parsed from its filename
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// path to the study configuration file
    /// (used to locate the output directory)
    #[arg(short = 'c', long = "config", default_value = "config.json")]
    config: PathBuf,
    /// directory holding the per-series CSV files,
    /// overrides the configured output directory
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,
    /// path of the combined CSV to write
    #[arg(short = 'o', long = "out", default_value = "combinedData.csv")]
    output: PathBuf,
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

    /// Could not combine tables
    Combine { source: combine::Error },

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
        config,
        dir,
        output,
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

    let dir = match dir {
        Some(dir) => dir,
        None => {
            StudyConfig::load(&config)
                .context(LoadConfigSnafu)?
                .output_directory
        }
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .whatever_context("Could not read results directory")?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut table = CombinedTable::new();
    let mut merged_files = 0;
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(name) = ResultName::parse(file_name) else {
            if file_name.ends_with(".csv") {
                warn!(
                    "Skipping '{}': filename does not follow the <id>_<YYYYMMDD>_<series>.csv convention",
                    file_name
                );
            }
            continue;
        };
        let appended = table.append_file(&path, &name).context(CombineSnafu)?;
        info!("Merged {} rows from '{}'", appended, file_name);
        merged_files += 1;
    }

    if merged_files == 0 {
        whatever!("No result tables found in {}", dir.display());
    }

    table.write(&output).context(CombineSnafu)?;
    info!(
        "Wrote {} rows from {} tables to '{}'",
        table.row_count(),
        merged_files,
        output.display()
    );
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
