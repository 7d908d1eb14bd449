//! Shared types for the ctmuscle workflow tools.
//!
//! This crate holds the pieces that more than one tool needs to agree on:
//! the generated study configuration file ([`config`]), the folder and
//! result-file naming conventions ([`naming`]), and the segment analysis
//! plan ([`plan`]).
pub mod config;
pub mod naming;
pub mod plan;

pub use config::{PatientSelection, StudyConfig};
pub use naming::ResultName;
pub use plan::{AnalysisPlan, SourceSegment, ThresholdRule};
