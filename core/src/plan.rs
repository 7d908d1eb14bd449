//! The segment analysis plan.
//!
//! A plan names which labelmap regions to analyze, which Hounsfield-unit
//! ranges to derive child segments from, and which extra regions to include
//! untouched. The built-in plan is the paraspinal muscle-composition rule
//! set; a configuration file may carry an override.
use serde::{Deserialize, Serialize};

/// A labelmap region to threshold into child segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSegment {
    /// Short name used to prefix child segment names
    pub name: String,
    /// Voxel value of the region in the labelmap
    pub label: u16,
}

/// An inclusive Hounsfield-unit range deriving a child segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Suffix of the derived segment's name
    pub name: String,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPlan {
    /// Regions thresholded into child segments
    pub sources: Vec<SourceSegment>,
    /// HU ranges applied to every source region
    pub rules: Vec<ThresholdRule>,
    /// Labelmap values analyzed without thresholding
    pub additional: Vec<u16>,
}

impl AnalysisPlan {
    /// Display name of a plain labelmap segment.
    pub fn segment_name(label: u16) -> String {
        format!("Segment_{}", label)
    }

    /// Display name of a thresholded child segment.
    pub fn child_name(source: &SourceSegment, rule: &ThresholdRule) -> String {
        format!("{}_{}", source.name, rule.name)
    }
}

impl Default for AnalysisPlan {
    fn default() -> Self {
        fn src(name: &str, label: u16) -> SourceSegment {
            SourceSegment {
                name: name.to_string(),
                label,
            }
        }
        fn rule(name: &str, min: f32, max: f32) -> ThresholdRule {
            ThresholdRule {
                name: name.to_string(),
                min,
                max,
            }
        }
        AnalysisPlan {
            // erector spinae and psoas major, left and right
            sources: vec![
                src("esml", 100),
                src("esmr", 101),
                src("pml", 102),
                src("pmr", 103),
            ],
            rules: vec![
                rule("fat", -150., -30.),
                rule("fattymuscle", -29., 29.),
                rule("leanmuscle", 30., 150.),
            ],
            additional: vec![92, 35],
        }
    }
}
