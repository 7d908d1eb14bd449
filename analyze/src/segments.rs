//! Building the segment table for one series.
//!
//! For each source segment of the plan, the table carries the source mask
//! itself followed by one child segment per threshold rule; additional
//! labels from the plan are appended untouched. The order matches the
//! statistics output row order.
use ctmuscle_core::plan::{AnalysisPlan, ThresholdRule};
use ctmuscle_volume::{Labelmap, ScalarVolume};
use ndarray::{Array3, Zip};
use tracing::{debug, warn};

/// A named voxel mask on the volume grid.
pub struct Segment {
    pub name: String,
    pub mask: Array3<bool>,
}

impl Segment {
    pub fn voxel_count(&self) -> u64 {
        self.mask.iter().filter(|m| **m).count() as u64
    }
}

/// Derive the full segment table from the analysis plan.
pub fn build_segments(
    plan: &AnalysisPlan,
    volume: &ScalarVolume,
    labelmap: &Labelmap,
) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(
        plan.sources.len() * (1 + plan.rules.len()) + plan.additional.len(),
    );

    for source in &plan.sources {
        let source_mask = labelmap.mask(source.label);
        if !source_mask.iter().any(|m| *m) {
            warn!(
                "Source segment '{}' (label {}) is empty",
                source.name, source.label
            );
        }
        segments.push(Segment {
            name: AnalysisPlan::segment_name(source.label),
            mask: source_mask.clone(),
        });
        for rule in &plan.rules {
            let child = threshold_within(&source_mask, volume, rule);
            debug!(
                "Created segment '{}'",
                AnalysisPlan::child_name(source, rule)
            );
            segments.push(Segment {
                name: AnalysisPlan::child_name(source, rule),
                mask: child,
            });
        }
    }

    for label in &plan.additional {
        if !labelmap.contains_label(*label) {
            warn!("Additional segment label {} is empty", label);
        }
        segments.push(Segment {
            name: AnalysisPlan::segment_name(*label),
            mask: labelmap.mask(*label),
        });
    }

    segments
}

/// Voxels of the source mask whose HU value falls in the rule's
/// inclusive range.
fn threshold_within(
    source_mask: &Array3<bool>,
    volume: &ScalarVolume,
    rule: &ThresholdRule,
) -> Array3<bool> {
    Zip::from(source_mask)
        .and(&volume.data)
        .map_collect(|inside, hu| *inside && *hu >= rule.min && *hu <= rule.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctmuscle_core::plan::SourceSegment;
    use ndarray::Array3;

    fn source(name: &str, label: u16) -> SourceSegment {
        SourceSegment {
            name: name.to_string(),
            label,
        }
    }

    fn test_volume() -> ScalarVolume {
        // one slice, 2x3: values -100, -30, 0, 30, 100, 500
        let data =
            Array3::from_shape_vec((1, 2, 3), vec![-100., -30., 0., 30., 100., 500.]).unwrap();
        ScalarVolume {
            data,
            spacing: (1., 1., 1.),
        }
    }

    fn test_labelmap() -> Labelmap {
        // label 100 covers all but the last voxel; label 35 covers only it
        let labels = Array3::from_shape_vec((1, 2, 3), vec![100u16, 100, 100, 100, 100, 35]).unwrap();
        Labelmap { labels }
    }

    fn plan() -> AnalysisPlan {
        AnalysisPlan {
            sources: vec![source("esml", 100)],
            rules: vec![
                ThresholdRule {
                    name: "fat".to_string(),
                    min: -150.,
                    max: -30.,
                },
                ThresholdRule {
                    name: "leanmuscle".to_string(),
                    min: 30.,
                    max: 150.,
                },
            ],
            additional: vec![35],
        }
    }

    #[test]
    fn table_order_and_names() {
        let segments = build_segments(&plan(), &test_volume(), &test_labelmap());
        let names: Vec<_> = segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["Segment_100", "esml_fat", "esml_leanmuscle", "Segment_35"]
        );
    }

    #[test]
    fn thresholds_are_inclusive() {
        let segments = build_segments(&plan(), &test_volume(), &test_labelmap());
        // fat range [-150, -30] captures -100 and the boundary value -30
        let fat = &segments[1];
        assert_eq!(fat.voxel_count(), 2);
        // leanmuscle range [30, 150] captures the boundary 30 and 100,
        // but not 500 (outside the range) nor anything outside label 100
        let lean = &segments[2];
        assert_eq!(lean.voxel_count(), 2);
    }

    #[test]
    fn children_confined_to_source() {
        let segments = build_segments(&plan(), &test_volume(), &test_labelmap());
        let source_count = segments[0].voxel_count();
        for child in &segments[1..3] {
            assert!(child.voxel_count() <= source_count);
            // every child voxel lies inside the source mask
            assert!(Zip::from(&child.mask)
                .and(&segments[0].mask)
                .all(|c, s| !*c || *s));
        }
    }

    #[test]
    fn empty_labels_yield_empty_masks() {
        let mut plan = plan();
        plan.additional.push(92);
        let segments = build_segments(&plan, &test_volume(), &test_labelmap());
        let missing = segments.last().unwrap();
        assert_eq!(missing.name, "Segment_92");
        assert_eq!(missing.voxel_count(), 0);
    }
}
