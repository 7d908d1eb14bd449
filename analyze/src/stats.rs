//! Per-segment volumetric and intensity statistics.
use ctmuscle_volume::ScalarVolume;
use ndarray::Zip;

use crate::segments::Segment;

/// Statistics of one segment over one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStats {
    pub name: String,
    pub voxel_count: u64,
    pub volume_mm3: f64,
    pub volume_cm3: f64,
    /// Intensity statistics in HU; `None` when the segment is empty
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub stdev: Option<f64>,
}

/// Compute the statistics of a segment against the scalar volume.
///
/// The intensity statistics cover exactly the masked voxels; the standard
/// deviation is the population standard deviation.
pub fn compute(segment: &Segment, volume: &ScalarVolume) -> SegmentStats {
    let mut values: Vec<f64> = Vec::new();
    Zip::from(&segment.mask).and(&volume.data).for_each(|m, v| {
        if *m {
            values.push(f64::from(*v));
        }
    });

    let voxel_count = values.len() as u64;
    let volume_mm3 = voxel_count as f64 * volume.voxel_volume_mm3();

    let (min, max, mean, median, stdev) = if values.is_empty() {
        (None, None, None, None, None)
    } else {
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.
        };
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        (
            Some(values[0]),
            Some(values[n - 1]),
            Some(mean),
            Some(median),
            Some(variance.sqrt()),
        )
    };

    SegmentStats {
        name: segment.name.clone(),
        voxel_count,
        volume_mm3,
        volume_cm3: volume_mm3 / 1000.,
        min,
        max,
        mean,
        median,
        stdev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn volume_of(values: Vec<f32>, spacing: (f32, f32, f32)) -> ScalarVolume {
        let len = values.len();
        ScalarVolume {
            data: Array3::from_shape_vec((1, 1, len), values).unwrap(),
            spacing,
        }
    }

    fn full_mask(volume: &ScalarVolume) -> Segment {
        Segment {
            name: "test".to_string(),
            mask: volume.data.mapv(|_| true),
        }
    }

    #[test]
    fn stats_over_masked_voxels() {
        let volume = volume_of(vec![-30., 0., 30., 60.], (1., 1., 2.));
        let mut segment = full_mask(&volume);
        // exclude the last voxel from the mask
        segment.mask[(0, 0, 3)] = false;

        let stats = compute(&segment, &volume);
        assert_eq!(stats.voxel_count, 3);
        assert_eq!(stats.volume_mm3, 6.);
        assert_eq!(stats.volume_cm3, 0.006);
        assert_eq!(stats.min, Some(-30.));
        assert_eq!(stats.max, Some(30.));
        assert_eq!(stats.mean, Some(0.));
        assert_eq!(stats.median, Some(0.));
        // population stdev of [-30, 0, 30]
        let expected = (600f64).sqrt();
        assert!((stats.stdev.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn even_count_median_averages() {
        let volume = volume_of(vec![10., 20., 30., 40.], (1., 1., 1.));
        let stats = compute(&full_mask(&volume), &volume);
        assert_eq!(stats.median, Some(25.));
    }

    #[test]
    fn empty_segment_has_no_intensity_stats() {
        let volume = volume_of(vec![10., 20.], (1., 1., 1.));
        let segment = Segment {
            name: "empty".to_string(),
            mask: volume.data.mapv(|_| false),
        };
        let stats = compute(&segment, &volume);
        assert_eq!(stats.voxel_count, 0);
        assert_eq!(stats.volume_mm3, 0.);
        assert_eq!(stats.min, None);
        assert_eq!(stats.stdev, None);
    }
}
