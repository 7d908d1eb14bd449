//! Volumetric data loading for the ctmuscle workflow.
//!
//! A [`ScalarVolume`] is a CT series loaded from a directory of DICOM files,
//! rescaled to Hounsfield units and ordered along the patient axis. A
//! [`Labelmap`] is a segmentation loaded from a NIfTI file, reoriented to
//! the scalar volume's slice/row/column axis order. Statistics are computed
//! over pairs of the two, so both are checked for grid compatibility first.
pub mod labelmap;
pub mod scalar;

pub use labelmap::Labelmap;
pub use scalar::ScalarVolume;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(display(
    "Labelmap grid {:?} does not match volume grid {:?}",
    labelmap_dim,
    volume_dim
))]
pub struct GridMismatch {
    pub volume_dim: (usize, usize, usize),
    pub labelmap_dim: (usize, usize, usize),
}

/// Check that a labelmap lies on the same voxel grid as a scalar volume.
pub fn check_same_grid(volume: &ScalarVolume, labelmap: &Labelmap) -> Result<(), GridMismatch> {
    let volume_dim = volume.data.dim();
    let labelmap_dim = labelmap.labels.dim();
    if volume_dim != labelmap_dim {
        return GridMismatchSnafu {
            volume_dim,
            labelmap_dim,
        }
        .fail();
    }
    Ok(())
}
