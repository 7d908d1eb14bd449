//! Loading a segmentation labelmap from a NIfTI file.
use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use snafu::{OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read segmentation file {}", path.display()))]
    ReadNifti {
        path: PathBuf,
        source: nifti::NiftiError,
    },

    #[snafu(display("Segmentation {} is not a 3-dimensional volume", path.display()))]
    NotVolumetric { path: PathBuf },
}

/// A segmentation labelmap on the acquisition grid.
///
/// Voxel values are region labels; 0 is background. Axes are ordered
/// (slice, row, column) to match [`crate::ScalarVolume`].
#[derive(Debug, Clone)]
pub struct Labelmap {
    pub labels: Array3<u16>,
}

impl Labelmap {
    /// Load a labelmap from a NIfTI file (`.nii` or `.nii.gz`).
    pub fn from_nifti_file(path: impl AsRef<Path>) -> Result<Labelmap, Error> {
        let path = path.as_ref();
        let object = ReaderOptions::new()
            .read_file(path)
            .context(ReadNiftiSnafu { path })?;
        let data = object
            .into_volume()
            .into_ndarray::<f32>()
            .context(ReadNiftiSnafu { path })?;
        let data = squeeze(data)
            .into_dimensionality::<Ix3>()
            .ok()
            .context(NotVolumetricSnafu { path })?;
        // NIfTI axes run (x, y, z); reorder to (slice, row, column)
        let data = data.permuted_axes([2, 1, 0]);
        let labels = data.mapv(|v| {
            if v.is_finite() && v > 0. {
                v.round() as u16
            } else {
                0
            }
        });
        Ok(Labelmap { labels })
    }

    /// Boolean mask of the voxels carrying the given label.
    pub fn mask(&self, label: u16) -> Array3<bool> {
        self.labels.mapv(|v| v == label)
    }

    /// Whether any voxel carries the given label.
    pub fn contains_label(&self, label: u16) -> bool {
        self.labels.iter().any(|v| *v == label)
    }
}

/// Drop trailing singleton axes (e.g. a 4th axis of length 1).
fn squeeze(mut data: ArrayD<f32>) -> ArrayD<f32> {
    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.remove_axis(Axis(last));
    }
    data
}

/// Locate the segmentation file belonging to a series folder.
///
/// The convention is `<series>_seg.nii` next to the series folder,
/// with `.nii.gz` accepted as well.
pub fn segmentation_path(study_dir: &Path, series_folder: &str) -> Option<PathBuf> {
    for suffix in ["_seg.nii", "_seg.nii.gz"] {
        let candidate = study_dir.join(format!("{}{}", series_folder, suffix));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn mask_selects_single_label() {
        let labels = Array3::from_shape_vec(
            (1, 2, 2),
            vec![0u16, 100, 100, 35],
        )
        .unwrap();
        let labelmap = Labelmap { labels };

        let mask = labelmap.mask(100);
        assert_eq!(mask.iter().filter(|m| **m).count(), 2);
        assert!(labelmap.contains_label(35));
        assert!(!labelmap.contains_label(101));
    }

    #[test]
    fn squeeze_drops_trailing_singletons() {
        let data = Array::zeros(vec![4, 4, 2, 1]).into_dyn();
        assert_eq!(squeeze(data).shape(), &[4, 4, 2]);

        let data = Array::zeros(vec![4, 4, 2]).into_dyn();
        assert_eq!(squeeze(data).shape(), &[4, 4, 2]);
    }
}
