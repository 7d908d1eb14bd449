//! Loading a DICOM series directory as a scalar volume in Hounsfield units.
use std::fs;
use std::path::{Path, PathBuf};

use dicom_dictionary_std::tags;
use dicom_object::{open_file, FileDicomObject, InMemDicomObject};
use dicom_pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption};
use ndarray::{s, Array2, Array3};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::warn;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read series directory {}", path.display()))]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("No DICOM slices found in {}", path.display()))]
    NoSlices { path: PathBuf },

    #[snafu(display("Could not decode pixel data of {}", path.display()))]
    DecodePixelData {
        path: PathBuf,
        source: dicom_pixeldata::Error,
    },

    #[snafu(display("Inconsistent slice dimensions in {}", path.display()))]
    InconsistentDimensions { path: PathBuf },

    #[snafu(display("Missing pixel spacing information in {}", path.display()))]
    MissingSpacing { path: PathBuf },
}

/// A CT series as a single volume of Hounsfield units.
#[derive(Debug, Clone)]
pub struct ScalarVolume {
    /// Voxel values in HU, indexed by (slice, row, column)
    pub data: Array3<f32>,
    /// Voxel spacing in mm: (row, column, slice)
    pub spacing: (f32, f32, f32),
}

impl ScalarVolume {
    /// Volume of a single voxel in mm³.
    pub fn voxel_volume_mm3(&self) -> f64 {
        let (row, col, slice) = self.spacing;
        f64::from(row) * f64::from(col) * f64::from(slice)
    }

    /// Load all DICOM files in a directory as one volume.
    ///
    /// Files that cannot be opened as DICOM are skipped with a warning.
    /// Slices are ordered by ImagePositionPatient along the patient axis,
    /// falling back to InstanceNumber, and the modality rescale is applied
    /// so that voxel values are in Hounsfield units.
    pub fn from_dicom_dir(path: impl AsRef<Path>) -> Result<ScalarVolume, Error> {
        let path = path.as_ref();
        let mut objects = Vec::new();
        for entry in fs::read_dir(path)
            .context(ReadDirSnafu { path })?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
        {
            match open_file(entry.path()) {
                Ok(obj) => objects.push(obj),
                Err(_) => {
                    warn!("Could not open file {} as DICOM", entry.path().display());
                }
            }
        }

        if objects.is_empty() {
            return NoSlicesSnafu { path }.fail();
        }

        let mut slices = Vec::with_capacity(objects.len());
        for obj in &objects {
            let order = slice_order(obj);
            let image = decode_slice(obj).context(DecodePixelDataSnafu { path })?;
            slices.push((order, image));
        }

        slices.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let first_dim = slices[0].1.dim();
        if slices.iter().any(|(_, image)| image.dim() != first_dim) {
            return InconsistentDimensionsSnafu { path }.fail();
        }

        let (rows, columns) = first_dim;
        let mut data = Array3::zeros((slices.len(), rows, columns));
        for (i, (_, image)) in slices.iter().enumerate() {
            data.slice_mut(s![i, .., ..]).assign(image);
        }

        let spacing = spacing(&objects).context(MissingSpacingSnafu { path })?;

        Ok(ScalarVolume { data, spacing })
    }
}

/// Position of a slice along the patient axis,
/// by ImagePositionPatient z or InstanceNumber.
fn slice_order(obj: &FileDicomObject<InMemDicomObject>) -> Option<f32> {
    if let Some(pos) = obj
        .element(tags::IMAGE_POSITION_PATIENT)
        .ok()
        .and_then(|e| e.to_multi_float32().ok())
    {
        return pos.get(2).copied();
    }
    obj.element(tags::INSTANCE_NUMBER)
        .ok()?
        .to_int::<i32>()
        .ok()
        .map(|n| n as f32)
}

fn decode_slice(
    obj: &FileDicomObject<InMemDicomObject>,
) -> Result<Array2<f32>, dicom_pixeldata::Error> {
    let pixel_data = obj.decode_pixel_data()?;
    // modality rescale only, no value-of-interest windowing
    let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
    let array = pixel_data.to_ndarray_with_options::<f32>(&options)?;
    Ok(array.slice_move(s![0, .., .., 0]))
}

fn spacing(objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
    objects.iter().find_map(|obj| {
        let pixel_spacing = obj
            .element(tags::PIXEL_SPACING)
            .ok()?
            .to_multi_float32()
            .ok()?;
        let slice_thickness = obj
            .element(tags::SLICE_THICKNESS)
            .ok()?
            .to_float32()
            .ok()?;
        Some((
            *pixel_spacing.first()?,
            *pixel_spacing.get(1)?,
            slice_thickness,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{dicom_value, DataElement, VR};
    use dicom_dictionary_std::uids;
    use dicom_object::FileMetaTableBuilder;

    /// Write a single uncompressed 2×2 CT slice with the given
    /// stored pixel value and patient-axis position.
    fn write_test_slice(path: &Path, z: &str, stored: u16) {
        let sop_instance_uid = format!("2.25.111222333.{}", stored);
        let obj = InMemDicomObject::from_element_iter([
            DataElement::new(tags::SOP_CLASS_UID, VR::UI, dicom_value!(Str, uids::CT_IMAGE_STORAGE)),
            DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, dicom_value!(Str, sop_instance_uid.as_str())),
            DataElement::new(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, dicom_value!(Str, "MONOCHROME2")),
            DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, dicom_value!(U16, [1])),
            DataElement::new(tags::NUMBER_OF_FRAMES, VR::IS, dicom_value!(Str, "1")),
            DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, [2])),
            DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [2])),
            DataElement::new(tags::BITS_ALLOCATED, VR::US, dicom_value!(U16, [16])),
            DataElement::new(tags::BITS_STORED, VR::US, dicom_value!(U16, [16])),
            DataElement::new(tags::HIGH_BIT, VR::US, dicom_value!(U16, [15])),
            DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, dicom_value!(U16, [0])),
            DataElement::new(tags::RESCALE_SLOPE, VR::DS, dicom_value!(Str, "1")),
            DataElement::new(tags::RESCALE_INTERCEPT, VR::DS, dicom_value!(Str, "-1024")),
            DataElement::new(tags::IMAGE_POSITION_PATIENT, VR::DS, dicom_value!(Strs, ["0", "0", z])),
            DataElement::new(tags::PIXEL_SPACING, VR::DS, dicom_value!(Strs, ["0.5", "0.5"])),
            DataElement::new(tags::SLICE_THICKNESS, VR::DS, dicom_value!(Str, "2.0")),
            DataElement::new(
                tags::PIXEL_DATA,
                VR::OW,
                dicom_value!(U16, [stored, stored, stored, stored]),
            ),
        ]);
        let obj = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid(sop_instance_uid),
            )
            .unwrap();
        obj.write_to_file(path).unwrap();
    }

    #[test]
    fn loads_slices_in_position_order_as_hounsfield_units() {
        let dir = tempfile::tempdir().unwrap();
        // the slice closer to the patient's head is written first,
        // so file order disagrees with position order
        write_test_slice(&dir.path().join("a.dcm"), "2.0", 1124);
        write_test_slice(&dir.path().join("b.dcm"), "0.0", 1024);

        let volume = ScalarVolume::from_dicom_dir(dir.path()).unwrap();

        assert_eq!(volume.data.dim(), (2, 2, 2));
        // slices come back sorted by ImagePositionPatient z
        // with the modality rescale applied: stored - 1024 HU
        assert!(volume.data.slice(s![0, .., ..]).iter().all(|v| *v == 0.));
        assert!(volume.data.slice(s![1, .., ..]).iter().all(|v| *v == 100.));
        assert_eq!(volume.spacing, (0.5, 0.5, 2.0));
    }

    #[test]
    fn voxel_volume_from_spacing() {
        let volume = ScalarVolume {
            data: Array3::zeros((1, 2, 2)),
            spacing: (0.5, 0.5, 2.0),
        };
        assert!((volume.voxel_volume_mm3() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_directory_is_reported() {
        let e = ScalarVolume::from_dicom_dir("/no/such/series").unwrap_err();
        assert!(matches!(e, Error::ReadDir { .. }));
    }
}
