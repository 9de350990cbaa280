use crate::error::{BidsortError, Result};
use crate::extraction::entities::{normalize_description, strip_non_alphanumeric};
use crate::extraction::listing::AcquisitionFiles;
use crate::extraction::sidecar::{
    get_f64_value, get_int_value, get_multi_string_value, get_string_value, Sidecar,
    ACQUISITION_DATE_TIME, ECHO_NUMBER, ECHO_TIME, IMAGE_TYPE, MULTIBAND_ACCELERATION_FACTOR,
    PATIENT_BIRTH_DATE, PATIENT_ID, PATIENT_NAME, PATIENT_SEX, PHASE_ENCODING_DIRECTION,
    PROTOCOL_NAME, REPETITION_TIME, SERIES_DESCRIPTION, SERIES_NUMBER, STUDY_ID,
};
use crate::source::DataSource;
use crate::types::{ExclusionReason, ImageType, PatientSex, PhaseEncodingDirection};
use std::cmp::Ordering;

/// Acquisition date used when the sidecar has no timestamp
pub const UNKNOWN_ACQUISITION_DATE: &str = "0000-00-00";

/// One scanner acquisition: normalized sidecar fields plus pipeline outputs
///
/// Created once by [`AcquisitionRecord::from_sidecar`], then mutated in place
/// by the session resolver, the deduplication engine and object linkage.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionRecord {
    pub study_id: String,
    pub patient_name: Option<String>,
    pub patient_id: Option<String>,
    /// Birth date with separators removed
    pub patient_birth_date: Option<String>,
    pub patient_sex: PatientSex,
    pub patient_age: String,

    /// Sanitized alphanumeric subject key, never empty
    pub subject: String,
    /// Session ordinal, empty for single-session subjects
    pub session: String,

    pub acquisition_date: String,
    pub acquisition_time: Option<String>,
    pub repetition_time: Option<f64>,
    /// Echo time in milliseconds
    pub echo_time: f64,
    pub echo_number: Option<i64>,

    pub series_description: String,
    pub protocol_name: String,
    pub image_type: ImageType,
    pub series_number: i64,
    pub multiband_factor: Option<f64>,

    pub direction: PhaseEncodingDirection,
    pub file_size: u64,
    pub volume_count: usize,
    pub json_path: String,
    pub nifti_path: String,
    pub paths: Vec<String>,
    pub sidecar: Sidecar,

    pub series_id: usize,
    pub section_id: usize,
    pub exclusion: Option<ExclusionReason>,
    pub error: Option<String>,
    pub message: String,
}

impl AcquisitionRecord {
    /// Normalizes one sidecar and its files into a record
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - None of PatientName, PatientID, PatientBirthDate yields a subject key
    /// - No `.nii.gz` image accompanies the sidecar
    /// - The image header cannot be read
    pub fn from_sidecar(
        files: &AcquisitionFiles,
        sidecar: Sidecar,
        source: &dyn DataSource,
    ) -> Result<Self> {
        let patient_name = get_string_value(&sidecar, PATIENT_NAME);
        let patient_id = get_string_value(&sidecar, PATIENT_ID);
        let patient_birth_date =
            get_string_value(&sidecar, PATIENT_BIRTH_DATE).map(|d| strip_non_alphanumeric(&d));

        let subject = resolve_subject_key([&patient_name, &patient_id, &patient_birth_date])
            .ok_or_else(|| BidsortError::MissingIdentity {
                path: files.json_path.clone(),
            })?;

        let nifti_path = files.nifti_path()?.to_string();
        let volume = source.inspect_volume(&nifti_path)?;

        let (acquisition_date, acquisition_time) =
            split_acquisition_date_time(get_string_value(&sidecar, ACQUISITION_DATE_TIME));

        Ok(Self {
            study_id: get_string_value(&sidecar, STUDY_ID).unwrap_or_default(),
            patient_sex: get_string_value(&sidecar, PATIENT_SEX)
                .map(|s| PatientSex::from_str(&s))
                .unwrap_or_default(),
            patient_age: "N/A".to_string(),
            patient_name,
            patient_id,
            patient_birth_date,
            subject,
            session: String::new(),
            acquisition_date,
            acquisition_time,
            repetition_time: get_f64_value(&sidecar, REPETITION_TIME),
            echo_time: get_f64_value(&sidecar, ECHO_TIME)
                .map(|seconds| seconds * 1000.0)
                .unwrap_or(0.0),
            echo_number: get_int_value(&sidecar, ECHO_NUMBER),
            series_description: get_string_value(&sidecar, SERIES_DESCRIPTION).unwrap_or_default(),
            protocol_name: get_string_value(&sidecar, PROTOCOL_NAME).unwrap_or_default(),
            image_type: ImageType::new(
                get_multi_string_value(&sidecar, IMAGE_TYPE).unwrap_or_default(),
            ),
            series_number: get_int_value(&sidecar, SERIES_NUMBER).unwrap_or(0),
            multiband_factor: get_f64_value(&sidecar, MULTIBAND_ACCELERATION_FACTOR),
            direction: get_string_value(&sidecar, PHASE_ENCODING_DIRECTION)
                .map(|token| PhaseEncodingDirection::from_token(&token))
                .unwrap_or_default(),
            file_size: volume.file_size,
            volume_count: volume.volume_count(),
            json_path: files.json_path.clone(),
            nifti_path,
            paths: files.paths.clone(),
            sidecar,
            series_id: 0,
            section_id: 1,
            exclusion: None,
            error: None,
            message: String::new(),
        })
    }

    /// Lowercased alphanumeric series description
    pub fn normalized_description(&self) -> String {
        normalize_description(&self.series_description)
    }

    /// Checks for diffusion gradient files
    pub fn has_gradients(&self) -> bool {
        self.paths.iter().any(|p| p.ends_with(".bvec"))
    }

    /// Path of the `.bval` file, if any
    pub fn bval_path(&self) -> Option<&str> {
        self.paths
            .iter()
            .find(|p| p.ends_with(".bval"))
            .map(String::as_str)
    }

    /// Path where a preview image for this acquisition is expected
    pub fn png_path(&self) -> String {
        let stem = self
            .nifti_path
            .strip_suffix(".nii.gz")
            .unwrap_or(&self.nifti_path);
        format!("{}.png", stem)
    }

    pub fn is_excluded(&self) -> bool {
        self.exclusion.is_some()
    }

    /// Marks the record excluded with an error doubling as the message
    pub fn exclude(&mut self, reason: ExclusionReason, error: String) {
        self.exclusion = Some(reason);
        self.message = error.clone();
        self.error = Some(error);
    }

    /// Processing order: subject, acquisition date, series number, sidecar path
    pub fn processing_order(&self, other: &Self) -> Ordering {
        self.subject
            .cmp(&other.subject)
            .then_with(|| self.acquisition_date.cmp(&other.acquisition_date))
            .then_with(|| self.series_number.cmp(&other.series_number))
            .then_with(|| self.json_path.cmp(&other.json_path))
    }
}

/// Picks the first identifier that survives sanitizing
///
/// Order of preference: PatientName, PatientID, PatientBirthDate.
pub fn resolve_subject_key(candidates: [&Option<String>; 3]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|value| strip_non_alphanumeric(value))
        .find(|key| !key.is_empty())
}

/// Splits `AcquisitionDateTime` into date and time at the `T`
fn split_acquisition_date_time(value: Option<String>) -> (String, Option<String>) {
    match value {
        Some(stamp) if !stamp.is_empty() => match stamp.split_once('T') {
            Some((date, time)) => (date.to_string(), Some(time.to_string())),
            None => (stamp, None),
        },
        _ => (UNKNOWN_ACQUISITION_DATE.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::listing::group_listing;
    use crate::source::{InMemorySource, NiftiDatatype, VolumeInfo};
    use serde_json::{json, Value};

    fn normalize(sidecar: Value, dims: Vec<usize>) -> Result<AcquisitionRecord> {
        let files = group_listing(&["sub/scan.json", "sub/scan.nii.gz"]).remove(0);
        let source = InMemorySource::new().with_volume(
            "sub/scan.nii.gz",
            VolumeInfo::new(dims, NiftiDatatype::Int16, 4096),
        );
        AcquisitionRecord::from_sidecar(&files, sidecar.as_object().cloned().unwrap(), &source)
    }

    #[test]
    fn test_full_sidecar() {
        let record = normalize(
            json!({
                "StudyID": "42",
                "PatientName": "Doe^Jane",
                "PatientID": "P-001",
                "PatientBirthDate": "1980-01-02",
                "PatientSex": "F",
                "AcquisitionDateTime": "2020-01-01T10:11:12.000000",
                "RepetitionTime": 2.0,
                "EchoTime": 0.03,
                "EchoNumber": 1,
                "SeriesDescription": "task-rest_bold",
                "ProtocolName": "rest",
                "ImageType": ["ORIGINAL", "PRIMARY", "M", "MB", "ND", "MOSAIC"],
                "SeriesNumber": 5,
                "MultibandAccelerationFactor": 4,
                "PhaseEncodingDirection": "j-"
            }),
            vec![64, 64, 36, 300],
        )
        .unwrap();

        assert_eq!(record.study_id, "42");
        assert_eq!(record.subject, "DoeJane");
        assert_eq!(record.patient_birth_date.as_deref(), Some("19800102"));
        assert_eq!(record.patient_sex, PatientSex::Female);
        assert_eq!(record.acquisition_date, "2020-01-01");
        assert_eq!(record.acquisition_time.as_deref(), Some("10:11:12.000000"));
        assert!((record.echo_time - 30.0).abs() < 1e-9);
        assert_eq!(record.echo_number, Some(1));
        assert_eq!(record.series_number, 5);
        assert_eq!(record.multiband_factor, Some(4.0));
        assert_eq!(record.direction, PhaseEncodingDirection::Ap);
        assert_eq!(record.volume_count, 300);
        assert_eq!(record.file_size, 4096);
        assert_eq!(record.nifti_path, "sub/scan.nii.gz");
        assert_eq!(record.png_path(), "sub/scan.png");
        assert_eq!(record.session, "");
        assert!(!record.is_excluded());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let record = normalize(json!({"PatientID": "abc-123"}), vec![256, 256, 176]).unwrap();

        assert_eq!(record.study_id, "");
        assert_eq!(record.patient_name, None);
        assert_eq!(record.subject, "abc123");
        assert_eq!(record.patient_sex, PatientSex::Unspecified);
        assert_eq!(record.acquisition_date, UNKNOWN_ACQUISITION_DATE);
        assert_eq!(record.acquisition_time, None);
        assert_eq!(record.echo_time, 0.0);
        assert_eq!(record.echo_number, None);
        assert_eq!(record.multiband_factor, None);
        assert_eq!(record.direction, PhaseEncodingDirection::Unknown);
        assert_eq!(record.volume_count, 1);
        assert!(record.image_type.is_empty());
    }

    #[test]
    fn test_subject_falls_back_to_birth_date() {
        let record = normalize(
            json!({"PatientName": "", "PatientBirthDate": "1990-05-06"}),
            vec![2, 2, 2],
        )
        .unwrap();
        assert_eq!(record.subject, "19900506");
    }

    #[test]
    fn test_missing_identity() {
        let result = normalize(json!({"SeriesDescription": "t1"}), vec![2, 2, 2]);
        assert!(matches!(result, Err(BidsortError::MissingIdentity { .. })));
    }

    #[test]
    fn test_unrecognized_sex() {
        let record = normalize(json!({"PatientID": "1", "PatientSex": "O"}), vec![2, 2, 2]).unwrap();
        assert_eq!(record.patient_sex, PatientSex::Unspecified);
    }

    #[test]
    fn test_resolve_subject_key() {
        let name = Some("^^".to_string());
        let id = Some("id_7".to_string());
        assert_eq!(
            resolve_subject_key([&name, &id, &None]).as_deref(),
            Some("id7")
        );
        assert_eq!(resolve_subject_key([&None, &None, &None]), None);
    }

    #[test]
    fn test_processing_order() {
        let mut a = normalize(json!({"PatientID": "A", "SeriesNumber": 2}), vec![2, 2, 2]).unwrap();
        let mut b = a.clone();
        b.series_number = 10;
        assert_eq!(a.processing_order(&b), Ordering::Less);

        a.acquisition_date = "2020-02-01".to_string();
        b.acquisition_date = "2020-01-01".to_string();
        assert_eq!(a.processing_order(&b), Ordering::Greater);
    }
}
