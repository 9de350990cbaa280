use serde_json::{Map, Value};

/// Parsed JSON sidecar
pub type Sidecar = Map<String, Value>;

// Identity Keys
pub const STUDY_ID: &str = "StudyID";
pub const PATIENT_NAME: &str = "PatientName";
pub const PATIENT_ID: &str = "PatientID";
pub const PATIENT_BIRTH_DATE: &str = "PatientBirthDate";
pub const PATIENT_SEX: &str = "PatientSex";

// Timing Keys
pub const ACQUISITION_DATE_TIME: &str = "AcquisitionDateTime";
pub const REPETITION_TIME: &str = "RepetitionTime";
pub const ECHO_TIME: &str = "EchoTime";
pub const ECHO_NUMBER: &str = "EchoNumber";
pub const INVERSION_TIME: &str = "InversionTime";

// Descriptive Keys
pub const SERIES_DESCRIPTION: &str = "SeriesDescription";
pub const PROTOCOL_NAME: &str = "ProtocolName";
pub const IMAGE_TYPE: &str = "ImageType";
pub const SERIES_NUMBER: &str = "SeriesNumber";
pub const MULTIBAND_ACCELERATION_FACTOR: &str = "MultibandAccelerationFactor";
pub const PHASE_ENCODING_DIRECTION: &str = "PhaseEncodingDirection";

/// Keys carrying patient or study identity
pub const IDENTIFYING_FIELDS: &[&str] = &[
    "SeriesInstanceUID",
    "StudyInstanceUID",
    "ReferringPhysicianName",
    STUDY_ID,
    PATIENT_NAME,
    PATIENT_ID,
    "AccessionNumber",
    PATIENT_BIRTH_DATE,
    PATIENT_SEX,
    "PatientWeight",
];

/// Helper to get string value from a sidecar key
///
/// Numbers are rendered as strings. Returns `None` for missing, null or
/// non-scalar values.
pub fn get_string_value(sidecar: &Sidecar, key: &str) -> Option<String> {
    match sidecar.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Helper to get float value from a sidecar key
///
/// Numeric strings are accepted.
pub fn get_f64_value(sidecar: &Sidecar, key: &str) -> Option<f64> {
    match sidecar.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Helper to get integer value from a sidecar key
///
/// Whole-valued floats are accepted.
pub fn get_int_value(sidecar: &Sidecar, key: &str) -> Option<i64> {
    match sidecar.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Helper to get multi-string value from a sidecar key
///
/// A single string is split on backslashes, as DICOM multi-values are.
pub fn get_multi_string_value(sidecar: &Sidecar, key: &str) -> Option<Vec<String>> {
    match sidecar.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(s) => Some(s.split('\\').map(|part| part.trim().to_string()).collect()),
        _ => None,
    }
}

/// Removes identity-bearing keys from a sidecar
pub fn scrub_identifiers(sidecar: &mut Sidecar) {
    for key in IDENTIFYING_FIELDS {
        sidecar.remove(*key);
    }
}
