use crate::error::Result;
use crate::objects::AcquisitionObject;
use crate::series::CanonicalSeries;
use crate::subjects::SubjectInfo;
use crate::types::{Entities, ImageType};
use serde::Serialize;
use serde_json::{json, Value};

/// Structured output of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub subjects: Vec<SubjectInfo>,
    #[serde(rename = "participantsColumn")]
    pub participants_column: Value,
    pub series: Vec<SeriesEntry>,
    pub objects: Vec<AcquisitionObject>,
    /// Acquisitions left out before clustering
    pub skipped: Vec<SkippedAcquisition>,
}

impl Catalog {
    /// Serializes the catalog as pretty-printed JSON
    ///
    /// Output is byte-identical for identical input: sidecar and schema maps
    /// are ordered by key.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Series-level entry of the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesEntry {
    #[serde(rename = "SeriesDescription")]
    pub series_description: String,
    #[serde(rename = "SeriesNumber")]
    pub series_number: i64,
    pub series_id: usize,
    #[serde(rename = "EchoTime")]
    pub echo_time: f64,
    #[serde(rename = "ImageType")]
    pub image_type: ImageType,
    #[serde(rename = "MultibandAccelerationFactor")]
    pub multiband_factor: Option<f64>,
    pub entities: Entities,
    #[serde(rename = "type")]
    pub series_type: String,
    #[serde(rename = "forType")]
    pub for_type: String,
    pub error: Option<String>,
    pub message: String,
    pub object_indices: Vec<usize>,
}

impl From<&CanonicalSeries> for SeriesEntry {
    fn from(series: &CanonicalSeries) -> Self {
        let classification = &series.classification;
        Self {
            series_description: series.series_description.clone(),
            series_number: series.series_number,
            series_id: series.series_id,
            echo_time: series.echo_time,
            image_type: series.image_type.clone(),
            multiband_factor: series.multiband_factor,
            entities: classification.entities.clone(),
            series_type: series.type_label(),
            for_type: classification
                .for_type
                .map(|target| target.to_string())
                .unwrap_or_default(),
            error: classification.error.clone(),
            message: classification.message.clone(),
            object_indices: series.object_indices.clone(),
        }
    }
}

/// Acquisition that could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAcquisition {
    pub path: String,
    pub reason: String,
}

/// Fixed participant-column schema
pub fn participants_column() -> Value {
    json!({
        "sex": {
            "LongName": "gender",
            "Description": "generic gender field",
            "Levels": {
                "M": "male",
                "F": "female"
            }
        },
        "age": {
            "LongName": "age",
            "Units": "years"
        }
    })
}
