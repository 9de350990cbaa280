use super::items::{build_items, ObjectItem};
use crate::error::Result;
use crate::extraction::{is_localizer_hint, AcquisitionRecord};
use crate::series::{CanonicalSeries, Classification};
use crate::source::DataSource;
use crate::subjects::SessionAssignment;
use crate::types::{AnalyzerConfig, Entities, ExclusionReason};
use log::warn;
use serde::Serialize;

/// Per-acquisition entry of the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionObject {
    pub series_id: usize,
    #[serde(rename = "PatientName")]
    pub patient_name: Option<String>,
    #[serde(rename = "PatientID")]
    pub patient_id: Option<String>,
    #[serde(rename = "PatientBirthDate")]
    pub patient_birth_date: Option<String>,
    #[serde(rename = "AcquisitionDate")]
    pub acquisition_date: String,
    #[serde(rename = "SeriesNumber")]
    pub series_number: i64,
    #[serde(rename = "pngPath")]
    pub png_path: String,
    #[serde(rename = "needsPreview")]
    pub needs_preview: bool,
    pub exclude: bool,
    pub entities: Entities,
    pub items: Vec<ObjectItem>,
    #[serde(rename = "analysisResults")]
    pub analysis_results: AnalysisResults,
    pub paths: Vec<String>,
    /// Image the preview is rendered from
    #[serde(skip)]
    pub nifti_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResults {
    #[serde(rename = "NumVolumes")]
    pub num_volumes: usize,
    pub errors: Option<String>,
    pub filesize: u64,
    #[serde(rename = "section_ID")]
    pub section_id: usize,
}

/// Numbers sections within one subject/session
///
/// `indices` lists the session's records in processing order. The first
/// record opens section 1; a new section opens whenever a localizer follows a
/// non-localizer.
pub fn assign_sections(records: &mut [AcquisitionRecord], indices: &[usize]) {
    let mut section_id = 0;
    let mut previous_localizer = false;

    for (position, &index) in indices.iter().enumerate() {
        let record = &mut records[index];
        let localizer = is_localizer_hint(&record.normalized_description());
        if position == 0 || (localizer && !previous_localizer) {
            section_id += 1;
        }
        record.section_id = section_id;
        previous_localizer = localizer;
    }
}

/// Re-expands series classifications onto every acquisition
///
/// Walks sessions in assignment order, numbers their sections, and builds one
/// [`AcquisitionObject`] per record. Each series' `object_indices` is filled
/// with the positions of its objects in the returned list.
///
/// # Errors
///
/// Returns an error if an image header cannot be read.
pub fn link_objects(
    records: &mut [AcquisitionRecord],
    series: &mut [CanonicalSeries],
    assignments: &[SessionAssignment],
    source: &dyn DataSource,
    config: &AnalyzerConfig,
) -> Result<Vec<AcquisitionObject>> {
    let mut objects = Vec::with_capacity(records.len());

    for assignment in assignments {
        let session: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.subject == assignment.subject && r.acquisition_date == assignment.acquisition_date
            })
            .map(|(i, _)| i)
            .collect();

        assign_sections(records, &session);

        for index in session {
            let series_id = records[index].series_id;
            let object = link_record(
                &mut records[index],
                &series[series_id].classification,
                source,
                config,
            )?;
            series[series_id].object_indices.push(objects.len());
            objects.push(object);
        }
    }

    Ok(objects)
}

fn link_record(
    record: &mut AcquisitionRecord,
    classification: &Classification,
    source: &dyn DataSource,
    config: &AnalyzerConfig,
) -> Result<AcquisitionObject> {
    record.exclusion = classification.exclusion;
    record.error = classification.error.clone();
    record.message = classification.message.clone();

    let volume = source.inspect_volume(&record.nifti_path)?;
    let png_path = record.png_path();
    let needs_preview = if volume.datatype.is_integer() {
        !source.exists(&png_path)
    } else {
        record.exclude(
            ExclusionReason::CorruptData,
            format!(
                "The data array for this acquisition is improper (corrupt/non-integer pixel data, {}); it will not be converted",
                volume.datatype
            ),
        );
        false
    };

    if let Some(error) = record.error.as_deref().filter(|_| record.is_excluded()) {
        warn!(
            "{} (sn-{}) not recommended for conversion: {}",
            record.series_description, record.series_number, error
        );
    }

    let entities = if config.propagate_entities {
        classification.entities.clone()
    } else {
        Entities::default()
    };

    Ok(AcquisitionObject {
        series_id: record.series_id,
        patient_name: record.patient_name.clone(),
        patient_id: record.patient_id.clone(),
        patient_birth_date: record.patient_birth_date.clone(),
        acquisition_date: record.acquisition_date.clone(),
        series_number: record.series_number,
        png_path,
        needs_preview,
        exclude: record.is_excluded(),
        entities,
        items: build_items(&record.paths, &record.sidecar, &volume.header_lines()),
        analysis_results: AnalysisResults {
            num_volumes: record.volume_count,
            errors: record.error.clone(),
            filesize: record.file_size,
            section_id: record.section_id,
        },
        paths: record.paths.clone(),
        nifti_path: record.nifti_path.clone(),
    })
}
