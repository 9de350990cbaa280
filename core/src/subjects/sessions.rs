use crate::extraction::AcquisitionRecord;
use crate::types::PatientSex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Aggregated identity for one subject key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectInfo {
    pub subject: String,
    #[serde(rename = "PatientID")]
    pub patient_id: Option<String>,
    #[serde(rename = "PatientName")]
    pub patient_name: Option<String>,
    #[serde(rename = "PatientBirthDate")]
    pub patient_birth_date: Option<String>,
    pub phenotype: Phenotype,
    pub exclude: bool,
    pub sessions: Vec<SessionEntry>,
    #[serde(rename = "validationErrors")]
    pub validation_errors: Vec<String>,
}

/// Participant phenotype columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phenotype {
    pub sex: PatientSex,
    pub age: String,
}

/// One acquisition date of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    #[serde(rename = "AcquisitionDate")]
    pub acquisition_date: String,
    pub session: String,
    pub exclude: bool,
}

/// (subject, acquisition date) → session ordinal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAssignment {
    pub subject: String,
    pub acquisition_date: String,
    pub session: String,
}

/// Resolves subjects and sessions, writing the session label onto every record
///
/// Dates sort lexically, which is chronological for `YYYY-MM-DD` dates.
/// Returns subjects sorted by key and assignments sorted by (subject, date).
/// Identity fields of a subject come from its first record in processing order.
pub fn resolve_sessions(
    records: &mut [AcquisitionRecord],
) -> (Vec<SubjectInfo>, Vec<SessionAssignment>) {
    let mut dates: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for record in records.iter() {
        dates
            .entry(record.subject.as_str())
            .or_default()
            .insert(record.acquisition_date.as_str());
    }

    let mut assignments = Vec::new();
    for (subject, subject_dates) in &dates {
        let multi_session = subject_dates.len() > 1;
        for (ordinal, date) in subject_dates.iter().enumerate() {
            assignments.push(SessionAssignment {
                subject: subject.to_string(),
                acquisition_date: date.to_string(),
                session: if multi_session {
                    (ordinal + 1).to_string()
                } else {
                    String::new()
                },
            });
        }
    }

    let mut subjects: Vec<SubjectInfo> = Vec::new();
    for subject in dates.keys() {
        let first = records
            .iter()
            .filter(|r| r.subject == *subject)
            .min_by(|a, b| a.processing_order(b));
        let Some(first) = first else { continue };

        subjects.push(SubjectInfo {
            subject: subject.to_string(),
            patient_id: first.patient_id.clone(),
            patient_name: first.patient_name.clone(),
            patient_birth_date: first.patient_birth_date.clone(),
            phenotype: Phenotype {
                sex: first.patient_sex,
                age: first.patient_age.clone(),
            },
            exclude: false,
            sessions: assignments
                .iter()
                .filter(|a| a.subject == *subject)
                .map(|a| SessionEntry {
                    acquisition_date: a.acquisition_date.clone(),
                    session: a.session.clone(),
                    exclude: false,
                })
                .collect(),
            validation_errors: Vec::new(),
        });
    }

    for record in records.iter_mut() {
        if let Some(assignment) = assignments.iter().find(|a| {
            a.subject == record.subject && a.acquisition_date == record.acquisition_date
        }) {
            record.session = assignment.session.clone();
        }
    }

    (subjects, assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::group_listing;
    use crate::source::{InMemorySource, NiftiDatatype, VolumeInfo};
    use serde_json::json;

    fn make_record(subject: &str, date: &str, series_number: i64) -> AcquisitionRecord {
        let json_path = format!("{}_{}_{}.json", subject, date, series_number);
        let nifti_path = json_path.replace(".json", ".nii.gz");
        let files = group_listing(&[json_path.as_str(), nifti_path.as_str()]).remove(0);
        let source = InMemorySource::new().with_volume(
            &nifti_path,
            VolumeInfo::new(vec![2, 2, 2], NiftiDatatype::Int16, 1),
        );
        let sidecar = json!({
            "PatientName": subject,
            "PatientSex": "M",
            "AcquisitionDateTime": format!("{}T09:00:00", date),
            "SeriesNumber": series_number
        });
        AcquisitionRecord::from_sidecar(&files, sidecar.as_object().cloned().unwrap(), &source)
            .unwrap()
    }

    #[test]
    fn test_sessions_are_chronological() {
        let mut records = vec![
            make_record("S", "2020-02-01", 1),
            make_record("S", "2020-01-01", 1),
            make_record("S", "2020-02-01", 2),
        ];
        let (subjects, assignments) = resolve_sessions(&mut records);

        assert_eq!(subjects.len(), 1);
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].acquisition_date, "2020-01-01");
        assert_eq!(assignments[0].session, "1");
        assert_eq!(assignments[1].session, "2");

        assert_eq!(records[0].session, "2");
        assert_eq!(records[1].session, "1");
        assert_eq!(records[2].session, "2");
    }

    #[test]
    fn test_stable_under_reordering() {
        let mut forward = vec![
            make_record("S", "2020-01-01", 1),
            make_record("S", "2020-02-01", 1),
        ];
        let mut backward: Vec<_> = forward.iter().rev().cloned().collect();

        let (subjects_fwd, assignments_fwd) = resolve_sessions(&mut forward);
        let (subjects_bwd, assignments_bwd) = resolve_sessions(&mut backward);

        assert_eq!(subjects_fwd, subjects_bwd);
        assert_eq!(assignments_fwd, assignments_bwd);
    }

    #[test]
    fn test_single_date_has_empty_session() {
        let mut records = vec![
            make_record("A", "2021-03-03", 1),
            make_record("A", "2021-03-03", 2),
            make_record("B", "2021-03-04", 1),
        ];
        let (subjects, assignments) = resolve_sessions(&mut records);

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].subject, "A");
        assert_eq!(subjects[1].subject, "B");
        assert!(assignments.iter().all(|a| a.session.is_empty()));
        assert!(records.iter().all(|r| r.session.is_empty()));
        assert_eq!(subjects[0].sessions.len(), 1);
        assert_eq!(subjects[0].phenotype.sex, PatientSex::Male);
        assert!(subjects[0].validation_errors.is_empty());
    }

    #[test]
    fn test_subject_serialization_keys() {
        let mut records = vec![make_record("A", "2021-03-03", 1)];
        let (subjects, _) = resolve_sessions(&mut records);
        let value = serde_json::to_value(&subjects[0]).unwrap();

        assert_eq!(value["PatientName"], "A");
        assert_eq!(value["phenotype"]["sex"], "M");
        assert_eq!(value["phenotype"]["age"], "N/A");
        assert_eq!(value["sessions"][0]["AcquisitionDate"], "2021-03-03");
        assert!(value["validationErrors"].as_array().unwrap().is_empty());
    }
}
