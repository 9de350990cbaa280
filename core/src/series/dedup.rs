use super::CanonicalSeries;
use crate::extraction::AcquisitionRecord;
use crate::types::{AnalyzerConfig, ImageType};
use log::debug;

/// Identity of an acquisition protocol
///
/// Two records with equal fingerprints belong to the same series. Records that
/// differ only in echo time may still merge when the echo times are close.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub echo_time: f64,
    pub series_description: String,
    pub image_type: ImageType,
    pub multiband_factor: Option<f64>,
}

impl Fingerprint {
    pub fn of(record: &AcquisitionRecord) -> Self {
        Self {
            echo_time: record.echo_time,
            series_description: record.series_description.clone(),
            image_type: record.image_type.clone(),
            multiband_factor: record.multiband_factor,
        }
    }

    /// Equality on everything but echo time
    pub fn same_protocol(&self, other: &Fingerprint) -> bool {
        self.series_description == other.series_description
            && self.image_type == other.image_type
            && self.multiband_factor == other.multiband_factor
    }

    fn same_protocol_as_series(&self, series: &CanonicalSeries) -> bool {
        self.series_description == series.series_description
            && self.image_type == series.image_type
            && self.multiband_factor == series.multiband_factor
    }
}

/// Clusters records into canonical series and stamps a series id on each
///
/// Records must already be in processing order; the first record seen for a
/// fingerprint wins. For each record:
///
/// 1. An exact fingerprint match reuses that series id
/// 2. Otherwise, if the first series opened for the same protocol has an echo
///    time within the tolerance window (inclusive), that series absorbs the
///    record
/// 3. Otherwise the record opens a new series and becomes its representative
pub fn deduplicate(records: &mut [AcquisitionRecord], config: &AnalyzerConfig) -> Vec<CanonicalSeries> {
    let tolerance = config.echo_time_tolerance_ms;
    let mut seen: Vec<(Fingerprint, usize)> = Vec::new();
    let mut series: Vec<CanonicalSeries> = Vec::new();

    for (index, record) in records.iter_mut().enumerate() {
        let fingerprint = Fingerprint::of(record);

        let exact = seen
            .iter()
            .find(|(known, _)| *known == fingerprint)
            .map(|(_, id)| *id);

        let assigned = exact.or_else(|| {
            series
                .iter()
                .find(|s| fingerprint.same_protocol_as_series(s))
                .filter(|anchor| (fingerprint.echo_time - anchor.echo_time).abs() <= tolerance)
                .map(|anchor| anchor.series_id)
        });

        match assigned {
            Some(series_id) => {
                debug!(
                    "{} joins series {} (echo time {:.3} ms)",
                    record.json_path, series_id, record.echo_time
                );
                record.series_id = series_id;
            }
            None => {
                let series_id = series.len();
                debug!(
                    "{} opens series {} ({})",
                    record.json_path, series_id, record.series_description
                );
                record.series_id = series_id;
                series.push(CanonicalSeries::new(series_id, index, record));
            }
        }

        seen.push((fingerprint, record.series_id));
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::group_listing;
    use crate::source::{InMemorySource, NiftiDatatype, VolumeInfo};
    use serde_json::json;

    fn make_record(name: &str, description: &str, echo_time_s: f64) -> AcquisitionRecord {
        let json_path = format!("{}.json", name);
        let nifti_path = format!("{}.nii.gz", name);
        let files = group_listing(&[json_path.as_str(), nifti_path.as_str()]).remove(0);
        let source = InMemorySource::new().with_volume(
            &nifti_path,
            VolumeInfo::new(vec![2, 2, 2], NiftiDatatype::Int16, 1),
        );
        let sidecar = json!({
            "PatientID": "S01",
            "SeriesDescription": description,
            "EchoTime": echo_time_s,
            "ImageType": ["ORIGINAL", "PRIMARY", "M", "ND"],
        });
        AcquisitionRecord::from_sidecar(&files, sidecar.as_object().cloned().unwrap(), &source)
            .unwrap()
    }

    #[test]
    fn test_first_record_opens_series_zero() {
        let mut records = vec![make_record("a", "t1w", 0.003)];
        let series = deduplicate(&mut records, &AnalyzerConfig::default());

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].series_id, 0);
        assert_eq!(series[0].representative, 0);
        assert_eq!(records[0].series_id, 0);
    }

    #[test]
    fn test_exact_repeat_reuses_id() {
        let mut records = vec![
            make_record("a", "bold", 0.03),
            make_record("b", "t1w", 0.003),
            make_record("c", "bold", 0.03),
        ];
        let series = deduplicate(&mut records, &AnalyzerConfig::default());

        assert_eq!(series.len(), 2);
        assert_eq!(records[2].series_id, records[0].series_id);
        assert_eq!(records[1].series_id, 1);
    }

    #[test]
    fn test_echo_jitter_merges() {
        let mut records = vec![
            make_record("a", "bold", 0.0300),
            make_record("b", "bold", 0.0305),
            make_record("c", "bold", 0.0310),
        ];
        let series = deduplicate(&mut records, &AnalyzerConfig::default());

        assert_eq!(series.len(), 1);
        assert!(records.iter().all(|r| r.series_id == 0));
    }

    #[test]
    fn test_distinct_echo_opens_new_series() {
        let mut records = vec![
            make_record("e1", "multiecho", 0.0142),
            make_record("e2", "multiecho", 0.0389),
            make_record("e3", "multiecho", 0.0636),
            make_record("e1b", "multiecho", 0.0145),
            make_record("e2b", "multiecho", 0.0389),
        ];
        let series = deduplicate(&mut records, &AnalyzerConfig::default());

        // e1b merges into the protocol's first echo, e2b is an exact repeat of e2
        assert_eq!(series.len(), 3);
        let ids: Vec<usize> = records.iter().map(|r| r.series_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_tolerance_measured_from_first_echo_of_protocol() {
        let mut records = vec![
            make_record("me1", "me", 0.0142),
            make_record("me2", "me", 0.0389),
            make_record("me2b", "me", 0.0391),
        ];
        let series = deduplicate(&mut records, &AnalyzerConfig::default());

        let ids: Vec<usize> = records.iter().map(|r| r.series_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(series.len(), 3);
        assert_eq!(series[2].representative, 2);
    }

    #[test]
    fn test_tolerance_is_configurable() {
        let mut records = vec![
            make_record("a", "bold", 0.0300),
            make_record("b", "bold", 0.0305),
        ];
        let config = AnalyzerConfig::default().echo_time_tolerance_ms(0.1);
        let series = deduplicate(&mut records, &config);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_distinct_fingerprints_get_distinct_ids() {
        let mut records = vec![
            make_record("a", "bold", 0.03),
            make_record("b", "BOLD", 0.03),
            make_record("c", "bold_sbref", 0.03),
        ];
        records[2].multiband_factor = Some(4.0);
        let mut changed_type = make_record("d", "bold", 0.03);
        changed_type.image_type = ["ORIGINAL", "PRIMARY", "P", "ND"].into_iter().collect();
        records.push(changed_type);

        let series = deduplicate(&mut records, &AnalyzerConfig::default());
        assert_eq!(series.len(), 4);
    }

    #[test]
    fn test_same_protocol() {
        let a = Fingerprint::of(&make_record("a", "bold", 0.03));
        let b = Fingerprint::of(&make_record("b", "bold", 0.05));
        let c = Fingerprint::of(&make_record("c", "rest", 0.03));
        assert!(a.same_protocol(&b));
        assert_ne!(a, b);
        assert!(!a.same_protocol(&c));
    }
}
