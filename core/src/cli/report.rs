use crate::api::Analysis;
use std::fmt;

/// Text report formatter for an analysis run
pub struct TextReport<'a> {
    analysis: &'a Analysis,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(analysis: &'a Analysis) -> Self {
        Self { analysis }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.analysis.catalog();

        writeln!(f, "Subjects")?;
        writeln!(f, "========")?;
        for subject in &catalog.subjects {
            writeln!(
                f,
                "{:<20} sex: {:<4} sessions: {}",
                subject.subject,
                subject.phenotype.sex.simple_name(),
                subject.sessions.len()
            )?;
            for session in &subject.sessions {
                let label = if session.session.is_empty() {
                    "-"
                } else {
                    session.session.as_str()
                };
                writeln!(f, "    ses {:<4} {}", label, session.acquisition_date)?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Series")?;
        writeln!(f, "======")?;
        for series in &catalog.series {
            writeln!(
                f,
                "{:>3}  sn-{:<4} {:<32} {:<18} objects: {}",
                series.series_id,
                series.series_number,
                series.series_description,
                series.series_type,
                series.object_indices.len()
            )?;
            if !series.for_type.is_empty() {
                writeln!(f, "       for: {}", series.for_type)?;
            }
            if let Some(error) = &series.error {
                writeln!(f, "       {}", error)?;
            }
        }

        if !catalog.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped")?;
            writeln!(f, "=======")?;
            for skipped in &catalog.skipped {
                writeln!(f, "{}: {}", skipped.path, skipped.reason)?;
            }
        }

        writeln!(f)?;
        let excluded = catalog.objects.iter().filter(|o| o.exclude).count();
        writeln!(
            f,
            "{} objects, {} excluded, {} previews pending",
            catalog.objects.len(),
            excluded,
            self.analysis.preview_requests().len()
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnalysisContext, Analyzer};
    use crate::source::{InMemorySource, NiftiDatatype, VolumeInfo};
    use serde_json::json;

    #[test]
    fn test_text_report_format() {
        let source = InMemorySource::new()
            .with_sidecar(
                "se_AP.json",
                json!({
                    "PatientName": "Test^Subject",
                    "PatientSex": "M",
                    "AcquisitionDateTime": "2023-04-05T11:00:00",
                    "SeriesDescription": "SpinEchoFieldMap_AP",
                    "SeriesNumber": 3,
                }),
            )
            .with_volume(
                "se_AP.nii.gz",
                VolumeInfo::new(vec![64, 64, 36, 3], NiftiDatatype::Int16, 10),
            )
            .with_sidecar("lost.json", json!({"SeriesDescription": "t1w"}))
            .with_volume(
                "lost.nii.gz",
                VolumeInfo::new(vec![2, 2, 2], NiftiDatatype::Int16, 1),
            );
        let listing = ["se_AP.json", "se_AP.nii.gz", "lost.json", "lost.nii.gz"];
        let analysis = Analyzer::run(&listing, &source, &AnalysisContext::new(".")).unwrap();

        let output = format!("{}", TextReport::new(&analysis));

        assert!(output.contains("TestSubject"));
        assert!(output.contains("sex: M"));
        assert!(output.contains("ses -    2023-04-05"));
        assert!(output.contains("fmap/epi"));
        assert!(output.contains("for: func/bold"));
        assert!(output.contains("lost.json"));
        assert!(output.contains("1 objects, 0 excluded, 1 previews pending"));
    }
}
