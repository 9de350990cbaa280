use crate::catalog::{participants_column, Catalog, SeriesEntry, SkippedAcquisition};
use crate::error::Result;
use crate::extraction::{group_listing, AcquisitionRecord};
use crate::objects::link_objects;
use crate::series::{classify_all, deduplicate, CanonicalSeries};
use crate::source::{DataSource, FsDataSource};
use crate::subjects::resolve_sessions;
use crate::types::AnalyzerConfig;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the listing file looked up under the data root
pub const LIST_FILE: &str = "list";

/// Settings for one analysis run
///
/// Created once at startup and passed explicitly to [`Analyzer`]. Listing
/// paths are relative to `root`.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub root: PathBuf,
    /// Listing file; defaults to `<root>/list`, then to a directory walk
    pub list_file: Option<PathBuf>,
    pub config: AnalyzerConfig,
}

impl AnalysisContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            list_file: None,
            config: AnalyzerConfig::default(),
        }
    }

    /// Builder: Set the listing file
    pub fn list_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.list_file = Some(path.into());
        self
    }

    /// Builder: Set the analyzer configuration
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Classification and deduplication pipeline
///
/// # Example
///
/// ```
/// use bidsort_core::{AnalysisContext, Analyzer, InMemorySource, NiftiDatatype, VolumeInfo};
/// use serde_json::json;
///
/// let source = InMemorySource::new()
///     .with_sidecar(
///         "sub01/rest.json",
///         json!({
///             "PatientName": "Doe^Jane",
///             "AcquisitionDateTime": "2021-06-01T09:30:00",
///             "SeriesDescription": "task-rest_bold",
///             "SeriesNumber": 3,
///             "EchoTime": 0.03,
///             "ImageType": ["ORIGINAL", "PRIMARY", "M", "ND", "MOSAIC"],
///         }),
///     )
///     .with_volume(
///         "sub01/rest.nii.gz",
///         VolumeInfo::new(vec![64, 64, 36, 200], NiftiDatatype::Int16, 1 << 20),
///     );
///
/// let listing = ["sub01/rest.json", "sub01/rest.nii.gz"];
/// let context = AnalysisContext::new(".");
/// let analysis = Analyzer::run(&listing, &source, &context).unwrap();
///
/// assert_eq!(analysis.catalog().series[0].series_type, "func/bold");
/// assert_eq!(analysis.catalog().subjects[0].subject, "DoeJane");
/// ```
pub struct Analyzer;

impl Analyzer {
    /// Analyzes the data root described by `context`
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or any required file cannot be read.
    pub fn analyze(context: &AnalysisContext) -> Result<Analysis> {
        let listing = load_listing(&context.root, context.list_file.as_deref())?;
        let source = FsDataSource::new(&context.root);
        Self::run(&listing, &source, context)
    }

    /// Runs the pipeline over a file listing
    ///
    /// Stages: grouping, normalization, sorting into processing order,
    /// session resolution, deduplication, classification, object linkage.
    /// Acquisitions without identity or image are skipped and reported.
    ///
    /// # Errors
    ///
    /// Returns an error if a sidecar, image header or b-value file cannot be
    /// read or parsed.
    pub fn run<S: AsRef<str>>(
        listing: &[S],
        source: &dyn DataSource,
        context: &AnalysisContext,
    ) -> Result<Analysis> {
        let config = &context.config;
        let groups = group_listing(listing);
        info!("Found {} acquisitions in listing", groups.len());

        let mut records = Vec::with_capacity(groups.len());
        let mut skipped = Vec::new();
        for files in &groups {
            let sidecar = source.read_sidecar(&files.json_path)?;
            match AcquisitionRecord::from_sidecar(files, sidecar, source) {
                Ok(record) => records.push(record),
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {}: {}", files.json_path, e);
                    skipped.push(SkippedAcquisition {
                        path: files.json_path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        records.sort_by(|a, b| a.processing_order(b));

        let (subjects, assignments) = resolve_sessions(&mut records);
        info!(
            "Resolved {} subjects across {} sessions",
            subjects.len(),
            assignments.len()
        );

        let mut series = deduplicate(&mut records, config);
        info!(
            "Clustered {} acquisitions into {} series",
            records.len(),
            series.len()
        );

        classify_all(&records, &mut series, source, config)?;
        let objects = link_objects(&mut records, &mut series, &assignments, source, config)?;

        let catalog = Catalog {
            subjects,
            participants_column: participants_column(),
            series: series.iter().map(SeriesEntry::from).collect(),
            objects,
            skipped,
        };

        Ok(Analysis {
            records,
            series,
            catalog,
        })
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Records in processing order, with every pipeline output filled in
    pub records: Vec<AcquisitionRecord>,
    pub series: Vec<CanonicalSeries>,
    catalog: Catalog,
}

impl Analysis {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Pretty-printed catalog JSON
    pub fn to_json(&self) -> Result<String> {
        self.catalog.to_json()
    }

    /// Objects whose preview image still has to be rendered
    pub fn preview_requests(&self) -> Vec<PreviewRequest> {
        self.catalog
            .objects
            .iter()
            .filter(|object| object.needs_preview)
            .map(|object| PreviewRequest {
                nifti_path: object.nifti_path.clone(),
                png_path: object.png_path.clone(),
                volume_index: usize::from(object.analysis_results.num_volumes > 1),
            })
            .collect()
    }
}

/// Request for an external renderer to draw a preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub nifti_path: String,
    pub png_path: String,
    /// Volume to slice: the second one for 4-D images, else the only one
    pub volume_index: usize,
}

/// Reads the file listing for a data root
///
/// Uses `list_file` when given, else `<root>/list`; without either, walks
/// `root` recursively for sidecars, images and gradient files. Walked paths
/// are relative to `root` and sorted.
///
/// # Errors
///
/// Returns an error if the listing file or a directory cannot be read.
pub fn load_listing(root: &Path, list_file: Option<&Path>) -> Result<Vec<String>> {
    let default_list = root.join(LIST_FILE);
    let list_path = match list_file {
        Some(path) => Some(path.to_path_buf()),
        None if default_list.is_file() => Some(default_list),
        None => None,
    };

    if let Some(path) = list_path {
        info!("Reading listing from {}", path.display());
        let text = fs::read_to_string(&path)?;
        return Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect());
    }

    info!("No listing file, walking {}", root.display());
    let mut listing = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_listing_candidate(path) {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            listing.push(parts.join("/"));
        }
    }
    listing.sort();
    Ok(listing)
}

fn is_listing_candidate(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    [".json", ".nii.gz", ".bval", ".bvec"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BidsortError;
    use crate::source::{InMemorySource, NiftiDatatype, VolumeInfo};
    use crate::types::ExclusionReason;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct Acquisition {
        name: &'static str,
        patient: &'static str,
        date: &'static str,
        description: &'static str,
        series_number: i64,
        echo_time: f64,
        dims: Vec<usize>,
    }

    fn build(acquisitions: &[Acquisition]) -> (Vec<String>, InMemorySource) {
        let mut listing = Vec::new();
        let mut source = InMemorySource::new();
        for a in acquisitions {
            let json_path = format!("{}.json", a.name);
            let nifti_path = format!("{}.nii.gz", a.name);
            source = source
                .with_sidecar(
                    &json_path,
                    json!({
                        "PatientName": a.patient,
                        "PatientSex": "F",
                        "AcquisitionDateTime": format!("{}T10:00:00", a.date),
                        "SeriesDescription": a.description,
                        "SeriesNumber": a.series_number,
                        "EchoTime": a.echo_time,
                        "ImageType": ["ORIGINAL", "PRIMARY", "M", "ND", "NORM"],
                    }),
                )
                .with_volume(
                    &nifti_path,
                    VolumeInfo::new(a.dims.clone(), NiftiDatatype::Int16, 4096),
                );
            listing.push(json_path);
            listing.push(nifti_path);
        }
        (listing, source)
    }

    fn study() -> Vec<Acquisition> {
        vec![
            Acquisition {
                name: "s1/d2/localizer",
                patient: "Subject^One",
                date: "2020-02-02",
                description: "AAHead_Scout",
                series_number: 1,
                echo_time: 0.004,
                dims: vec![256, 256, 3],
            },
            Acquisition {
                name: "s1/d2/t1",
                patient: "Subject^One",
                date: "2020-02-02",
                description: "anat-T1w_acq-mprage",
                series_number: 2,
                echo_time: 0.0023,
                dims: vec![256, 256, 176],
            },
            Acquisition {
                name: "s1/d1/t1",
                patient: "Subject^One",
                date: "2020-01-01",
                description: "anat-T1w_acq-mprage",
                series_number: 2,
                echo_time: 0.0025,
                dims: vec![256, 256, 176],
            },
            Acquisition {
                name: "s1/d1/rest",
                patient: "Subject^One",
                date: "2020-01-01",
                description: "func_task-rest_run-01_bold",
                series_number: 5,
                echo_time: 0.03,
                dims: vec![64, 64, 36, 300],
            },
            Acquisition {
                name: "s2/d1/rest",
                patient: "Subject^Two",
                date: "2020-03-03",
                description: "func_task-rest_run-01_bold",
                series_number: 4,
                echo_time: 0.03,
                dims: vec![64, 64, 36, 20],
            },
        ]
    }

    #[test]
    fn test_full_pipeline() {
        let (listing, source) = build(&study());
        let analysis = Analyzer::run(&listing, &source, &AnalysisContext::new(".")).unwrap();
        let catalog = analysis.catalog();

        assert_eq!(catalog.subjects.len(), 2);
        let one = &catalog.subjects[0];
        assert_eq!(one.subject, "SubjectOne");
        assert_eq!(one.sessions.len(), 2);
        assert_eq!(one.sessions[0].acquisition_date, "2020-01-01");
        assert_eq!(one.sessions[0].session, "1");
        assert_eq!(catalog.subjects[1].sessions[0].session, "");

        // t1 jitter merges; bold from subject two shares the bold fingerprint
        let types: Vec<&str> = catalog.series.iter().map(|s| s.series_type.as_str()).collect();
        assert_eq!(types, vec!["anat/T1w", "func/bold", "exclude"]);
        assert_eq!(catalog.series[0].entities.acquisition.as_deref(), Some("mprage"));
        assert_eq!(catalog.series[1].entities.run.as_deref(), Some("1"));
        assert_eq!(catalog.objects.len(), 5);

        let total: usize = catalog.series.iter().map(|s| s.object_indices.len()).sum();
        assert_eq!(total, catalog.objects.len());
        for entry in &catalog.series {
            for &index in &entry.object_indices {
                assert_eq!(catalog.objects[index].series_id, entry.series_id);
            }
        }

        // subject two's short run shares the bold series and its classification
        let short_run = catalog
            .objects
            .iter()
            .find(|o| o.paths.iter().any(|p| p.starts_with("s2/")))
            .unwrap();
        assert_eq!(short_run.series_id, 1);
        assert_eq!(short_run.analysis_results.num_volumes, 20);
    }

    #[test]
    fn test_localizer_section_and_exclusion() {
        let (listing, source) = build(&study());
        let analysis = Analyzer::run(&listing, &source, &AnalysisContext::new(".")).unwrap();

        let localizer = analysis
            .records
            .iter()
            .find(|r| r.json_path == "s1/d2/localizer.json")
            .unwrap();
        assert_eq!(localizer.exclusion, Some(ExclusionReason::Localizer));
        assert_eq!(localizer.section_id, 1);
        assert_eq!(localizer.session, "2");
    }

    #[test]
    fn test_output_is_deterministic() {
        let (listing, source) = build(&study());
        let context = AnalysisContext::new(".");
        let first = Analyzer::run(&listing, &source, &context).unwrap().to_json().unwrap();

        let mut reversed = listing.clone();
        reversed.reverse();
        let second = Analyzer::run(&reversed, &source, &context).unwrap().to_json().unwrap();

        assert_eq!(first, second);
        let value: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["participantsColumn"]["sex"]["LongName"], "gender");
    }

    #[test]
    fn test_missing_identity_and_volume_are_skipped() {
        let (mut listing, source) = build(&study()[..1]);
        let source = source
            .with_sidecar("anon.json", json!({"SeriesDescription": "t1w"}))
            .with_volume(
                "anon.nii.gz",
                VolumeInfo::new(vec![2, 2, 2], NiftiDatatype::Int16, 1),
            )
            .with_sidecar("orphan.json", json!({"PatientID": "X"}));
        listing.extend(["anon.json", "anon.nii.gz", "orphan.json"].map(String::from));

        let analysis = Analyzer::run(&listing, &source, &AnalysisContext::new(".")).unwrap();
        let skipped: Vec<&str> = analysis
            .catalog()
            .skipped
            .iter()
            .map(|s| s.path.as_str())
            .collect();
        assert_eq!(skipped, vec!["anon.json", "orphan.json"]);
        assert_eq!(analysis.catalog().objects.len(), 1);
    }

    #[test]
    fn test_unreadable_sidecar_is_fatal() {
        let listing = ["missing.json", "missing.nii.gz"];
        let result = Analyzer::run(&listing, &InMemorySource::new(), &AnalysisContext::new("."));
        assert!(matches!(result, Err(BidsortError::Io(_))));
    }

    #[test]
    fn test_preview_requests() {
        let (listing, source) = build(&study());
        let source = source.with_file("s1/d1/t1.png");
        let analysis = Analyzer::run(&listing, &source, &AnalysisContext::new(".")).unwrap();
        let requests = analysis.preview_requests();

        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.png_path != "s1/d1/t1.png"));
        let rest = requests
            .iter()
            .find(|r| r.nifti_path == "s1/d1/rest.nii.gz")
            .unwrap();
        assert_eq!(rest.png_path, "s1/d1/rest.png");
        assert_eq!(rest.volume_index, 1);
    }

    #[test]
    fn test_load_listing_from_list_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(LIST_FILE),
            "a/scan.json\n\na/scan.nii.gz\n",
        )
        .unwrap();

        let listing = load_listing(temp_dir.path(), None).unwrap();
        assert_eq!(listing, vec!["a/scan.json", "a/scan.nii.gz"]);
    }

    #[test]
    fn test_load_listing_walks_root() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("sub01").join("ses1");
        fs::create_dir_all(&nested).unwrap();
        for name in ["b.json", "b.nii.gz", "b.bval", "b.bvec", "notes.txt"] {
            fs::write(nested.join(name), "").unwrap();
        }
        fs::write(temp_dir.path().join("a.json"), "{}").unwrap();

        let listing = load_listing(temp_dir.path(), None).unwrap();
        assert_eq!(
            listing,
            vec![
                "a.json",
                "sub01/ses1/b.bval",
                "sub01/ses1/b.bvec",
                "sub01/ses1/b.json",
                "sub01/ses1/b.nii.gz",
            ]
        );
    }

    #[test]
    fn test_explicit_list_file_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(load_listing(temp_dir.path(), Some(&missing)).is_err());
    }
}
