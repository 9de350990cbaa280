pub mod api;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod extraction;
pub mod objects;
pub mod series;
pub mod source;
pub mod subjects;
pub mod types;

pub use api::{load_listing, Analysis, AnalysisContext, Analyzer, PreviewRequest};
pub use catalog::{Catalog, SeriesEntry, SkippedAcquisition};
pub use cli::report::TextReport;
pub use error::{BidsortError, Result};
pub use extraction::{AcquisitionFiles, AcquisitionRecord};
pub use objects::{AcquisitionObject, ObjectItem};
pub use series::{CanonicalSeries, Classification};
pub use source::{DataSource, FsDataSource, InMemorySource, NiftiDatatype, VolumeInfo};
pub use subjects::{SessionAssignment, SubjectInfo};
pub use types::*;
