//! Series clustering and classification
//!
//! [`deduplicate`] clusters sorted acquisition records into canonical series;
//! [`classify_all`] labels each series from its representative record using
//! the ordered rule table in [`classify::RULES`].

pub mod classify;
mod dedup;

pub use classify::{classify_all, classify_series, Classification, Rule, SeriesContext, RULES};
pub use dedup::{deduplicate, Fingerprint};

use crate::extraction::AcquisitionRecord;
use crate::types::ImageType;

/// One cluster of acquisitions sharing a fingerprint
///
/// The representative is the first record of the cluster in processing order;
/// its classification applies to the whole cluster. Records are referenced by
/// index into the record list, never by ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    pub series_id: usize,
    /// Index of the representative record
    pub representative: usize,
    pub series_description: String,
    pub series_number: i64,
    pub echo_time: f64,
    pub image_type: ImageType,
    pub multiband_factor: Option<f64>,
    pub classification: Classification,
    /// Indices into the object list of every acquisition in this series
    pub object_indices: Vec<usize>,
}

impl CanonicalSeries {
    /// Opens a new series represented by `record`
    pub fn new(series_id: usize, representative: usize, record: &AcquisitionRecord) -> Self {
        Self {
            series_id,
            representative,
            series_description: record.series_description.clone(),
            series_number: record.series_number,
            echo_time: record.echo_time,
            image_type: record.image_type.clone(),
            multiband_factor: record.multiband_factor,
            classification: Classification::default(),
            object_indices: Vec::new(),
        }
    }

    /// Output type: `"<datatype>/<modality>"` or `"exclude"`
    pub fn type_label(&self) -> String {
        self.classification.type_label()
    }

    pub fn is_excluded(&self) -> bool {
        self.classification.is_excluded()
    }
}
