pub mod entities;
pub mod listing;
pub mod record;
pub mod sidecar;

pub use entities::{extract_entities, is_localizer_hint, normalize_description};
pub use listing::{group_listing, AcquisitionFiles};
pub use record::{AcquisitionRecord, UNKNOWN_ACQUISITION_DATE};
pub use sidecar::*;
