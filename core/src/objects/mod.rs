//! Object linkage and sectioning
//!
//! Every acquisition becomes an object carrying its series id, section id,
//! file items (with the identity-scrubbed sidecar) and preview request.

mod items;
mod linkage;

pub use items::{build_items, ObjectItem};
pub use linkage::{assign_sections, link_objects, AcquisitionObject, AnalysisResults};
