use crate::extraction::{scrub_identifiers, Sidecar};
use serde::Serialize;

/// One file of an acquisition object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectItem {
    pub path: String,
    /// `bval`, `bvec`, `json` or `nii.gz`
    pub name: &'static str,
    /// Scrubbed sidecar, on the `json` item only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<Sidecar>,
    /// Image header summary, on the `nii.gz` item only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
}

impl ObjectItem {
    fn plain(path: &str, name: &'static str) -> Self {
        Self {
            path: path.to_string(),
            name,
            sidecar: None,
            headers: None,
        }
    }
}

/// Builds the item list for an acquisition's files
///
/// # Arguments
///
/// * `paths` - Sorted file paths of the acquisition
/// * `sidecar` - Raw sidecar; identifying fields are removed before it is attached
/// * `headers` - Header summary attached to the image item
///
/// # Returns
///
/// One item per recognized file, in path order. Unrecognized files are skipped.
pub fn build_items(paths: &[String], sidecar: &Sidecar, headers: &[String]) -> Vec<ObjectItem> {
    paths
        .iter()
        .filter_map(|path| {
            if path.contains(".bval") {
                Some(ObjectItem::plain(path, "bval"))
            } else if path.contains(".bvec") {
                Some(ObjectItem::plain(path, "bvec"))
            } else if path.contains(".json") {
                let mut scrubbed = sidecar.clone();
                scrub_identifiers(&mut scrubbed);
                Some(ObjectItem {
                    sidecar: Some(scrubbed),
                    ..ObjectItem::plain(path, "json")
                })
            } else if path.contains(".nii.gz") {
                Some(ObjectItem {
                    headers: Some(headers.to_vec()),
                    ..ObjectItem::plain(path, "nii.gz")
                })
            } else {
                None
            }
        })
        .collect()
}
