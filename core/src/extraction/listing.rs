use crate::error::{BidsortError, Result};

/// Files belonging to one acquisition: a sidecar plus its image and gradients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionFiles {
    pub json_path: String,
    /// Sorted sidecar, image and gradient paths
    pub paths: Vec<String>,
}

impl AcquisitionFiles {
    /// Path of the `.nii.gz` image
    ///
    /// # Errors
    ///
    /// Returns `MissingVolume` if no image shares the sidecar's stem
    pub fn nifti_path(&self) -> Result<&str> {
        self.paths
            .iter()
            .find(|p| p.ends_with(".nii.gz"))
            .map(String::as_str)
            .ok_or_else(|| BidsortError::MissingVolume {
                path: self.json_path.clone(),
            })
    }

    /// Path of the `.bval` file, if any
    pub fn bval_path(&self) -> Option<&str> {
        self.paths
            .iter()
            .find(|p| p.ends_with(".bval"))
            .map(String::as_str)
    }
}

/// Groups a flat listing into per-acquisition file sets
///
/// Vendor PAR/REC files and previously written catalogs are ignored. An image
/// or gradient file belongs to a sidecar when it starts with the sidecar path
/// minus its `json` extension (`sub/run1.` matches `sub/run1.nii.gz`).
pub fn group_listing<S: AsRef<str>>(listing: &[S]) -> Vec<AcquisitionFiles> {
    let paths: Vec<&str> = listing
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty() && !is_parrec(p))
        .collect();

    let data_files: Vec<&str> = paths
        .iter()
        .copied()
        .filter(|p| p.ends_with(".nii.gz") || p.ends_with(".bval") || p.ends_with(".bvec"))
        .collect();

    paths
        .iter()
        .copied()
        .filter(|p| p.ends_with(".json") && !p.contains("ezbids"))
        .map(|json_path| {
            let stem = &json_path[..json_path.len() - "json".len()];
            let mut group: Vec<String> = data_files
                .iter()
                .filter(|p| p.starts_with(stem))
                .map(|p| p.to_string())
                .collect();
            group.push(json_path.to_string());
            group.sort();
            group.dedup();

            AcquisitionFiles {
                json_path: json_path.to_string(),
                paths: group,
            }
        })
        .collect()
}

fn is_parrec(path: &str) -> bool {
    path.contains("PARREC") || path.contains("Parrec") || path.contains("parrec")
}
