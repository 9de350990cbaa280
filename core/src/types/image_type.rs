use serde::Serialize;
use std::fmt;

/// `ImageType` tag list from an acquisition sidecar
///
/// Typical values: `["ORIGINAL", "PRIMARY", "M", "ND", "NORM"]`,
/// `["DERIVED", "PRIMARY", "DIFFUSION", "TRACEW"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ImageType {
    pub values: Vec<String>,
}

impl ImageType {
    /// Creates a new ImageType
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Returns a simple string representation
    ///
    /// Format: "value1|value2|..."
    pub fn simple_repr(&self) -> String {
        self.values.join("|")
    }

    /// Checks if the image type contains a specific value
    pub fn contains(&self, val: &str) -> bool {
        self.values.iter().any(|x| x == val)
    }

    /// Checks if the image type contains any of the given values
    pub fn contains_any(&self, vals: &[&str]) -> bool {
        vals.iter().any(|v| self.contains(v))
    }

    /// Returns true for derived or intensity-normalized images
    pub fn is_normalized(&self) -> bool {
        self.contains_any(&["DERIVED", "NORM"])
    }

    /// Returns true for a Siemens mosaic phase image
    pub fn is_mosaic_phase(&self) -> bool {
        self.contains("MOSAIC") && self.contains("PHASE")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_repr())
    }
}

impl<S: Into<String>> FromIterator<S> for ImageType {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
