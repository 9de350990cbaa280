use super::{Datatype, ModalityLabel};
use serde::Serialize;
use std::fmt;

/// Datatype and modality pair, e.g. `func/bold` or `fmap/epi`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BidsLabel {
    pub datatype: Datatype,
    pub modality: ModalityLabel,
}

impl BidsLabel {
    /// Creates a new BidsLabel
    pub fn new(datatype: Datatype, modality: ModalityLabel) -> Self {
        Self { datatype, modality }
    }

    /// Checks if this is an anatomical label
    pub fn is_anat(&self) -> bool {
        self.datatype == Datatype::Anat
    }
}

impl fmt::Display for BidsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.datatype.simple_name(),
            self.modality.simple_name()
        )
    }
}

impl Serialize for BidsLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Field maps default to correcting BOLD runs
pub const FUNC_BOLD: BidsLabel = BidsLabel {
    datatype: Datatype::Func,
    modality: ModalityLabel::Bold,
};

/// Target of a b0 field map acquired with diffusion gradients
pub const DWI_DWI: BidsLabel = BidsLabel {
    datatype: Datatype::Dwi,
    modality: ModalityLabel::Dwi,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(FUNC_BOLD.to_string(), "func/bold");
        assert_eq!(DWI_DWI.to_string(), "dwi/dwi");
        assert_eq!(
            BidsLabel::new(Datatype::Fmap, ModalityLabel::Magnitude1).to_string(),
            "fmap/magnitude1"
        );
    }

    #[test]
    fn test_is_anat() {
        assert!(BidsLabel::new(Datatype::Anat, ModalityLabel::T1w).is_anat());
        assert!(!FUNC_BOLD.is_anat());
    }

    #[test]
    fn test_serializes_as_string() {
        assert_eq!(serde_json::to_string(&FUNC_BOLD).unwrap(), "\"func/bold\"");
    }
}
