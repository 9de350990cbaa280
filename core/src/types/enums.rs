use serde::Serialize;
use std::fmt;

/// BIDS datatype directory an acquisition is sorted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Anat,
    Func,
    Dwi,
    Fmap,
    Asl,
}

impl Datatype {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            Datatype::Anat => "anat",
            Datatype::Func => "func",
            Datatype::Dwi => "dwi",
            Datatype::Fmap => "fmap",
            Datatype::Asl => "asl",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Modality (suffix) label within a datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModalityLabel {
    #[serde(rename = "T1w")]
    T1w,
    #[serde(rename = "T2w")]
    T2w,
    #[serde(rename = "FLAIR")]
    Flair,
    #[serde(rename = "MP2RAGE")]
    Mp2rage,
    #[serde(rename = "UNIT1")]
    Unit1,
    #[serde(rename = "angio")]
    Angio,
    #[serde(rename = "bold")]
    Bold,
    #[serde(rename = "phase")]
    Phase,
    #[serde(rename = "sbref")]
    Sbref,
    #[serde(rename = "dwi")]
    Dwi,
    #[serde(rename = "epi")]
    Epi,
    #[serde(rename = "magnitude1")]
    Magnitude1,
    #[serde(rename = "magnitude2")]
    Magnitude2,
    #[serde(rename = "phase1")]
    Phase1,
    #[serde(rename = "phase2")]
    Phase2,
    #[serde(rename = "phasediff")]
    Phasediff,
    #[serde(rename = "asl")]
    Asl,
}

impl ModalityLabel {
    /// Returns the label exactly as it appears in BIDS file names
    pub fn simple_name(&self) -> &'static str {
        match self {
            ModalityLabel::T1w => "T1w",
            ModalityLabel::T2w => "T2w",
            ModalityLabel::Flair => "FLAIR",
            ModalityLabel::Mp2rage => "MP2RAGE",
            ModalityLabel::Unit1 => "UNIT1",
            ModalityLabel::Angio => "angio",
            ModalityLabel::Bold => "bold",
            ModalityLabel::Phase => "phase",
            ModalityLabel::Sbref => "sbref",
            ModalityLabel::Dwi => "dwi",
            ModalityLabel::Epi => "epi",
            ModalityLabel::Magnitude1 => "magnitude1",
            ModalityLabel::Magnitude2 => "magnitude2",
            ModalityLabel::Phase1 => "phase1",
            ModalityLabel::Phase2 => "phase2",
            ModalityLabel::Phasediff => "phasediff",
            ModalityLabel::Asl => "asl",
        }
    }
}

impl fmt::Display for ModalityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Phase-encoding direction derived from the `PhaseEncodingDirection` token
///
/// The token-to-direction table is incomplete across vendors, so `Unknown`
/// means "could not tell", not "no direction".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhaseEncodingDirection {
    Ap,
    Pa,
    Rl,
    Lr,
    #[default]
    Unknown,
}

impl PhaseEncodingDirection {
    /// Maps a raw axis+sign token (`j-`, `j`, `i`, `i-`) to a direction
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "j-" => PhaseEncodingDirection::Ap,
            "j" => PhaseEncodingDirection::Pa,
            "i" => PhaseEncodingDirection::Rl,
            "i-" => PhaseEncodingDirection::Lr,
            _ => PhaseEncodingDirection::Unknown,
        }
    }

    /// Returns whether the direction could not be determined
    pub fn is_unknown(&self) -> bool {
        matches!(self, PhaseEncodingDirection::Unknown)
    }

    /// Returns the `dir-` entity value, empty when unknown
    pub fn simple_name(&self) -> &'static str {
        match self {
            PhaseEncodingDirection::Ap => "AP",
            PhaseEncodingDirection::Pa => "PA",
            PhaseEncodingDirection::Rl => "RL",
            PhaseEncodingDirection::Lr => "LR",
            PhaseEncodingDirection::Unknown => "",
        }
    }
}

impl fmt::Display for PhaseEncodingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

impl Serialize for PhaseEncodingDirection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.simple_name())
    }
}

/// Patient sex as reported to the participants table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PatientSex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "N/A")]
    Unspecified,
}

impl PatientSex {
    /// Parses the `PatientSex` field; anything but exactly `M` or `F` is unspecified
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "M" => PatientSex::Male,
            "F" => PatientSex::Female,
            _ => PatientSex::Unspecified,
        }
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            PatientSex::Male => "M",
            PatientSex::Female => "F",
            PatientSex::Unspecified => "N/A",
        }
    }
}

impl fmt::Display for PatientSex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Why a series or record will not be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Localizer or scout scan
    Localizer,
    /// Recognized, but intentionally not converted (ASL, angio, TRACE/FA/ADC, real/imaginary fmaps)
    UnsupportedAcquisitionType,
    /// Metadata insufficient to pick a label
    AmbiguousClassification,
    /// Functional series with too few volumes
    LikelyAcquisitionFailure,
    /// Anatomical without DERIVED/NORM image type
    NonNormalized,
    /// Pixel array is not an integer type
    CorruptData,
}

impl ExclusionReason {
    /// Returns whether this is the localizer flavour of exclusion
    pub fn is_localizer(&self) -> bool {
        matches!(self, ExclusionReason::Localizer)
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            ExclusionReason::Localizer => "localizer",
            ExclusionReason::UnsupportedAcquisitionType => "unsupported",
            ExclusionReason::AmbiguousClassification => "ambiguous",
            ExclusionReason::LikelyAcquisitionFailure => "likely failure",
            ExclusionReason::NonNormalized => "non-normalized",
            ExclusionReason::CorruptData => "corrupt data",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}
