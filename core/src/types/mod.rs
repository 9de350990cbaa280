//! Core type definitions for acquisition metadata and BIDS labels
//!
//! This module provides the value types used throughout the bidsort library:
//! - [`Datatype`] and [`ModalityLabel`]: the two halves of a BIDS label
//! - [`BidsLabel`]: combined datatype/modality, e.g. `anat/T1w`
//! - [`Entities`]: naming entities (run, task, echo, direction, ...)
//! - [`ImageType`]: the `ImageType` tag list from a sidecar
//! - [`PhaseEncodingDirection`], [`PatientSex`]: normalized sidecar fields
//! - [`ExclusionReason`]: why a series or record will not be converted
//! - [`AnalyzerConfig`]: thresholds for clustering and classification

mod config;
mod entities;
mod enums;
mod image_type;
mod label;

pub use config::AnalyzerConfig;
pub use entities::Entities;
pub use enums::{Datatype, ExclusionReason, ModalityLabel, PatientSex, PhaseEncodingDirection};
pub use image_type::ImageType;
pub use label::{BidsLabel, DWI_DWI, FUNC_BOLD};
