use super::CanonicalSeries;
use crate::error::{BidsortError, Result};
use crate::extraction::sidecar::{get_f64_value, get_int_value, ECHO_NUMBER, INVERSION_TIME};
use crate::extraction::{extract_entities, is_localizer_hint, AcquisitionRecord};
use crate::source::DataSource;
use crate::types::{
    AnalyzerConfig, BidsLabel, Datatype, Entities, ExclusionReason, ModalityLabel, DWI_DWI,
    FUNC_BOLD,
};
use log::{debug, info};

/// Outcome of classifying one series
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    /// Assigned label; may be set on an excluded series to record what it looked like
    pub label: Option<BidsLabel>,
    /// Target of a field map
    pub for_type: Option<BidsLabel>,
    pub entities: Entities,
    pub exclusion: Option<ExclusionReason>,
    pub error: Option<String>,
    /// Human-readable explanation, always set after classification
    pub message: String,
}

impl Classification {
    fn labeled(entities: Entities, label: BidsLabel, message: impl Into<String>) -> Self {
        Self {
            label: Some(label),
            entities,
            message: message.into(),
            ..Default::default()
        }
    }

    fn excluded(entities: Entities, reason: ExclusionReason, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            entities,
            exclusion: Some(reason),
            message: error.clone(),
            error: Some(error),
            ..Default::default()
        }
    }

    fn with_label(mut self, label: BidsLabel) -> Self {
        self.label = Some(label);
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn for_type(mut self, target: BidsLabel) -> Self {
        self.for_type = Some(target);
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.exclusion.is_some()
    }

    /// Output type: `"<datatype>/<modality>"`, or `"exclude"` for every exclusion
    pub fn type_label(&self) -> String {
        match (&self.exclusion, &self.label) {
            (Some(_), _) => "exclude".to_string(),
            (None, Some(label)) => label.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Everything a rule may look at for one representative record
#[derive(Debug)]
pub struct SeriesContext<'a> {
    pub record: &'a AcquisitionRecord,
    /// Lowercased alphanumeric series description
    pub description: String,
    /// Entities parsed from the raw series description
    pub entities: Entities,
    /// Sidecar path of the representative two series earlier, if any
    pub two_back_json_path: Option<&'a str>,
    pub config: &'a AnalyzerConfig,
}

impl<'a> SeriesContext<'a> {
    pub fn new(
        record: &'a AcquisitionRecord,
        two_back_json_path: Option<&'a str>,
        config: &'a AnalyzerConfig,
    ) -> Self {
        Self {
            record,
            description: record.normalized_description(),
            entities: extract_entities(&record.series_description),
            two_back_json_path,
            config,
        }
    }

    /// Checks if the normalized description contains any keyword
    fn mentions(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.description.contains(k))
    }

    fn json_path_contains(&self, pattern: &str) -> bool {
        self.record.json_path.contains(pattern)
    }

    fn direction_entity(&self) -> Option<String> {
        let direction = self.record.direction;
        (!direction.is_unknown()).then(|| direction.simple_name().to_string())
    }
}

/// One entry of the classification table
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&SeriesContext<'_>) -> bool,
    pub apply: fn(&SeriesContext<'_>, &dyn DataSource) -> Result<Classification>,
}

/// Classification rules in priority order; the first match wins
///
/// A series matching none of them falls through to a volume-shape check.
pub const RULES: &[Rule] = &[
    Rule {
        name: "localizer",
        matches: |ctx| is_localizer_hint(&ctx.description),
        apply: classify_localizer,
    },
    Rule {
        name: "asl",
        matches: |ctx| ctx.mentions(&["asl"]),
        apply: classify_asl,
    },
    Rule {
        name: "angio",
        matches: |ctx| ctx.mentions(&["angio"]),
        apply: classify_angio,
    },
    Rule {
        name: "fieldmap",
        matches: |ctx| ctx.mentions(&FIELDMAP_HINTS),
        apply: classify_fieldmap,
    },
    Rule {
        name: "diffusion",
        matches: |ctx| ctx.record.has_gradients(),
        apply: classify_diffusion,
    },
    Rule {
        name: "diffusion-derivative",
        matches: |ctx| ctx.mentions(&DERIVATIVE_HINTS) && ctx.mentions(&DIFFUSION_HINTS),
        apply: classify_diffusion_derivative,
    },
    Rule {
        name: "functional",
        matches: |ctx| ctx.mentions(&FUNCTIONAL_HINTS) && !ctx.mentions(&["sbref"]),
        apply: classify_functional,
    },
    Rule {
        name: "sbref",
        matches: |ctx| ctx.mentions(&["sbref"]),
        apply: classify_sbref,
    },
    Rule {
        name: "mp2rage",
        matches: |ctx| ctx.mentions(&["mp2rage"]),
        apply: classify_mp2rage,
    },
    Rule {
        name: "t1w",
        matches: |ctx| ctx.mentions(&T1W_HINTS),
        apply: classify_t1w,
    },
    Rule {
        name: "flair",
        matches: |ctx| ctx.mentions(&FLAIR_HINTS),
        apply: |ctx, _| Ok(flair(ctx)),
    },
    Rule {
        name: "t2w",
        matches: |ctx| {
            ctx.mentions(&["t2w", "t2"]) && ctx.record.echo_time > ctx.config.t2w_min_echo_time_ms
        },
        apply: |ctx, _| {
            Ok(Classification::labeled(
                ctx.entities.clone(),
                BidsLabel::new(Datatype::Anat, ModalityLabel::T2w),
                format!(
                    "Classified as anat/T2w: SeriesDescription mentions \"t2w\" or \"t2\" and EchoTime > {} ms",
                    ctx.config.t2w_min_echo_time_ms
                ),
            ))
        },
    },
];

const FIELDMAP_HINTS: [&str; 5] = ["fmap", "fieldmap", "spinecho", "sefmri", "semri"];
const DERIVATIVE_HINTS: [&str; 3] = ["trace", "fa", "adc"];
const DIFFUSION_HINTS: [&str; 3] = ["dti", "dwi", "dmri"];
const FUNCTIONAL_HINTS: [&str; 7] = ["bold", "func", "fmri", "epi", "mri", "task", "rest"];
const T1W_HINTS: [&str; 5] = ["t1w", "tfl3d", "mprage", "spgr", "tflmgh"];
const FLAIR_HINTS: [&str; 2] = ["flair", "t2spacedafl"];

const DERIVATIVE_ERROR: &str =
    "Acquisition appears to be a TRACE, FA or ADC map, which is not converted";

fn classify_localizer(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    Ok(Classification::excluded(
        ctx.entities.clone(),
        ExclusionReason::Localizer,
        "Acquisition appears to be a localizer because \"localizer\" or \"scout\" is in the SeriesDescription; localizers are not converted",
    ))
}

fn classify_asl(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    Ok(Classification::excluded(
        ctx.entities.clone(),
        ExclusionReason::UnsupportedAcquisitionType,
        "Acquisition appears to be asl/asl because \"asl\" is in the SeriesDescription; ASL conversion is not supported",
    )
    .with_label(BidsLabel::new(Datatype::Asl, ModalityLabel::Asl)))
}

fn classify_angio(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    Ok(Classification::excluded(
        ctx.entities.clone(),
        ExclusionReason::UnsupportedAcquisitionType,
        "Acquisition appears to be anat/angio because \"angio\" is in the SeriesDescription; angiography conversion is not supported",
    )
    .with_label(BidsLabel::new(Datatype::Anat, ModalityLabel::Angio)))
}

/// Field maps: magnitude/phase pairs when an EchoNumber is present, otherwise
/// spin-echo EPI
fn classify_fieldmap(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    let sidecar = &ctx.record.sidecar;
    let fmap = |modality| BidsLabel::new(Datatype::Fmap, modality);

    if !sidecar.contains_key(ECHO_NUMBER) {
        let mut entities = ctx.entities.clone();
        entities.direction = ctx.direction_entity();
        return Ok(Classification::labeled(
            entities,
            fmap(ModalityLabel::Epi),
            "Classified as fmap/epi: SeriesDescription names a field map and the metadata has no EchoNumber",
        )
        .for_type(FUNC_BOLD));
    }

    if ctx.json_path_contains("_real.") || ctx.json_path_contains("_imaginary.") {
        return Ok(Classification::excluded(
            ctx.entities.clone(),
            ExclusionReason::UnsupportedAcquisitionType,
            "Acquisition appears to be a real or imaginary field map, which must be converted to magnitude and phase by hand; it will not be converted",
        )
        .for_type(FUNC_BOLD));
    }

    let e1_phase = ctx.json_path_contains("_e1_ph");
    let e2_phase = ctx.json_path_contains("_e2_ph");
    let (modality, why) = match get_int_value(sidecar, ECHO_NUMBER) {
        Some(1) if !e1_phase => (
            ModalityLabel::Magnitude1,
            "EchoNumber is 1 and the file name lacks \"_e1_ph\"",
        ),
        Some(1) => (
            ModalityLabel::Phase1,
            "EchoNumber is 1 and the file name contains \"_e1_ph\"",
        ),
        Some(2) if !e2_phase => (
            ModalityLabel::Magnitude2,
            "EchoNumber is 2 and the file name lacks \"_e2_ph\"",
        ),
        Some(2) if ctx.two_back_json_path.is_some_and(|p| p.contains("_e1_ph")) => (
            ModalityLabel::Phase2,
            "EchoNumber is 2, the file name contains \"_e2_ph\" and the series two earlier contains \"_e1_ph\"",
        ),
        Some(2) => (
            ModalityLabel::Phasediff,
            "EchoNumber is 2, the file name contains \"_e2_ph\" and the series two earlier lacks \"_e1_ph\"",
        ),
        _ => {
            return Ok(Classification::excluded(
                ctx.entities.clone(),
                ExclusionReason::AmbiguousClassification,
                "Acquisition appears to be a field map with an EchoNumber, but magnitude, phase or phasediff cannot be determined; it will not be converted unless relabeled",
            )
            .for_type(FUNC_BOLD));
        }
    };

    let label = fmap(modality);
    Ok(Classification::labeled(
        ctx.entities.clone(),
        label,
        format!("Classified as {}: SeriesDescription names a field map, {}", label, why),
    )
    .for_type(FUNC_BOLD))
}

/// Acquisitions shipped with gradient tables
fn classify_diffusion(ctx: &SeriesContext<'_>, source: &dyn DataSource) -> Result<Classification> {
    if ctx.mentions(&FLAIR_HINTS) {
        return Ok(flair(ctx));
    }
    if ctx.mentions(&["t2w"]) {
        return Ok(Classification::labeled(
            ctx.entities.clone(),
            BidsLabel::new(Datatype::Anat, ModalityLabel::T2w),
            "Classified as anat/T2w: SeriesDescription mentions \"t2w\"",
        ));
    }
    if !ctx.record.image_type.contains("DIFFUSION") {
        return Ok(Classification::excluded(
            ctx.entities.clone(),
            ExclusionReason::AmbiguousClassification,
            "Acquisition has bval and bvec files but does not look like dwi/dwi or a dwi field map; it will not be converted unless relabeled",
        ));
    }

    let bval_path = ctx
        .record
        .bval_path()
        .ok_or_else(|| BidsortError::InvalidGradients {
            path: ctx.record.json_path.clone(),
            reason: "bvec file without a matching bval file".to_string(),
        })?;
    let bvals = source.read_bvals(bval_path)?;
    let max_bvalue = bvals
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or_else(|| BidsortError::InvalidGradients {
            path: bval_path.to_string(),
            reason: "no b-values".to_string(),
        })?;

    let mut entities = ctx.entities.clone();
    entities.direction = ctx.direction_entity();

    if max_bvalue <= ctx.config.fmap_max_bvalue && bvals.len() < ctx.config.fmap_max_bvalue_count {
        return Ok(Classification::labeled(
            entities,
            BidsLabel::new(Datatype::Fmap, ModalityLabel::Epi),
            format!(
                "Classified as fmap/epi for dwi/dwi: gradient files present, max b-value <= {} and fewer than {} b-values",
                ctx.config.fmap_max_bvalue, ctx.config.fmap_max_bvalue_count
            ),
        )
        .for_type(DWI_DWI));
    }

    if ctx.mentions(&DERIVATIVE_HINTS) && !ctx.mentions(&DIFFUSION_HINTS) {
        return Ok(Classification::excluded(
            entities,
            ExclusionReason::UnsupportedAcquisitionType,
            DERIVATIVE_ERROR,
        ));
    }

    Ok(Classification::labeled(
        entities,
        DWI_DWI,
        "Classified as dwi/dwi: gradient files present and the b-values describe a diffusion acquisition",
    ))
}

fn classify_diffusion_derivative(
    ctx: &SeriesContext<'_>,
    _: &dyn DataSource,
) -> Result<Classification> {
    Ok(Classification::excluded(
        ctx.entities.clone(),
        ExclusionReason::UnsupportedAcquisitionType,
        DERIVATIVE_ERROR,
    ))
}

fn classify_functional(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    let min_volumes = ctx.config.min_bold_volumes;
    if ctx.record.volume_count < min_volumes {
        return Ok(Classification::excluded(
            ctx.entities.clone(),
            ExclusionReason::LikelyAcquisitionFailure,
            format!(
                "Acquisition appears to be func/bold; however, there are < {} volumes, suggesting a failure/restart, or the acquisition has been misidentified",
                min_volumes
            ),
        ));
    }

    let mut entities = ctx.entities.clone();
    if ctx.mentions(&["rest", "rsfmri", "fcmri"]) {
        entities.task = Some("rest".to_string());
    }
    entities.set_echo_number(ctx.record.echo_number);

    let (modality, message) = if ctx.record.image_type.is_mosaic_phase() {
        (
            ModalityLabel::Phase,
            "Classified as func/phase: SeriesDescription suggests a functional run and ImageType contains MOSAIC and PHASE",
        )
    } else {
        (
            ModalityLabel::Bold,
            "Classified as func/bold: SeriesDescription suggests a functional run and does not mention \"sbref\"",
        )
    };
    Ok(Classification::labeled(
        entities,
        BidsLabel::new(Datatype::Func, modality),
        message,
    ))
}

fn classify_sbref(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    let mut entities = ctx.entities.clone();
    if ctx.mentions(&["rest", "rsfmri"]) {
        entities.task = Some("rest".to_string());
    }
    entities.set_echo_number(ctx.record.echo_number);
    Ok(Classification::labeled(
        entities,
        BidsLabel::new(Datatype::Func, ModalityLabel::Sbref),
        "Classified as func/sbref: SeriesDescription mentions \"sbref\"",
    ))
}

fn classify_mp2rage(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    let sidecar = &ctx.record.sidecar;
    let mut entities = ctx.entities.clone();

    match get_f64_value(sidecar, INVERSION_TIME).filter(|t| *t != 0.0) {
        Some(inversion_time) => {
            entities.inversion = Some(if inversion_time < 1.0 { "1" } else { "2" }.to_string());
            entities.echo = get_int_value(sidecar, ECHO_NUMBER).map(|n| n.to_string());
            entities.part = Some(
                if ctx.json_path_contains("_e2.json") {
                    "phase"
                } else {
                    "mag"
                }
                .to_string(),
            );
            Ok(Classification::labeled(
                entities,
                BidsLabel::new(Datatype::Anat, ModalityLabel::Mp2rage),
                "Classified as anat/MP2RAGE: SeriesDescription mentions \"mp2rage\" and InversionTime is set",
            ))
        }
        None => Ok(Classification::labeled(
            entities,
            BidsLabel::new(Datatype::Anat, ModalityLabel::Unit1),
            "Classified as anat/UNIT1: SeriesDescription mentions \"mp2rage\" and there is no InversionTime",
        )),
    }
}

fn classify_t1w(ctx: &SeriesContext<'_>, _: &dyn DataSource) -> Result<Classification> {
    let mut entities = ctx.entities.clone();
    if ctx.mentions(&["multiecho", "echo"]) && !ctx.record.image_type.contains("MEAN") {
        if let Some(n) = ctx.record.echo_number {
            entities.echo = Some(n.to_string());
        }
    }
    Ok(Classification::labeled(
        entities,
        BidsLabel::new(Datatype::Anat, ModalityLabel::T1w),
        "Classified as anat/T1w: SeriesDescription mentions one of \"t1w\", \"tfl3d\", \"mprage\", \"spgr\", \"tflmgh\"",
    ))
}

fn flair(ctx: &SeriesContext<'_>) -> Classification {
    Classification::labeled(
        ctx.entities.clone(),
        BidsLabel::new(Datatype::Anat, ModalityLabel::Flair),
        "Classified as anat/FLAIR: SeriesDescription mentions \"flair\" or \"t2spacedafl\"",
    )
}

/// Last resort when the description gives no hint: long 4-D acquisitions are BOLD
fn classify_by_volume(ctx: &SeriesContext<'_>, source: &dyn DataSource) -> Result<Classification> {
    let volume = source.inspect_volume(&ctx.record.nifti_path)?;
    let long_series = volume.ndim() == 4 && volume.volume_count() >= ctx.config.min_bold_volumes;
    let raw = !ctx
        .record
        .image_type
        .contains_any(&["DERIVED", "PERFUSION", "DIFFUSION", "ASL"]);

    if long_series && raw {
        return Ok(Classification::labeled(
            ctx.entities.clone(),
            FUNC_BOLD,
            format!(
                "SeriesDescription gives no hint, but the acquisition has >= {} volumes and is classified as func/bold",
                ctx.config.min_bold_volumes
            ),
        ));
    }

    Ok(Classification::excluded(
        ctx.entities.clone(),
        ExclusionReason::AmbiguousClassification,
        "Acquisition cannot be resolved. Please determine whether or not this acquisition should be converted to BIDS",
    ))
}

/// Excludes anatomical series that are neither derived nor intensity-normalized
fn apply_normalization_policy(classification: &mut Classification, ctx: &SeriesContext<'_>) {
    if classification.is_excluded() || ctx.record.image_type.is_normalized() {
        return;
    }
    let Some(label) = classification.label.filter(BidsLabel::is_anat) else {
        return;
    };
    let error = format!(
        "Acquisition is a poor resolution {} (non-normalized); check whether this {} acquisition should be converted, otherwise it is left out of the output",
        label, label
    );
    *classification = Classification::excluded(
        classification.entities.clone(),
        ExclusionReason::NonNormalized,
        error,
    )
    .with_label(label);
}

/// Classifies one series from its context
///
/// The first matching entry of [`RULES`] decides; with no match the volume
/// shape decides. Non-normalized anatomical results are then excluded.
///
/// # Errors
///
/// Returns an error if a file a rule needs (b-values, image header) cannot be read.
pub fn classify_series(ctx: &SeriesContext<'_>, source: &dyn DataSource) -> Result<Classification> {
    let mut classification = match RULES.iter().find(|rule| (rule.matches)(ctx)) {
        Some(rule) => {
            debug!("{} matched rule {}", ctx.record.json_path, rule.name);
            (rule.apply)(ctx, source)?
        }
        None => classify_by_volume(ctx, source)?,
    };
    apply_normalization_policy(&mut classification, ctx);

    if classification.message.is_empty() {
        let message = classification.error.clone().unwrap_or_default();
        classification = classification.with_message(message);
    }
    Ok(classification)
}

/// Classifies every series from its representative record
///
/// Series must be ordered by series id; the field-map rule looks at the
/// representative two series earlier.
pub fn classify_all(
    records: &[AcquisitionRecord],
    series: &mut [CanonicalSeries],
    source: &dyn DataSource,
    config: &AnalyzerConfig,
) -> Result<()> {
    for i in 0..series.len() {
        let record = &records[series[i].representative];
        let two_back_json_path = i
            .checked_sub(2)
            .map(|j| records[series[j].representative].json_path.as_str());

        let ctx = SeriesContext::new(record, two_back_json_path, config);
        let classification = classify_series(&ctx, source)?;

        info!(
            "Series {} ({}): {}",
            series[i].series_id,
            record.series_description,
            match &classification.exclusion {
                Some(reason) => format!("exclude ({})", reason),
                None => classification.type_label(),
            }
        );
        series[i].classification = classification;
    }
    Ok(())
}
