use crate::types::Entities;
use regex::Regex;
use std::sync::OnceLock;

/// Extracts ReproIn-style entities from a series description
///
/// `sub-` is matched anywhere; every other key must follow an underscore
/// (`_run-`, `_task-`, ...). The value runs up to the next underscore and the
/// last occurrence of a key wins. Leading zeros are stripped from the numeric
/// entities run, echo and inversion.
pub fn extract_entities(description: &str) -> Entities {
    Entities {
        subject: entity_value(description, "sub-"),
        session: entity_value(description, "_ses-"),
        run: entity_value(description, "_run-").map(strip_leading_zeros),
        task: entity_value(description, "_task-"),
        direction: entity_value(description, "_dir-"),
        acquisition: entity_value(description, "_acq-"),
        ceagent: entity_value(description, "_ce-"),
        echo: entity_value(description, "_echo-").map(strip_leading_zeros),
        fa: entity_value(description, "_fa-"),
        inversion: entity_value(description, "_inv-").map(strip_leading_zeros),
        part: entity_value(description, "_part-"),
    }
}

fn entity_value(description: &str, key: &str) -> Option<String> {
    description
        .rsplit_once(key)
        .and_then(|(_, rest)| rest.split('_').next())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn strip_leading_zeros(value: String) -> String {
    let stripped = value.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Strips every non-alphanumeric character
pub fn strip_non_alphanumeric(s: &str) -> String {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let re = REGEX.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("Failed to compile regex"));
    re.replace_all(s, "").into_owned()
}

/// Lowercased, alphanumeric-only description used for keyword matching
pub fn normalize_description(description: &str) -> String {
    strip_non_alphanumeric(description).to_lowercase()
}

/// Checks if a normalized description names a localizer or scout
pub fn is_localizer_hint(normalized: &str) -> bool {
    normalized.contains("localizer") || normalized.contains("scout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_reproin_description() {
        let entities = extract_entities("sub-01_ses-2_task-rest_run-02_bold");

        assert_eq!(entities.subject.as_deref(), Some("01"));
        assert_eq!(entities.session.as_deref(), Some("2"));
        assert_eq!(entities.task.as_deref(), Some("rest"));
        assert_eq!(entities.run.as_deref(), Some("2"));
        assert_eq!(entities.direction, None);
        assert_eq!(entities.echo, None);
    }

    #[test]
    fn test_all_keys() {
        let entities = extract_entities(
            "anat-T1w_acq-mprage_ce-gad_dir-AP_echo-01_fa-02_inv-1_part-mag",
        );

        assert_eq!(entities.acquisition.as_deref(), Some("mprage"));
        assert_eq!(entities.ceagent.as_deref(), Some("gad"));
        assert_eq!(entities.direction.as_deref(), Some("AP"));
        assert_eq!(entities.echo.as_deref(), Some("1"));
        assert_eq!(entities.fa.as_deref(), Some("02"));
        assert_eq!(entities.inversion.as_deref(), Some("1"));
        assert_eq!(entities.part.as_deref(), Some("mag"));
        assert_eq!(entities.subject, None);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let entities = extract_entities("func_run-1_bold_run-3");
        assert_eq!(entities.run.as_deref(), Some("3"));
    }

    #[rstest]
    #[case("02", "2")]
    #[case("10", "10")]
    #[case("007", "7")]
    #[case("00", "0")]
    fn test_strip_leading_zeros(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_leading_zeros(input.to_string()), expected);
    }

    #[rstest]
    #[case("T1w_MPRAGE (1mm)", "t1wmprage1mm")]
    #[case("AAHead_Scout_32ch", "aaheadscout32ch")]
    #[case("", "")]
    fn test_normalize_description(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_description(input), expected);
    }

    #[test]
    fn test_localizer_hint() {
        assert!(is_localizer_hint(&normalize_description("Localizer_3plane")));
        assert!(is_localizer_hint(&normalize_description("AAHead_Scout")));
        assert!(!is_localizer_hint(&normalize_description("T1w_MPR")));
    }
}
