use regex::Regex;
use std::sync::LazyLock;

use crate::errors::ReproError;

/// Structural markers every accepted plan must contain, by name.
static MARKERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("evidence append", r#""into"\s*:\s*"evidence""#),
        ("screenshot append", r#""into"\s*:\s*"screenshots""#),
        ("steps append", r#""into"\s*:\s*"steps_to_reproduce""#),
        ("screenshot call", r#""op"\s*:\s*"screenshot""#),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("marker pattern")))
    .collect()
});

pub fn missing_markers(text: &str) -> Vec<&'static str> {
    MARKERS
        .iter()
        .filter(|(_, re)| !re.is_match(text))
        .map(|(name, _)| *name)
        .collect()
}

pub fn check_markers(text: &str) -> Result<(), ReproError> {
    let missing = missing_markers(text);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReproError::Validation(format!("missing {}", missing.join(", "))))
    }
}
