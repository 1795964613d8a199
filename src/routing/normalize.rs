//! Classifier response normalisation
//!
//! Classifiers echo labels with extra words, punctuation or different casing.
//! An exact match wins; otherwise the first category (in declared order) whose
//! name contains, or is contained in, the response case-insensitively is used.
//! A blank response is contained in every name, so it resolves to the first
//! category. Anything else means "no category".

/// Literal the classifier answers with when no category applies
pub const NONE_LABEL: &str = "NONE";

/// Map a raw classifier response onto one of `available` category names
pub fn normalize_response<'a>(response: Option<&str>, available: &[&'a str]) -> Option<&'a str> {
    let cleaned = response?.trim();
    if cleaned == NONE_LABEL {
        return None;
    }

    if let Some(exact) = available.iter().find(|name| **name == cleaned) {
        return Some(*exact);
    }

    let lowered = cleaned.to_lowercase();
    available.iter().copied().find(|name| {
        let name = name.to_lowercase();
        lowered.contains(&name) || name.contains(&lowered)
    })
}
