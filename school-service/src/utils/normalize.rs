//! Normalization of external identifiers and display fields.

/// Normalize a matricula: keep digits only, accept 1..=7 of them.
///
/// Returns `None` for empty results and for anything longer than 7 digits.
pub fn normalize_external_id(text: &str) -> Option<String> {
    let only_digits: String = text.trim().chars().filter(|c| c.is_ascii_digit()).collect();
    if only_digits.is_empty() || only_digits.len() > 7 {
        return None;
    }
    Some(only_digits)
}

/// Trim, lowercase, then title-case each whitespace-separated word.
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    let titled = trimmed
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(titled)
}

/// Trim and lowercase an email; empty becomes `None`.
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
