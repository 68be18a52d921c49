//! Text normalizers and patterns shared by the page heuristics

use once_cell::sync::Lazy;
use regex::Regex;

/// Earliest year accepted as a release year
pub const MIN_RELEASE_YEAR: i32 = 1900;

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

static ITEM_NUMBER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)item\s+number:\s*([A-Z0-9]+)").expect("valid label regex"));

static SKU_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+$").expect("valid token regex"));

/// Trimmed copy of `value`, or `None` when nothing is left
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collapse every whitespace run (including newlines) to one space and trim
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a series name: collapse whitespace, then drop repeated
/// consecutive words or word groups.
///
/// `"Keepsake Ornaments\n  Keepsake Ornaments"` becomes `"Keepsake Ornaments"`.
/// Non-adjacent repeats are kept (`"Star Wars Galaxy Star"` is unchanged).
pub fn normalize_series(value: &str) -> Option<String> {
    let collapsed = collapse_whitespace(value);
    let mut words: Vec<&str> = Vec::new();

    for word in collapsed.split(' ').filter(|w| !w.is_empty()) {
        words.push(word);
        // Removing a repeat can expose another ending at the same word
        while let Some(size) = repeated_suffix(&words) {
            words.truncate(words.len() - size);
        }
    }

    non_empty(&words.join(" "))
}

/// Length of the shortest block that ends `words` and immediately repeats
/// the block before it (case-insensitive)
fn repeated_suffix(words: &[&str]) -> Option<usize> {
    let n = words.len();
    (1..=n / 2).find(|&size| {
        words[n - size..]
            .iter()
            .zip(&words[n - 2 * size..n - size])
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

/// First 19xx/20xx year in `text` within `[1900, current_year + 1]`
pub fn find_year(text: &str, current_year: i32) -> Option<i32> {
    YEAR_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .find(|year| (MIN_RELEASE_YEAR..=current_year + 1).contains(year))
}

/// True if `text` contains an "Item number:" label (any case)
pub fn has_item_number_label(text: &str) -> bool {
    text.to_ascii_lowercase().contains("item number:")
}

/// Value following an "Item number:" label
///
/// `"Item number: 5QXD7292 Collectible"` yields `"5QXD7292"`.
pub fn sku_from_label(text: &str) -> Option<String> {
    ITEM_NUMBER_LABEL
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// True for a bare uppercase-alphanumeric token (e.g. `5QXD7292`)
pub fn is_sku_token(text: &str) -> bool {
    SKU_TOKEN.is_match(text)
}

/// Strip a leftover "Item number:" label from a mined SKU value
pub fn clean_sku(value: String) -> String {
    if has_item_number_label(&value) {
        sku_from_label(&value).unwrap_or(value)
    } else {
        value
    }
}
