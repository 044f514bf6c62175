//! Location matching between an extracted incident location and a center's
//! declared service area.
//!
//! This is a coarse bag-of-words overlap, not geospatial distance. False
//! positives on homonymous place names and false negatives on synonyms are
//! accepted limitations; tokens of length <= 2 are discarded to suppress
//! stop words.

/// Minimum token length considered meaningful.
const MIN_TOKEN_LEN: usize = 3;

/// Does the extracted location overlap a center's service-area descriptor?
///
/// Both sides are lower-cased and whitespace-tokenized; the center side is
/// the concatenation of its `location` and `state` fields. The predicate is
/// true if any meaningful token of one side appears in the other side's text,
/// checked in both directions. An empty extracted location never matches.
pub fn location_matches(extracted: &str, center_location: &str, center_state: &str) -> bool {
    let extracted = extracted.trim().to_lowercase();
    if extracted.is_empty() {
        return false;
    }

    let combined = format!(
        "{} {}",
        center_location.trim().to_lowercase(),
        center_state.trim().to_lowercase()
    );

    let extracted_hit = extracted
        .split_whitespace()
        .filter(|w| w.len() >= MIN_TOKEN_LEN)
        .any(|w| combined.contains(w));
    if extracted_hit {
        return true;
    }

    combined
        .split_whitespace()
        .filter(|w| w.len() >= MIN_TOKEN_LEN)
        .any(|w| extracted.contains(w))
}
