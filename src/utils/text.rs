use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// NFD-decomposes and drops combining marks, so `é` becomes `e`.
pub fn remove_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison form used on both sides of every match.
pub fn normalize(value: &str) -> String {
    remove_diacritics(value).to_lowercase()
}

/// Char offset of the first occurrence of `needle` in `haystack`.
pub fn find_char_index(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte_idx| haystack[..byte_idx].chars().count())
}

/// True when every non-space char of `query` appears in `candidate` in
/// order, not necessarily contiguously.
pub fn is_subsequence(candidate: &str, query: &str) -> bool {
    let mut chars = candidate.chars();
    query
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|q| chars.by_ref().any(|c| c == q))
}

/// Splits `text` at a char range into (before, matched, after).
pub fn split_at_chars(text: &str, start: usize, len: usize) -> (String, String, String) {
    let before: String = text.chars().take(start).collect();
    let matched: String = text.chars().skip(start).take(len).collect();
    let after: String = text.chars().skip(start + len).collect();
    (before, matched, after)
}

/// Locates normalized `lookup` inside `text` and returns the matching
/// (start, len) range in chars of the original `text`.
pub fn normalized_span(text: &str, lookup: &str) -> Option<(usize, usize)> {
    if lookup.is_empty() {
        return None;
    }
    // owner[i] is the index of the original char that produced normalized char i
    let mut normalized = String::new();
    let mut owner: Vec<usize> = Vec::new();
    let mut buf = [0u8; 4];
    for (idx, ch) in text.chars().enumerate() {
        for out in normalize(ch.encode_utf8(&mut buf)).chars() {
            normalized.push(out);
            owner.push(idx);
        }
    }
    let start = find_char_index(&normalized, lookup)?;
    let end = start + lookup.chars().count() - 1;
    let first = *owner.get(start)?;
    let last = *owner.get(end)?;
    // trailing chars that normalize to nothing (combining marks) belong to the match
    let total = text.chars().count();
    let mut stop = last + 1;
    while stop < total && owner.binary_search(&stop).is_err() {
        stop += 1;
    }
    Some((first, stop - first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize("Élodie Ångström"), "elodie angstrom");
        assert_eq!(remove_diacritics("crème brûlée"), "creme brulee");
    }

    #[test]
    fn find_char_index_counts_chars_not_bytes() {
        assert_eq!(find_char_index("ñandú", "dú"), Some(3));
        assert_eq!(find_char_index("abc", "z"), None);
        assert_eq!(find_char_index("abc", ""), Some(0));
    }

    #[test]
    fn subsequence_skips_spaces_in_query() {
        assert!(is_subsequence("javascript", "jvs"));
        assert!(is_subsequence("new york", "n y"));
        assert!(!is_subsequence("javascript", "sj"));
        assert!(is_subsequence("anything", ""));
    }

    #[test]
    fn split_at_chars_keeps_multibyte_intact() {
        let (before, matched, after) = split_at_chars("Zürich", 1, 3);
        assert_eq!(before, "Z");
        assert_eq!(matched, "üri");
        assert_eq!(after, "ch");
    }

    #[test]
    fn normalized_span_maps_back_to_original_chars() {
        assert_eq!(normalized_span("Crème Brûlée", "bru"), Some((6, 3)));
        assert_eq!(normalized_span("Zurich", "zz"), None);
        assert_eq!(normalized_span("abc", ""), None);
        // decomposed e + combining acute is one visible letter
        assert_eq!(normalized_span("Caf\u{0065}\u{0301} noir", "cafe"), Some((0, 5)));
    }
}
