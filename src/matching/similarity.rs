//! Counterparty-name similarity for fuzzy matching
//!
//! Bank statement descriptions truncate and re-encode supplier names, so
//! matching is token-overlap based over normalized text rather than exact
//! string comparison.

use std::collections::HashSet;

/// Normalize free text for comparison: lowercase, fold diacritics, keep
/// alphanumeric characters, collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(fold_diacritic)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold the accented characters common in Italian business names
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

/// Token-overlap similarity between two free-text names, in [0, 1]
///
/// Jaccard overlap of normalized tokens, with a containment bonus so a
/// truncated bank description still scores high against the full invoice
/// counterparty (all tokens of the shorter side present in the longer).
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }

    let tokens_a: HashSet<&str> = na.split_whitespace().collect();
    let tokens_b: HashSet<&str> = nb.split_whitespace().collect();

    let intersection = tokens_a.intersection(&tokens_b).count();
    if intersection == 0 {
        return 0.0;
    }
    let union = tokens_a.union(&tokens_b).count();
    let jaccard = intersection as f64 / union as f64;

    // Containment: the shorter name fully appearing inside the longer one
    let shorter = tokens_a.len().min(tokens_b.len());
    let containment = intersection as f64 / shorter as f64;

    jaccard.max(containment * 0.9)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_accents() {
        assert_eq!(normalize("Caffè  S.r.l.!"), "caffe s r l");
        assert_eq!(normalize("ROSSI & FIGLI"), "rossi figli");
    }

    #[test]
    fn identical_names_score_one() {
        assert_eq!(token_set_similarity("Rossi SRL", "rossi srl"), 1.0);
    }

    #[test]
    fn disjoint_names_score_zero() {
        assert_eq!(token_set_similarity("Rossi SRL", "Bianchi SPA"), 0.0);
    }

    #[test]
    fn truncated_bank_description_still_matches() {
        // Bank descriptions wrap the supplier name in boilerplate
        let sim = token_set_similarity("Rossi Forniture SRL", "BONIFICO SEPA ROSSI FORNITURE SRL");
        assert!(sim >= 0.85, "similarity was {sim}");
    }

    #[test]
    fn partial_overlap_scores_between() {
        let sim = token_set_similarity("Rossi Forniture SRL", "ROSSI COSTRUZIONI");
        assert!(sim > 0.0 && sim < 0.85, "similarity was {sim}");
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(token_set_similarity("", "Rossi"), 0.0);
        assert_eq!(token_set_similarity("Rossi", "   "), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "Rossi Forniture SRL";
        let b = "BONIFICO ROSSI";
        assert_eq!(token_set_similarity(a, b), token_set_similarity(b, a));
    }
}
