use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::context::{self, ContextLabel};
use crate::transform::split_sentences;

/// Naturalness signals computed over a finished text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub perplexity: f64,
    pub burstiness: f64,
    pub readability: f64,
    pub context: ContextLabel,
    pub word_count: usize,
    pub sentence_count: usize,
}

// ---------------------------------------------------------------------------
// Flesch constants
// ---------------------------------------------------------------------------

const FLESCH_BASE: f64 = 206.835;
const FLESCH_SENTENCE_WEIGHT: f64 = 1.015;
const FLESCH_SYLLABLE_WEIGHT: f64 = 84.6;
const SHORT_WORD_MAX_CHARS: usize = 3;

static SILENT_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[^laeiouy]es|ed|[^laeiouy]e)$").unwrap());

static LEADING_Y_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^y").unwrap());

static VOWEL_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[aeiouy]+").unwrap());

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// 2 raised to the Shannon entropy of the lower-cased unigram distribution.
///
/// Text with no tokens, or a single repeated token, scores 1.
pub fn perplexity(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let mut freq: BTreeMap<&str, usize> = BTreeMap::new();
    let mut total = 0usize;
    for word in lowered.split_whitespace() {
        *freq.entry(word).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 1.0;
    }

    let entropy: f64 = freq
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    2f64.powf(entropy.max(0.0))
}

/// Coefficient of variation of per-sentence word counts.
pub fn burstiness(text: &str) -> f64 {
    let lengths: Vec<f64> = split_sentences(text)
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .collect();
    if lengths.len() < 2 {
        return 0.0;
    }

    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = lengths.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
    variance.sqrt() / mean
}

/// Heuristic syllable count, never below one.
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    if word.chars().count() <= SHORT_WORD_MAX_CHARS {
        return 1;
    }
    let stripped = SILENT_SUFFIX_RE.replace(&word, "");
    let stripped = LEADING_Y_RE.replace(&stripped, "");
    VOWEL_RUN_RE.find_iter(&stripped).count().max(1)
}

/// Flesch Reading Ease. Empty text scores 0.
pub fn readability(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let sentences = split_sentences(text).len().max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    FLESCH_BASE - FLESCH_SENTENCE_WEIGHT * words_per_sentence - FLESCH_SYLLABLE_WEIGHT * syllables_per_word
}

/// Compute every metric plus the detected context for `text`.
pub fn analyze(text: &str) -> AnalysisResult {
    AnalysisResult {
        perplexity: perplexity(text),
        burstiness: burstiness(text),
        readability: readability(text),
        context: context::detect(text),
        word_count: text.split_whitespace().count(),
        sentence_count: split_sentences(text).len(),
    }
}

impl AnalysisResult {
    pub fn is_finite(&self) -> bool {
        self.perplexity.is_finite() && self.burstiness.is_finite() && self.readability.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn repeated_token_has_perplexity_one() {
        assert_eq!(perplexity("cat cat cat"), 1.0);
        assert_eq!(perplexity(""), 1.0);
    }

    #[test]
    fn uniform_tokens_match_vocabulary_size() {
        assert!(approx(perplexity("a b c d"), 4.0));
        // Case folding merges tokens.
        let h = -(0.75 * 0.75f64.log2() + 0.25 * 0.25f64.log2());
        assert!(approx(perplexity("Dog dog DOG cat"), 2f64.powf(h)));
    }

    #[test]
    fn single_sentence_has_no_burstiness() {
        assert_eq!(burstiness("Hello world."), 0.0);
        assert_eq!(burstiness(""), 0.0);
    }

    #[test]
    fn burstiness_is_coefficient_of_variation() {
        // Lengths 1 and 3: mean 2, population std 1.
        assert!(approx(burstiness("One. Two three four."), 0.5));
        assert!(approx(burstiness("Same size here. And also here."), 0.0));
    }

    #[test]
    fn syllable_heuristic() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("makes"), 1);
        assert_eq!(count_syllables("wanted"), 1);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("yellow"), 2);
        assert_eq!(count_syllables("rhythm"), 1);
    }

    #[test]
    fn flesch_for_simple_sentence() {
        // 3 words, 1 sentence, 3 syllables.
        let expected = 206.835 - 1.015 * 3.0 - 84.6;
        assert!(approx(readability("The cat sat."), expected));
        assert_eq!(readability("   "), 0.0);
    }

    #[test]
    fn analyze_bundles_metrics() {
        let result = analyze("Research shows this. The study was long and careful.");
        assert_eq!(result.context, ContextLabel::Academic);
        assert_eq!(result.word_count, 9);
        assert_eq!(result.sentence_count, 2);
        assert!(result.perplexity >= 1.0);
        assert!(result.burstiness > 0.0);
        assert!(result.is_finite());
    }
}
