//! Text rewriting stages.
//!
//! Every stochastic stage takes the caller's random source explicitly, so a
//! seeded generator reproduces the same output for the same input and mode.
//! [`normalize`] is deterministic and always runs last.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};

use crate::mode::ModeConfig;
use crate::patterns::match_leading_case;

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

struct Hyperparameters {
    contraction_floor: f64,
    contraction_scale: f64,
    passive_scale: f64,
    merge_scale: f64,
    merge_max_chars: usize,
    starter_scale: f64,
    parenthetical_scale: f64,
    filler_scale: f64,
    very_swap_scale: f64,
    personal_touch_rate: f64,
    personal_touch_min_sentences: usize,
}

static HP: Hyperparameters = Hyperparameters {
    contraction_floor: 0.1,
    contraction_scale: 0.9,
    passive_scale: 0.8,
    merge_scale: 0.3,
    merge_max_chars: 50,
    starter_scale: 0.3,
    parenthetical_scale: 0.15,
    filler_scale: 0.4,
    very_swap_scale: 0.25,
    personal_touch_rate: 0.3,
    personal_touch_min_sentences: 3,
};

const CONJUNCTIONS: &[&str] = &[" and ", " but ", " so ", " yet ", " plus "];
const STARTERS: &[&str] = &["Actually, ", "You know, ", "Honestly, ", "Frankly, ", "Really, ", "Look, "];
const PARENTHETICALS: &[&str] = &[" (which is pretty cool)", " (if you ask me)", " (obviously)", " (clearly)"];
const FILLERS: &[&str] = &["you know, ", "I mean, ", "basically, ", "look, ", "listen, ", "well, "];
const VERY_SYNONYMS: &[&str] = &["pretty", "really", "quite", "super"];
const PERSONAL_PHRASES: &[&str] = &[
    "In my experience,",
    "I've found that",
    "From what I've seen,",
    "Based on my observation,",
    "Personally,",
];

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

static SENTENCE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

static VERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bvery\b").unwrap());

static CONTRACTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let table: [(&str, &str); 23] = [
        (r"(?i)\bdo not\b", "don't"),
        (r"(?i)\bdoes not\b", "doesn't"),
        (r"(?i)\bdid not\b", "didn't"),
        (r"(?i)\bwill not\b", "won't"),
        (r"(?i)\bwould not\b", "wouldn't"),
        (r"(?i)\bshould not\b", "shouldn't"),
        (r"(?i)\bcould not\b", "couldn't"),
        (r"(?i)\bcannot\b", "can't"),
        (r"(?i)\bis not\b", "isn't"),
        (r"(?i)\bare not\b", "aren't"),
        (r"(?i)\bwas not\b", "wasn't"),
        (r"(?i)\bwere not\b", "weren't"),
        (r"(?i)\bhave not\b", "haven't"),
        (r"(?i)\bhas not\b", "hasn't"),
        (r"(?i)\bhad not\b", "hadn't"),
        // Only the capitalised pronoun; "i am" is left alone.
        (r"\bI am\b", "I'm"),
        (r"(?i)\byou are\b", "you're"),
        (r"(?i)\bwe are\b", "we're"),
        (r"(?i)\bthey are\b", "they're"),
        (r"(?i)\bit is\b", "it's"),
        (r"(?i)\bthat is\b", "that's"),
        (r"(?i)\bwho is\b", "who's"),
        (r"(?i)\bwhere is\b", "where's"),
    ];
    table
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
        .collect()
});

/// A passive construction plus the rewrite applied to its captures.
pub struct PassiveRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub rewrite: fn(&Captures<'_>) -> String,
}

impl PassiveRule {
    pub fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.rewrite).into_owned()
    }
}

fn gets_verb(caps: &Captures<'_>) -> String {
    format!("gets {}", &caps[1])
}

fn got_verb_by(caps: &Captures<'_>) -> String {
    format!("got {} by", &caps[1])
}

fn will_get_verb(caps: &Captures<'_>) -> String {
    format!("will get {}", &caps[1])
}

fn got_verb(caps: &Captures<'_>) -> String {
    format!("got {}", &caps[1])
}

fn get_verb_by(caps: &Captures<'_>) -> String {
    format!("get {} by", &caps[1])
}

pub static PASSIVE_RULES: Lazy<Vec<PassiveRule>> = Lazy::new(|| {
    vec![
        PassiveRule {
            name: "is_being",
            pattern: Regex::new(r"(?i)\bis being (\w+ed)\b").unwrap(),
            rewrite: gets_verb,
        },
        PassiveRule {
            name: "was_by",
            pattern: Regex::new(r"(?i)\bwas (\w+ed) by\b").unwrap(),
            rewrite: got_verb_by,
        },
        PassiveRule {
            name: "will_be",
            pattern: Regex::new(r"(?i)\bwill be (\w+ed)\b").unwrap(),
            rewrite: will_get_verb,
        },
        PassiveRule {
            name: "has_been",
            pattern: Regex::new(r"(?i)\bhas been (\w+ed)\b").unwrap(),
            rewrite: got_verb,
        },
        PassiveRule {
            name: "are_by",
            pattern: Regex::new(r"(?i)\bare (\w+ed) by\b").unwrap(),
            rewrite: get_verb_by,
        },
    ]
});

static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static REPEATED_PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(?:\s*\.)+").unwrap());
static LOWER_AFTER_TERMINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])\s+([a-z])").unwrap());
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.!?])").unwrap());

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split on runs of terminal punctuation, trimming and dropping empty pieces.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pick<'a, R: Rng + ?Sized>(options: &[&'a str], rng: &mut R) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Contract common two-word forms ("do not" -> "don't").
///
/// Each pair is applied across the whole text with probability
/// `casualness * 0.9 + 0.1`.
pub fn expand_contractions<R: Rng + ?Sized>(text: &str, mode: &ModeConfig, rng: &mut R) -> String {
    let p = mode.casualness * HP.contraction_scale + HP.contraction_floor;
    let mut result = text.to_string();
    for (pattern, replacement) in CONTRACTIONS.iter() {
        if rng.gen::<f64>() < p {
            result = pattern
                .replace_all(&result, |caps: &Captures<'_>| {
                    match_leading_case(&caps[0], replacement)
                })
                .into_owned();
        }
    }
    result
}

/// Rewrite passive constructions into "get"/"got" forms, each rule with
/// probability `intensity * 0.8`.
pub fn reduce_passive<R: Rng + ?Sized>(text: &str, mode: &ModeConfig, rng: &mut R) -> String {
    let p = mode.intensity * HP.passive_scale;
    let mut result = text.to_string();
    for rule in PASSIVE_RULES.iter() {
        if rng.gen::<f64>() < p {
            result = rule.apply(&result);
        }
    }
    result
}

/// Merge short sentences, add discourse starters and asides.
///
/// A sentence merged into its predecessor is not emitted a second time.
/// Text without any sentence content is returned unchanged.
pub fn vary_sentences<R: Rng + ?Sized>(text: &str, mode: &ModeConfig, rng: &mut R) -> String {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return text.to_string();
    }

    let last = sentences.len() - 1;
    let mut out: Vec<String> = Vec::with_capacity(sentences.len());
    let mut consumed_next = false;

    for (i, sentence) in sentences.iter().enumerate() {
        if consumed_next {
            consumed_next = false;
            continue;
        }

        if rng.gen::<f64>() < mode.variety * HP.merge_scale
            && sentence.chars().count() < HP.merge_max_chars
            && i < last
        {
            let conj = pick(CONJUNCTIONS, rng);
            out.push(format!("{sentence}{conj}{}", sentences[i + 1].to_lowercase()));
            consumed_next = true;
            continue;
        }

        if rng.gen::<f64>() < mode.casualness * HP.starter_scale && i > 0 {
            let starter = pick(STARTERS, rng);
            out.push(format!("{starter}{}", lowercase_first(sentence)));
            continue;
        }

        if rng.gen::<f64>() < mode.casualness * HP.parenthetical_scale {
            let aside = pick(PARENTHETICALS, rng);
            out.push(format!("{sentence}{aside}"));
            continue;
        }

        out.push(sentence.to_string());
    }

    out.join(". ")
}

/// Sprinkle conversational fillers and soften "very".
pub fn inject_casual<R: Rng + ?Sized>(text: &str, mode: &ModeConfig, rng: &mut R) -> String {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return text.to_string();
    }

    sentences
        .into_iter()
        .map(|sentence| {
            let mut s = if rng.gen::<f64>() < mode.casualness * HP.filler_scale {
                format!("{}{}", pick(FILLERS, rng), lowercase_first(sentence))
            } else {
                sentence.to_string()
            };
            if rng.gen::<f64>() < mode.casualness * HP.very_swap_scale {
                s = VERY_RE
                    .replace_all(&s, |_: &Captures<'_>| pick(VERY_SYNONYMS, rng))
                    .into_owned();
            }
            s
        })
        .collect::<Vec<_>>()
        .join(". ")
}

/// Prefix one sentence after the first with a first-person aside.
///
/// Only fires for texts of three or more sentences, and then with a fixed
/// 30% chance. The result is always re-terminated with a period.
pub fn add_personal_touch<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return text.to_string();
    }

    let mut owned: Vec<String> = sentences.iter().map(|s| s.to_string()).collect();
    if owned.len() >= HP.personal_touch_min_sentences && rng.gen::<f64>() < HP.personal_touch_rate {
        let idx = rng.gen_range(1..owned.len());
        let phrase = pick(PERSONAL_PHRASES, rng);
        owned[idx] = format!("{phrase} {}", owned[idx].to_lowercase());
    }
    format!("{}.", owned.join(". "))
}

/// Deterministic cleanup: whitespace, doubled periods, capitalisation after
/// terminal punctuation, stray spaces before punctuation.
///
/// Idempotent.
pub fn normalize(text: &str) -> String {
    let collapsed = WHITESPACE_RUN_RE.replace_all(text, " ");
    let single_periods = REPEATED_PERIOD_RE.replace_all(&collapsed, ".");
    let capitalised = LOWER_AFTER_TERMINAL_RE.replace_all(&single_periods, |caps: &Captures<'_>| {
        format!("{} {}", &caps[1], caps[2].to_uppercase())
    });
    let tightened = SPACE_BEFORE_PUNCT_RE.replace_all(&capitalised, "$1");
    tightened.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // Every draw is 0.0 and every pick is index 0, so each gate with a
    // positive probability passes.
    fn always() -> StepRng {
        StepRng::new(0, 0)
    }

    // Every draw is just below 1.0, so no gate passes.
    fn never() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn params(intensity: f64, casualness: f64, variety: f64) -> ModeConfig {
        ModeConfig {
            name: "test",
            intensity,
            casualness,
            variety,
            description: "",
        }
    }

    #[test]
    fn splits_on_terminal_runs() {
        assert_eq!(
            split_sentences("One. Two!! Three?  ... four"),
            vec!["One", "Two", "Three", "four"]
        );
        assert!(split_sentences(" ... ").is_empty());
    }

    #[test]
    fn contractions_keep_leading_capital() {
        let mode = Mode::Balanced.config();
        let out = expand_contractions("Do not worry, it is fine. I am here.", mode, &mut always());
        assert_eq!(out, "Don't worry, it's fine. I'm here.");
    }

    #[test]
    fn contractions_skip_when_gate_fails() {
        let mode = Mode::Aggressive.config();
        let text = "We do not know.";
        assert_eq!(expand_contractions(text, mode, &mut never()), text);
    }

    #[test]
    fn lowercase_i_am_is_left_alone() {
        let out = expand_contractions("i am sure I am right", Mode::Aggressive.config(), &mut always());
        assert_eq!(out, "i am sure I'm right");
    }

    #[test]
    fn each_pair_is_gated_on_its_own() {
        // Draws alternate 0.0, 0.5, 0.0, ... so only even-indexed pairs fire
        // at the 0.1 floor.
        let mut rng = StepRng::new(0, 1 << 63);
        let out = expand_contractions(
            "We do not know, it does not matter, we did not try, they will not go",
            &params(0.0, 0.0, 0.0),
            &mut rng,
        );
        assert_eq!(
            out,
            "We don't know, it does not matter, we didn't try, they will not go"
        );
    }

    #[test]
    fn contraction_floor_applies_with_zero_casualness() {
        let out = expand_contractions("they are here", &params(0.0, 0.0, 0.0), &mut always());
        assert_eq!(out, "they're here");
    }

    #[test]
    fn passive_rules_reuse_captured_verb() {
        let cases = [
            ("The code is being reviewed now", "The code gets reviewed now"),
            ("It was approved by the board", "It got approved by the board"),
            ("It will be released soon", "It will get released soon"),
            ("The bug has been fixed", "The bug got fixed"),
            ("Reports are generated by cron", "Reports get generated by cron"),
        ];
        for (rule, (input, expected)) in PASSIVE_RULES.iter().zip(cases) {
            assert_eq!(rule.apply(input), expected, "rule {}", rule.name);
        }
    }

    #[test]
    fn passive_gate_uses_intensity() {
        let text = "The bug has been fixed";
        assert_eq!(reduce_passive(text, &params(0.0, 0.5, 0.5), &mut always()), text);
        assert_eq!(
            reduce_passive(text, &params(1.0, 0.5, 0.5), &mut always()),
            "The bug got fixed"
        );
    }

    #[test]
    fn merge_suppresses_consumed_successor() {
        let out = vary_sentences("One. Two. Three.", Mode::Balanced.config(), &mut always());
        assert_eq!(out, "One and two. Actually, three");
        assert_eq!(out.matches("two").count(), 1);
    }

    #[test]
    fn long_sentences_are_not_merged() {
        let long = "This sentence is deliberately long enough to exceed fifty characters";
        let text = format!("{long}. Short one.");
        let out = vary_sentences(&text, Mode::Balanced.config(), &mut always());
        // Falls through to the aside branch instead.
        assert_eq!(out, format!("{long} (which is pretty cool). Actually, short one"));
    }

    #[test]
    fn vary_without_gates_only_rejoins() {
        let out = vary_sentences("First!  Second? Third.", Mode::Aggressive.config(), &mut never());
        assert_eq!(out, "First. Second. Third");
    }

    #[test]
    fn vary_passes_through_punctuation_only_text() {
        assert_eq!(vary_sentences("?!", Mode::Aggressive.config(), &mut always()), "?!");
    }

    #[test]
    fn inject_adds_filler_and_swaps_very() {
        let out = inject_casual("That is very, VERY good.", Mode::Balanced.config(), &mut always());
        assert_eq!(out, "you know, that is pretty, pretty good");
    }

    #[test]
    fn inject_with_zero_casualness_is_a_rejoin() {
        let out = inject_casual("A very big deal. Another one.", &params(1.0, 0.0, 1.0), &mut always());
        assert_eq!(out, "A very big deal. Another one");
    }

    #[test]
    fn personal_touch_needs_three_sentences() {
        assert_eq!(add_personal_touch("One. Two.", &mut always()), "One. Two.");
        let out = add_personal_touch("One. Two. Three.", &mut always());
        assert_eq!(out, "One. In my experience, two. Three.");
    }

    #[test]
    fn normalize_cleans_spacing_and_case() {
        assert_eq!(
            normalize("  hello   world .. this is fine ! really ?  yes , ok.  "),
            "hello world. This is fine! Really? Yes, ok."
        );
        assert_eq!(normalize("a. . . b"), "a. B");
        assert_eq!(normalize("Line one.\n\nline two"), "Line one. Line two");
    }

    #[test]
    fn normalize_leaves_decimals_alone() {
        assert_eq!(normalize("Pi is 3.14 roughly"), "Pi is 3.14 roughly");
    }

    #[test]
    fn seeded_stages_are_reproducible() {
        let text = "It is important to note that the system is being improved. We do not stop. Results are very good.";
        let mode = Mode::Aggressive.config();
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let t = expand_contractions(text, mode, &mut rng);
            let t = reduce_passive(&t, mode, &mut rng);
            let t = vary_sentences(&t, mode, &mut rng);
            normalize(&inject_casual(&t, mode, &mut rng))
        };
        assert_eq!(run(42), run(42));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-zA-Z .,!?\t\n]{0,80}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
        }
    }
}
