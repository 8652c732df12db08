use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::context::ContextLabel;
use crate::error::{HumanizeError, HumanizeResult};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A case-insensitive matcher plus the phrases it may be replaced with.
#[derive(Debug, Clone)]
pub struct PatternRule {
    matcher: Regex,
    candidates: Vec<String>,
    category: String,
}

impl PatternRule {
    /// Compile `pattern` case-insensitively.
    ///
    /// Fails when the pattern does not compile or `candidates` is empty.
    pub fn new<S: Into<String>>(
        pattern: &str,
        candidates: Vec<String>,
        category: S,
    ) -> HumanizeResult<Self> {
        if candidates.is_empty() {
            return Err(HumanizeError::EmptyCandidates {
                pattern: pattern.to_string(),
            });
        }
        let matcher =
            Regex::new(&format!("(?i){pattern}")).map_err(|source| HumanizeError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            matcher,
            candidates,
            category: category.into(),
        })
    }

    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Replace every match, drawing a fresh candidate for each one.
    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        self.matcher
            .replace_all(text, |caps: &Captures<'_>| {
                let pick = &self.candidates[rng.gen_range(0..self.candidates.len())];
                match_leading_case(&caps[0], pick)
            })
            .into_owned()
    }
}

/// Upper-case the first letter of `replacement` when `matched` starts with one.
pub(crate) fn match_leading_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().is_some_and(char::is_uppercase);
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Apply each rule with probability `intensity`.
///
/// Gating is per rule: a rule that passes its draw rewrites every match in
/// the text, a rule that fails it is skipped entirely for this call.
pub fn substitute<R: Rng + ?Sized>(
    text: &str,
    rules: &[PatternRule],
    intensity: f64,
    rng: &mut R,
) -> String {
    let mut result = text.to_string();
    for rule in rules {
        if rng.gen::<f64>() < intensity {
            result = rule.apply(&result, rng);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Emotion tones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Enthusiasm,
    Concern,
    Confidence,
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Emotion::Enthusiasm => "enthusiasm",
            Emotion::Concern => "concern",
            Emotion::Confidence => "confidence",
        })
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

type RawRule = (&'static str, &'static [&'static str], &'static str);

const AI_PATTERNS: &[RawRule] = &[
    // Common AI phrases
    (r"In conclusion,", &["To wrap up,", "Finally,", "To sum things up,", "Overall,"], "conclusion"),
    (r"Furthermore,", &["Also,", "Plus,", "What's more,", "Additionally,"], "transition"),
    (r"Moreover,", &["Also,", "Besides that,", "On top of that,", "Plus,"], "transition"),
    (r"\bIt is important to note that\b", &["Worth mentioning:", "Keep in mind that", "Remember that", "Note that"], "emphasis"),
    (r"\bIt should be noted that\b", &["Worth pointing out:", "Remember that", "Keep in mind:", "Note that"], "emphasis"),
    (r"\bIn today's digital age\b", &["These days", "Nowadays", "In our connected world", "Today"], "temporal"),
    (r"\bcutting-edge\b", &["advanced", "modern", "latest", "innovative"], "adjective"),
    (r"\bstate-of-the-art\b", &["advanced", "modern", "top-notch", "high-end"], "adjective"),
    (r"\bleverage\b", &["use", "utilize", "take advantage of", "employ"], "verb"),
    (r"\bseamless\b", &["smooth", "easy", "effortless", "simple"], "adjective"),
    (r"\brobust\b", &["strong", "reliable", "solid", "powerful"], "adjective"),
    (r"\bdelve into\b", &["explore", "look at", "examine", "dive into"], "verb"),
    (r"\bmyriad of\b", &["many", "lots of", "numerous", "countless"], "quantifier"),
    (r"\bplethora of\b", &["lots of", "many", "tons of", "plenty of"], "quantifier"),
    // Overly formal transitions
    (r"\bHowever,", &["But,", "Though,", "Still,", "Yet,"], "transition"),
    (r"\bTherefore,", &["So,", "That's why", "Because of this,", "This means"], "conclusion"),
    (r"\bSubsequently,", &["Then,", "After that,", "Next,", "Later,"], "sequence"),
    (r"\bConsequently,", &["As a result,", "So,", "This means", "Because of this,"], "consequence"),
    (r"\bNevertheless,", &["Still,", "Even so,", "But,", "Yet,"], "contrast"),
    // Generic superlatives
    (r"\bincredibly\b", &["really", "very", "extremely", "quite"], "intensifier"),
    (r"\btremendously\b", &["greatly", "significantly", "a lot", "substantially"], "intensifier"),
    (r"\bexceptionally\b", &["very", "really", "particularly", "especially"], "intensifier"),
    (r"\bextraordinarily\b", &["really", "very", "incredibly", "amazingly"], "intensifier"),
    // AI-specific structures
    (r"\bIt is worth noting that\b", &["Worth mentioning", "Interesting to note", "Also", "Plus"], "emphasis"),
    (r"\bOne must consider\b", &["You should think about", "Consider", "Think about", "Remember"], "consideration"),
    (r"\bIt can be observed that\b", &["You can see that", "Notice that", "It's clear that", "Obviously"], "observation"),
];

const ACADEMIC_PATTERNS: &[RawRule] = &[
    (r"\bresearch shows\b", &["studies indicate", "findings suggest", "evidence points to"], "academic"),
    (r"\bin order to\b", &["to", "so we can", "for"], "academic"),
    (r"\butilize\b", &["use", "apply", "employ"], "academic"),
];

const CASUAL_PATTERNS: &[RawRule] = &[
    (r"\bvery important\b", &["super important", "really key", "crucial"], "casual"),
    (r"\bI believe\b", &["I think", "I feel like", "seems to me"], "casual"),
    (r"\bunfortunately\b", &["sadly", "too bad", "bummer is"], "casual"),
];

const BUSINESS_PATTERNS: &[RawRule] = &[
    (r"\bimplement\b", &["put in place", "set up", "roll out"], "business"),
    (r"\boptimize\b", &["improve", "enhance", "boost"], "business"),
    (r"\bsynergize\b", &["work together", "combine", "team up"], "business"),
];

const ENTHUSIASM_PATTERNS: &[RawRule] = &[
    (r"\bgood\b", &["amazing", "fantastic", "awesome"], "enthusiasm"),
    (r"\bnice\b", &["brilliant", "excellent", "wonderful"], "enthusiasm"),
];

const CONCERN_PATTERNS: &[RawRule] = &[
    (r"\bproblem\b", &["issue", "challenge", "difficulty"], "concern"),
    (r"\bbad\b", &["troubling", "concerning", "worrying"], "concern"),
];

const CONFIDENCE_PATTERNS: &[RawRule] = &[
    (r"\bI think\b", &["I'm confident", "I'm certain", "I know"], "confidence"),
    (r"\bmaybe\b", &["likely", "probably", "most likely"], "confidence"),
];

fn compile_table(table: &[RawRule]) -> Vec<PatternRule> {
    table
        .iter()
        .map(|(pattern, candidates, category)| {
            let candidates = candidates.iter().map(|c| c.to_string()).collect();
            PatternRule::new(pattern, candidates, *category).expect("built-in pattern table")
        })
        .collect()
}

static BUILTIN: Lazy<Arc<PatternLibrary>> = Lazy::new(|| {
    let mut contextual = HashMap::new();
    contextual.insert(ContextLabel::Academic, compile_table(ACADEMIC_PATTERNS));
    contextual.insert(ContextLabel::Casual, compile_table(CASUAL_PATTERNS));
    contextual.insert(ContextLabel::Business, compile_table(BUSINESS_PATTERNS));

    let mut emotion = HashMap::new();
    emotion.insert(Emotion::Enthusiasm, compile_table(ENTHUSIASM_PATTERNS));
    emotion.insert(Emotion::Concern, compile_table(CONCERN_PATTERNS));
    emotion.insert(Emotion::Confidence, compile_table(CONFIDENCE_PATTERNS));

    Arc::new(PatternLibrary {
        ai: compile_table(AI_PATTERNS),
        contextual,
        emotion,
    })
});

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// All substitution tables used by the pipeline.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    ai: Vec<PatternRule>,
    contextual: HashMap<ContextLabel, Vec<PatternRule>>,
    emotion: HashMap<Emotion, Vec<PatternRule>>,
}

impl PatternLibrary {
    /// The shared built-in tables, compiled on first use.
    pub fn builtin() -> Arc<PatternLibrary> {
        Arc::clone(&BUILTIN)
    }

    /// Built-in tables with `extra` appended to the AI phrase table.
    pub fn with_extra_rules(extra: Vec<PatternRule>) -> PatternLibrary {
        let mut library = PatternLibrary::clone(&BUILTIN);
        library.ai.extend(extra);
        library
    }

    pub fn ai_rules(&self) -> &[PatternRule] {
        &self.ai
    }

    /// Rules for a detected context; [`ContextLabel::General`] has none.
    pub fn context_rules(&self, label: ContextLabel) -> &[PatternRule] {
        self.contextual.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn emotion_rules(&self, emotion: Emotion) -> &[PatternRule] {
        self.emotion.get(&emotion).map(Vec::as_slice).unwrap_or(&[])
    }
}
