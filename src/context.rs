use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse genre of an input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLabel {
    Academic,
    Casual,
    Business,
    General,
}

impl ContextLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextLabel::Academic => "academic",
            ContextLabel::Casual => "casual",
            ContextLabel::Business => "business",
            ContextLabel::General => "general",
        }
    }
}

impl fmt::Display for ContextLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Keyword sets
// ---------------------------------------------------------------------------

const ACADEMIC_KEYWORDS: &[&str] = &["research", "study", "analysis", "methodology", "findings"];
const CASUAL_KEYWORDS: &[&str] = &["yeah", "awesome", "cool", "hey", "basically"];
// Tokens are lower-cased before lookup, so every keyword must be too.
const BUSINESS_KEYWORDS: &[&str] = &["revenue", "roi", "synergy", "optimize", "leverage"];

/// Classify `text` by exact whitespace-token keyword hits.
///
/// The label with the most hits wins. Ties go to the first label in the
/// order academic, casual, business. No hits at all yields
/// [`ContextLabel::General`].
pub fn detect(text: &str) -> ContextLabel {
    let lowered = text.to_lowercase();
    let (mut academic, mut casual, mut business) = (0usize, 0usize, 0usize);

    for token in lowered.split_whitespace() {
        if ACADEMIC_KEYWORDS.contains(&token) {
            academic += 1;
        }
        if CASUAL_KEYWORDS.contains(&token) {
            casual += 1;
        }
        if BUSINESS_KEYWORDS.contains(&token) {
            business += 1;
        }
    }

    let max = academic.max(casual).max(business);
    if max == 0 {
        ContextLabel::General
    } else if academic == max {
        ContextLabel::Academic
    } else if casual == max {
        ContextLabel::Casual
    } else {
        ContextLabel::Business
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_academic_keyword() {
        assert_eq!(detect("research research research"), ContextLabel::Academic);
    }

    #[test]
    fn no_keywords_is_general() {
        assert_eq!(detect("no relevant keywords here at all"), ContextLabel::General);
        assert_eq!(detect(""), ContextLabel::General);
    }

    #[test]
    fn highest_count_wins() {
        assert_eq!(
            detect("hey yeah that was awesome but the revenue was fine"),
            ContextLabel::Casual
        );
        assert_eq!(detect("Optimize revenue and ROI"), ContextLabel::Business);
    }

    #[test]
    fn ties_resolve_in_check_order() {
        assert_eq!(detect("study cool"), ContextLabel::Academic);
        assert_eq!(detect("cool revenue"), ContextLabel::Casual);
    }

    #[test]
    fn tokens_must_match_exactly() {
        // Trailing punctuation and substrings are not hits.
        assert_eq!(detect("research. researcher studying"), ContextLabel::General);
    }
}
