use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named intensity presets selectable by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

/// Probability scales applied by every stochastic stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeConfig {
    pub name: &'static str,
    pub intensity: f64,
    pub casualness: f64,
    pub variety: f64,
    pub description: &'static str,
}

static CONSERVATIVE: ModeConfig = ModeConfig {
    name: "conservative",
    intensity: 0.3,
    casualness: 0.2,
    variety: 0.4,
    description: "Light touch: swaps the most obvious AI phrasing and leaves structure alone",
};

static BALANCED: ModeConfig = ModeConfig {
    name: "balanced",
    intensity: 0.6,
    casualness: 0.5,
    variety: 0.7,
    description: "Rewrites common patterns and loosens the tone without changing the register much",
};

static AGGRESSIVE: ModeConfig = ModeConfig {
    name: "aggressive",
    intensity: 0.9,
    casualness: 0.8,
    variety: 0.9,
    description: "Heavy rewriting with frequent fillers, merged sentences and asides",
};

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Conservative, Mode::Balanced, Mode::Aggressive];

    pub fn config(self) -> &'static ModeConfig {
        match self {
            Mode::Conservative => &CONSERVATIVE,
            Mode::Balanced => &BALANCED,
            Mode::Aggressive => &AGGRESSIVE,
        }
    }

    pub fn name(self) -> &'static str {
        self.config().name
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| format!("unknown mode '{s}' (expected conservative, balanced or aggressive)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_values() {
        let c = Mode::Conservative.config();
        assert_eq!((c.intensity, c.casualness, c.variety), (0.3, 0.2, 0.4));
        let b = Mode::Balanced.config();
        assert_eq!((b.intensity, b.casualness, b.variety), (0.6, 0.5, 0.7));
        let a = Mode::Aggressive.config();
        assert_eq!((a.intensity, a.casualness, a.variety), (0.9, 0.8, 0.9));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Aggressive".parse::<Mode>(), Ok(Mode::Aggressive));
        assert_eq!(" balanced ".parse::<Mode>(), Ok(Mode::Balanced));
        assert!("wild".parse::<Mode>().is_err());
    }

    #[test]
    fn default_is_balanced() {
        assert_eq!(Mode::default(), Mode::Balanced);
        assert_eq!(Mode::default().to_string(), "balanced");
    }
}
