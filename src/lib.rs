//! Rewrite machine-generated prose so it reads as casual, human-written text,
//! and score the result with simple statistics.
//!
//! ```rust,ignore
//! use prose_humanizer::{Humanizer, HumanizeRequest, Mode};
//! use rand::SeedableRng;
//!
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
//! let response = Humanizer::new()
//!     .humanize(&HumanizeRequest::new("Furthermore, it is important to note that...", Mode::Balanced), &mut rng)?;
//! println!("{} ({:?})", response.text, response.analysis);
//! ```

pub mod analyzer;
pub mod config;
pub mod context;
pub mod error;
pub mod mode;
pub mod patterns;
pub mod pipeline;
pub mod rate_limit;
pub mod transform;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use analyzer::{analyze, AnalysisResult};
pub use config::{load_config, load_config_file, ConfigError, HumanizerConfig};
pub use context::{detect, ContextLabel};
pub use error::{HumanizeError, HumanizeResult};
pub use mode::{Mode, ModeConfig};
pub use patterns::{Emotion, PatternLibrary, PatternRule};
pub use pipeline::{
    CancellationToken, HumanizeRequest, HumanizeResponse, Humanizer, NoopObserver, PipelineState,
    StageObserver,
};
pub use rate_limit::{Clock, ManualClock, RateLimitConfig, RateLimiter, SystemClock};

/// One-shot rewrite with the built-in tables, the process-wide limiter and
/// an entropy-seeded generator.
pub fn humanize(text: &str, mode: Mode) -> HumanizeResult<HumanizeResponse> {
    let mut rng = ChaCha8Rng::from_entropy();
    Humanizer::new().humanize(&HumanizeRequest::new(text, mode), &mut rng)
}
