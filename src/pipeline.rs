//! The per-request rewrite pipeline and the batch runner built on it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzer::{self, AnalysisResult};
use crate::context;
use crate::error::{HumanizeError, HumanizeResult};
use crate::mode::Mode;
use crate::patterns::{self, Emotion, PatternLibrary};
use crate::rate_limit::RateLimiter;
use crate::transform;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Pipeline states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Admitting,
    DetectingContext,
    Substituting,
    ExpandingContractions,
    ReducingPassive,
    Varying,
    Injecting,
    Normalizing,
    Analyzing,
    Done,
    Failed,
}

impl PipelineState {
    /// Progress line shown to users while the state is active.
    pub fn progress_message(self) -> Option<&'static str> {
        match self {
            PipelineState::Substituting => Some("Replacing AI patterns..."),
            PipelineState::ExpandingContractions => Some("Adding natural contractions..."),
            PipelineState::ReducingPassive => Some("Improving sentence structure..."),
            PipelineState::Varying => Some("Adding variety..."),
            PipelineState::Injecting => Some("Making it more conversational..."),
            PipelineState::Normalizing => Some("Final polish..."),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Admitting => "admitting",
            PipelineState::DetectingContext => "detecting context",
            PipelineState::Substituting => "substituting",
            PipelineState::ExpandingContractions => "expanding contractions",
            PipelineState::ReducingPassive => "reducing passive voice",
            PipelineState::Varying => "varying sentences",
            PipelineState::Injecting => "injecting casual expressions",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Observation and cancellation
// ---------------------------------------------------------------------------

/// Receives state transitions and may ask the run to stop between stages.
pub trait StageObserver {
    fn on_state(&mut self, _state: PipelineState) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Shared flag that cancels a run at the next stage boundary.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl StageObserver for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HumanizeRequest {
    pub text: String,
    pub mode: Mode,
    pub emotion: Option<Emotion>,
    pub personal_touch: bool,
}

impl HumanizeRequest {
    pub fn new(text: impl Into<String>, mode: Mode) -> Self {
        Self {
            text: text.into(),
            mode,
            emotion: None,
            personal_touch: false,
        }
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = Some(emotion);
        self
    }

    pub fn with_personal_touch(mut self, enabled: bool) -> Self {
        self.personal_touch = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumanizeResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    pub final_state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl HumanizeResponse {
    pub fn succeeded(&self) -> bool {
        self.final_state == PipelineState::Done
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs requests through the rewrite stages, gated by a rate limiter.
#[derive(Debug, Clone)]
pub struct Humanizer {
    library: Arc<PatternLibrary>,
    limiter: Arc<RateLimiter>,
}

impl Default for Humanizer {
    fn default() -> Self {
        Self::new()
    }
}

struct Run<'o> {
    observer: &'o mut dyn StageObserver,
}

impl Run<'_> {
    fn enter(&mut self, state: PipelineState) -> HumanizeResult<()> {
        if self.observer.is_cancelled() {
            return Err(HumanizeError::Processing {
                state,
                reason: "cancelled".to_string(),
            });
        }
        match state.progress_message() {
            Some(progress) => debug!(%state, progress, "pipeline stage"),
            None => debug!(%state, "pipeline stage"),
        }
        self.observer.on_state(state);
        Ok(())
    }
}

impl Humanizer {
    /// Built-in tables and the process-wide rate limiter.
    pub fn new() -> Self {
        Self {
            library: PatternLibrary::builtin(),
            limiter: RateLimiter::global(),
        }
    }

    pub fn with_library(mut self, library: Arc<PatternLibrary>) -> Self {
        self.library = library;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn humanize<R: Rng + ?Sized>(
        &self,
        request: &HumanizeRequest,
        rng: &mut R,
    ) -> HumanizeResult<HumanizeResponse> {
        self.humanize_observed(request, rng, &mut NoopObserver)
    }

    /// Run one request, reporting every state to `observer`.
    ///
    /// Blank input and rate-limit rejection come back as `Err`. Any later
    /// fault is absorbed: the response carries the original text, no
    /// analysis, and the failure message.
    pub fn humanize_observed<R: Rng + ?Sized>(
        &self,
        request: &HumanizeRequest,
        rng: &mut R,
        observer: &mut dyn StageObserver,
    ) -> HumanizeResult<HumanizeResponse> {
        if request.text.trim().is_empty() {
            return Err(HumanizeError::EmptyInput);
        }

        observer.on_state(PipelineState::Idle);
        observer.on_state(PipelineState::Admitting);
        if !self.limiter.admit() {
            let retry_after = self.limiter.time_until_reset();
            warn!(
                retry_after_ms = retry_after.as_millis() as u64,
                "request rejected by rate limiter"
            );
            observer.on_state(PipelineState::Failed);
            return Err(HumanizeError::RateLimited { retry_after });
        }

        let mut run = Run { observer };
        match self.run_stages(request, rng, &mut run) {
            Ok((text, analysis)) => {
                run.observer.on_state(PipelineState::Done);
                info!(
                    mode = %request.mode,
                    context = %analysis.context,
                    words = analysis.word_count,
                    "humanized text"
                );
                Ok(HumanizeResponse {
                    text,
                    analysis: Some(analysis),
                    final_state: PipelineState::Done,
                    failure: None,
                })
            }
            Err(err) => {
                warn!(error = %err, "pipeline failed, returning original text");
                run.observer.on_state(PipelineState::Failed);
                Ok(HumanizeResponse {
                    text: request.text.clone(),
                    analysis: None,
                    final_state: PipelineState::Failed,
                    failure: Some(err.to_string()),
                })
            }
        }
    }

    fn run_stages<R: Rng + ?Sized>(
        &self,
        request: &HumanizeRequest,
        rng: &mut R,
        run: &mut Run<'_>,
    ) -> HumanizeResult<(String, AnalysisResult)> {
        let mode = request.mode.config();

        run.enter(PipelineState::DetectingContext)?;
        let label = context::detect(&request.text);
        debug!(context = %label, "detected context");

        run.enter(PipelineState::Substituting)?;
        let mut text = patterns::substitute(&request.text, self.library.ai_rules(), mode.intensity, rng);
        text = patterns::substitute(&text, self.library.context_rules(label), mode.intensity, rng);
        if let Some(emotion) = request.emotion {
            text = patterns::substitute(&text, self.library.emotion_rules(emotion), mode.intensity, rng);
        }

        run.enter(PipelineState::ExpandingContractions)?;
        text = transform::expand_contractions(&text, mode, rng);

        run.enter(PipelineState::ReducingPassive)?;
        text = transform::reduce_passive(&text, mode, rng);

        run.enter(PipelineState::Varying)?;
        text = transform::vary_sentences(&text, mode, rng);

        run.enter(PipelineState::Injecting)?;
        text = transform::inject_casual(&text, mode, rng);
        if request.personal_touch {
            text = transform::add_personal_touch(&text, rng);
        }

        run.enter(PipelineState::Normalizing)?;
        text = transform::normalize(&text);
        if text.is_empty() {
            return Err(HumanizeError::Processing {
                state: PipelineState::Normalizing,
                reason: "rewrite produced empty text".to_string(),
            });
        }

        run.enter(PipelineState::Analyzing)?;
        let analysis = analyzer::analyze(&text);
        if !analysis.is_finite() {
            return Err(HumanizeError::Processing {
                state: PipelineState::Analyzing,
                reason: "non-finite metric".to_string(),
            });
        }

        Ok((text, analysis))
    }

    /// Run every non-blank input in order with default request options.
    pub fn run_batch<S, R>(&self, inputs: &[S], mode: Mode, rng: &mut R) -> HumanizeResult<Vec<String>>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        self.run_batch_observed(inputs, &HumanizeRequest::new("", mode), rng, &mut NoopObserver)
    }

    /// Run every non-blank input in order, each as a copy of `template`
    /// carrying that input's text.
    ///
    /// Blank inputs yield `""` without touching the limiter. A rate-limit
    /// rejection aborts the whole batch. An item whose run fails, including
    /// one cancelled through `observer`, keeps its original text and the
    /// batch moves on.
    pub fn run_batch_observed<S, R>(
        &self,
        inputs: &[S],
        template: &HumanizeRequest,
        rng: &mut R,
        observer: &mut dyn StageObserver,
    ) -> HumanizeResult<Vec<String>>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let mut outputs = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let input = input.as_ref();
            if input.trim().is_empty() {
                outputs.push(String::new());
                continue;
            }
            let request = HumanizeRequest {
                text: input.to_string(),
                ..template.clone()
            };
            let response = match self.humanize_observed(&request, rng, observer) {
                Ok(response) => response,
                Err(err) => {
                    warn!(index, total = inputs.len(), error = %err, "batch aborted");
                    return Err(err);
                }
            };
            if let Some(failure) = &response.failure {
                warn!(index, failure = %failure, "batch item kept its original text");
            }
            outputs.push(response.text);
        }
        Ok(outputs)
    }
}
