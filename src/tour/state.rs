//! Tour state machine.
//!
//! `reduce` is the single transition function: it mutates the state in place
//! and returns the side effects the caller must run (persist, notify, load
//! images). It never performs I/O itself.
//!
//! Phases: Closed → OpenActive(i) on first visit or resume,
//! Closed → OpenReview(0) on explicit review, back to Closed on finish or
//! dismiss.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use super::step::{DeviceClass, StepList, effective_image_url};
use crate::config::{COMPLETION_NOTICE_DURATION, PROGRESS_SAVED_NOTICE_DURATION};
use crate::images::ImageStatus;
use crate::store::ProgressRecord;

/// Where the tour is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "index", rename_all = "snake_case")]
pub enum TourPhase {
    Closed,
    /// First pass (or resumed pass) at the given step.
    OpenActive(usize),
    /// Voluntary re-run after progress exists. Never records step ids;
    /// finishing it records the tour as seen.
    OpenReview(usize),
}

impl TourPhase {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Closed => None,
            Self::OpenActive(i) | Self::OpenReview(i) => Some(*i),
        }
    }

    fn with_index(self, index: usize) -> Self {
        match self {
            Self::Closed => Self::Closed,
            Self::OpenActive(_) => Self::OpenActive(index),
            Self::OpenReview(_) => Self::OpenReview(index),
        }
    }
}

/// Display status of the current step's image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    #[default]
    Loading,
    Loaded,
    Error,
}

impl From<Option<ImageStatus>> for ImageState {
    fn from(status: Option<ImageStatus>) -> Self {
        match status {
            None => Self::Loading,
            Some(status) if status.error => Self::Error,
            Some(_) => Self::Loaded,
        }
    }
}

/// Toasts the tour raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    TourCompleted,
    ProgressSaved,
}

impl Notice {
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::TourCompleted => "onboarding.completion",
            Self::ProgressSaved => "onboarding.progressSaved",
        }
    }

    /// Literal text when the message key is not localized.
    pub fn fallback(&self) -> &'static str {
        match self {
            Self::TourCompleted => "Onboarding completed",
            Self::ProgressSaved => "Progress saved",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::TourCompleted => COMPLETION_NOTICE_DURATION,
            Self::ProgressSaved => PROGRESS_SAVED_NOTICE_DURATION,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourEvent {
    Next,
    Prev,
    /// "Next"/"Finish" button: mark the current step done and advance.
    CompleteStep,
    /// Dismiss without finishing.
    Close,
    /// Floating review button.
    OpenReview,
    DeviceChanged(DeviceClass),
    /// An image load (or cache hit) settled.
    ImageSettled { url: String, status: ImageStatus },
}

/// Side effects requested by a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourEffect {
    PersistStepComplete(String),
    PersistSeen,
    Notify(Notice),
    /// Look up (and if needed fetch) the current step's image.
    LoadImage(String),
    /// Warm the cache for these URLs.
    Preload(Vec<String>),
}

/// In-memory tour session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TourState {
    pub phase: TourPhase,
    /// Completed step ids; only ever grows.
    pub completed: BTreeSet<String>,
    /// The review affordance is available.
    pub can_review: bool,
    pub device: DeviceClass,
    pub image: ImageState,
}

impl TourState {
    /// Initial state from persisted progress, plus the effects to run on
    /// mount (image warm-up and the first image lookup).
    ///
    /// - seen → Closed, reviewable
    /// - partial progress → OpenActive at the resume index
    /// - nothing → OpenActive(0)
    pub fn mount(steps: &StepList, record: ProgressRecord, device: DeviceClass) -> (Self, Vec<TourEffect>) {
        let mut state = Self {
            phase: TourPhase::Closed,
            can_review: record.seen || !record.completed_step_ids.is_empty(),
            completed: record.completed_step_ids,
            device,
            image: ImageState::Loading,
        };

        if steps.is_empty() {
            return (state, Vec::new());
        }

        if !record.seen {
            let index = if state.completed.is_empty() {
                0
            } else {
                steps.resume_index(&state.completed)
            };
            state.phase = TourPhase::OpenActive(index);
        }

        let mut effects = vec![TourEffect::Preload(steps.image_urls(device))];
        if let Some(url) = state.current_image_url(steps) {
            effects.push(TourEffect::LoadImage(url.to_string()));
        }
        (state, effects)
    }

    pub fn is_open(&self) -> bool {
        self.phase.is_open()
    }

    pub fn review_mode(&self) -> bool {
        matches!(self.phase, TourPhase::OpenReview(_))
    }

    /// Current step index, 0 while closed.
    pub fn current_index(&self) -> usize {
        self.phase.index().unwrap_or(0)
    }

    /// Effective image of the current step, if the tour is open.
    pub fn current_image_url<'a>(&self, steps: &'a StepList) -> Option<&'a str> {
        let step = steps.get(self.phase.index()?)?;
        Some(effective_image_url(step, self.device, false))
    }

    fn move_to(&mut self, steps: &StepList, index: usize) -> Vec<TourEffect> {
        self.phase = self.phase.with_index(index);
        self.image = ImageState::Loading;
        self.current_image_url(steps)
            .map(|url| vec![TourEffect::LoadImage(url.to_string())])
            .unwrap_or_default()
    }
}

/// Apply `event` to `state`, returning the side effects to run.
pub fn reduce(state: &mut TourState, steps: &StepList, event: TourEvent) -> Vec<TourEffect> {
    if let Some(index) = state.phase.index() {
        debug_assert!(
            index < steps.len(),
            "step index {index} out of range for {} steps",
            steps.len()
        );
        if index >= steps.len() {
            return Vec::new();
        }
    }

    match event {
        TourEvent::Next => match state.phase.index() {
            Some(i) if i < steps.last_index() => state.move_to(steps, i + 1),
            _ => Vec::new(),
        },

        TourEvent::Prev => match state.phase.index() {
            Some(i) if i > 0 => state.move_to(steps, i - 1),
            _ => Vec::new(),
        },

        TourEvent::CompleteStep => complete_step(state, steps),

        TourEvent::Close => match state.phase {
            TourPhase::Closed => Vec::new(),
            TourPhase::OpenReview(_) => {
                state.phase = TourPhase::Closed;
                Vec::new()
            }
            TourPhase::OpenActive(i) => {
                // Leaving mid-tour counts the visible step as done
                let mut effects = Vec::new();
                if let Some(step) = steps.get(i) {
                    state.completed.insert(step.id.clone());
                    effects.push(TourEffect::PersistStepComplete(step.id.clone()));
                }
                state.phase = TourPhase::Closed;
                state.can_review = true;
                effects.push(TourEffect::Notify(Notice::ProgressSaved));
                effects
            }
        },

        TourEvent::OpenReview => {
            if state.is_open() || !state.can_review {
                return Vec::new();
            }
            state.phase = TourPhase::OpenReview(0);
            state.move_to(steps, 0)
        }

        TourEvent::DeviceChanged(device) => {
            if device == state.device {
                return Vec::new();
            }
            state.device = device;
            let mut effects = vec![TourEffect::Preload(steps.image_urls(device))];
            if let Some(i) = state.phase.index() {
                effects.extend(state.move_to(steps, i));
            }
            effects
        }

        TourEvent::ImageSettled { url, status } => {
            // A load for a step that is no longer shown must not touch the
            // visible status
            if state.current_image_url(steps) == Some(url.as_str()) {
                state.image = ImageState::from(Some(status));
            }
            Vec::new()
        }
    }
}

fn complete_step(state: &mut TourState, steps: &StepList) -> Vec<TourEffect> {
    let (index, reviewing) = match state.phase {
        TourPhase::Closed => return Vec::new(),
        TourPhase::OpenActive(i) => (i, false),
        TourPhase::OpenReview(i) => (i, true),
    };

    let mut effects = Vec::new();
    if !reviewing {
        if let Some(step) = steps.get(index) {
            if state.completed.insert(step.id.clone()) {
                effects.push(TourEffect::PersistStepComplete(step.id.clone()));
            }
        }
    }

    if index == steps.last_index() {
        // A finished review counts as a full pass too
        effects.push(TourEffect::PersistSeen);
        state.phase = TourPhase::Closed;
        state.can_review = true;
        effects.push(TourEffect::Notify(Notice::TourCompleted));
    } else {
        effects.extend(state.move_to(steps, index + 1));
    }
    effects
}

/// By-value form of [`reduce`].
pub fn transition(mut state: TourState, steps: &StepList, event: TourEvent) -> (TourState, Vec<TourEffect>) {
    let effects = reduce(&mut state, steps, event);
    (state, effects)
}
