//! `TourController` owns one tour session and runs the effects its
//! transitions request.
//!
//! Persistence writes are awaited before `dispatch` returns, so a host that
//! tears down right after a close or finish still observes the write. Image
//! loads run in background tasks and report back through
//! `TourEvent::ImageSettled`, which the state machine drops if the user has
//! moved on to another step.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::state::{TourEffect, TourEvent, TourState, reduce};
use super::step::{DeviceClass, StepList};
use super::view::{self, TourView};
use crate::i18n::Localizer;
use crate::images::{ImageCache, ImageStatus};
use crate::notify::Notifier;
use crate::store::{ProgressRecord, ProgressScope, ProgressStore};

/// Collaborators shared by every tour in the application.
#[derive(Clone)]
pub struct TourDeps {
    pub progress: Arc<ProgressStore>,
    pub images: Arc<ImageCache>,
    pub notifier: Arc<dyn Notifier>,
    pub localizer: Arc<dyn Localizer>,
}

/// One mounted tour.
pub struct TourController {
    scope: ProgressScope,
    steps: StepList,
    deps: TourDeps,
    state: Mutex<TourState>,
}

impl TourController {
    /// Load persisted progress and build the initial state.
    ///
    /// Returns `None` for an empty step list: the feature is suppressed.
    pub async fn mount(
        scope: ProgressScope,
        steps: StepList,
        device: DeviceClass,
        deps: TourDeps,
    ) -> Option<Arc<Self>> {
        if steps.is_empty() {
            debug!(route = %scope.route, "No onboarding steps, tour suppressed");
            return None;
        }

        let record = deps.progress.load(&scope).await;
        let (state, effects) = TourState::mount(&steps, record, device);
        info!(
            route = %scope.route,
            phase = ?state.phase,
            completed = state.completed.len(),
            "Onboarding tour mounted"
        );

        let controller = Arc::new(Self {
            scope,
            steps,
            deps,
            state: Mutex::new(state),
        });
        {
            let mut state = controller.state.lock().await;
            controller.run_effects(&mut state, effects).await;
        }
        Some(controller)
    }

    pub fn scope(&self) -> &ProgressScope {
        &self.scope
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    /// Apply a user or device event and return the resulting view.
    pub async fn dispatch(self: &Arc<Self>, event: TourEvent) -> TourView {
        let mut state = self.state.lock().await;
        debug!(route = %self.scope.route, event = ?event, "Tour event");
        let effects = reduce(&mut state, &self.steps, event);
        self.run_effects(&mut state, effects).await;
        self.render(&state)
    }

    /// Current view without changing anything.
    pub async fn view(&self) -> TourView {
        let state = self.state.lock().await;
        self.render(&state)
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> TourState {
        self.state.lock().await.clone()
    }

    /// Forget persisted progress and start over from the first step.
    pub async fn restart(self: &Arc<Self>) -> TourView {
        let mut state = self.state.lock().await;
        self.deps.progress.reset(&self.scope).await;
        let (fresh, effects) = TourState::mount(&self.steps, ProgressRecord::default(), state.device);
        *state = fresh;
        info!(route = %self.scope.route, "Onboarding progress reset");
        self.run_effects(&mut state, effects).await;
        self.render(&state)
    }

    fn render(&self, state: &TourState) -> TourView {
        view::render(state, &self.steps, self.deps.localizer.as_ref(), &self.deps.images)
    }

    async fn run_effects(self: &Arc<Self>, state: &mut TourState, effects: Vec<TourEffect>) {
        let mut queue: VecDeque<TourEffect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                TourEffect::PersistStepComplete(step_id) => {
                    debug!(route = %self.scope.route, step_id = %step_id, "Saving step");
                    // The session set already holds step_id
                    self.deps
                        .progress
                        .merge_completed(&self.scope, &state.completed)
                        .await;
                }
                TourEffect::PersistSeen => {
                    self.deps.progress.mark_seen(&self.scope).await;
                }
                TourEffect::Notify(notice) => {
                    let message = self
                        .deps
                        .localizer
                        .translate_or(notice.message_key(), notice.fallback());
                    self.deps.notifier.notify(&message, notice.duration());
                }
                TourEffect::LoadImage(url) => match self.deps.images.status(&url) {
                    Some(status) => {
                        queue.extend(reduce(
                            state,
                            &self.steps,
                            TourEvent::ImageSettled { url, status },
                        ));
                    }
                    None => self.spawn_image_load(url),
                },
                TourEffect::Preload(urls) => {
                    let images = Arc::clone(&self.deps.images);
                    tokio::spawn(async move {
                        images.preload_all(urls).await;
                    });
                }
            }
        }
    }

    fn spawn_image_load(self: &Arc<Self>, url: String) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let status = controller.deps.images.ensure_loaded(&url).await;
            controller.settle_image(url, status).await;
        });
    }

    async fn settle_image(&self, url: String, status: ImageStatus) {
        let mut state = self.state.lock().await;
        reduce(
            &mut state,
            &self.steps,
            TourEvent::ImageSettled { url, status },
        );
    }
}
