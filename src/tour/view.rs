//! Presentation adapter that turns tour state into renderable view data.

use serde::Serialize;

use super::state::{ImageState, TourState};
use super::step::{DeviceClass, StepList, effective_image_url};
use crate::i18n::Localizer;
use crate::images::ImageCache;

/// What the UI shell should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum TourView {
    /// Nothing to show.
    Hidden,
    /// Closed but reviewable: the small floating button.
    ReviewButton { label: String },
    /// The tour dialog (desktop) or sheet (mobile).
    Open(OpenView),
}

/// Contents of the open tour surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenView {
    pub dialog_title: String,
    pub title: String,
    pub description: String,
    /// 1-based.
    pub step_number: usize,
    pub step_count: usize,
    /// e.g. "Step 1 of 2".
    pub step_label: String,
    pub progress_percent: f64,
    pub image_url: String,
    pub enlarged_image_url: String,
    pub image_status: ImageState,
    /// The image can be clicked to enlarge.
    pub can_enlarge: bool,
    pub device: DeviceClass,
    pub review_mode: bool,
    pub can_go_back: bool,
    pub is_last: bool,
    pub labels: Labels,
}

/// Localized control labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labels {
    pub back: String,
    /// "Next", or "Finish" on the last step.
    pub advance: String,
    pub image_missing: String,
    pub click_to_enlarge: String,
}

/// `100 * (index + 1) / len`.
pub fn progress_percent(index: usize, len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    100.0 * (index + 1) as f64 / len as f64
}

/// Image status for `url` as the cache knows it.
pub fn cached_image_state(cache: &ImageCache, url: &str) -> ImageState {
    ImageState::from(cache.status(url))
}

/// Build the view for `state`.
///
/// An empty step list or an out-of-range index is a caller bug: it panics
/// in debug builds and renders `Hidden` otherwise.
pub fn render(state: &TourState, steps: &StepList, localizer: &dyn Localizer, cache: &ImageCache) -> TourView {
    debug_assert!(!steps.is_empty(), "tour rendered without steps");
    if steps.is_empty() {
        return TourView::Hidden;
    }

    let Some(index) = state.phase.index() else {
        if state.can_review {
            return TourView::ReviewButton {
                label: localizer.translate_or("onboarding.review", "Review onboarding"),
            };
        }
        return TourView::Hidden;
    };

    debug_assert!(
        index < steps.len(),
        "step index {index} out of range for {} steps",
        steps.len()
    );
    let Ok(step) = steps.step(index) else {
        return TourView::Hidden;
    };

    let image_url = effective_image_url(step, state.device, false).to_string();
    let enlarged_image_url = effective_image_url(step, state.device, false).to_string();

    let image_status = match state.image {
        ImageState::Loading => cached_image_state(cache, &image_url),
        settled => settled,
    };

    let is_last = index == steps.last_index();
    let step_number = index + 1;

    TourView::Open(OpenView {
        dialog_title: localizer.translate_or("onboarding.title", "Onboarding Guide"),
        title: localizer.translate(&step.title_key),
        description: localizer.translate(&step.description_key),
        step_number,
        step_count: steps.len(),
        step_label: format!(
            "{} {} {} {}",
            localizer.translate_or("onboarding.step", "Step"),
            step_number,
            localizer.translate_or("onboarding.of", "of"),
            steps.len()
        ),
        progress_percent: progress_percent(index, steps.len()),
        image_url,
        enlarged_image_url,
        image_status,
        can_enlarge: image_status == ImageState::Loaded,
        device: state.device,
        review_mode: state.review_mode(),
        can_go_back: index > 0,
        is_last,
        labels: Labels {
            back: localizer.translate_or("onboarding.back", "Back"),
            advance: if is_last {
                localizer.translate_or("onboarding.finish", "Finish")
            } else {
                localizer.translate_or("onboarding.next", "Next")
            },
            image_missing: localizer.translate_or("onboarding.imageMissing", "Image not available"),
            click_to_enlarge: localizer.translate_or("onboarding.clickToEnlarge", "Click to enlarge"),
        },
    })
}
