//! Tour steps and image selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::TourError;

/// One page of the tour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identifier, unique within a step list.
    pub id: String,
    pub title_key: String,
    pub description_key: String,
    /// Primary image locator.
    pub image: String,
    /// Alternate locator for narrow viewports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_image: Option<String>,
}

impl Step {
    pub fn new(id: &str, title_key: &str, description_key: &str, image: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            title_key: title_key.to_string(),
            description_key: description_key.to_string(),
            image: image.into(),
            mobile_image: None,
        }
    }

    pub fn with_mobile_image(mut self, image: impl Into<String>) -> Self {
        self.mobile_image = Some(image.into());
        self
    }
}

/// Viewport class reported by the UI shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    /// Narrow viewport.
    Mobile,
}

/// The image a step shows on `device`.
///
/// The mobile image wins only on narrow viewports, when one exists, and when
/// `force_desktop` is off. This is the only place image selection happens.
pub fn effective_image_url(step: &Step, device: DeviceClass, force_desktop: bool) -> &str {
    match (&step.mobile_image, device, force_desktop) {
        (Some(mobile), DeviceClass::Mobile, false) if !mobile.is_empty() => mobile,
        _ => &step.image,
    }
}

/// Ordered steps for one route. Order drives both display and resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepList(Vec<Step>);

impl StepList {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.0.get(index)
    }

    /// Like [`get`](Self::get), with an error naming the bad index.
    pub fn step(&self, index: usize) -> Result<&Step, TourError> {
        self.0.get(index).ok_or(TourError::StepOutOfRange {
            index,
            len: self.0.len(),
        })
    }

    pub fn last_index(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.0.iter()
    }

    /// First step whose id is not in `completed`, or the last step when all
    /// are done.
    pub fn resume_index(&self, completed: &BTreeSet<String>) -> usize {
        self.0
            .iter()
            .position(|step| !completed.contains(&step.id))
            .unwrap_or_else(|| self.last_index())
    }

    /// Every image the tour may show on `device`: the inline selection and
    /// the forced-desktop one, deduplicated, in step order.
    pub fn image_urls(&self, device: DeviceClass) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for step in &self.0 {
            for force_desktop in [false, true] {
                let url = effective_image_url(step, device, force_desktop);
                if !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
        }
        urls
    }
}

impl From<Vec<Step>> for StepList {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}
