//! Onboarding tour: step progression, review mode and presentation.
//!
//! A tour is a short ordered walkthrough shown the first time a user lands
//! on a route. `state` holds the pure transition rules, `controller` runs
//! their side effects against storage, the image cache and the notifier,
//! and `view` turns the state into something a UI shell can draw.

pub mod catalog;
pub mod controller;
pub mod routes;
pub mod service;
pub mod state;
pub mod step;
pub mod view;

pub use controller::{TourController, TourDeps};
pub use routes::tour_routes;
pub use service::{ProductInfo, TourService};
pub use state::{ImageState, Notice, TourEffect, TourEvent, TourPhase, TourState, reduce, transition};
pub use step::{DeviceClass, Step, StepList, effective_image_url};
pub use view::{OpenView, TourView, render};
