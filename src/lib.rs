//! Onboarding Tour: first-visit walkthrough engine.

pub mod config;
pub mod error;
pub mod i18n;
pub mod identity;
pub mod images;
pub mod notify;
pub mod store;
pub mod tour;
