//! Step catalog: which steps a route shows.
//!
//! A closed mapping from route to step list. Adding a route means adding a
//! match arm here.

use super::step::{Step, StepList};

/// Route of the product home page.
pub const HOME_ROUTE: &str = "/";

/// Routes with their own catalog entry.
pub const KNOWN_ROUTES: &[&str] = &[HOME_ROUTE];

/// Catalog entry serving `route`: the route itself when it has one, the
/// home route otherwise.
pub fn route_key(route: &str) -> &'static str {
    KNOWN_ROUTES
        .iter()
        .copied()
        .find(|known| *known == route)
        .unwrap_or(HOME_ROUTE)
}

/// Steps for `route`, with images picked for `theme`. Unknown routes get the
/// home catalog.
pub fn steps_for(route: &str, theme: &str) -> StepList {
    match route_key(route) {
        HOME_ROUTE => home_steps(theme),
        _ => StepList::default(),
    }
}

/// The home page tour.
pub fn home_steps(theme: &str) -> StepList {
    StepList::new(vec![
        Step::new(
            "welcome",
            "onboarding.steps.home.welcome.title",
            "onboarding.steps.home.welcome.description",
            image_path(theme, "home-welcome", false),
        )
        .with_mobile_image(image_path(theme, "home-welcome", true)),
        Step::new(
            "test",
            "onboarding.steps.home.test.title",
            "onboarding.steps.home.test.description",
            image_path(theme, "home-test", false),
        )
        .with_mobile_image(image_path(theme, "home-test", true)),
    ])
}

fn image_path(theme: &str, name: &str, mobile: bool) -> String {
    let suffix = if mobile { "-mobile" } else { "" };
    format!("/onboarding/{theme}/{name}{suffix}.png")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn home_route_has_steps() {
        let steps = steps_for("/", "light");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps.get(0).unwrap().id, "welcome");
        assert_eq!(steps.get(1).unwrap().id, "test");
    }

    #[test]
    fn unknown_route_falls_back_to_home() {
        assert_eq!(steps_for("/settings", "light"), steps_for("/", "light"));
        assert_eq!(route_key("/settings"), HOME_ROUTE);
        assert_eq!(route_key("/junk/42"), HOME_ROUTE);
    }

    #[test]
    fn known_routes_key_to_themselves() {
        for route in KNOWN_ROUTES {
            assert_eq!(route_key(route), *route);
            assert!(!steps_for(route, "light").is_empty());
        }
    }

    #[test]
    fn theme_selects_images() {
        let dark = steps_for("/", "dark");
        let step = dark.get(0).unwrap();
        assert_eq!(step.image, "/onboarding/dark/home-welcome.png");
        assert_eq!(
            step.mobile_image.as_deref(),
            Some("/onboarding/dark/home-welcome-mobile.png")
        );
    }

    #[test]
    fn ids_are_unique_and_catalog_is_deterministic() {
        let steps = home_steps("light");
        let ids: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), steps.len());
        assert_eq!(steps, home_steps("light"));
    }
}
