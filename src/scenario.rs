//! Scenario model: the step vocabulary and the built-in catalog.

pub mod catalog;

pub use catalog::{catalog, find, DEFAULT_SCENARIO};

use crate::browser::LaunchProfile;
use std::time::Duration;

/// One step of a verification scenario.
///
/// Steps run strictly in order; there is no branching and no retry. The
/// first failing step ends the run.
#[derive(Debug, Clone)]
pub enum Step {
    /// Wait until the page's visible text contains `text`.
    WaitForText {
        text: &'static str,
        timeout: Duration,
    },
    /// Wait until `selector` matches an element.
    WaitForSelector {
        selector: &'static str,
        timeout: Duration,
    },
    /// Click the innermost element whose text contains `label`.
    ClickText { label: &'static str },
    /// Let a transition/render settle: returns early if the app sets its
    /// scene-ready flag, otherwise waits the full duration.
    Settle { wait: Duration },
    /// Capture a full-page PNG to `file`, relative to the output dir.
    Screenshot { file: &'static str },
    /// Record whether the page HTML contains `needle`.
    CheckText { needle: &'static str },
    /// Record whether an element with `text` is actually visible.
    CheckVisible { text: &'static str },
    /// Record whether `selector` matches anything.
    CheckSelector {
        selector: &'static str,
        /// Dump the page HTML when nothing matches, to spot an error
        /// overlay where the scene should be.
        dump_page_on_missing: bool,
    },
}

/// A named verification scenario: one catalog entry, one browser run.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    /// Dev-server URL this scenario targets.
    pub url: &'static str,
    pub profile: LaunchProfile,
    /// Forward browser console messages and page errors to stdout.
    pub capture_console: bool,
    pub nav_timeout: Duration,
    pub steps: Vec<Step>,
    /// Where to capture the page if the run fails, for scenarios that
    /// keep a failure screenshot.
    pub error_screenshot: Option<&'static str>,
}

#[cfg(test)]
mod catalog_tests {
    use super::{catalog, find, Step, DEFAULT_SCENARIO};
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn names_are_unique() {
        let names: Vec<_> = catalog().iter().map(|s| s.name).collect();
        let unique: HashSet<_> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
    }

    #[test]
    fn default_scenario_exists() {
        assert!(find(DEFAULT_SCENARIO).is_some());
    }

    #[test]
    fn unknown_scenario_is_none() {
        assert!(find("no-such-scenario").is_none());
    }

    #[test]
    fn all_output_paths_are_png() {
        for scenario in catalog() {
            for step in &scenario.steps {
                if let Step::Screenshot { file } = step {
                    assert!(
                        file.ends_with(".png"),
                        "{}: {file} is not a PNG path",
                        scenario.name
                    );
                }
            }
            if let Some(file) = scenario.error_screenshot {
                assert!(file.ends_with(".png"), "{}: {file}", scenario.name);
            }
        }
    }

    #[test]
    fn all_waits_are_bounded() {
        // An unbounded wait would hang a run forever against a dead
        // server; every timeout and settle must be finite and sane.
        let cap = Duration::from_secs(120);
        for scenario in catalog() {
            assert!(scenario.nav_timeout > Duration::ZERO);
            assert!(scenario.nav_timeout <= cap, "{}", scenario.name);
            for step in &scenario.steps {
                let bound = match step {
                    Step::WaitForText { timeout, .. }
                    | Step::WaitForSelector { timeout, .. } => Some(*timeout),
                    Step::Settle { wait } => Some(*wait),
                    _ => None,
                };
                if let Some(bound) = bound {
                    assert!(bound > Duration::ZERO && bound <= cap, "{}", scenario.name);
                }
            }
        }
    }

    #[test]
    fn tour_targets_the_alternate_port() {
        let tour = find("tour").unwrap();
        assert!(tour.url.ends_with(":3002"));
        // every other scenario targets the main dev server
        for scenario in catalog() {
            if scenario.name != "tour" {
                assert!(scenario.url.ends_with(":3000"), "{}", scenario.name);
            }
        }
    }

    #[test]
    fn debug_scenarios_capture_console() {
        for name in ["console", "debug", "journey", "pyramid-debug"] {
            assert!(find(name).unwrap().capture_console, "{name}");
        }
        assert!(!find("visuals").unwrap().capture_console);
    }
}
