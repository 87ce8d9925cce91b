//! Built-in scenarios, one per retired verification script.
//!
//! The durations, marker texts, and output paths are the empirically
//! tuned values those scripts converged on; they are data here, not
//! constants scattered across copies.

use super::{Scenario, Step};
use crate::browser::LaunchProfile;
use std::time::Duration;

/// Scenario used when none is named on the command line.
pub const DEFAULT_SCENARIO: &str = "visuals";

const DEV_SERVER: &str = "http://localhost:3000";
/// The tour flow shipped against a later dev server instance.
const TOUR_SERVER: &str = "http://localhost:3002";

const NAV_TIMEOUT: Duration = Duration::from_secs(60);
const MARKER_TIMEOUT: Duration = Duration::from_secs(30);
const CANVAS_TIMEOUT: Duration = Duration::from_secs(30);

const BEGIN_JOURNEY: &str = "Begin Journey";

/// Look up a scenario by name.
pub fn find(name: &str) -> Option<Scenario> {
    catalog().into_iter().find(|s| s.name == name)
}

/// All built-in scenarios.
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "landing",
            summary: "Let the landing intro play out and capture it",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                // The ETERNAL SANDS title fades in around 5.5s; 12s covers it
                Step::Settle {
                    wait: Duration::from_secs(12),
                },
                Step::Screenshot {
                    file: "verification_screenshot.png",
                },
            ],
            error_screenshot: Some("verification_error.png"),
        },
        Scenario {
            name: "app",
            summary: "Full journey with software WebGL, headed",
            url: DEV_SERVER,
            profile: LaunchProfile::headed_software_gl(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::ClickText {
                    label: "BEGIN JOURNEY",
                },
                Step::WaitForSelector {
                    selector: "canvas",
                    timeout: CANVAS_TIMEOUT,
                },
                Step::Settle {
                    wait: Duration::from_secs(5),
                },
                Step::Screenshot {
                    file: "verification.png",
                },
            ],
            error_screenshot: Some("error.png"),
        },
        Scenario {
            name: "visuals",
            summary: "Landing, journey, scene render, screenshot",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: BEGIN_JOURNEY,
                    timeout: MARKER_TIMEOUT,
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                Step::WaitForSelector {
                    selector: "canvas",
                    timeout: CANVAS_TIMEOUT,
                },
                // WebGL init is the slow part
                Step::Settle {
                    wait: Duration::from_secs(10),
                },
                Step::Screenshot {
                    file: "verification_screenshot.png",
                },
            ],
            error_screenshot: Some("error_screenshot.png"),
        },
        Scenario {
            name: "console",
            summary: "Journey with console/page-error forwarding",
            url: DEV_SERVER,
            profile: LaunchProfile::headless_software_gl(),
            capture_console: true,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: BEGIN_JOURNEY,
                    timeout: MARKER_TIMEOUT,
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                Step::WaitForSelector {
                    selector: "canvas",
                    timeout: CANVAS_TIMEOUT,
                },
                Step::Settle {
                    wait: Duration::from_secs(5),
                },
                Step::Screenshot {
                    file: "verification_console_check.png",
                },
            ],
            error_screenshot: None,
        },
        Scenario {
            name: "debug",
            summary: "Capture the landing as-is and report whether the canvas exists",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: true,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::Settle {
                    wait: Duration::from_secs(5),
                },
                Step::Screenshot {
                    file: "debug_screenshot.png",
                },
                Step::CheckSelector {
                    selector: "canvas",
                    dump_page_on_missing: true,
                },
            ],
            error_screenshot: None,
        },
        Scenario {
            name: "journey",
            summary: "Journey under software WebGL, console only, no screenshot",
            url: DEV_SERVER,
            profile: LaunchProfile::headed_software_gl(),
            capture_console: true,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                Step::WaitForSelector {
                    selector: "canvas",
                    timeout: CANVAS_TIMEOUT,
                },
                Step::Settle {
                    wait: Duration::from_secs(10),
                },
            ],
            error_screenshot: None,
        },
        Scenario {
            name: "experience",
            summary: "Landing and post-transition screenshots",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: "Giza",
                    timeout: MARKER_TIMEOUT,
                },
                Step::Screenshot {
                    file: "verification/landing.png",
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                // Overlay fade is 2s
                Step::Settle {
                    wait: Duration::from_secs(3),
                },
                Step::Screenshot {
                    file: "verification/experience.png",
                },
            ],
            error_screenshot: None,
        },
        Scenario {
            name: "pyramid",
            summary: "Journey into the pyramid view",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: BEGIN_JOURNEY,
                    timeout: MARKER_TIMEOUT,
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                // Transition (3s) plus render time
                Step::Settle {
                    wait: Duration::from_secs(5),
                },
                Step::Screenshot {
                    file: "verification/pyramid_view.png",
                },
            ],
            error_screenshot: None,
        },
        Scenario {
            name: "pyramid-debug",
            summary: "Pyramid view with console forwarding and failure capture",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: true,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: BEGIN_JOURNEY,
                    timeout: Duration::from_secs(10),
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                Step::Settle {
                    wait: Duration::from_secs(5),
                },
                Step::Screenshot {
                    file: "verification/pyramid_debug.png",
                },
            ],
            error_screenshot: Some("verification/pyramid_error.png"),
        },
        Scenario {
            name: "tour",
            summary: "Progressive-disclosure tour overlay visibility checks",
            url: TOUR_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: BEGIN_JOURNEY,
                    timeout: MARKER_TIMEOUT,
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                // Text fades in 1s, 1.5s, 2s after the 3s parent fade
                Step::Settle {
                    wait: Duration::from_secs(5),
                },
                Step::CheckVisible { text: "Location" },
                Step::CheckVisible { text: "Vibe" },
                Step::CheckVisible {
                    text: "The Great Pyramid",
                },
                Step::Screenshot {
                    file: "verification/tour_complete.png",
                },
            ],
            error_screenshot: None,
        },
        Scenario {
            name: "ui",
            summary: "Experience overlay content checks with screenshots",
            url: DEV_SERVER,
            profile: LaunchProfile::headless(),
            capture_console: false,
            nav_timeout: NAV_TIMEOUT,
            steps: vec![
                Step::WaitForText {
                    text: BEGIN_JOURNEY,
                    timeout: Duration::from_secs(20),
                },
                Step::Screenshot {
                    file: "verification/landing_page.png",
                },
                Step::ClickText {
                    label: BEGIN_JOURNEY,
                },
                // Progressive disclosure fades in with 1s, 2s, 3s delays
                Step::Settle {
                    wait: Duration::from_secs(6),
                },
                Step::Screenshot {
                    file: "verification/experience_ui.png",
                },
                Step::CheckText { needle: "Location" },
                Step::CheckText {
                    needle: "The Great Pyramid",
                },
            ],
            error_screenshot: Some("verification/error.png"),
        },
    ]
}
