//! The consolidated verification run.
//!
//! One linear pass: launch, navigate, execute the scenario's steps in
//! order. The first failing step ends the run; the error is logged, a
//! best-effort failure screenshot is attempted where the scenario keeps
//! one, and the browser is closed on every path.

use crate::browser::{actions, BrowserError, VerifySession};
use crate::report::{CheckResult, RunOutcome, RunReport};
use crate::scenario::{Scenario, Step};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Auto-wait before a click. The retired scripts relied on their
/// automation library waiting for the target before clicking; a click
/// that fired instantly against the landing animation would miss.
const CLICK_WAIT: Duration = Duration::from_secs(15);

/// Command-line adjustments applied on top of a scenario.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub url: Option<String>,
    pub out_dir: PathBuf,
    pub headed: bool,
    pub chrome: Option<PathBuf>,
}

/// Run one scenario to completion or first failure.
///
/// Failures never propagate out: they are folded into the report, which
/// is the whole deliverable of a verification run.
pub async fn run(scenario: &Scenario, overrides: &RunOverrides) -> RunReport {
    let mut report = RunReport::new(scenario.name);

    let mut profile = scenario.profile;
    if overrides.headed {
        profile.headless = false;
    }

    let mut session = match VerifySession::launch(profile, overrides.chrome.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Error: {e}");
            report.outcome = RunOutcome::Failed {
                error: e.to_string(),
            };
            return report;
        }
    };

    if scenario.capture_console {
        if let Err(e) = session.attach_console_forwarding().await {
            tracing::warn!("Could not capture console messages: {e}");
        }
    }

    let url = overrides.url.as_deref().unwrap_or(scenario.url);

    if let Err(e) = execute(&session, scenario, url, &overrides.out_dir, &mut report).await {
        tracing::error!("Error: {e}");
        report.outcome = RunOutcome::Failed {
            error: e.to_string(),
        };

        // Best-effort capture of the failure state; an error here is not
        // interesting on top of the one we already have.
        if let Some(file) = scenario.error_screenshot {
            let path = overrides.out_dir.join(file);
            if actions::screenshot(session.page(), &path).await.is_ok() {
                report.screenshots.push(path);
            }
        }
    }

    report.console_errors = session.console_errors().len();
    session.close().await;
    report
}

async fn execute(
    session: &VerifySession,
    scenario: &Scenario,
    url: &str,
    out_dir: &Path,
    report: &mut RunReport,
) -> Result<(), BrowserError> {
    let page = session.page();

    tracing::info!("Navigating to {url}...");
    actions::navigate(page, url, scenario.nav_timeout).await?;

    for step in &scenario.steps {
        match step {
            Step::WaitForText { text, timeout } => {
                tracing::info!("Waiting for '{text}'...");
                actions::wait_for_text(page, text, *timeout).await?;
            }
            Step::WaitForSelector { selector, timeout } => {
                tracing::info!("Waiting for {selector}...");
                actions::wait_for_selector(page, selector, *timeout).await?;
            }
            Step::ClickText { label } => {
                tracing::info!("Clicking '{label}'...");
                actions::wait_for_text(page, label, CLICK_WAIT).await?;
                actions::click_text(page, label).await?;
            }
            Step::Settle { wait } => {
                tracing::info!("Waiting for render ({}s)...", wait.as_secs());
                actions::settle(page, *wait).await;
            }
            Step::Screenshot { file } => {
                tracing::info!("Taking screenshot...");
                let path = out_dir.join(file);
                actions::screenshot(page, &path).await?;
                report.screenshots.push(path);
            }
            Step::CheckText { needle } => {
                let html = actions::page_html(page).await?;
                report
                    .checks
                    .push(CheckResult::new(*needle, html.contains(needle)));
            }
            Step::CheckVisible { text } => {
                let visible = actions::is_text_visible(page, text).await?;
                report.checks.push(CheckResult::new(*text, visible));
            }
            Step::CheckSelector {
                selector,
                dump_page_on_missing,
            } => {
                let found = actions::count_selector(page, selector).await? > 0;
                report.checks.push(CheckResult::new(*selector, found));
                if !found && *dump_page_on_missing {
                    // An error overlay where the scene should be is only
                    // visible in the markup
                    println!("{}", actions::page_html(page).await?);
                }
            }
        }
    }

    Ok(())
}
