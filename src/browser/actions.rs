//! Bounded page operations.
//!
//! Every await against the browser is wrapped in `tokio::time::timeout`.
//! Waits poll the page instead of trusting load events, because the
//! application under test reveals its UI through animation, not loads.

use super::session::BrowserError;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// How often poll-based waits re-check the page
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeout for a single CDP round-trip (evaluate, screenshot)
const OP_TIMEOUT: Duration = Duration::from_secs(15);

/// Readiness flag the application sets on `<html>` once its transition
/// animation has finished. `settle` returns early when it appears.
const SCENE_READY_EXPR: &str = "document.documentElement.dataset.sceneReady === 'true'";

/// Navigate with a bounded timeout.
pub async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), BrowserError> {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(BrowserError::OperationFailed(format!(
            "navigation to {url} failed: {e}"
        ))),
        Err(_) => Err(BrowserError::Timeout(format!(
            "page load of {url} did not finish within {timeout:?}"
        ))),
    }
}

/// Wait until the page's visible text contains `needle`.
///
/// Matching is case-insensitive, like the text selectors the retired
/// scripts used; the landing button renders uppercased by CSS.
pub async fn wait_for_text(
    page: &Page,
    needle: &str,
    timeout: Duration,
) -> Result<(), BrowserError> {
    let expr = format!(
        "document.body !== null && document.body.innerText.toLowerCase().includes({}.toLowerCase())",
        js_string(needle)
    );
    if poll_until(page, &expr, timeout).await {
        Ok(())
    } else {
        Err(BrowserError::Timeout(format!(
            "text {needle:?} did not appear within {timeout:?}"
        )))
    }
}

/// Wait until `selector` matches an element.
pub async fn wait_for_selector(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<(), BrowserError> {
    let expr = format!("document.querySelector({}) !== null", js_string(selector));
    if poll_until(page, &expr, timeout).await {
        Ok(())
    } else {
        Err(BrowserError::Timeout(format!(
            "selector {selector:?} did not appear within {timeout:?}"
        )))
    }
}

/// Click the innermost element whose text contains `label`.
///
/// React-style overlays render buttons as nested divs, so the click goes
/// to the deepest match rather than a container that happens to include
/// the label somewhere in its subtree.
pub async fn click_text(page: &Page, label: &str) -> Result<(), BrowserError> {
    let expr = format!(
        r"(() => {{
            const needle = {needle}.toLowerCase();
            const matchesText = el => (el.innerText || el.textContent || '').toLowerCase().includes(needle);
            const nodes = Array.from(document.querySelectorAll('body *'));
            const matches = nodes.filter(matchesText);
            if (matches.length === 0) return false;
            const target = matches.reverse().find(el =>
                !Array.from(el.children).some(matchesText)
            ) || matches[0];
            target.click();
            return true;
        }})()",
        needle = js_string(label)
    );
    if eval(page, expr).await?.as_bool().unwrap_or(false) {
        Ok(())
    } else {
        Err(BrowserError::OperationFailed(format!(
            "no element with text {label:?} to click"
        )))
    }
}

/// Let a client-side transition settle.
///
/// Polls for the scene-ready flag and returns as soon as it appears;
/// when the application never sets it, the full duration elapses,
/// matching the fixed sleeps the retired scripts used.
pub async fn settle(page: &Page, wait: Duration) {
    let deadline = Instant::now() + wait;
    loop {
        if eval_bool(page, SCENE_READY_EXPR).await {
            tracing::debug!("scene-ready flag observed, skipping remaining settle time");
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

/// Capture a full-page PNG to `path`, creating parent directories.
/// An existing file at `path` is overwritten.
pub async fn screenshot(page: &Page, path: &Path) -> Result<(), BrowserError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                BrowserError::OperationFailed(format!(
                    "could not create {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(true)
        .build();

    let png = match tokio::time::timeout(OP_TIMEOUT, page.screenshot(params)).await {
        Ok(Ok(data)) => data,
        Ok(Err(e)) => {
            return Err(BrowserError::OperationFailed(format!(
                "screenshot failed: {e}"
            )))
        }
        Err(_) => {
            return Err(BrowserError::Timeout(format!(
                "screenshot exceeded {OP_TIMEOUT:?}"
            )))
        }
    };

    tokio::fs::write(path, &png).await.map_err(|e| {
        BrowserError::OperationFailed(format!("could not write {}: {e}", path.display()))
    })
}

/// Current page HTML, for content checks and debug dumps.
pub async fn page_html(page: &Page) -> Result<String, BrowserError> {
    let value = eval(page, "document.documentElement.outerHTML".to_string()).await?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| BrowserError::OperationFailed(String::from("page HTML was not a string")))
}

/// Whether an element containing `needle` exists, takes up space, and is
/// not hidden by CSS.
pub async fn is_text_visible(page: &Page, needle: &str) -> Result<bool, BrowserError> {
    let expr = format!(
        r"(() => {{
            const needle = {needle}.toLowerCase();
            const matchesText = el => (el.textContent || '').toLowerCase().includes(needle);
            const nodes = Array.from(document.querySelectorAll('body *'));
            const el = nodes.reverse().find(el =>
                matchesText(el) && !Array.from(el.children).some(matchesText)
            );
            if (!el) return false;
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden') return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        }})()",
        needle = js_string(needle)
    );
    Ok(eval(page, expr).await?.as_bool().unwrap_or(false))
}

/// Number of elements matching `selector`.
pub async fn count_selector(page: &Page, selector: &str) -> Result<u64, BrowserError> {
    let expr = format!(
        "document.querySelectorAll({}).length",
        js_string(selector)
    );
    Ok(eval(page, expr).await?.as_u64().unwrap_or(0))
}

/// Evaluate `expr` repeatedly until it is true or the deadline passes.
async fn poll_until(page: &Page, expr: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if eval_bool(page, expr).await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn eval(page: &Page, expr: String) -> Result<serde_json::Value, BrowserError> {
    match tokio::time::timeout(OP_TIMEOUT, page.evaluate(expr)).await {
        Ok(Ok(result)) => Ok(result.value().cloned().unwrap_or(serde_json::Value::Null)),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(BrowserError::Timeout(format!(
            "JavaScript evaluation exceeded {OP_TIMEOUT:?}"
        ))),
    }
}

/// Evaluate a boolean predicate; evaluation errors count as false so
/// poll loops ride out transient states (navigation in flight, page not
/// yet parsed).
async fn eval_bool(page: &Page, expr: &str) -> bool {
    match eval(page, expr.to_string()).await {
        Ok(value) => value.as_bool().unwrap_or(false),
        Err(_) => false,
    }
}

/// Embed a Rust string as a JS string literal. Catalog data contains
/// apostrophes and could contain quotes; JSON escaping covers both.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}
