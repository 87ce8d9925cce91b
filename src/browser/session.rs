//! Browser lifecycle management.
//!
//! A `VerifySession` launches Chromium, holds the single page a run
//! drives, and forwards browser console messages and page errors to
//! stdout as they arrive. The session is closed exactly once per run,
//! whether the run succeeded or failed.

use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown, RemoteObject},
    fetcher::{BrowserFetcher, BrowserFetcherOptions},
    Page,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Maximum console log entries kept per session
const MAX_CONSOLE_LOGS: usize = 1000;

/// Maximum bytes stored per rendered console arg
const MAX_CAPTURE_ARG_BYTES: usize = 10_000;

/// How long to wait for the CDP handler to drain after a close request
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Viewport all scenarios run at
const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 720;

/// Distinguishes concurrent sessions within one process (tests launch
/// several) so their Chrome profile directories never collide.
static NEXT_PROFILE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Browser operation failed: {0}")]
    OperationFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::OperationFailed(e.to_string())
    }
}

/// How a scenario launches Chromium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchProfile {
    /// Run without a visible window.
    pub headless: bool,
    /// Add `--use-gl=swiftshader` so WebGL renders in software.
    pub software_gl: bool,
}

impl LaunchProfile {
    pub const fn headless() -> Self {
        Self {
            headless: true,
            software_gl: false,
        }
    }

    pub const fn headless_software_gl() -> Self {
        Self {
            headless: true,
            software_gl: true,
        }
    }

    pub const fn headed_software_gl() -> Self {
        Self {
            headless: false,
            software_gl: true,
        }
    }
}

/// Console message captured from the page
#[derive(Debug, Clone)]
pub struct ConsoleEntry {
    pub level: String,
    pub text: String,
}

/// The browser a single verification run drives.
pub struct VerifySession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    listener_tasks: Vec<JoinHandle<()>>,
    page: Page,
    console_logs: Arc<Mutex<VecDeque<ConsoleEntry>>>,
    user_data_dir: PathBuf,
}

impl VerifySession {
    /// Directory where the fetcher caches downloaded Chrome binaries
    fn fetcher_cache_dir() -> PathBuf {
        let base = std::env::var("HOME").map_or_else(|_| PathBuf::from("/tmp"), PathBuf::from);
        base.join(".cache/giza-verify/chromium")
    }

    /// Build a `BrowserConfig` with optional explicit Chrome executable path
    fn browser_config(
        profile: LaunchProfile,
        user_data_dir: &Path,
        executable: Option<&Path>,
    ) -> Result<BrowserConfig, BrowserError> {
        // Remove stale profile data to avoid Chrome SingletonLock conflicts
        // (e.g. from a previous run that didn't clean up)
        let _ = std::fs::remove_dir_all(user_data_dir);

        let mut builder = BrowserConfig::builder();

        builder = if profile.headless {
            builder
                .new_headless_mode()
                .arg("--disable-gpu")
                .arg("--disable-software-rasterizer")
        } else {
            builder.with_head()
        };

        if profile.software_gl {
            builder = builder.arg("--use-gl=swiftshader");
        }

        builder = builder
            .no_sandbox()
            .user_data_dir(user_data_dir)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            });

        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::LaunchFailed)
    }

    /// Launch browser and open the run's single page
    async fn launch_and_init(
        profile: LaunchProfile,
        executable: Option<&Path>,
    ) -> Result<Self, BrowserError> {
        let user_data_dir = std::env::temp_dir().join(format!(
            "giza-verify-{}-{}",
            std::process::id(),
            NEXT_PROFILE_ID.fetch_add(1, Ordering::Relaxed)
        ));

        let config = Self::browser_config(profile, &user_data_dir, executable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("CDP handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser,
            handler_task,
            listener_tasks: Vec::new(),
            page,
            console_logs: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_CONSOLE_LOGS))),
            user_data_dir,
        })
    }

    /// Launch a browser for one verification run.
    ///
    /// With no explicit executable, tries system Chrome first (zero
    /// download). On failure, downloads a compatible Chromium via
    /// `BrowserFetcher` and caches it for future runs.
    pub async fn launch(
        profile: LaunchProfile,
        executable: Option<&Path>,
    ) -> Result<Self, BrowserError> {
        if let Some(path) = executable {
            return Self::launch_and_init(profile, Some(path)).await;
        }

        match Self::launch_and_init(profile, None).await {
            Ok(session) => return Ok(session),
            Err(e) => {
                tracing::info!("System Chrome not available ({e}), trying fetcher...");
            }
        }

        let cache_dir = Self::fetcher_cache_dir();
        tracing::info!("Downloading Chrome to {cache_dir:?} (first run only)...");

        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "Failed to create cache dir {}: {e}",
                cache_dir.display()
            ))
        })?;

        let fetcher_opts = BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .map_err(|e| BrowserError::LaunchFailed(format!("Fetcher config error: {e}")))?;

        let fetcher = BrowserFetcher::new(fetcher_opts);
        let info = fetcher
            .fetch()
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("Chrome download failed: {e:#}")))?;

        tracing::info!("Using Chrome at {:?}", info.executable_path);

        Self::launch_and_init(profile, Some(&info.executable_path)).await
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Forward browser console messages and uncaught page errors to
    /// stdout as they arrive, and keep them in a bounded buffer for the
    /// run report.
    pub async fn attach_console_forwarding(&mut self) -> Result<(), BrowserError> {
        let mut console_events = self.page.event_listener::<EventConsoleApiCalled>().await?;
        let logs = self.console_logs.clone();
        self.listener_tasks.push(tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let level = format!("{:?}", event.r#type).to_lowercase();
                let text = event
                    .args
                    .iter()
                    .map(render_console_arg)
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("Console ({level}): {text}");
                push_entry(&logs, level, text);
            }
        }));

        let mut error_events = self.page.event_listener::<EventExceptionThrown>().await?;
        let logs = self.console_logs.clone();
        self.listener_tasks.push(tokio::spawn(async move {
            while let Some(event) = error_events.next().await {
                let details = &event.exception_details;
                let text = details
                    .exception
                    .as_ref()
                    .and_then(|exc| exc.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                println!("Page Error: {text}");
                push_entry(&logs, String::from("pageerror"), text);
            }
        }));

        Ok(())
    }

    /// Captured console errors and uncaught page errors, in arrival order.
    pub fn console_errors(&self) -> Vec<String> {
        self.console_logs
            .lock()
            .map(|logs| {
                logs.iter()
                    .filter(|e| e.level == "error" || e.level == "pageerror")
                    .map(|e| e.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Close the browser. Called exactly once per run, on every exit path.
    pub async fn close(mut self) {
        for task in self.listener_tasks.drain(..) {
            task.abort();
        }

        if let Err(e) = self.browser.close().await {
            tracing::warn!("Browser close failed: {e}");
        }

        // The CDP handler stream ends once the browser connection drops
        if tokio::time::timeout(CLOSE_GRACE, &mut self.handler_task)
            .await
            .is_err()
        {
            self.handler_task.abort();
        }

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            tracing::debug!(
                "Could not remove browser data dir {}: {e}",
                self.user_data_dir.display()
            );
        }
    }
}

fn push_entry(logs: &Arc<Mutex<VecDeque<ConsoleEntry>>>, level: String, text: String) {
    if let Ok(mut logs) = logs.lock() {
        if logs.len() >= MAX_CONSOLE_LOGS {
            logs.pop_front();
        }
        logs.push_back(ConsoleEntry { level, text });
    }
}

/// Render a CDP `RemoteObject` console argument as the text a devtools
/// console would show.
///
/// Priority:
/// 1. `value` — present for primitives; strings unwrapped, others JSON-serialized
/// 2. `preview` — for objects/arrays, reconstructs a `{k: v}` or `[v]` representation
/// 3. `description` — fallback string representation (e.g. "Object", "Array(3)")
/// 4. `unserializable_value` — for `undefined`, `NaN`, `Infinity`, etc.
fn render_console_arg(arg: &RemoteObject) -> String {
    if let Some(value) = &arg.value {
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return clip_utf8(raw, MAX_CAPTURE_ARG_BYTES);
    }

    if let Some(preview) = &arg.preview {
        use chromiumoxide::cdp::js_protocol::runtime::ObjectPreviewSubtype;
        let is_array = preview
            .subtype
            .as_ref()
            .is_some_and(|s| matches!(s, ObjectPreviewSubtype::Array));

        let props: Vec<String> = preview
            .properties
            .iter()
            .map(|p| {
                let val = p.value.as_deref().unwrap_or("…");
                if is_array {
                    val.to_string()
                } else {
                    format!("{}: {}", p.name, val)
                }
            })
            .collect();

        let overflow = if preview.overflow { ", …" } else { "" };
        let raw = if is_array {
            format!("[{}{}]", props.join(", "), overflow)
        } else {
            format!("{{{}{}}}", props.join(", "), overflow)
        };
        return clip_utf8(raw, MAX_CAPTURE_ARG_BYTES);
    }

    if let Some(desc) = &arg.description {
        return clip_utf8(desc.clone(), MAX_CAPTURE_ARG_BYTES);
    }

    if let Some(unser) = &arg.unserializable_value {
        return clip_utf8(unser.inner().clone(), MAX_CAPTURE_ARG_BYTES);
    }

    String::from("[unknown]")
}

/// Truncate a string to at most `max_bytes` bytes at a valid UTF-8 char
/// boundary, appending `…` if truncation occurred.
fn clip_utf8(s: String, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s;
    }
    // Map each char to its *end* byte position; keep those that fit.
    let boundary = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    format!("{}…", &s[..boundary])
}

#[cfg(test)]
mod console_arg_tests {
    use super::{clip_utf8, render_console_arg, MAX_CAPTURE_ARG_BYTES};
    use chromiumoxide::cdp::js_protocol::runtime::RemoteObject;
    use proptest::prelude::*;
    use serde_json::json;

    fn make_arg(value: Option<serde_json::Value>, description: Option<&str>) -> RemoteObject {
        serde_json::from_value(json!({
            "type": "string",
            "value": value,
            "description": description,
        }))
        .unwrap()
    }

    #[test]
    fn string_primitive() {
        let arg = make_arg(Some(json!("hello world")), None);
        assert_eq!(render_console_arg(&arg), "hello world");
    }

    #[test]
    fn number_primitive() {
        let arg = make_arg(Some(json!(42)), None);
        assert_eq!(render_console_arg(&arg), "42");
    }

    #[test]
    fn null_value_uses_description() {
        // console.log(null): CDP sends description "null", value is absent
        let arg = make_arg(None, Some("null"));
        assert_eq!(render_console_arg(&arg), "null");
    }

    #[test]
    fn object_with_preview() {
        // console.log({foo: 'bar'}) — Chrome omits value but provides preview
        let arg: RemoteObject = serde_json::from_value(json!({
            "type": "object",
            "description": "Object",
            "preview": {
                "type": "object",
                "overflow": false,
                "properties": [
                    {"name": "foo", "type": "string", "value": "'bar'"}
                ]
            }
        }))
        .unwrap();
        let result = render_console_arg(&arg);
        assert!(result.contains("foo"), "Expected property name: {result}");
        assert!(result.starts_with('{'), "Expected object notation: {result}");
    }

    #[test]
    fn array_with_preview() {
        // console.log([1, 2, 3])
        let arg: RemoteObject = serde_json::from_value(json!({
            "type": "object",
            "subtype": "array",
            "description": "Array(3)",
            "preview": {
                "type": "object",
                "subtype": "array",
                "overflow": false,
                "properties": [
                    {"name": "0", "type": "number", "value": "1"},
                    {"name": "1", "type": "number", "value": "2"},
                    {"name": "2", "type": "number", "value": "3"}
                ]
            }
        }))
        .unwrap();
        assert_eq!(render_console_arg(&arg), "[1, 2, 3]");
    }

    #[test]
    fn preview_overflow_marked() {
        let arg: RemoteObject = serde_json::from_value(json!({
            "type": "object",
            "description": "Object",
            "preview": {
                "type": "object",
                "overflow": true,
                "properties": [
                    {"name": "a", "type": "number", "value": "1"}
                ]
            }
        }))
        .unwrap();
        let result = render_console_arg(&arg);
        assert!(result.contains('…'), "Expected overflow indicator: {result}");
    }

    #[test]
    fn unserializable_undefined() {
        let arg: RemoteObject = serde_json::from_value(json!({
            "type": "undefined",
            "unserializableValue": "undefined"
        }))
        .unwrap();
        assert_eq!(render_console_arg(&arg), "undefined");
    }

    #[test]
    fn huge_arg_is_capped() {
        let huge = "x".repeat(MAX_CAPTURE_ARG_BYTES + 500);
        let arg = make_arg(Some(serde_json::Value::String(huge)), None);
        let result = render_console_arg(&arg);
        assert!(result.len() <= MAX_CAPTURE_ARG_BYTES + 4);
        assert!(result.ends_with('…'));
    }

    #[test]
    fn clip_utf8_multibyte_boundary() {
        // Each '€' is 3 bytes; 167 of them = 501 bytes, just over 500
        let s = "€".repeat(167);
        let result = clip_utf8(s, 500);
        assert!(result.ends_with('…'));
        assert!(!result.contains('\u{FFFD}'), "No replacement chars");
    }

    #[test]
    fn clip_utf8_fits_exactly() {
        let s = "hello".to_string();
        assert_eq!(clip_utf8(s.clone(), 5), s);
    }

    proptest! {
        #[test]
        fn clip_utf8_bounded_and_prefix_preserving(s in ".{0,64}", max in 0usize..80) {
            let clipped = clip_utf8(s.clone(), max);
            // at most max bytes of content plus the 3-byte ellipsis
            prop_assert!(clipped.len() <= max + '…'.len_utf8());
            let body = clipped.strip_suffix('…').unwrap_or(clipped.as_str());
            prop_assert!(s.starts_with(body));
        }
    }
}
