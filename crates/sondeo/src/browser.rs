//! Chromium page driver over CDP (Chrome `DevTools` Protocol).
//!
//! Element operations are evaluated as small scripts in the page. Each script
//! locates the first match of a [`Selector`] through
//! [`Selector::to_query`], so every selector kind works the same way here as
//! in the resolver. Actions report problems as a string instead of throwing,
//! which keeps "element vanished" apart from "script failed".

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::driver::{DriverConfig, OptionMatch, PageDriver, Screenshot};
use crate::locator::{ElementProbe, Selector};
use crate::result::{SondeoError, SondeoResult};

const ACTION_OK: &str = "ok";

/// A Chromium instance with one page
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Arc<Mutex<Browser>>,
    page: Arc<Mutex<Page>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched or the page cannot be
    /// created
    pub async fn launch(config: DriverConfig) -> SondeoResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(config.navigation_timeout);

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(ref ua) = config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }

        let cdp_config = builder
            .build()
            .map_err(|message| SondeoError::BrowserLaunchError { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| SondeoError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SondeoError::page(e.to_string()))?;

        info!(
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
            "chromium launched"
        );

        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            page: Arc::new(Mutex::new(page)),
            handle,
        })
    }

    /// Configuration the browser was launched with
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns error if Chromium does not acknowledge the close
    pub async fn close(self) -> SondeoResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| SondeoError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        self.handle.abort();
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> SondeoResult<T> {
        trace!(script, "evaluate");
        let page = self.page.lock().await;
        page.evaluate(script)
            .await
            .map_err(|e| SondeoError::script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| SondeoError::script(e.to_string()))
    }

    /// Run an action script on the first match of `selector`
    async fn act(&self, selector: &Selector, body: &str) -> SondeoResult<()> {
        let script = action_script(selector, body);
        let status: String = self.eval(&script).await?;
        if status == ACTION_OK {
            Ok(())
        } else {
            Err(SondeoError::page(status))
        }
    }
}

/// Wrap `body` so it runs with `el` bound to the first match
fn action_script(selector: &Selector, body: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return 'no element matches {}'; {body} return '{ACTION_OK}'; }})()",
        selector.to_query(),
        selector.to_string().replace(['\'', '\\'], "")
    )
}

fn probe_script(selector: &Selector) -> String {
    format!(
        "(() => {{ const all = {}; const el = all[0]; \
         if (!el) return {{ count: 0, visible: false, enabled: false }}; \
         const r = el.getBoundingClientRect(); const s = window.getComputedStyle(el); \
         const visible = r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
         return {{ count: all.length, visible, enabled: !el.disabled }}; }})()",
        selector.to_all_query()
    )
}

fn js_string(value: &str) -> SondeoResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> SondeoResult<()> {
        let page = self.page.lock().await;
        page.goto(url)
            .await
            .map_err(|e| SondeoError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        debug!(url, "page loaded");
        Ok(())
    }

    async fn probe(&self, selector: &Selector) -> SondeoResult<ElementProbe> {
        self.eval(&probe_script(selector)).await
    }

    async fn fill(&self, selector: &Selector, value: &str) -> SondeoResult<()> {
        let body = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            js_string(value)?
        );
        self.act(selector, &body).await
    }

    async fn click(&self, selector: &Selector) -> SondeoResult<()> {
        self.act(selector, "el.scrollIntoView({ block: 'center' }); el.click();")
            .await
    }

    async fn select_option(&self, selector: &Selector, option: &OptionMatch) -> SondeoResult<()> {
        let wanted = js_string(option.text())?;
        let test = match option {
            OptionMatch::Label(_) => format!("o.text.trim() === {wanted}"),
            OptionMatch::Value(_) => format!("o.value === {wanted}"),
        };
        let body = format!(
            "const o = Array.from(el.options || []).find(o => {test}); \
             if (!o) return 'no option ' + {wanted}; \
             el.value = o.value; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));"
        );
        self.act(selector, &body).await
    }

    async fn set_checked(&self, selector: &Selector, checked: bool) -> SondeoResult<()> {
        let body = format!(
            "if (el.checked !== {checked}) el.click(); \
             if (el.checked !== {checked}) return 'checked state did not change';"
        );
        self.act(selector, &body).await
    }

    async fn text_content(&self, selector: &Selector) -> SondeoResult<Option<String>> {
        let script = format!(
            "(() => {{ const el = {}; return el ? (el.innerText || el.textContent || '') : null; }})()",
            selector.to_query()
        );
        self.eval(&script).await
    }

    async fn current_url(&self) -> SondeoResult<String> {
        let page = self.page.lock().await;
        let url = page
            .url()
            .await
            .map_err(|e| SondeoError::page(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> SondeoResult<String> {
        let page = self.page.lock().await;
        let title = page
            .get_title()
            .await
            .map_err(|e| SondeoError::page(e.to_string()))?;
        Ok(title.unwrap_or_default())
    }

    async fn screenshot(&self) -> SondeoResult<Screenshot> {
        use base64::Engine;

        let page = self.page.lock().await;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = page
            .execute(params)
            .await
            .map_err(|e| SondeoError::ScreenshotError {
                message: e.to_string(),
            })?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| SondeoError::ScreenshotError {
                message: e.to_string(),
            })?;
        Ok(Screenshot::new(
            data,
            self.config.viewport_width,
            self.config.viewport_height,
        ))
    }
}
