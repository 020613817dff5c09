//! Browser control for headless testing.
//!
//! With the `browser` feature this module provides [`ChromiumDriver`], a
//! [`PageDriver`](crate::PageDriver) speaking the Chrome `DevTools` Protocol
//! through chromiumoxide. [`BrowserConfig`] is always available so that
//! configuration files parse the same way with or without the feature.

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// CDP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            request_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{ElementHandle, ElementSnapshot, PageDriver};
    use crate::result::{ProbeError, ProbeResult};
    use crate::selector::Selector;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
    use chromiumoxide::layout::Point as CdpPoint;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tracing::{debug, info, warn};

    /// Chromium page driven over CDP
    #[derive(Debug)]
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: Arc<Mutex<CdpBrowser>>,
        page: Arc<Mutex<CdpPage>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch a new browser instance and open one blank page
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(Duration::from_millis(config.request_timeout_ms));

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                ProbeError::BrowserLaunch {
                    message: e.to_string(),
                }
            })?;

            // Spawn handler task
            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ProbeError::Page {
                    message: e.to_string(),
                })?;

            info!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "browser launched"
            );

            Ok(Self {
                config,
                browser: Arc::new(Mutex::new(browser)),
                page: Arc::new(Mutex::new(page)),
                handle,
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        async fn eval_raw(&self, expression: &str) -> ProbeResult<serde_json::Value> {
            let params = EvaluateParams::builder()
                .expression(expression)
                .return_by_value(true)
                .await_promise(true)
                .build()
                .map_err(|message| ProbeError::Evaluation { message })?;
            let page = self.page.lock().await;
            let result = page
                .evaluate_expression(params)
                .await
                .map_err(|e| ProbeError::Evaluation {
                    message: e.to_string(),
                })?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        }

        async fn eval_as<T: DeserializeOwned>(&self, expression: &str) -> ProbeResult<T> {
            let value = self.eval_raw(expression).await?;
            serde_json::from_value(value).map_err(|e| ProbeError::Evaluation {
                message: e.to_string(),
            })
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct Center {
        x: f64,
        y: f64,
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
            info!(url, "navigating");
            let page = self.page.lock().await;
            page.goto(url)
                .await
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
            let snapshots: Vec<ElementSnapshot> =
                self.eval_as(&selector.to_snapshot_query()).await?;
            Ok(snapshots
                .into_iter()
                .enumerate()
                .map(|(index, snap)| snap.into_handle(selector, index))
                .collect())
        }

        async fn click(&mut self, element: &ElementHandle) -> ProbeResult<()> {
            let center: Option<Center> = self
                .eval_as(&element.selector.to_scroll_center_query(element.index))
                .await?;
            let center = center.ok_or_else(|| ProbeError::Input {
                message: format!(
                    "element {} #{} is no longer attached",
                    element.selector, element.index
                ),
            })?;
            debug!(x = center.x, y = center.y, "dispatching click");
            let page = self.page.lock().await;
            page.click(CdpPoint::new(center.x, center.y))
                .await
                .map_err(|e| ProbeError::Input {
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn evaluate(&self, expression: &str) -> ProbeResult<serde_json::Value> {
            self.eval_raw(expression).await
        }

        async fn current_url(&self) -> ProbeResult<String> {
            let page = self.page.lock().await;
            let url = page.url().await.map_err(|e| ProbeError::Page {
                message: e.to_string(),
            })?;
            Ok(url.unwrap_or_default())
        }

        async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
            use base64::Engine;

            let page = self.page.lock().await;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot =
                page.execute(params)
                    .await
                    .map_err(|e| ProbeError::Screenshot {
                        message: e.to_string(),
                    })?;

            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| ProbeError::Screenshot {
                    message: e.to_string(),
                })
        }

        async fn close(&mut self) -> ProbeResult<()> {
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "browser process did not exit cleanly");
            }
            self.handle.abort();
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
