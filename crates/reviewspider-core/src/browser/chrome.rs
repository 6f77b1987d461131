use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use super::PageSession;
use crate::config::{BrowserOptions, Viewport};
use crate::error::{Result, ReviewError};

const TARGET: &str = "chromium";

/// A Chromium instance with a single page, closed on drop if the caller never did.
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
    current_url: String,
}

impl ChromeSession {
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if options.headful {
            builder = builder.with_head();
        }
        if let Some(proxy) = &options.proxy_url {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        let config = builder
            .build()
            .map_err(|e| ReviewError::browser("launch", TARGET, e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ReviewError::browser("launch", TARGET, e))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    debug!("Browser handler error: {:?}", h);
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ReviewError::browser("new_page", TARGET, e))?;

        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler: handle,
            current_url: "about:blank".to_string(),
        })
    }

    fn page(&self, operation: &'static str) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ReviewError::browser(operation, TARGET, "session already closed"))
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.page("goto")?
            .goto(url)
            .await
            .map_err(|e| ReviewError::browser("goto", url, e))?;
        self.current_url = url.to_string();
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.page("content")?
            .content()
            .await
            .map_err(|e| ReviewError::browser("content", self.current_url.clone(), e))
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| ReviewError::browser("set_viewport", self.current_url.clone(), e))?;
        self.page("set_viewport")?
            .execute(params)
            .await
            .map_err(|e| ReviewError::browser("set_viewport", self.current_url.clone(), e))?;
        Ok(())
    }

    async fn scroll_by(&mut self, pixels: i64) -> Result<()> {
        self.page("scroll_by")?
            .evaluate(format!("window.scrollBy(0, {})", pixels))
            .await
            .map_err(|e| ReviewError::browser("scroll_by", self.current_url.clone(), e))?;
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<i64> {
        self.page("scroll_height")?
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(|e| ReviewError::browser("scroll_height", self.current_url.clone(), e))?
            .into_value::<i64>()
            .map_err(|e| ReviewError::browser("scroll_height", self.current_url.clone(), e))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }
        if let Some(mut browser) = self.browser.take() {
            browser
                .close()
                .await
                .map_err(|e| ReviewError::browser("close", TARGET, e))?;
            if let Err(e) = browser.wait().await {
                debug!("Failed to reap browser process: {}", e);
            }
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        let (page, browser) = (self.page.take(), self.browser.take());
        if browser.is_none() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Some(page) = page {
                        if let Err(e) = page.close().await {
                            debug!("Failed to close page in Drop: {}", e);
                        }
                    }
                    if let Some(mut browser) = browser {
                        if let Err(e) = browser.close().await {
                            debug!("Failed to close browser in Drop: {}", e);
                        }
                        let _ = browser.wait().await;
                    }
                });
            }
            Err(_) => debug!("No runtime in Drop, leaving browser teardown to chromiumoxide"),
        }
    }
}
