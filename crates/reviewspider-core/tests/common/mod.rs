#![allow(dead_code)]

use async_trait::async_trait;
use reviewspider_core::browser::PageSession;
use reviewspider_core::scraper::ProductDiscovery;
use reviewspider_core::{LoaderConfig, Result, ReviewError, RunLimits, SiteLayout, Viewport};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://shop.test/";

#[derive(Debug, Default)]
pub struct SessionLog {
    pub visited: Vec<String>,
    pub scrolls: usize,
    pub closes: usize,
    pub viewport: Option<Viewport>,
}

/// Serves canned pages by URL and scripted scroll heights.
pub struct FakeSession {
    pages: HashMap<String, String>,
    current: Option<String>,
    heights: VecDeque<i64>,
    last_height: i64,
    grow_forever: bool,
    fail_on: Option<String>,
    log: Arc<Mutex<SessionLog>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            current: None,
            heights: VecDeque::new(),
            last_height: 1000,
            grow_forever: false,
            fail_on: None,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn heights(mut self, heights: &[i64]) -> Self {
        self.heights = heights.iter().copied().collect();
        self
    }

    pub fn growing(mut self) -> Self {
        self.grow_forever = true;
        self
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.fail_on = Some(url.to_string());
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        self.log.clone()
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(url) {
            return Err(ReviewError::browser("goto", url, "connection reset"));
        }
        self.log.lock().unwrap().visited.push(url.to_string());
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.log.lock().unwrap().viewport = Some(viewport);
        Ok(())
    }

    async fn scroll_by(&mut self, _pixels: i64) -> Result<()> {
        self.log.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<i64> {
        if let Some(height) = self.heights.pop_front() {
            self.last_height = height;
        } else if self.grow_forever {
            self.last_height += 1000;
        }
        Ok(self.last_height)
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

pub fn site() -> SiteLayout {
    SiteLayout::parse(BASE).unwrap()
}

pub fn fast_loader() -> LoaderConfig {
    LoaderConfig {
        settle_delay: Duration::ZERO,
        max_scrolls: 5,
        ..LoaderConfig::default()
    }
}

pub fn no_limits() -> RunLimits {
    RunLimits {
        per_product: None,
        per_run: None,
    }
}

pub fn search_url(product_name: &str) -> String {
    ProductDiscovery::new(Arc::new(site()))
        .search_url(product_name)
        .unwrap()
        .to_string()
}

pub fn search_page(product_paths: &[&str]) -> String {
    let items: String = product_paths
        .iter()
        .map(|path| format!(r#"<li><a href="{}">product</a></li>"#, path))
        .collect();
    format!(r#"<html><body><ul class="results-base">{}</ul></body></html>"#, items)
}

pub fn product_page(title: &str, review_path: Option<&str>) -> String {
    let link = review_path
        .map(|path| format!(r#"<a class="detailed-reviews-allReviews" href="{}">All reviews</a>"#, path))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{}</title></head><body>
             <div class="index-overallRating"><div>4.2</div></div>
             <span class="pdp-price">Rs. 1499</span>
             {}
           </body></html>"#,
        title, link
    )
}

pub fn review_block(rating: &str, comment: &str, name: &str, date: &str) -> String {
    format!(
        r#"<div class="user-review-main user-review-showRating"><span class="user-review-starRating">{}</span></div>
           <div class="user-review-reviewTextWrapper">{}</div>
           <div class="user-review-left"><span>{}</span><span>{}</span></div>"#,
        rating, comment, name, date
    )
}

pub fn review_page(containers: &[String]) -> String {
    let body: String = containers
        .iter()
        .map(|inner| format!(r#"<div class="detailed-reviews-userReviewsContainer">{}</div>"#, inner))
        .collect();
    format!("<html><body>{}</body></html>", body)
}
