use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Result, ReviewError};

pub const DEFAULT_SITE_URL: &str = "https://www.myntra.com/";
pub const DEFAULT_BACKUP_DIR: &str = "data_backup";

/// Where the shop lives and how its pages are shaped.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub base_url: Url,
    pub results_container: String,
    pub overall_rating: String,
    pub price: String,
    pub all_reviews_link: String,
    pub review_container: String,
    pub rating_block: String,
    pub rating_value: String,
    pub comment_block: String,
    pub reviewer_block: String,
}

impl SiteLayout {
    pub fn for_site(base_url: Url) -> Self {
        Self {
            base_url,
            results_container: "ul.results-base".to_string(),
            overall_rating: "div.index-overallRating div".to_string(),
            price: "span.pdp-price".to_string(),
            all_reviews_link: "a.detailed-reviews-allReviews".to_string(),
            review_container: "div.detailed-reviews-userReviewsContainer".to_string(),
            rating_block: "div.user-review-main.user-review-showRating".to_string(),
            rating_value: "span.user-review-starRating".to_string(),
            comment_block: "div.user-review-reviewTextWrapper".to_string(),
            reviewer_block: "div.user-review-left".to_string(),
        }
    }

    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| ReviewError::invalid_input(format!("site url `{base_url}`: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ReviewError::invalid_input(format!(
                "site url `{base_url}` cannot be used as a base"
            )));
        }
        Ok(Self::for_site(url))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    pub proxy_url: Option<String>,
    pub headful: bool,
}

/// Scroll-until-stable settings. Both bounds apply; whichever hits first stops the loop.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub viewport: Viewport,
    pub scroll_step: i64,
    pub settle_delay: Duration,
    pub max_scrolls: usize,
    pub max_elapsed: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            scroll_step: 1000,
            settle_delay: Duration::from_secs(3),
            max_scrolls: 60,
            max_elapsed: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunLimits {
    pub per_product: Option<Duration>,
    pub per_run: Option<Duration>,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            per_product: Some(Duration::from_secs(600)),
            per_run: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Primary endpoint; `None` starts the gateway offline.
    pub url: Option<String>,
    pub backup_dir: PathBuf,
    pub force_offline: bool,
    /// Stay offline after the first primary failure instead of retrying each call.
    pub remember_offline: bool,
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            force_offline: false,
            remember_offline: true,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteLayout,
    pub browser: BrowserOptions,
    pub loader: LoaderConfig,
    pub limits: RunLimits,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| {
            var(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };

        let site_url = var("REVIEW_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());

        Ok(Self {
            site: SiteLayout::parse(&site_url)?,
            browser: BrowserOptions {
                proxy_url: var("PROXY_SERVER"),
                headful: flag("REVIEW_BROWSER_HEADFUL"),
            },
            loader: LoaderConfig::default(),
            limits: RunLimits::default(),
            store: StoreConfig {
                url: var("REVIEW_STORE_URL"),
                backup_dir: var("REVIEW_BACKUP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
                force_offline: flag("REVIEW_OFFLINE"),
                ..StoreConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.site.base_url.as_str(), DEFAULT_SITE_URL);
        assert!(config.store.url.is_none());
        assert_eq!(config.store.backup_dir, PathBuf::from(DEFAULT_BACKUP_DIR));
        assert!(!config.store.force_offline);
        assert!(config.store.remember_offline);
    }

    #[test]
    fn test_reads_store_and_browser_settings() {
        let config = Config::from_lookup(lookup(&[
            ("REVIEW_STORE_URL", "redis://127.0.0.1/"),
            ("REVIEW_BACKUP_DIR", "/tmp/reviews"),
            ("REVIEW_OFFLINE", "TRUE"),
            ("PROXY_SERVER", "http://proxy:3128"),
            ("REVIEW_SITE_URL", "https://shop.test/"),
        ]))
        .unwrap();

        assert_eq!(config.store.url.as_deref(), Some("redis://127.0.0.1/"));
        assert_eq!(config.store.backup_dir, PathBuf::from("/tmp/reviews"));
        assert!(config.store.force_offline);
        assert_eq!(config.browser.proxy_url.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.site.base_url.host_str(), Some("shop.test"));
    }

    #[test]
    fn test_blank_store_url_means_offline() {
        let config = Config::from_lookup(lookup(&[("REVIEW_STORE_URL", "   ")])).unwrap();
        assert!(config.store.url.is_none());
    }

    #[test]
    fn test_rejects_unusable_site_url() {
        let err = Config::from_lookup(lookup(&[("REVIEW_SITE_URL", "mailto:shop@test")])).unwrap_err();
        assert!(err.is_invalid_input());
    }
}
