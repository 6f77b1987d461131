use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{ChromeSession, PageSession};
use crate::config::{Config, LoaderConfig, RunLimits, SiteLayout};
use crate::error::{Result, ReviewError};
use crate::model::{Candidate, Dataset};
use crate::scraper::discovery::ProductDiscovery;
use crate::scraper::extractor::ReviewExtractor;
use crate::scraper::loader::LazyContentLoader;
use crate::scraper::locator::{ReviewPage, ReviewPageLocator, ReviewPageLookup};

#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub product_name: String,
    pub product_count: usize,
}

impl ReviewRequest {
    pub fn new(product_name: impl Into<String>, product_count: usize) -> Self {
        Self {
            product_name: product_name.into(),
            product_count,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(ReviewError::invalid_input("product name cannot be empty"));
        }
        if self.product_count == 0 {
            return Err(ReviewError::invalid_input("product count must be at least 1"));
        }
        Ok(())
    }
}

enum Visit {
    Collected(Dataset),
    Skipped,
}

/// Runs one acquisition: search, then visit candidates until enough products
/// with reviews were collected or the candidates run out.
///
/// Owns its page session for the whole run and closes it exactly once in
/// [`ReviewScraper::collect`], whatever the outcome.
pub struct ReviewScraper<S: PageSession> {
    session: S,
    discovery: ProductDiscovery,
    locator: ReviewPageLocator,
    loader: LazyContentLoader,
    extractor: ReviewExtractor,
    limits: RunLimits,
}

impl ReviewScraper<ChromeSession> {
    pub async fn launch(config: &Config) -> Result<Self> {
        let session = ChromeSession::launch(&config.browser).await?;
        Ok(Self::new(
            session,
            config.site.clone(),
            config.loader.clone(),
            config.limits.clone(),
        ))
    }
}

impl<S: PageSession> ReviewScraper<S> {
    pub fn new(session: S, site: SiteLayout, loader: LoaderConfig, limits: RunLimits) -> Self {
        let site = Arc::new(site);
        Self {
            session,
            discovery: ProductDiscovery::new(site.clone()),
            locator: ReviewPageLocator::new(site.clone()),
            loader: LazyContentLoader::new(loader),
            extractor: ReviewExtractor::new(site),
            limits,
        }
    }

    pub async fn collect(mut self, request: &ReviewRequest) -> Result<Dataset> {
        let per_run = self.limits.per_run;
        let outcome = with_limit("collect reviews", per_run, self.run(request)).await;

        if let Err(e) = self.session.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }
        outcome
    }

    async fn run(&mut self, request: &ReviewRequest) -> Result<Dataset> {
        request.validate()?;

        let mut queue: VecDeque<Candidate> = self
            .discovery
            .discover(&mut self.session, &request.product_name)
            .await?
            .into();

        let target = request.product_count.min(queue.len());
        let mut tables = Vec::with_capacity(target);

        while tables.len() < target {
            let Some(candidate) = queue.pop_front() else {
                break;
            };

            let per_product = self.limits.per_product;
            match with_limit("visit product", per_product, self.visit(&candidate)).await? {
                Visit::Collected(table) => {
                    tracing::info!(
                        "Collected {} reviews from {} ({}/{})",
                        table.len(),
                        candidate.url,
                        tables.len() + 1,
                        target
                    );
                    tables.push(table);
                }
                Visit::Skipped => {
                    tracing::info!("No reviews for candidate #{} {}, skipping", candidate.position, candidate.url);
                }
            }
        }

        if tables.is_empty() {
            tracing::info!("No product reviews were found for '{}'", request.product_name.trim());
        }
        Ok(Dataset::concat(tables))
    }

    async fn visit(&mut self, candidate: &Candidate) -> Result<Visit> {
        let page = match self.locator.locate(&mut self.session, candidate).await? {
            ReviewPageLookup::Found(page) => page,
            ReviewPageLookup::NotFound => return Ok(Visit::Skipped),
        };
        self.collect_reviews(&page).await.map(Visit::Collected)
    }

    async fn collect_reviews(&mut self, page: &ReviewPage) -> Result<Dataset> {
        self.session.goto(page.review_url.as_str()).await?;
        let report = self.loader.load(&mut self.session).await?;
        tracing::debug!("Loaded {} after {} scrolls (settled: {})", page.review_url, report.steps, report.settled);

        let markup = self.session.content().await?;
        self.extractor.extract(&markup, &page.summary)
    }
}

async fn with_limit<T>(
    operation: &'static str,
    limit: Option<Duration>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .unwrap_or(Err(ReviewError::Timeout {
                operation,
                elapsed: limit,
            })),
        None => future.await,
    }
}
