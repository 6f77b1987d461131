use std::sync::Arc;
use url::Url;

use crate::browser::PageSession;
use crate::config::SiteLayout;
use crate::error::Result;
use crate::html::{self, Markup};
use crate::model::{Candidate, ProductSummary, NO_OVERALL_RATING, NO_PRICE, NO_TITLE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPage {
    pub review_url: Url,
    pub summary: ProductSummary,
}

/// Outcome of looking for a product's review listing. Failures travel as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewPageLookup {
    Found(ReviewPage),
    NotFound,
}

pub struct ReviewPageLocator {
    site: Arc<SiteLayout>,
}

impl ReviewPageLocator {
    pub fn new(site: Arc<SiteLayout>) -> Self {
        Self { site }
    }

    pub async fn locate<S>(&self, session: &mut S, candidate: &Candidate) -> Result<ReviewPageLookup>
    where
        S: PageSession + ?Sized,
    {
        session.goto(candidate.url.as_str()).await?;
        let page = session.content().await?;
        self.parse_product_page(&page)
    }

    pub fn parse_product_page(&self, page: &str) -> Result<ReviewPageLookup> {
        let markup = Markup::parse(page);

        let summary = ProductSummary {
            title: markup.first_text("title")?.unwrap_or_else(|| NO_TITLE.to_string()),
            overall_rating: markup
                .first_text(&self.site.overall_rating)?
                .unwrap_or_else(|| NO_OVERALL_RATING.to_string()),
            price: markup
                .first_text(&self.site.price)?
                .unwrap_or_else(|| NO_PRICE.to_string()),
        };

        let href = markup
            .select_all(&self.site.all_reviews_link)?
            .first()
            .and_then(|anchor| html::attr(anchor, "href"));

        let Some(href) = href else {
            return Ok(ReviewPageLookup::NotFound);
        };

        match self.site.base_url.join(href.trim()) {
            Ok(review_url) => Ok(ReviewPageLookup::Found(ReviewPage { review_url, summary })),
            Err(e) => {
                tracing::warn!("Unresolvable review link {} for '{}': {}", href, summary.title, e);
                Ok(ReviewPageLookup::NotFound)
            }
        }
    }
}
