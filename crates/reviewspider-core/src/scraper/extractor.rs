use kuchikiki::NodeRef;
use std::sync::Arc;

use crate::config::SiteLayout;
use crate::error::Result;
use crate::html::{self, Markup};
use crate::model::{
    Dataset, ProductSummary, ReviewRecord, NO_COMMENT, NO_DATE, NO_NAME, NO_RATING,
};

/// Pairs rating, comment and reviewer blocks into records.
///
/// Blocks are matched by position inside each review container. Within one
/// container only the first `min(ratings, comments, reviewers)` positions are
/// kept; surplus blocks are dropped. Containers never borrow blocks from each
/// other.
pub struct ReviewExtractor {
    site: Arc<SiteLayout>,
}

impl ReviewExtractor {
    pub fn new(site: Arc<SiteLayout>) -> Self {
        Self { site }
    }

    pub fn extract(&self, page: &str, summary: &ProductSummary) -> Result<Dataset> {
        let markup = Markup::parse(page);
        let mut dataset = Dataset::new();

        for container in markup.select_all(&self.site.review_container)? {
            let ratings = html::select_all(&container, &self.site.rating_block)?;
            let comments = html::select_all(&container, &self.site.comment_block)?;
            let reviewers = html::select_all(&container, &self.site.reviewer_block)?;

            let aligned = ratings.len().min(comments.len()).min(reviewers.len());
            if aligned < ratings.len().max(comments.len()).max(reviewers.len()) {
                tracing::debug!(
                    "Truncating review blocks to {} (ratings {}, comments {}, reviewers {})",
                    aligned,
                    ratings.len(),
                    comments.len(),
                    reviewers.len()
                );
            }

            for ((rating, comment), reviewer) in ratings.iter().zip(&comments).zip(&reviewers) {
                let (reviewer_name, date) = reviewer_fields(reviewer);
                dataset.push(ReviewRecord {
                    product_name: summary.title.clone(),
                    overall_rating: summary.overall_rating.clone(),
                    price: summary.price.clone(),
                    date,
                    rating: html::first_text(rating, &self.site.rating_value)?
                        .unwrap_or_else(|| NO_RATING.to_string()),
                    reviewer_name,
                    comment: html::text_of(comment).unwrap_or_else(|| NO_COMMENT.to_string()),
                });
            }
        }

        Ok(dataset)
    }
}

/// Reviewer blocks hold the name in their first `span` and the date in the second.
fn reviewer_fields(reviewer: &NodeRef) -> (String, String) {
    let spans = html::select_all(reviewer, "span").unwrap_or_default();
    let name = spans.first().and_then(html::text_of);
    let date = spans.get(1).and_then(html::text_of);
    (
        name.unwrap_or_else(|| NO_NAME.to_string()),
        date.unwrap_or_else(|| NO_DATE.to_string()),
    )
}
