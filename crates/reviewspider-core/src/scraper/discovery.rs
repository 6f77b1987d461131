use std::sync::Arc;
use url::Url;

use crate::browser::PageSession;
use crate::config::SiteLayout;
use crate::error::{Result, ReviewError};
use crate::html::{self, Markup};
use crate::model::Candidate;

/// Turns a product name into the ordered product pages of one search.
pub struct ProductDiscovery {
    site: Arc<SiteLayout>,
}

impl ProductDiscovery {
    pub fn new(site: Arc<SiteLayout>) -> Self {
        Self { site }
    }

    /// `<base>/<slug>?rawQuery=<slug>`, where the slug joins the name's words with `-`.
    pub fn search_url(&self, product_name: &str) -> Result<Url> {
        let slug = product_name.split_whitespace().collect::<Vec<_>>().join("-");
        if slug.is_empty() {
            return Err(ReviewError::invalid_input("product name cannot be empty"));
        }

        let mut url = self.site.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReviewError::markup("search_url", "site url cannot be a base"))?
            .pop_if_empty()
            .push(&slug);
        url.query_pairs_mut().append_pair("rawQuery", &slug);
        Ok(url)
    }

    pub async fn discover<S>(&self, session: &mut S, product_name: &str) -> Result<Vec<Candidate>>
    where
        S: PageSession + ?Sized,
    {
        let url = self.search_url(product_name)?;
        tracing::info!("Searching products: {}", url);

        session.goto(url.as_str()).await?;
        let page = session.content().await?;
        let candidates = self.parse_results(&page)?;

        if candidates.is_empty() {
            tracing::info!("No products found for '{}'", product_name.trim());
        } else {
            tracing::debug!("Found {} candidate products", candidates.len());
        }
        Ok(candidates)
    }

    /// Every link inside the results containers, in page order.
    pub fn parse_results(&self, page: &str) -> Result<Vec<Candidate>> {
        let markup = Markup::parse(page);
        let mut candidates = Vec::new();

        for container in markup.select_all(&self.site.results_container)? {
            for anchor in html::select_all(&container, "a[href]")? {
                let Some(href) = html::attr(&anchor, "href") else {
                    continue;
                };
                match self.site.base_url.join(href.trim()) {
                    Ok(url) => candidates.push(Candidate {
                        url,
                        position: candidates.len(),
                    }),
                    Err(e) => tracing::warn!("Skipping unresolvable product link {}: {}", href, e),
                }
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery() -> ProductDiscovery {
        ProductDiscovery::new(Arc::new(SiteLayout::parse("https://shop.test/").unwrap()))
    }

    #[test]
    fn test_search_url_uses_hyphenated_slug() {
        let url = discovery().search_url("  red   shoes ").unwrap();
        assert_eq!(url.as_str(), "https://shop.test/red-shoes?rawQuery=red-shoes");
    }

    #[test]
    fn test_search_url_rejects_blank_name() {
        assert!(discovery().search_url(" \t ").unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_parse_results_resolves_links_in_order() {
        let page = r#"
            <ul class="results-base">
              <li><a href="shoes/nike/air/101/buy">Nike</a></li>
              <li><a href="/shoes/puma/speed/202/buy">Puma</a></li>
            </ul>
            <ul class="results-base"><li><a href="https://cdn.test/x">X</a></li></ul>
            <a href="/outside">ignored</a>"#;
        let candidates = discovery().parse_results(page).unwrap();
        let urls: Vec<_> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://shop.test/shoes/nike/air/101/buy",
                "https://shop.test/shoes/puma/speed/202/buy",
                "https://cdn.test/x",
            ]
        );
        assert_eq!(candidates[2].position, 2);
    }

    #[test]
    fn test_parse_results_without_container_is_empty() {
        let candidates = discovery().parse_results("<html><body><p>Nothing</p></body></html>").unwrap();
        assert!(candidates.is_empty());
    }
}
