//! Thin query layer over `kuchikiki` for the structural lookups the scraper needs.
//!
//! Trees are `Rc`-based, so parse and query inside synchronous code and hand
//! owned strings back to async callers.

use kuchikiki::traits::TendrilSink;
use kuchikiki::NodeRef;

use crate::error::{Result, ReviewError};

pub struct Markup {
    root: NodeRef,
}

impl Markup {
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchikiki::parse_html().one(html),
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeRef>> {
        select_all(&self.root, selector)
    }

    pub fn first_text(&self, selector: &str) -> Result<Option<String>> {
        first_text(&self.root, selector)
    }
}

/// All elements under `node` matching `selector`, in document order.
pub fn select_all(node: &NodeRef, selector: &str) -> Result<Vec<NodeRef>> {
    let matches = node
        .select(selector)
        .map_err(|_| ReviewError::markup("select", format!("invalid selector `{selector}`")))?;
    Ok(matches.map(|m| m.as_node().clone()).collect())
}

/// Trimmed text of the first match, `None` when nothing matches or the text is blank.
pub fn first_text(node: &NodeRef, selector: &str) -> Result<Option<String>> {
    Ok(select_all(node, selector)?.first().and_then(text_of))
}

pub fn text_of(node: &NodeRef) -> Option<String> {
    let text = node.text_contents();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><title> Shoes </title></head><body>
          <ul class="results-base">
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a>no link</a></li>
          </ul>
          <span class="pdp-price">  </span>
        </body></html>"#;

    #[test]
    fn test_select_all_keeps_document_order() {
        let markup = Markup::parse(PAGE);
        let links = markup.select_all("ul.results-base a[href]").unwrap();
        let hrefs: Vec<_> = links.iter().filter_map(|n| attr(n, "href")).collect();
        assert_eq!(hrefs, ["/a", "/b"]);
    }

    #[test]
    fn test_first_text_trims_and_skips_blank() {
        let markup = Markup::parse(PAGE);
        assert_eq!(markup.first_text("title").unwrap().as_deref(), Some("Shoes"));
        assert_eq!(markup.first_text("span.pdp-price").unwrap(), None);
        assert_eq!(markup.first_text("div.missing").unwrap(), None);
    }

    #[test]
    fn test_invalid_selector_is_markup_error() {
        let markup = Markup::parse(PAGE);
        let err = markup.select_all("ul[").unwrap_err();
        assert!(matches!(err, ReviewError::Markup { .. }));
    }
}
