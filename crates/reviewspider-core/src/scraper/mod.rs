pub mod discovery;
pub mod extractor;
pub mod loader;
pub mod locator;
pub mod service;

pub use discovery::ProductDiscovery;
pub use extractor::ReviewExtractor;
pub use loader::{LazyContentLoader, ScrollReport};
pub use locator::{ReviewPage, ReviewPageLocator, ReviewPageLookup};
pub use service::{ReviewRequest, ReviewScraper};
