pub mod chrome;

use async_trait::async_trait;

use crate::config::Viewport;
use crate::error::Result;

pub use chrome::ChromeSession;

/// One browser tab driven step by step by the scraper.
///
/// A session is acquired once per run and closed once when the run ends.
/// `close` must be safe to call more than once.
#[async_trait]
pub trait PageSession: Send {
    /// Navigates and waits for the page load to finish.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Rendered markup of the current page.
    async fn content(&mut self) -> Result<String>;

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    async fn scroll_by(&mut self, pixels: i64) -> Result<()>;

    /// Current `document.body.scrollHeight`.
    async fn scroll_height(&mut self) -> Result<i64>;

    async fn close(&mut self) -> Result<()>;
}
