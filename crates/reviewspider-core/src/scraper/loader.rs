use tokio::time::Instant;

use crate::browser::PageSession;
use crate::config::LoaderConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    pub steps: usize,
    /// `false` when a bound stopped the loop before the height stabilized.
    pub settled: bool,
}

/// Scrolls a listing until its height stops growing or the budget runs out.
pub struct LazyContentLoader {
    config: LoaderConfig,
}

impl LazyContentLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub async fn load<S>(&self, session: &mut S) -> Result<ScrollReport>
    where
        S: PageSession + ?Sized,
    {
        session.set_viewport(self.config.viewport).await?;

        let started = Instant::now();
        let mut last_height = session.scroll_height().await?;

        for step in 1..=self.config.max_scrolls {
            session.scroll_by(self.config.scroll_step).await?;
            tokio::time::sleep(self.config.settle_delay).await;

            let height = session.scroll_height().await?;
            if height == last_height {
                tracing::debug!("Review list settled after {} scrolls at height {}", step, height);
                return Ok(ScrollReport { steps: step, settled: true });
            }
            last_height = height;

            if started.elapsed() >= self.config.max_elapsed {
                tracing::warn!(
                    "Stopped scrolling after {:?} ({} scrolls), list still growing",
                    started.elapsed(),
                    step
                );
                return Ok(ScrollReport { steps: step, settled: false });
            }
        }

        tracing::warn!(
            "Stopped scrolling after {} scrolls, list still growing",
            self.config.max_scrolls
        );
        Ok(ScrollReport {
            steps: self.config.max_scrolls,
            settled: false,
        })
    }
}
