use url::Url;

use crate::css::extract_references;
use crate::fetcher::PageFetcher;
use crate::html_parser::summarize;

/// Estimates how many assets a page run will touch.
///
/// The result is only a progress denominator. It is never reconciled with
/// what the run actually rewrites.
#[derive(Debug, Clone)]
pub struct AssetCounter {
    fetcher: PageFetcher,
}

impl AssetCounter {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Images + scripts + stylesheet links + non-`data:` `url(...)`
    /// references inside those stylesheets. Returns 0 when the page itself
    /// can't be fetched.
    pub async fn precount(&self, page_url: &Url) -> usize {
        let html = match self.fetcher.fetch_text(page_url).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("precount of {} failed: {}", page_url, e);
                return 0;
            }
        };

        let summary = summarize(&html);
        let mut total = summary.images + summary.scripts + summary.stylesheets;

        for href in &summary.stylesheet_hrefs {
            let css_url = match page_url.join(href.trim()) {
                Ok(url) => url,
                Err(e) => {
                    log::debug!("precount skipping stylesheet {}: {}", href, e);
                    continue;
                }
            };
            match self.fetcher.fetch_text(&css_url).await {
                Ok(css) => total += extract_references(&css).len(),
                Err(e) => log::debug!("precount skipping stylesheet {}: {}", css_url, e),
            }
        }

        log::debug!("precount for {}: {}", page_url, total);
        total
    }
}
