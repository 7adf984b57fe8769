use regex::Regex;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::fetcher::PageFetcher;
use crate::file_manager::FileManager;
use crate::progress::ProgressTracker;
use crate::resolver::{AssetResolver, ReferenceOrigin};

/// A `url(...)` token found in stylesheet text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssReference {
    /// The whole matched token, e.g. `url('a.png')`.
    pub token: String,
    /// Quote character used inside the parentheses, if any.
    pub quote: Option<char>,
    pub value: String,
}

impl CssReference {
    fn with_value(&self, value: &str) -> String {
        match self.quote {
            Some(q) => format!("url({q}{value}{q})"),
            None => format!("url({value})"),
        }
    }
}

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"url\(\s*(['"]?)(.*?)['"]?\s*\)"#).ok())
        .as_ref()
}

/// All non-`data:` `url(...)` references, in order of appearance.
pub fn extract_references(css: &str) -> Vec<CssReference> {
    let Some(pattern) = url_pattern() else {
        return Vec::new();
    };

    pattern
        .captures_iter(css)
        .filter_map(|cap| {
            let value = cap.get(2)?.as_str();
            if value.is_empty() || value.starts_with("data:") {
                return None;
            }
            Some(CssReference {
                token: cap.get(0)?.as_str().to_string(),
                quote: cap.get(1).and_then(|q| q.as_str().chars().next()),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Downloads the resources a stylesheet references and points them at the
/// local copies.
#[derive(Debug, Clone)]
pub struct CssRewriter {
    fetcher: PageFetcher,
    resolver: AssetResolver,
}

impl CssRewriter {
    pub fn new(fetcher: PageFetcher, resolver: AssetResolver) -> Self {
        Self { fetcher, resolver }
    }

    /// Returns the rewritten text. Tokens whose download fails are left as
    /// they were; every successful download advances `tracker`.
    pub async fn rewrite(
        &self,
        css_text: &str,
        css_url: &Url,
        files: &FileManager,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> String {
        let mut rewritten = css_text.to_string();

        for reference in extract_references(css_text) {
            if cancel.is_cancelled() {
                break;
            }

            let asset = match self
                .resolver
                .resolve(css_url, &reference.value, ReferenceOrigin::CssUrl)
            {
                Ok(asset) => asset,
                Err(e) => {
                    log::warn!("skipping {} in {}: {}", reference.value, css_url, e);
                    continue;
                }
            };

            let destination = files.asset_path(asset.kind, &asset.local_name);
            if self
                .fetcher
                .download(&asset.source_url, &destination, tracker.sink(), cancel)
                .await
            {
                let replacement = reference.with_value(&asset.stylesheet_relative_path());
                rewritten = rewritten.replace(&reference.token, &replacement);
                tracker.advance();
            }
        }

        rewritten
    }
}
