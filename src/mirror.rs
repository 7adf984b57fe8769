use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::counter::AssetCounter;
use crate::css::CssRewriter;
use crate::error::{MirrorError, Result};
use crate::fetcher::{FetchSettings, PageFetcher};
use crate::file_manager::FileManager;
use crate::html_parser::{ElementKind, ElementRef, MarkupDocument};
use crate::progress::{MirrorStep, ProgressSink, ProgressTracker};
use crate::project::{Project, ProjectLock};
use crate::resolver::{AssetResolver, ResolvedAsset};

/// Outcome of mirroring a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub url: String,
    /// Written markup file; `None` only if the run aborted before the page
    /// was fetched.
    pub output: Option<PathBuf>,
    pub completed: usize,
    pub total: usize,
    /// Source URLs of assets left pointing at the remote copy.
    pub failed: Vec<String>,
    /// Either [`MirrorStep::Done`] or [`MirrorStep::Aborted`].
    pub state: MirrorStep,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectReport {
    pub pages: Vec<PageReport>,
    /// Pages that could not be fetched at all, with the reason.
    pub failed_pages: Vec<(String, String)>,
    pub aborted: bool,
}

/// Mirrors pages of a project one at a time, assets strictly in order.
#[derive(Debug, Clone)]
pub struct PageMirror {
    fetcher: PageFetcher,
    resolver: AssetResolver,
    counter: AssetCounter,
    css: CssRewriter,
}

impl PageMirror {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        Ok(Self::with_fetcher(PageFetcher::new(settings)?))
    }

    pub fn with_fetcher(fetcher: PageFetcher) -> Self {
        let resolver = AssetResolver::new();
        Self {
            counter: AssetCounter::new(fetcher.clone()),
            css: CssRewriter::new(fetcher.clone(), resolver),
            fetcher,
            resolver,
        }
    }

    /// Runs every URL of `project` in list order.
    ///
    /// A page that can't be fetched is recorded and skipped; cancellation
    /// stops the run after the current page has written its output.
    pub async fn mirror_project(
        &self,
        project: &Project,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ProjectReport> {
        let _lock = ProjectLock::acquire(project.name())?;
        let mut report = ProjectReport::default();

        for url in project.urls() {
            if cancel.is_cancelled() {
                report.aborted = true;
                break;
            }

            match self.mirror_page(project, url, sink, cancel).await {
                Ok(page) => {
                    let aborted = page.state == MirrorStep::Aborted;
                    report.pages.push(page);
                    if aborted {
                        report.aborted = true;
                        break;
                    }
                }
                Err(e) => {
                    log::error!("error processing {}: {}", url, e);
                    report.failed_pages.push((url.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Mirrors one page into the project directory.
    ///
    /// Only page-level failures are returned as errors. Asset failures leave
    /// the original reference in place and show up in [`PageReport::failed`].
    pub async fn mirror_page(
        &self,
        project: &Project,
        url: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PageReport> {
        let page_url = Url::parse(url).map_err(|source| MirrorError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let step = |current: MirrorStep| {
            log::debug!("{}: {}", url, current);
            sink.on_step(url, current);
        };
        let aborted_early = |total: usize| {
            step(MirrorStep::Aborted);
            PageReport {
                url: url.to_string(),
                output: None,
                completed: 0,
                total,
                failed: Vec::new(),
                state: MirrorStep::Aborted,
            }
        };

        step(MirrorStep::Init);
        if cancel.is_cancelled() {
            return Ok(aborted_early(0));
        }

        step(MirrorStep::Precount);
        let total = self.counter.precount(&page_url).await;
        let mut tracker = ProgressTracker::new(total, sink);
        tracker.announce();
        if cancel.is_cancelled() {
            return Ok(aborted_early(total));
        }

        step(MirrorStep::FetchPage);
        let html = self
            .fetcher
            .fetch_text(&page_url)
            .await
            .map_err(|source| MirrorError::PageFetch {
                url: url.to_string(),
                source,
            })?;
        let references = MarkupDocument::parse(&html)
            .map_err(|source| MirrorError::Parse {
                url: url.to_string(),
                source,
            })?
            .references();

        if project.replace_links() {
            step(MirrorStep::StripLinks);
        }
        if project.replace_forms() {
            step(MirrorStep::StripForms);
        }

        let files = project.files();
        let mut rewrites: Vec<(ElementRef, String)> = Vec::new();
        let mut failed = Vec::new();
        let mut aborted = false;

        'kinds: for kind in ElementKind::ORDER {
            step(match kind {
                ElementKind::Image => MirrorStep::ProcessImages,
                ElementKind::Script => MirrorStep::ProcessScripts,
                ElementKind::Stylesheet => MirrorStep::ProcessStylesheets,
            });

            for element in references.iter().filter(|r| r.kind == kind) {
                if cancel.is_cancelled() {
                    aborted = true;
                    break 'kinds;
                }

                let asset = match self
                    .resolver
                    .resolve(&page_url, &element.reference, kind.origin())
                {
                    Ok(asset) => asset,
                    Err(e) => {
                        log::warn!("skipping {} on {}: {}", element.reference, url, e);
                        failed.push(element.reference.clone());
                        continue;
                    }
                };

                let mirrored = match kind {
                    ElementKind::Stylesheet => {
                        self.mirror_stylesheet(&asset, files, &mut tracker, cancel)
                            .await
                    }
                    ElementKind::Image | ElementKind::Script => {
                        let destination = files.asset_path(asset.kind, &asset.local_name);
                        self.fetcher
                            .download(&asset.source_url, &destination, sink, cancel)
                            .await
                    }
                };

                if mirrored {
                    rewrites.push((element.clone(), asset.page_relative_path()));
                    tracker.advance();
                } else {
                    failed.push(asset.source_url.to_string());
                }

                if cancel.is_cancelled() {
                    aborted = true;
                    break 'kinds;
                }
            }
        }

        // Partial output is still written on abort so it matches what landed on disk.
        step(MirrorStep::WriteOutput);
        let markup = render(&html, &rewrites, project.replace_links(), project.replace_forms())
            .map_err(|source| MirrorError::Parse {
                url: url.to_string(),
                source,
            })?;
        let output = files.save_page(&page_url, &markup)?;

        let state = if aborted {
            MirrorStep::Aborted
        } else {
            MirrorStep::Done
        };
        step(state);
        log::info!(
            "saved {} to {:?} ({}/{} assets)",
            url,
            output,
            tracker.completed(),
            tracker.total()
        );

        Ok(PageReport {
            url: url.to_string(),
            output: Some(output),
            completed: tracker.completed(),
            total: tracker.total(),
            failed,
            state,
        })
    }

    /// Fetches a stylesheet, mirrors what it references and writes the
    /// rewritten copy into `css/`.
    ///
    /// A cancelled rewrite still saves the sheet with the references that
    /// were mirrored before the cancel, so the tracked count matches disk.
    async fn mirror_stylesheet(
        &self,
        asset: &ResolvedAsset,
        files: &FileManager,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> bool {
        let css = match self.fetcher.fetch_text(&asset.source_url).await {
            Ok(css) => css,
            Err(e) => {
                log::warn!("error downloading stylesheet {}: {}", asset.source_url, e);
                return false;
            }
        };

        let rewritten = self
            .css
            .rewrite(&css, &asset.source_url, files, tracker, cancel)
            .await;

        let path = files.asset_path(asset.kind, &asset.local_name);
        match files.save_text(&path, &rewritten) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("error saving stylesheet {}: {}", asset.source_url, e);
                false
            }
        }
    }
}

/// Re-parses the page and applies the placeholder strips and every
/// successful rewrite in discovery order.
fn render(
    html: &str,
    rewrites: &[(ElementRef, String)],
    replace_links: bool,
    replace_forms: bool,
) -> std::io::Result<String> {
    let document = MarkupDocument::parse(html)?;
    if replace_links {
        document.strip_links();
    }
    if replace_forms {
        document.strip_forms();
    }
    for (element, local_path) in rewrites {
        document.rewrite(element, local_path);
    }
    document.serialize()
}
