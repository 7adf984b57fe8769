use std::fmt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Coarse, per-asset progress for one page run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetProgress {
    pub completed: usize,
    pub total: usize,
}

/// Fine, per-chunk progress for the file currently downloading.
///
/// `total_bytes` is zero when the server did not declare a content length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProgress {
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub name: String,
}

/// Steps of the per-page state machine, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStep {
    Init,
    Precount,
    FetchPage,
    StripLinks,
    StripForms,
    ProcessImages,
    ProcessScripts,
    ProcessStylesheets,
    WriteOutput,
    Done,
    Aborted,
}

impl fmt::Display for MirrorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MirrorStep::Init => "init",
            MirrorStep::Precount => "precount",
            MirrorStep::FetchPage => "fetch page",
            MirrorStep::StripLinks => "strip links",
            MirrorStep::StripForms => "strip forms",
            MirrorStep::ProcessImages => "images",
            MirrorStep::ProcessScripts => "scripts",
            MirrorStep::ProcessStylesheets => "stylesheets",
            MirrorStep::WriteOutput => "write output",
            MirrorStep::Done => "done",
            MirrorStep::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Receives progress and status notifications from a mirror run.
///
/// Calls arrive synchronously from inside the download flow, possibly on a
/// different thread than the one that started the run, so implementations
/// must return quickly.
pub trait ProgressSink: Send + Sync {
    fn on_asset_progress(&self, _progress: AssetProgress) {}

    fn on_file_progress(&self, _progress: FileProgress) {}

    fn on_step(&self, _url: &str, _step: MirrorStep) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

/// Forwards every event onto an unbounded channel per granularity.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    assets: UnboundedSender<AssetProgress>,
    files: UnboundedSender<FileProgress>,
    steps: UnboundedSender<(String, MirrorStep)>,
}

#[derive(Debug)]
pub struct ProgressReceivers {
    pub assets: UnboundedReceiver<AssetProgress>,
    pub files: UnboundedReceiver<FileProgress>,
    pub steps: UnboundedReceiver<(String, MirrorStep)>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, ProgressReceivers) {
        let (assets_tx, assets_rx) = unbounded_channel();
        let (files_tx, files_rx) = unbounded_channel();
        let (steps_tx, steps_rx) = unbounded_channel();
        (
            Self {
                assets: assets_tx,
                files: files_tx,
                steps: steps_tx,
            },
            ProgressReceivers {
                assets: assets_rx,
                files: files_rx,
                steps: steps_rx,
            },
        )
    }
}

impl ProgressSink for ChannelProgressSink {
    // A dropped receiver just means nobody is watching anymore.
    fn on_asset_progress(&self, progress: AssetProgress) {
        let _ = self.assets.send(progress);
    }

    fn on_file_progress(&self, progress: FileProgress) {
        let _ = self.files.send(progress);
    }

    fn on_step(&self, url: &str, step: MirrorStep) {
        let _ = self.steps.send((url.to_string(), step));
    }
}

/// Completed/total bookkeeping for one page run.
///
/// `total` is fixed at construction from the precount and never adjusted,
/// even when the actual number of rewritten assets differs.
pub struct ProgressTracker<'a> {
    completed: usize,
    total: usize,
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(total: usize, sink: &'a dyn ProgressSink) -> Self {
        Self {
            completed: 0,
            total,
            sink,
        }
    }

    /// Emits the current state without changing it.
    pub fn announce(&self) {
        self.sink.on_asset_progress(AssetProgress {
            completed: self.completed,
            total: self.total,
        });
    }

    /// Records one more rewritten asset and emits the coarse event.
    pub fn advance(&mut self) {
        self.completed += 1;
        self.announce();
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn sink(&self) -> &'a dyn ProgressSink {
        self.sink
    }
}
