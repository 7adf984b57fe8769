pub mod cli;
pub mod counter;
pub mod css;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod mirror;
pub mod progress;
pub mod project;
pub mod resolver;

// Re-export main types for convenience
pub use cli::MirrorCommand;
pub use counter::AssetCounter;
pub use css::{extract_references, CssReference, CssRewriter};
pub use error::{FetchError, MirrorError};
pub use fetcher::{FetchSettings, PageFetcher};
pub use file_manager::{output_file_name, FileManager};
pub use mirror::{PageMirror, PageReport, ProjectReport};
pub use progress::{
    AssetProgress, ChannelProgressSink, FileProgress, MirrorStep, NoopProgress, ProgressReceivers,
    ProgressSink, ProgressTracker,
};
pub use project::{Project, ProjectLock, ProjectRecord, ProjectStore, Registry};
pub use resolver::{AssetKind, AssetResolver, ReferenceOrigin, ResolvedAsset};
