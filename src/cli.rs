use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::{FetchSettings, DEFAULT_CHUNK_SIZE};

#[derive(Parser, Debug)]
#[command(
    name = "page-mirror",
    about = "Mirror web pages and their assets into local projects",
    version,
    long_about = "Downloads each page of a project together with its images, scripts, stylesheets and the fonts/images those stylesheets reference, and rewrites the page to use the local copies."
)]
pub struct MirrorCommand {
    /// Directory that holds the `projects/` folder
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// User agent string to use for requests
    #[arg(long, global = true, default_value = "PageMirror/1.0")]
    pub user_agent: String,

    /// Timeout for requests in seconds (client default when omitted)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Size of the chunks written to disk between progress updates
    #[arg(long, global = true, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_chunk_size)]
    pub chunk_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create (or overwrite) a project and save it to the registry
    New {
        /// Project name, used as the directory under `projects/`
        name: String,

        /// Page URL to mirror (repeatable, order is kept)
        #[arg(short, long = "url", required = true)]
        urls: Vec<String>,

        /// Replace every link target with `#`
        #[arg(long)]
        replace_links: bool,

        /// Replace every form action with `#`
        #[arg(long)]
        replace_forms: bool,

        /// Start mirroring right after saving
        #[arg(long)]
        run: bool,
    },

    /// Mirror every URL of a saved project
    Run {
        /// Name of a saved project
        name: String,
    },

    /// List saved projects
    List,
}

fn parse_chunk_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("chunk size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

impl MirrorCommand {
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout.map(Duration::from_secs),
            chunk_size: self.chunk_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_new_project() {
        let args = MirrorCommand::try_parse_from(&[
            "page-mirror",
            "new",
            "docs",
            "-u", "https://example.com/a",
            "--url", "https://example.com/b",
            "--replace-forms",
        ])
        .unwrap();

        assert_eq!(args.root, PathBuf::from("."));
        assert_eq!(
            args.command,
            Command::New {
                name: "docs".to_string(),
                urls: vec![
                    "https://example.com/a".to_string(),
                    "https://example.com/b".to_string()
                ],
                replace_links: false,
                replace_forms: true,
                run: false,
            }
        );
    }

    #[test]
    fn test_parse_run_with_globals() {
        let args = MirrorCommand::try_parse_from(&[
            "page-mirror",
            "run",
            "docs",
            "--root", "/tmp/mirror",
            "--timeout", "30",
            "--chunk-size", "4096",
        ])
        .unwrap();

        assert_eq!(args.command, Command::Run { name: "docs".to_string() });
        let settings = args.fetch_settings();
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.chunk_size, 4096);
        assert_eq!(settings.user_agent, "PageMirror/1.0");
        assert_eq!(args.root, PathBuf::from("/tmp/mirror"));
    }

    #[test]
    fn test_parse_defaults() {
        let args = MirrorCommand::try_parse_from(&["page-mirror", "list"]).unwrap();
        assert_eq!(args.command, Command::List);
        assert_eq!(args.chunk_size, 1024);
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn test_parse_new_requires_url() {
        let result = MirrorCommand::try_parse_from(&["page-mirror", "new", "docs"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_chunk_size() {
        let result = MirrorCommand::try_parse_from(&["page-mirror", "list", "--chunk-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_missing_subcommand() {
        let result = MirrorCommand::try_parse_from(&["page-mirror"]);
        assert!(result.is_err());
    }
}
