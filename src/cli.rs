use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Read files from disk, the web cache, or inside filing archives
#[derive(Parser, Debug, Clone)]
#[command(name = "filing-source")]
#[command(about = "Fetch, cache and list files inside ZIP, tar.gz, EIS, XFD and RSS sources")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Human, global = true)]
    pub format: OutputFormat,

    /// Web cache directory
    #[arg(long = "cache-dir", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Hours before a cached file is rechecked against the server
    #[arg(long = "max-age-hours", global = true)]
    pub max_age_hours: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout: Option<u64>,

    /// Number of retry attempts for failed downloads
    #[arg(long = "retry-attempts", global = true)]
    pub retry_attempts: Option<u32>,

    /// Proxy: `system`, `none`, or `[scheme://][user:password@]host[:port]`
    #[arg(long = "proxy", global = true)]
    pub proxy: Option<String>,

    /// Never contact servers; use only cached files
    #[arg(long = "offline", global = true)]
    pub offline: bool,

    /// Never prompt, even on a terminal
    #[arg(long = "no-prompt", global = true)]
    pub no_prompt: bool,

    /// Probe `.xml` paths for EDGAR submission envelopes
    #[arg(long = "xml-is-eis", global = true)]
    pub xml_is_eis: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download a URL into the cache and print the cached file path
    Fetch {
        url: String,
        /// Download even when a fresh copy is cached
        #[arg(long = "reload")]
        reload: bool,
    },
    /// List the members of an archive or the filings of an RSS feed
    List { source: String },
    /// Print a file, which may live inside an archive
    Cat {
        path: String,
        /// Write raw bytes instead of decoded text
        #[arg(long = "binary")]
        binary: bool,
    },
    /// Print the cache path a URL maps to
    CachePath { url: String },
    /// Print the URL a cache path came from
    UrlOf { path: PathBuf },
    /// Remove every cached file
    Clear,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Prompts are allowed when stdin and stderr are terminals
    pub fn is_interactive(&self) -> bool {
        !self.no_prompt && atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stderr)
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.timeout {
            return Err("Timeout must be greater than 0".to_string());
        }
        if let Some(path) = &self.config
            && !path.exists()
        {
            return Err(format!("Config file does not exist: {}", path.display()));
        }
        Ok(())
    }
}
