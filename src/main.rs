use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};

use filing_source::cli::{Cli, Command};
use filing_source::config::{Config, ConfigManager};
use filing_source::error::SourceError;
use filing_source::error_reporter::ErrorReporter;
use filing_source::file_source::{FileOptions, FileSource};
use filing_source::http_client::Credentials;
use filing_source::output::Output;
use filing_source::web_cache::{CacheDelegate, GetOptions, NoopDelegate, WebCache};
use filing_source::{CacheCodec, FileContent};

/// Asks on the terminal for credentials and confirmations
struct ConsoleDelegate;

impl ConsoleDelegate {
    fn prompt(question: &str) -> Option<String> {
        eprint!("{}", question);
        std::io::stderr().flush().ok()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        Some(answer)
    }

    fn confirm(question: &str) -> bool {
        Self::prompt(&format!("{} [y/N] ", question))
            .map(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"))
            .unwrap_or(false)
    }
}

impl CacheDelegate for ConsoleDelegate {
    fn credentials(&self, host: &str, realm: &str) -> Option<Credentials> {
        eprintln!("Authentication required for {} (realm '{}')", host, realm);
        let user = Self::prompt("User: ")?;
        if user.is_empty() {
            return None;
        }
        let password = Self::prompt("Password: ")?;
        Some(Credentials::new(user, password))
    }

    fn confirm_unexpected_html(&self, url: &str) -> bool {
        Self::confirm(&format!(
            "{} returned an HTML page where XML was expected. Keep it anyway?",
            url
        ))
    }

    fn offer_work_offline(&self, url: &str, error: &SourceError) -> bool {
        Self::confirm(&format!(
            "Cannot retrieve {} ({}). Switch to offline mode?",
            url, error
        ))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let reporter = ErrorReporter::new(cli.verbosity());

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            reporter.report_error(&error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = ConfigManager::load_config(cli).await?;
    let output = Output::new(cli.verbosity(), cli.format);
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Command::CachePath { url } => {
            let codec = CacheCodec::new(&config.cache.directory);
            let path = codec.url_to_cache_path(url);
            write!(stdout, "{}", output.format_location("path", &path.to_string_lossy()))?;
        }
        Command::UrlOf { path } => {
            let codec = CacheCodec::new(&config.cache.directory);
            let url = codec
                .cache_path_to_url(path)
                .ok_or_else(|| anyhow!("{} is not inside the cache directory", path.display()))?;
            write!(stdout, "{}", output.format_location("url", &url))?;
        }
        Command::Clear => {
            let cache = open_cache(&config, cli).await?;
            cache.clear().await?;
        }
        Command::Fetch { url, reload } => {
            let mut cache = open_cache(&config, cli).await?;
            let result = cache
                .get_filename(url, &GetOptions::new().normalize(true).reload(*reload))
                .await;
            cache.shutdown().await?;
            let path = result?;
            write!(stdout, "{}", output.format_location("path", &path.to_string_lossy()))?;
        }
        Command::List { source } => {
            let mut cache = open_cache(&config, cli).await?;
            let mut file_source = FileSource::new(source, cli.xml_is_eis);
            let opened = file_source.open(Some(&mut cache)).await;
            cache.shutdown().await?;
            if !opened {
                return Err(match file_source.take_open_error() {
                    Some(e) => e.into(),
                    None => anyhow!("{} is not an archive or feed", source),
                });
            }
            let listing = file_source
                .dir()
                .ok_or_else(|| anyhow!("{} has no listing", source))?;
            write!(
                stdout,
                "{}",
                output.format_listing(source, file_source.kind(), listing)
            )?;
            file_source.close();
        }
        Command::Cat { path, binary } => {
            let mut cache = open_cache(&config, cli).await?;
            let options = if *binary {
                FileOptions::binary()
            } else {
                FileOptions::text()
            };
            let mut file_source = FileSource::new(path, cli.xml_is_eis);
            let content = file_source.file(path, &options, Some(&mut cache)).await;
            file_source.close();
            cache.shutdown().await?;
            match content? {
                FileContent::Binary(buffer) => stdout.write_all(buffer.as_bytes())?,
                FileContent::Text { buffer, .. } => stdout.write_all(buffer.as_bytes())?,
            }
        }
    }
    stdout.flush().context("cannot write to stdout")?;
    Ok(())
}

async fn open_cache(config: &Config, cli: &Cli) -> anyhow::Result<WebCache> {
    let delegate: Arc<dyn CacheDelegate> = if cli.is_interactive() {
        Arc::new(ConsoleDelegate)
    } else {
        Arc::new(NoopDelegate)
    };
    let mut cache = WebCache::new(config, delegate)?;
    cache.init().await;
    Ok(cache)
}
