//! Output formatting for listings and fetch results

use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::file_source::DirectoryListing;
use crate::formats::SourceKind;
use crate::formats::rss::RssItem;

/// Output formatter for human-readable or JSON results
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

#[derive(Serialize)]
struct ListingJson<'a> {
    source: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a [RssItem]>,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout) && format == OutputFormat::Human,
        }
    }

    pub fn plain(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Members of an archive, or the filings of a feed
    pub fn format_listing(
        &self,
        source: &str,
        kind: SourceKind,
        listing: &DirectoryListing,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = match listing {
                    DirectoryListing::Members(names) => ListingJson {
                        source,
                        kind: kind.as_str(),
                        members: Some(names.as_slice()),
                        items: None,
                    },
                    DirectoryListing::Feed(items) => ListingJson {
                        source,
                        kind: kind.as_str(),
                        members: None,
                        items: Some(items.as_slice()),
                    },
                };
                let mut text = serde_json::to_string_pretty(&json).unwrap_or_default();
                text.push('\n');
                text
            }
            OutputFormat::Human => self.format_listing_human(source, kind, listing),
        }
    }

    fn format_listing_human(
        &self,
        source: &str,
        kind: SourceKind,
        listing: &DirectoryListing,
    ) -> String {
        let mut output = String::new();
        if self.verbosity >= VerbosityLevel::Normal {
            output.push_str(&format!(
                "{} {} ({}, {} entr{})\n",
                self.colorize("Source:", "36"),
                source,
                kind,
                listing.len(),
                if listing.len() == 1 { "y" } else { "ies" }
            ));
        }
        match listing {
            DirectoryListing::Members(names) => {
                for name in names {
                    output.push_str(&format!("  {}\n", name));
                }
            }
            DirectoryListing::Feed(items) => {
                for item in items {
                    output.push_str(&format!(
                        "  {}  {}\n",
                        self.colorize(&item.title, "32"),
                        item.instance_url
                    ));
                    if self.verbosity >= VerbosityLevel::Verbose {
                        output.push_str(&format!("    {}\n", item.pub_date));
                        for line in item.tooltip.lines() {
                            output.push_str(&format!("    {}\n", line.trim()));
                        }
                    }
                }
            }
        }
        output
    }

    /// A single path or URL result, as printed by `fetch`, `cache-path` and `url-of`
    pub fn format_location(&self, label: &str, value: &str) -> String {
        match self.format {
            OutputFormat::Json => format!("{}\n", serde_json::json!({ label: value })),
            OutputFormat::Human => format!("{}\n", value),
        }
    }
}
