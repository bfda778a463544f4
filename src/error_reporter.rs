use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::SourceError;

/// Error reporter with configurable verbosity
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_timestamps: false,
        }
    }

    pub fn with_timestamps(verbosity: VerbosityLevel, show_timestamps: bool) -> Self {
        Self {
            verbosity,
            show_timestamps,
        }
    }

    /// Report a source error with appropriate verbosity
    pub fn report_source_error(&self, error: &SourceError) {
        eprintln!("{}", self.format_source_error(error));
    }

    pub fn format_source_error(&self, error: &SourceError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => self.format_error_brief(error),
            VerbosityLevel::Normal => self.format_error_normal(error),
            VerbosityLevel::Verbose => self.format_error_verbose(error),
            VerbosityLevel::Debug => self.format_error_debug(error),
        }
    }

    /// Report a configuration error
    pub fn report_config_error(&self, error: &ConfigError) {
        let formatted = match self.verbosity {
            VerbosityLevel::Quiet => format!("Config error: {}", error),
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                format!(
                    "Configuration Error: {}\n{}",
                    error,
                    self.get_config_help(error)
                )
            }
            VerbosityLevel::Debug => {
                format!(
                    "Configuration Error: {}\nDebug: {:?}\n{}",
                    error,
                    error,
                    self.get_config_help(error)
                )
            }
        };
        eprintln!("{}", formatted);
    }

    /// Report any other failure of the command line tool
    pub fn report_error(&self, error: &anyhow::Error) {
        if let Some(source_error) = error.downcast_ref::<SourceError>() {
            self.report_source_error(source_error);
        } else if let Some(config_error) = error.downcast_ref::<ConfigError>() {
            self.report_config_error(config_error);
        } else if self.verbosity == VerbosityLevel::Debug {
            eprintln!("Error: {:?}", error);
        } else {
            eprintln!("Error: {}", error);
        }
    }

    /// Format error for brief output (quiet mode)
    fn format_error_brief(&self, error: &SourceError) -> String {
        match error {
            SourceError::MemberNotFound { archive, member } => {
                format!("NOT FOUND: {} in {}", member, archive)
            }
            SourceError::Offline { url } => format!("OFFLINE: {}", url),
            _ => format!("ERROR: {}", error),
        }
    }

    /// Format error for normal output
    fn format_error_normal(&self, error: &SourceError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Utc::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        let mut output = format!("{}{}", timestamp, error);
        if let Some(hint) = error.remediation() {
            output.push_str(&format!("\nSuggestion: {}", hint));
        }
        output
    }

    /// Format error for verbose output
    fn format_error_verbose(&self, error: &SourceError) -> String {
        let mut output = self.format_error_normal(error);

        match error {
            SourceError::HttpStatus { status, .. } => {
                output.push_str(&format!("\nServer answered with status {}", status));
            }
            SourceError::Format {
                container, member, ..
            } => {
                output.push_str(&format!("\nContainer: {}", container));
                if let Some(member) = member {
                    output.push_str(&format!("\nMember: {}", member));
                }
            }
            SourceError::Integrity {
                expected, actual, ..
            } => {
                output.push_str(&format!(
                    "\nMissing {} bytes; the cached copy was left untouched",
                    expected.saturating_sub(*actual)
                ));
            }
            _ => {}
        }

        output
    }

    /// Format error for debug output
    fn format_error_debug(&self, error: &SourceError) -> String {
        let mut output = self.format_error_verbose(error);
        output.push_str(&format!("\nDebug Info: {:?}", error));

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    /// Get helpful suggestions for configuration errors
    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::Io(_) => "Check that the configuration file exists and is readable".to_string(),
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::UnsupportedFormat(_) => {
                "Use a .toml or .json configuration file".to_string()
            }
            ConfigError::Environment(_) => {
                "Fix the FILING_SOURCE_* environment variable values".to_string()
            }
            ConfigError::Proxy(_) => {
                "Use 'system', 'none' or [scheme://][user:password@]host[:port]".to_string()
            }
            ConfigError::Validation(_) => "Fix the reported configuration value".to_string(),
        }
    }
}
