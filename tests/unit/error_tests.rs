use std::path::PathBuf;

use filing_source::{ErrorReporter, SourceError, VerbosityLevel};

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
    let source_error: SourceError = io_error.into();

    assert!(source_error.to_string().contains("File not found"));
    assert!(!source_error.is_network());
}

#[test]
fn test_network_errors_are_soft_failable() {
    let timeout = SourceError::Timeout {
        url: "http://example.com/schema.xsd".to_string(),
        timeout_seconds: 30,
    };
    let html = SourceError::UnexpectedHtml {
        url: "http://example.com/schema.xsd".to_string(),
    };
    let write = SourceError::CacheWrite {
        path: PathBuf::from("/cache/http/example.com/schema.xsd"),
        details: "Permission denied".to_string(),
    };

    assert!(timeout.is_soft_failable());
    assert!(html.is_soft_failable());
    assert!(!write.is_soft_failable());
}

#[test]
fn test_reporter_levels() {
    let error = SourceError::MemberNotFound {
        archive: "filing.zip".to_string(),
        member: "a.xml".to_string(),
    };

    let brief = ErrorReporter::new(VerbosityLevel::Quiet).format_source_error(&error);
    assert_eq!(brief, "NOT FOUND: a.xml in filing.zip");

    let normal = ErrorReporter::new(VerbosityLevel::Normal).format_source_error(&error);
    assert!(normal.contains("a.xml not found in archive filing.zip"));

    let offline = SourceError::Offline {
        url: "http://example.com/a.xsd".to_string(),
    };
    let normal = ErrorReporter::new(VerbosityLevel::Normal).format_source_error(&offline);
    assert!(normal.contains("Suggestion:"));
}
