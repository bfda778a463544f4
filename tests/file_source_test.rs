mod common;

use std::sync::Arc;

use common::mocks::{MockReply, MockTransport};
use common::test_helpers::{
    TestCacheEnv, build_eis, build_tar_gz, build_xfd, build_zip, eis_xml, path_str, rss_feed,
};
use filing_source::error::SourceError;
use filing_source::file_source::{
    DirectoryListing, FileOptions, FileResolver, FileSource, Selection, open_file_source,
};
use filing_source::formats::SourceKind;
use filing_source::web_cache::{NoopDelegate, WebCache};

fn member_names(source: &FileSource) -> Vec<String> {
    match source.dir() {
        Some(DirectoryListing::Members(names)) => names.clone(),
        other => panic!("Expected a member listing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_member_of_remote_zip() {
    let env = TestCacheEnv::new();
    let archive_url = "http://example.org/pkg.zip";
    let transport = MockTransport::new();
    transport.on_get(
        archive_url,
        MockReply::body(&build_zip(&[
            ("meta/entry.xsd", b"<schema/>"),
            ("meta/other.xsd", b"<other/>"),
        ])),
    );
    let mut cache =
        WebCache::with_transport(&env.config, Arc::new(transport.clone()), Arc::new(NoopDelegate));

    let mut source = FileSource::new(archive_url, false);
    let content = source
        .file(
            "http://example.org/pkg.zip/meta/entry.xsd",
            &FileOptions::text(),
            Some(&mut cache),
        )
        .await
        .unwrap();
    assert_eq!(content.text(), Some("<schema/>"));
    assert_eq!(content.encoding(), Some("utf-8"));
    assert!(source.is_open());
    assert_eq!(member_names(&source), vec!["meta/entry.xsd", "meta/other.xsd"]);

    let cached_archive = source.base_file().unwrap().to_string();
    assert!(cached_archive.starts_with(&path_str(&env.cache_dir())));

    // through the cached file name as well
    let by_cache_path = format!("{}/meta/other.xsd", cached_archive);
    let content = source
        .file(&by_cache_path, &FileOptions::binary(), Some(&mut cache))
        .await
        .unwrap();
    assert_eq!(content.as_bytes(), b"<other/>");
    assert!(source.is_in_archive(&by_cache_path));
    assert_eq!(transport.get_count(archive_url), 1);

    source.close();
    assert!(!source.is_open());
    assert!(source.dir().is_none());
    assert!(!source.open(Some(&mut cache)).await);

    // a new source for the same archive is served from the cache
    let mut reopened = FileSource::new(archive_url, false);
    let content = reopened
        .file(
            "http://example.org/pkg.zip/meta/entry.xsd",
            &FileOptions::binary(),
            Some(&mut cache),
        )
        .await
        .unwrap();
    assert_eq!(content.as_bytes(), b"<schema/>");
    assert_eq!(reopened.base_file(), Some(cached_archive.as_str()));
    assert_eq!(transport.get_count(archive_url), 1);
    assert_eq!(transport.head_count(archive_url), 0);
}

#[tokio::test]
async fn test_missing_member() {
    let env = TestCacheEnv::new();
    let zip = env.write_file("pkg.zip", &build_zip(&[("a.xml", b"<a/>")]));
    let mut source = FileSource::new(&path_str(&zip), false);

    let error = source
        .file(&format!("{}/b.xml", path_str(&zip)), &FileOptions::text(), None)
        .await
        .unwrap_err();
    match error {
        SourceError::MemberNotFound { archive, member } => {
            assert_eq!(archive, path_str(&zip));
            assert_eq!(member, "b.xml");
        }
        other => panic!("Expected MemberNotFound, got {:?}", other),
    }
    assert!(!source.exists(&format!("{}/b.xml", path_str(&zip)), None).await);
    assert!(source.exists(&format!("{}/a.xml", path_str(&zip)), None).await);
}

#[tokio::test]
async fn test_broken_zip_does_not_open() {
    let env = TestCacheEnv::new();
    let zip = env.write_file("broken.zip", b"this is not a zip file");
    let mut source = FileSource::new(&path_str(&zip), false);

    assert!(!source.open(None).await);
    assert!(!source.is_open());
    assert!(matches!(source.open_error(), Some(SourceError::Format { .. })));
}

#[tokio::test]
async fn test_nested_archive() {
    let env = TestCacheEnv::new();
    let inner = build_zip(&[("docs/a.xml", b"<inner/>")]);
    let outer = env.write_file(
        "outer.zip",
        &build_zip(&[("inner.zip", &inner), ("b.xml", b"<outer/>")]),
    );
    let outer_path = path_str(&outer);
    let mut source = FileSource::new(&outer_path, false);

    let nested = format!("{}/inner.zip/docs/a.xml", outer_path);
    let content = source.file(&nested, &FileOptions::text(), None).await.unwrap();
    assert_eq!(content.text(), Some("<inner/>"));
    assert!(
        source
            .referenced_sources()
            .contains(&format!("{}/inner.zip", outer_path))
    );
    assert!(source.is_in_archive(&nested));

    let direct = format!("{}/b.xml", outer_path);
    let content = source.file(&direct, &FileOptions::text(), None).await.unwrap();
    assert_eq!(content.text(), Some("<outer/>"));
}

#[tokio::test]
async fn test_referenced_archive_from_plain_source() {
    let env = TestCacheEnv::new();
    let instance = env.write_file("filing/instance.xml", b"<xbrl/>");
    let zip = env.write_file("filing/taxonomy.zip", &build_zip(&[("t.xsd", b"<schema/>")]));

    let mut source = FileSource::new(&path_str(&instance), false);
    assert_eq!(source.kind(), SourceKind::Plain);

    let member = format!("{}/t.xsd", path_str(&zip));
    let content = source.file(&member, &FileOptions::text(), None).await.unwrap();
    assert_eq!(content.text(), Some("<schema/>"));
    assert_eq!(source.referenced_sources().len(), 1);
    assert!(source.referenced_sources().contains(&path_str(&zip)));

    let plain = source
        .file(&path_str(&instance), &FileOptions::text(), None)
        .await
        .unwrap();
    assert_eq!(plain.text(), Some("<xbrl/>"));

    source.close();
    assert!(source.referenced_sources().is_empty());
}

#[tokio::test]
async fn test_tar_gz_source() {
    let env = TestCacheEnv::new();
    let tarball = env.write_file(
        "filing.tar.gz",
        &build_tar_gz(&[("filing/a.xml", b"<a/>"), ("filing/b.xsd", b"<b/>")]),
    );
    let mut source = FileSource::new(&path_str(&tarball), false);
    assert!(source.open(None).await);
    assert_eq!(source.kind(), SourceKind::TarGz);
    assert_eq!(member_names(&source), vec!["filing/a.xml", "filing/b.xsd"]);

    let content = source
        .file(
            &format!("{}/filing/b.xsd", path_str(&tarball)),
            &FileOptions::binary(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(content.as_bytes(), b"<b/>");
}

#[tokio::test]
async fn test_eis_source() {
    let env = TestCacheEnv::new();
    let eis = env.write_file(
        "submission.eis",
        &build_eis(&[("a.xml", b"\xEF\xBB\xBF<a/>"), ("b.htm", b"<p>b</p>")]),
    );
    let mut source = FileSource::new(&path_str(&eis), false);
    assert!(source.open(None).await);
    assert_eq!(member_names(&source), vec!["a.xml", "b.htm"]);

    let content = source
        .file(&format!("{}/a.xml", path_str(&eis)), &FileOptions::binary(), None)
        .await
        .unwrap();
    assert_eq!(content.as_bytes(), b"<a/>");
}

#[tokio::test]
async fn test_xml_probed_as_eis() {
    let env = TestCacheEnv::new();
    let submission = env.write_file(
        "submission.xml",
        eis_xml(&[("doc.xml", b"<doc/>")]).as_bytes(),
    );
    let plain = env.write_file("plain.xml", b"<?xml version=\"1.0\"?><xbrl/>");

    let mut source = FileSource::new(&path_str(&submission), true);
    assert_eq!(source.kind(), SourceKind::Eis);
    assert!(source.open(None).await);
    assert_eq!(member_names(&source), vec!["doc.xml"]);

    let mut not_eis = FileSource::new(&path_str(&plain), true);
    assert!(!not_eis.open(None).await);
    assert_eq!(not_eis.kind(), SourceKind::Plain);
    assert!(not_eis.open_error().is_none());
}

#[tokio::test]
async fn test_xfd_source() {
    let env = TestCacheEnv::new();
    let form = env.write_file(
        "form.xfd",
        &build_xfd(&[
            ("ex-101.ins.xml", b"<xbrl/>"),
            ("C:\\forms\\attachment.xml", b"<skip/>"),
        ]),
    );
    let mut source = FileSource::new(&path_str(&form), false);
    assert!(source.open(None).await);
    assert_eq!(member_names(&source), vec!["ex-101.ins.xml"]);

    let content = source
        .file(
            &format!("{}/ex-101.ins.xml", path_str(&form)),
            &FileOptions::text(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(content.text(), Some("<xbrl/>"));
}

#[tokio::test]
async fn test_rss_feed_listing() {
    let env = TestCacheEnv::new();
    let feed = env.write_file(
        "monthly.rss",
        rss_feed(&[
            ("ACME CORP", "http://www.sec.gov/acme-20231231.xml"),
            ("WIDGETS INC", "http://www.sec.gov/wid-20231231.xml"),
        ])
        .as_bytes(),
    );
    let mut source = FileSource::new(&path_str(&feed), false);
    assert!(source.open(None).await);

    let Some(DirectoryListing::Feed(items)) = source.dir() else {
        panic!("Expected a feed listing");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "ACME CORP (10-K)");
    assert_eq!(items[0].instance_url, "http://www.sec.gov/acme-20231231.xml");
    assert_eq!(
        items[0].tooltip,
        "ACME CORP\n 10-K\n 03/01/2024\n 0000001\n 20231231"
    );
    assert_eq!(
        source.dir().unwrap().names(),
        vec![
            "http://www.sec.gov/acme-20231231.xml",
            "http://www.sec.gov/wid-20231231.xml"
        ]
    );
}

#[tokio::test]
async fn test_installed_taxonomy_package() {
    let env = TestCacheEnv::new();
    env.write_file(
        "pkgs/example/META-INF/catalog.xml",
        br#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
  <rewriteURI uriStartString="http://example.org/2024/" rewritePrefix="../example.org/2024/"/>
</catalog>"#,
    );
    env.write_file("pkgs/example/example.org/2024/entry.xsd", b"<schema/>");
    let root = env.path().join("pkgs").join("example");
    let root_str = path_str(&root);

    let mut source = FileSource::new(&root_str, false);
    assert_eq!(source.kind(), SourceKind::InstalledPackage);
    assert!(source.open(None).await);
    assert_eq!(
        member_names(&source),
        vec!["META-INF/catalog.xml", "example.org/2024/entry.xsd"]
    );

    let mapped = source.mapped_url("http://example.org/2024/entry.xsd");
    assert_eq!(mapped, format!("{}/example.org/2024/entry.xsd", root_str));
    assert_eq!(
        source.mapped_url("http://other.org/a.xsd"),
        "http://other.org/a.xsd"
    );

    let content = source.file(&mapped, &FileOptions::text(), None).await.unwrap();
    assert_eq!(content.text(), Some("<schema/>"));
}

#[tokio::test]
async fn test_zip_package_catalog() {
    let env = TestCacheEnv::new();
    let zip = env.write_file(
        "taxonomy.zip",
        &build_zip(&[
            (
                "tax/META-INF/catalog.xml",
                br#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog"><rewriteURI uriStartString="http://example.org/" rewritePrefix="../www/"/></catalog>"#,
            ),
            ("tax/www/entry.xsd", b"<schema/>"),
        ]),
    );
    let mut source = FileSource::new(&path_str(&zip), false);
    assert!(source.open(None).await);
    assert_eq!(source.mapped_paths().len(), 1);

    let mapped = source.mapped_url("http://example.org/entry.xsd");
    assert_eq!(mapped, format!("{}/tax/www/entry.xsd", path_str(&zip)));
    let content = source.file(&mapped, &FileOptions::text(), None).await.unwrap();
    assert_eq!(content.text(), Some("<schema/>"));
}

#[tokio::test]
async fn test_open_file_source_selects_member() {
    let env = TestCacheEnv::new();
    let zip = env.write_file("pkg.zip", &build_zip(&[("meta/entry.xsd", b"<schema/>")]));
    let path = format!("{}/meta/entry.xsd", path_str(&zip));

    let mut source = open_file_source(&path, false, None).await;
    assert!(source.is_open());
    assert_eq!(source.base_url(), path_str(&zip));
    assert_eq!(
        source.selection(),
        Some(&Selection::One("meta/entry.xsd".to_string()))
    );
    assert_eq!(source.url(), path);

    let url = source.url().to_string();
    let content = source.file(&url, &FileOptions::text(), None).await.unwrap();
    assert_eq!(content.text(), Some("<schema/>"));
}

#[tokio::test]
async fn test_text_decoding_options() {
    let env = TestCacheEnv::new();
    let zip = env.write_file(
        "enc.zip",
        &build_zip(&[(
            "latin.xml",
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<name>Soci\xE9t\xE9</name>",
        )]),
    );
    let member = format!("{}/latin.xml", path_str(&zip));
    let mut source = FileSource::new(&path_str(&zip), false);

    let content = source
        .file(&member, &FileOptions::text().strip_declaration(true), None)
        .await
        .unwrap();
    assert_eq!(content.encoding(), Some("iso-8859-1"));
    assert_eq!(content.text(), Some("\n<name>Société</name>"));
}

#[tokio::test]
async fn test_windows_1252_member() {
    let env = TestCacheEnv::new();
    let zip = env.write_file(
        "cp.zip",
        &build_zip(&[(
            "quotes.xml",
            b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><p>\x93quoted\x94</p>",
        )]),
    );
    let member = format!("{}/quotes.xml", path_str(&zip));
    let mut source = FileSource::new(&path_str(&zip), false);

    let content = source
        .file(&member, &FileOptions::text().strip_declaration(true), None)
        .await
        .unwrap();
    assert_eq!(content.encoding(), Some("windows-1252"));
    assert_eq!(content.text(), Some("<p>\u{201C}quoted\u{201D}</p>"));
}

struct FixedResolver;

impl FileResolver for FixedResolver {
    fn try_open(&self, path: &str) -> Option<std::io::Result<Vec<u8>>> {
        (path == "virtual://fixed.xml").then(|| Ok(b"<fixed/>".to_vec()))
    }

    fn exists(&self, path: &str) -> Option<bool> {
        (path == "virtual://fixed.xml").then_some(true)
    }
}

#[tokio::test]
async fn test_resolvers_are_consulted_first() {
    let mut source =
        FileSource::new("/nonexistent/report.xml", false).with_resolver(Arc::new(FixedResolver));

    let content = source
        .file("virtual://fixed.xml", &FileOptions::text(), None)
        .await
        .unwrap();
    assert_eq!(content.text(), Some("<fixed/>"));
    assert_eq!(content.name(), "virtual://fixed.xml");
    assert!(source.exists("virtual://fixed.xml", None).await);
    assert!(!source.exists("/nonexistent/other.xml", None).await);
}
