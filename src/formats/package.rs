//! Taxonomy packages: URL remappings and installed package directories

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::fs;
use tracing::warn;

use super::parse_xml;
use crate::error::Result;
use crate::path_util::{is_http_url, posix_normpath};

/// Catalog inside a package
pub const CATALOG_PATH: &str = "META-INF/catalog.xml";
/// Package manifest inside a package
pub const MANIFEST_PATH: &str = "META-INF/taxonomyPackage.xml";
/// Manifest file name of an installed package
pub const INSTALLED_MANIFEST_NAME: &str = ".taxonomyPackage.xml";

/// Whether `dir` is an unpacked taxonomy package
pub fn is_package_dir(dir: &Path) -> bool {
    dir.is_dir()
        && (dir.join(CATALOG_PATH).is_file()
            || dir.join(MANIFEST_PATH).is_file()
            || dir.join(INSTALLED_MANIFEST_NAME).is_file())
}

/// Prefix rewrites; the longest matching prefix wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedPaths {
    entries: Vec<(String, String)>,
}

impl MappedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, replacement: impl Into<String>) {
        let prefix = prefix.into();
        self.entries.retain(|(p, _)| *p != prefix);
        self.entries.push((prefix, replacement.into()));
    }

    pub fn extend(&mut self, other: MappedPaths) {
        for (prefix, replacement) in other.entries {
            self.insert(prefix, replacement);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, r)| (p.as_str(), r.as_str()))
    }

    /// `url` with its longest matching prefix replaced, if any matches
    pub fn map(&self, url: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, replacement)| format!("{}{}", replacement, &url[prefix.len()..]))
    }
}

/// `<rewriteURI uriStartString=".." rewritePrefix=".."/>` entries.
///
/// Relative prefixes resolve against `base_dir`, the directory holding the
/// catalog.
pub fn parse_catalog(container: &str, xml: &str, base_dir: &str) -> Result<MappedPaths> {
    parse_rewrites(container, xml, base_dir, "rewriteURI", "uriStartString", "rewritePrefix")
}

/// `<remapping prefix=".." replaceWith=".."/>` entries of a package manifest
pub fn parse_manifest(container: &str, xml: &str, base_dir: &str) -> Result<MappedPaths> {
    parse_rewrites(container, xml, base_dir, "remapping", "prefix", "replaceWith")
}

fn parse_rewrites(
    container: &str,
    xml: &str,
    base_dir: &str,
    tag: &str,
    from_attr: &str,
    to_attr: &str,
) -> Result<MappedPaths> {
    let document = parse_xml(container, xml)?;
    let mut mapped = MappedPaths::new();
    for node in document
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == tag)
    {
        let (Some(from), Some(to)) = (node.attribute(from_attr), node.attribute(to_attr)) else {
            warn!(container, tag, "rewrite entry without both attributes");
            continue;
        };
        mapped.insert(from, resolve_prefix(base_dir, to));
    }
    Ok(mapped)
}

/// Resolve a rewrite target against `base_dir`, keeping a trailing separator
pub fn resolve_prefix(base_dir: &str, prefix: &str) -> String {
    if is_http_url(prefix) || Path::new(prefix).is_absolute() || base_dir.is_empty() {
        return prefix.to_string();
    }
    let trailing = prefix.ends_with('/') || prefix.ends_with('\\');
    let joined = format!("{}/{}", base_dir.trim_end_matches(['/', '\\']), prefix.replace('\\', "/"));
    let resolved = match joined.split_once("://") {
        Some((scheme, rest)) => format!("{}://{}", scheme, posix_normpath(rest)),
        None => posix_normpath(&joined),
    };
    if trailing {
        format!("{}/", resolved)
    } else {
        resolved
    }
}

/// Files under an installed package, relative to `root`, `/`-separated, sorted
pub async fn list_package_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files).await?;
    files.sort();
    Ok(files)
}

fn collect_files<'a>(
    root: &'a Path,
    dir: &'a Path,
    files: &'a mut Vec<String>,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut read_dir = fs::read_dir(dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let entry_path: PathBuf = entry.path();
            if entry_path.is_symlink() {
                continue;
            }
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if let Err(e) = collect_files(root, &entry_path, files).await {
                    // keep listing the rest of the package
                    warn!(path = %entry_path.display(), error = %e, "cannot list directory");
                }
            } else if file_type.is_file()
                && let Ok(relative) = entry_path.strip_prefix(root)
            {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push(name);
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_longest_prefix_wins() {
        let mut mapped = MappedPaths::new();
        mapped.insert("http://example.org/", "/pkgs/a/");
        mapped.insert("http://example.org/taxonomy/", "/pkgs/b/");
        assert_eq!(
            mapped.map("http://example.org/taxonomy/x.xsd").as_deref(),
            Some("/pkgs/b/x.xsd")
        );
        assert_eq!(mapped.map("http://example.org/y.xsd").as_deref(), Some("/pkgs/a/y.xsd"));
        assert!(mapped.map("http://other.org/y.xsd").is_none());
    }

    #[test]
    fn test_parse_catalog_relative_prefix() {
        let xml = r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
            <rewriteURI uriStartString="http://example.org/2024/" rewritePrefix="../example.org/2024/"/>
            <rewriteURI uriStartString="http://abs.org/" rewritePrefix="http://mirror.org/"/>
        </catalog>"#;
        let mapped = parse_catalog("pkg.zip", xml, "/data/pkg.zip/META-INF").unwrap();
        assert_eq!(
            mapped.map("http://example.org/2024/entry.xsd").as_deref(),
            Some("/data/pkg.zip/example.org/2024/entry.xsd")
        );
        assert_eq!(
            mapped.map("http://abs.org/a.xsd").as_deref(),
            Some("http://mirror.org/a.xsd")
        );
    }

    #[test]
    fn test_parse_manifest() {
        let xml = r#"<taxonomyPackage xmlns="http://www.corefiling.com/xbrl/taxonomypackage/v1">
            <remappings><remapping prefix="http://example.org/" replaceWith="example/"/></remappings>
        </taxonomyPackage>"#;
        let mapped = parse_manifest("pkg", xml, "/pkgs/one").unwrap();
        assert_eq!(
            mapped.map("http://example.org/a.xsd").as_deref(),
            Some("/pkgs/one/example/a.xsd")
        );
    }

    #[test]
    fn test_resolve_prefix_http_base() {
        assert_eq!(
            resolve_prefix("http://h.org/pkg.zip/META-INF", "../www/"),
            "http://h.org/pkg.zip/www/"
        );
    }

    #[tokio::test]
    async fn test_list_package_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("META-INF")).unwrap();
        std::fs::create_dir_all(root.join("example/2024")).unwrap();
        std::fs::write(root.join("META-INF/catalog.xml"), "<catalog/>").unwrap();
        std::fs::write(root.join("example/2024/entry.xsd"), "<schema/>").unwrap();

        assert!(is_package_dir(root));
        let files = list_package_files(root).await.unwrap();
        assert_eq!(files, vec!["META-INF/catalog.xml", "example/2024/entry.xsd"]);
    }
}
