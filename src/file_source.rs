//! Uniform access to files that may live inside containers
//!
//! A [`FileSource`] wraps one container (ZIP, tar.gz, EIS, XFD, RSS feed or
//! installed taxonomy package) or a plain file. Paths handed to
//! [`FileSource::file`] are logical: `report.zip/docs/a.xml`, a plain local
//! path, or a URL. Paths into other archives open those archives as
//! referenced sources, owned by the source that first needed them and closed
//! with it. Archives stored inside an open archive are opened from memory the
//! same way.

use std::collections::HashMap;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::archive_path::{split_archive_path, split_archive_path_with};
use crate::encoding::{NamedBuffer, decode_text, detect_encoding, strip_xml_declaration};
use crate::error::{Result, SourceError};
use crate::formats::package::{self, CATALOG_PATH, INSTALLED_MANIFEST_NAME, MANIFEST_PATH, MappedPaths};
use crate::formats::rss::{self, RssItem};
use crate::formats::tar_archive::TarGzContainer;
use crate::formats::zip_archive::ZipContainer;
use crate::formats::{EmbeddedDocument, SourceKind, eis, xfd};
use crate::path_util::{is_http_url, strip_file_scheme};
use crate::web_cache::{CachedResource, GetOptions, WebCache};

/// Pluggable lookup consulted before the built-in resolution chain
pub trait FileResolver: Send + Sync {
    /// Content for `path`, or `None` to defer to the next resolver
    fn try_open(&self, path: &str) -> Option<std::io::Result<Vec<u8>>>;

    fn exists(&self, _path: &str) -> Option<bool> {
        None
    }
}

/// How [`FileSource::file`] should hand back content
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    pub binary: bool,
    /// Drop a leading `<?xml ...?>` from text content
    pub strip_declaration: bool,
    /// Decode with this encoding instead of the detected one
    pub encoding: Option<String>,
}

impl FileOptions {
    pub fn binary() -> Self {
        Self {
            binary: true,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self::default()
    }

    pub fn strip_declaration(mut self, strip: bool) -> Self {
        self.strip_declaration = strip;
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Content returned by [`FileSource::file`]
#[derive(Debug, Clone)]
pub enum FileContent {
    Binary(NamedBuffer),
    /// UTF-8 text together with the encoding it was decoded from
    Text { buffer: NamedBuffer, encoding: String },
}

impl FileContent {
    pub fn name(&self) -> &str {
        self.buffer().name()
    }

    pub fn buffer(&self) -> &NamedBuffer {
        match self {
            FileContent::Binary(buffer) | FileContent::Text { buffer, .. } => buffer,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer().as_bytes()
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            FileContent::Text { buffer, .. } => std::str::from_utf8(buffer.as_bytes()).ok(),
            FileContent::Binary(_) => None,
        }
    }

    pub fn encoding(&self) -> Option<&str> {
        match self {
            FileContent::Text { encoding, .. } => Some(encoding),
            FileContent::Binary(_) => None,
        }
    }

    pub fn into_buffer(self) -> NamedBuffer {
        match self {
            FileContent::Binary(buffer) | FileContent::Text { buffer, .. } => buffer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

/// Members of an open source
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryListing {
    Members(Vec<String>),
    Feed(Vec<RssItem>),
}

impl DirectoryListing {
    /// Member names, or instance URLs for a feed
    pub fn names(&self) -> Vec<&str> {
        match self {
            DirectoryListing::Members(names) => names.iter().map(String::as_str).collect(),
            DirectoryListing::Feed(items) => {
                items.iter().map(|item| item.instance_url.as_str()).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DirectoryListing::Members(names) => names.len(),
            DirectoryListing::Feed(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Container {
    Zip(ZipContainer),
    TarGz(TarGzContainer),
    Embedded(Vec<EmbeddedDocument>),
    Rss,
    Installed { root: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Open,
    Closed,
}

/// Which source answers for a logical path
enum Owner {
    Member(String),
    Referenced(String),
    Plain,
}

/// Sources opened on behalf of another source, keyed by archive path
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, FileSource>,
}

impl SourceRegistry {
    pub fn get(&self, key: &str) -> Option<&FileSource> {
        self.sources.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FileSource> {
        self.sources.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sources.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, source: FileSource) {
        self.sources.insert(key.into(), source);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Close every source, and the sources they reference
    pub fn close_all(&mut self) {
        for (_, mut source) in self.sources.drain() {
            source.close();
        }
    }
}

/// A plain file or an archive whose members can be listed and read
pub struct FileSource {
    base_url: String,
    base_file: Option<String>,
    urls: Vec<String>,
    kind: SourceKind,
    check_if_xml_is_eis: bool,
    state: State,
    container: Option<Container>,
    listing: Option<DirectoryListing>,
    selection: Option<Selection>,
    mapped_paths: MappedPaths,
    referenced: SourceRegistry,
    resolvers: Vec<Arc<dyn FileResolver>>,
    backing: Option<Vec<u8>>,
    open_error: Option<SourceError>,
}

impl FileSource {
    pub fn new(url: &str, check_if_xml_is_eis: bool) -> Self {
        let url = url.trim_end_matches(['/', '\\']);
        let url = if url.is_empty() { "/" } else { url };
        Self {
            base_url: url.to_string(),
            base_file: None,
            urls: vec![url.to_string()],
            kind: SourceKind::detect(url, check_if_xml_is_eis),
            check_if_xml_is_eis,
            state: State::Created,
            container: None,
            listing: None,
            selection: None,
            mapped_paths: MappedPaths::new(),
            referenced: SourceRegistry::default(),
            resolvers: Vec::new(),
            backing: None,
            open_error: None,
        }
    }

    /// Source over bytes already in memory, named `url`
    pub fn from_bytes(url: &str, bytes: Vec<u8>, check_if_xml_is_eis: bool) -> Self {
        let mut source = Self::new(url, check_if_xml_is_eis);
        source.backing = Some(bytes);
        source
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn FileResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    pub fn add_resolver(&mut self, resolver: Arc<dyn FileResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_archive(&self) -> bool {
        self.kind.is_archive()
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Local file backing the source, once opened
    pub fn base_file(&self) -> Option<&str> {
        self.base_file.as_deref()
    }

    /// The selected path, or the source itself without a selection
    pub fn url(&self) -> &str {
        self.urls.first().map(String::as_str).unwrap_or(&self.base_url)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn mapped_paths(&self) -> &MappedPaths {
        &self.mapped_paths
    }

    pub fn referenced_sources(&self) -> &SourceRegistry {
        &self.referenced
    }

    /// Why the last [`open`](Self::open) failed
    pub fn open_error(&self) -> Option<&SourceError> {
        self.open_error.as_ref()
    }

    pub fn take_open_error(&mut self) -> Option<SourceError> {
        self.open_error.take()
    }

    pub fn is_zip_backslashed(&self) -> bool {
        matches!(&self.container, Some(Container::Zip(zip)) if zip.is_backslashed())
    }

    /// `url` rewritten through the package's remappings
    pub fn mapped_url(&self, url: &str) -> String {
        self.mapped_paths.map(url).unwrap_or_else(|| url.to_string())
    }

    /// Open the container. Remote sources are fetched through `cache`.
    ///
    /// Failures are logged and leave the source closed; the reason is kept
    /// in [`open_error`](Self::open_error). A closed source cannot be reopened.
    pub async fn open(&mut self, cache: Option<&mut WebCache>) -> bool {
        match self.state {
            State::Open => return true,
            State::Closed => {
                warn!(url = %self.base_url, "file source was closed and cannot be reopened");
                return false;
            }
            State::Created => {}
        }
        if !self.kind.is_archive() {
            return false;
        }
        match self.open_container(cache).await {
            Ok(true) => {
                self.state = State::Open;
                self.open_error = None;
                debug!(url = %self.base_url, kind = %self.kind, "opened file source");
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(url = %self.base_url, kind = %self.kind, error = %e, "cannot open file source");
                self.open_error = Some(e);
                false
            }
        }
    }

    /// Release the container and every referenced source
    pub fn close(&mut self) {
        self.referenced.close_all();
        self.container = None;
        self.listing = None;
        self.backing = None;
        self.state = State::Closed;
    }

    /// Select one or more members; paths become `<base>/<member>`
    pub fn select(&mut self, selection: Selection) {
        self.urls = match &selection {
            Selection::One(member) => vec![self.member_url(member)],
            Selection::Many(members) => members.iter().map(|m| self.member_url(m)).collect(),
        };
        self.selection = Some(selection);
    }

    /// Listing of an open source
    pub fn dir(&self) -> Option<&DirectoryListing> {
        if self.is_open() {
            self.listing.as_ref()
        } else {
            None
        }
    }

    /// Whether `filepath` is a member of this source or of an already opened
    /// referenced source
    pub fn is_in_archive(&self, filepath: &str) -> bool {
        if let Some((_, member)) = self.member_of(filepath)
            && self.contains_member(&member)
        {
            return true;
        }
        self.referenced
            .sources
            .values()
            .any(|source| source.is_in_archive(filepath))
    }

    /// Whether `filepath` can be read
    pub async fn exists(&mut self, filepath: &str, mut cache: Option<&mut WebCache>) -> bool {
        for resolver in &self.resolvers {
            if let Some(found) = resolver.exists(filepath) {
                return found;
            }
        }
        match self.locate(filepath, cache.as_deref_mut()).await {
            Ok(Owner::Member(member)) => self.contains_member(&member),
            Ok(Owner::Referenced(key)) => match self.referenced.get_mut(&key) {
                Some(child) => Box::pin(child.exists(filepath, cache)).await,
                None => false,
            },
            Ok(Owner::Plain) => {
                if is_http_url(filepath) {
                    match cache {
                        Some(cache) => cache
                            .get_filename(filepath, &GetOptions::new().filename_only(true))
                            .await
                            .map(|path| path.exists())
                            .unwrap_or(false),
                        None => false,
                    }
                } else {
                    Path::new(strip_file_scheme(filepath)).exists()
                }
            }
            Err(e) => {
                debug!(filepath, error = %e, "existence check failed");
                false
            }
        }
    }

    /// Read `filepath` as text or bytes
    pub async fn file(
        &mut self,
        filepath: &str,
        options: &FileOptions,
        cache: Option<&mut WebCache>,
    ) -> Result<FileContent> {
        for resolver in &self.resolvers {
            if let Some(result) = resolver.try_open(filepath) {
                return finish_content(filepath, result?, options);
            }
        }
        let bytes = self.read_bytes(filepath, cache).await?;
        finish_content(filepath, bytes, options)
    }

    async fn read_bytes(
        &mut self,
        filepath: &str,
        mut cache: Option<&mut WebCache>,
    ) -> Result<Vec<u8>> {
        match self.locate(filepath, cache.as_deref_mut()).await? {
            Owner::Member(member) => self.read_member(&member).await,
            Owner::Referenced(key) => {
                let child = self
                    .referenced
                    .get_mut(&key)
                    .ok_or_else(|| SourceError::NotOpen { url: key.clone() })?;
                Box::pin(child.read_bytes(filepath, cache)).await
            }
            Owner::Plain => read_plain(filepath, cache).await,
        }
    }

    /// Decide which source answers for `filepath`, opening archives on the way
    async fn locate(&mut self, filepath: &str, cache: Option<&mut WebCache>) -> Result<Owner> {
        if self.state == State::Created
            && self.kind.is_archive()
            && self.member_of_base(filepath).is_some()
        {
            self.open(cache).await;
            return match self.member_of(filepath) {
                Some((prefix_len, member)) => self.locate_member(filepath, prefix_len, member).await,
                None => Err(self.open_error.take().unwrap_or_else(|| SourceError::NotOpen {
                    url: self.base_url.clone(),
                })),
            };
        }

        if let Some((prefix_len, member)) = self.member_of(filepath) {
            return self.locate_member(filepath, prefix_len, member).await;
        }

        if let Some((archive, _)) = split_archive_path(filepath, self.check_if_xml_is_eis) {
            if !self.referenced.contains(&archive) {
                let mut child = FileSource::new(&archive, self.check_if_xml_is_eis);
                if !child.open(cache).await {
                    return Err(child.open_error.take().unwrap_or(SourceError::NotOpen {
                        url: archive,
                    }));
                }
                debug!(archive = %archive, "opened referenced source");
                self.referenced.insert(archive.clone(), child);
            }
            return Ok(Owner::Referenced(archive));
        }

        Ok(Owner::Plain)
    }

    /// A member of this source, or an archive stored inside it
    async fn locate_member(
        &mut self,
        filepath: &str,
        prefix_len: usize,
        member: String,
    ) -> Result<Owner> {
        if self.contains_member(&member) {
            return Ok(Owner::Member(member));
        }
        let nested = split_archive_path_with(&member, self.check_if_xml_is_eis, |candidate| {
            self.contains_member(candidate)
        });
        let Some((inner_archive, _)) = nested else {
            return Ok(Owner::Member(member));
        };

        let key = filepath[..prefix_len + 1 + inner_archive.len()].to_string();
        if !self.referenced.contains(&key) {
            let bytes = self.read_member(&inner_archive).await?;
            let mut child = FileSource::from_bytes(&key, bytes, self.check_if_xml_is_eis);
            if !child.open(None).await {
                return Err(child
                    .open_error
                    .take()
                    .unwrap_or(SourceError::NotOpen { url: key }));
            }
            debug!(archive = %key, "opened nested archive");
            self.referenced.insert(key.clone(), child);
        }
        Ok(Owner::Referenced(key))
    }

    /// `(prefix length, member)` when `filepath` lies under this open source
    fn member_of(&self, filepath: &str) -> Option<(usize, String)> {
        if !self.is_open() {
            return None;
        }
        self.member_of_base(filepath)
    }

    fn member_of_base(&self, filepath: &str) -> Option<(usize, String)> {
        [self.base_file.as_deref(), Some(self.base_url.as_str())]
            .into_iter()
            .flatten()
            .filter(|prefix| !prefix.is_empty())
            .find_map(|prefix| {
                let rest = filepath.strip_prefix(prefix)?;
                let member = rest.strip_prefix(['/', '\\'])?;
                Some((prefix.len(), member.replace('\\', "/")))
            })
    }

    fn contains_member(&self, member: &str) -> bool {
        match &self.container {
            Some(Container::Zip(zip)) => zip.contains(member),
            Some(Container::TarGz(tar)) => tar.contains(member),
            Some(Container::Embedded(documents)) => documents.iter().any(|d| d.name == member),
            Some(Container::Installed { root }) => root.join(member).is_file(),
            Some(Container::Rss) | None => false,
        }
    }

    async fn read_member(&mut self, member: &str) -> Result<Vec<u8>> {
        let archive = self.base_url.clone();
        match &mut self.container {
            Some(Container::Zip(zip)) => zip.read(&archive, member),
            Some(Container::TarGz(tar)) => tar.read(&archive, member),
            Some(Container::Embedded(documents)) => documents
                .iter()
                .find(|d| d.name == member)
                .ok_or_else(|| SourceError::MemberNotFound {
                    archive: archive.clone(),
                    member: member.to_string(),
                })?
                .decode(&archive),
            Some(Container::Installed { root }) => {
                let path = root.join(member);
                match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(SourceError::MemberNotFound {
                            archive,
                            member: member.to_string(),
                        })
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Some(Container::Rss) => Err(SourceError::MemberNotFound {
                archive,
                member: member.to_string(),
            }),
            None => Err(SourceError::NotOpen { url: archive }),
        }
    }

    fn member_url(&self, member: &str) -> String {
        if is_http_url(member) || Path::new(member).is_absolute() {
            return member.to_string();
        }
        let separator = if is_http_url(&self.base_url) {
            '/'
        } else {
            MAIN_SEPARATOR
        };
        format!("{}{}{}", self.base_url, separator, member)
    }

    /// Parse the container; `Ok(false)` when the content turns out not to be
    /// an archive after all
    async fn open_container(&mut self, cache: Option<&mut WebCache>) -> Result<bool> {
        if self.kind == SourceKind::InstalledPackage {
            self.open_installed().await?;
            return Ok(true);
        }

        let raw = self.load_bytes(cache).await?;
        let name = self.base_url.clone();
        match self.kind {
            SourceKind::Zip => {
                let zip = ZipContainer::open(&name, raw)?;
                self.listing = Some(DirectoryListing::Members(zip.names().to_vec()));
                self.container = Some(Container::Zip(zip));
                self.load_archive_mappings().await;
            }
            SourceKind::TarGz => {
                let tar = TarGzContainer::open(&name, &raw)?;
                self.listing = Some(DirectoryListing::Members(tar.names().to_vec()));
                self.container = Some(Container::TarGz(tar));
            }
            SourceKind::Eis => {
                let probing_xml = !name.to_ascii_lowercase().ends_with(".eis");
                if probing_xml && !eis::is_submission(&raw) {
                    debug!(url = %name, "xml file is not an EIS submission");
                    self.kind = SourceKind::Plain;
                    return Ok(false);
                }
                let xml = envelope_text(&name, &eis::decode(&name, &raw)?)?;
                let documents = eis::parse_documents(&name, &xml)?;
                let names = documents.iter().map(|d| d.name.clone()).collect();
                self.listing = Some(DirectoryListing::Members(names));
                self.container = Some(Container::Embedded(documents));
            }
            SourceKind::Xfd => {
                let xml = envelope_text(&name, &xfd::decode(&name, &raw)?)?;
                let documents = xfd::parse_documents(&name, &xml)?;
                let names = documents
                    .iter()
                    .map(|d| d.name.clone())
                    .filter(|n| !is_absolute_windows_path(n))
                    .collect();
                self.listing = Some(DirectoryListing::Members(names));
                self.container = Some(Container::Embedded(documents));
            }
            SourceKind::Rss => {
                let xml = envelope_text(&name, &raw)?;
                let items = rss::parse_items(&name, &xml)?;
                self.listing = Some(DirectoryListing::Feed(items));
                self.container = Some(Container::Rss);
            }
            SourceKind::Plain | SourceKind::InstalledPackage => return Ok(false),
        }
        Ok(true)
    }

    async fn load_bytes(&mut self, cache: Option<&mut WebCache>) -> Result<Vec<u8>> {
        if let Some(bytes) = self.backing.take() {
            return Ok(bytes);
        }
        if is_http_url(&self.base_url) {
            let cache = cache.ok_or_else(|| {
                SourceError::Config(format!("a web cache is needed to open {}", self.base_url))
            })?;
            let resource = cache.resolve(&self.base_url, &GetOptions::new()).await?;
            if let CachedResource::File(path) = &resource {
                self.base_file = Some(path.to_string_lossy().into_owned());
            }
            return resource.read().await;
        }
        let path = strip_file_scheme(&self.base_url).to_string();
        let bytes = tokio::fs::read(&path).await?;
        self.base_file = Some(path);
        Ok(bytes)
    }

    async fn open_installed(&mut self) -> Result<()> {
        let location = PathBuf::from(strip_file_scheme(&self.base_url));
        let root = if location.is_dir() {
            location
        } else {
            location
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| SourceError::format(&self.base_url, None, "no package directory"))?
        };
        let files = package::list_package_files(&root).await?;

        let root_str = root.to_string_lossy().into_owned();
        for manifest in [INSTALLED_MANIFEST_NAME, MANIFEST_PATH] {
            let path = root.join(manifest);
            if let Ok(xml) = tokio::fs::read_to_string(&path).await {
                match package::parse_manifest(&path.to_string_lossy(), &xml, &root_str) {
                    Ok(mapped) => self.mapped_paths.extend(mapped),
                    Err(e) => warn!(path = %path.display(), error = %e, "ignoring package manifest"),
                }
            }
        }
        let catalog = root.join(CATALOG_PATH);
        if let Ok(xml) = tokio::fs::read_to_string(&catalog).await {
            let catalog_dir = root.join("META-INF").to_string_lossy().into_owned();
            match package::parse_catalog(&catalog.to_string_lossy(), &xml, &catalog_dir) {
                Ok(mapped) => self.mapped_paths.extend(mapped),
                Err(e) => warn!(path = %catalog.display(), error = %e, "ignoring package catalog"),
            }
        }

        self.base_file = Some(root_str);
        self.listing = Some(DirectoryListing::Members(files));
        self.container = Some(Container::Installed { root });
        Ok(())
    }

    /// Remappings from a taxonomy package catalog inside a ZIP
    async fn load_archive_mappings(&mut self) {
        let catalogs: Vec<String> = match &self.listing {
            Some(DirectoryListing::Members(names)) => names
                .iter()
                .filter(|n| *n == CATALOG_PATH || n.ends_with(&format!("/{}", CATALOG_PATH)))
                .cloned()
                .collect(),
            _ => return,
        };
        for catalog in catalogs {
            let xml = match self.read_member(&catalog).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(member = %catalog, error = %e, "cannot read package catalog");
                    continue;
                }
            };
            let catalog_dir = catalog.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            let base_dir = format!("{}/{}", self.base_url, catalog_dir);
            match package::parse_catalog(&self.base_url, &xml, &base_dir) {
                Ok(mapped) => self.mapped_paths.extend(mapped),
                Err(e) => warn!(member = %catalog, error = %e, "ignoring package catalog"),
            }
        }
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        if self.state == State::Open {
            self.close();
        }
    }
}

/// Split an archive path, open the archive and select the member
pub async fn open_file_source(
    path: &str,
    check_if_xml_is_eis: bool,
    cache: Option<&mut WebCache>,
) -> FileSource {
    match split_archive_path(path, check_if_xml_is_eis) {
        Some((archive, member)) => {
            let mut source = FileSource::new(&archive, check_if_xml_is_eis);
            source.open(cache).await;
            source.select(Selection::One(member));
            source
        }
        None => FileSource::new(path, check_if_xml_is_eis),
    }
}

async fn read_plain(filepath: &str, cache: Option<&mut WebCache>) -> Result<Vec<u8>> {
    if is_http_url(filepath) {
        let cache = cache.ok_or_else(|| {
            SourceError::Config(format!("a web cache is needed to read {}", filepath))
        })?;
        let resource = cache.resolve(filepath, &GetOptions::new()).await?;
        return resource.read().await;
    }
    Ok(tokio::fs::read(strip_file_scheme(filepath)).await?)
}

fn finish_content(name: &str, bytes: Vec<u8>, options: &FileOptions) -> Result<FileContent> {
    if options.binary {
        return Ok(FileContent::Binary(NamedBuffer::new(name, bytes)));
    }
    let encoding = options
        .encoding
        .clone()
        .unwrap_or_else(|| detect_encoding(&bytes));
    let mut text = decode_text(name, &bytes, &encoding)?;
    if options.strip_declaration {
        text = strip_xml_declaration(&text);
    }
    Ok(FileContent::Text {
        buffer: NamedBuffer::new(name, text.into_bytes()),
        encoding,
    })
}

/// Envelope XML as text, ready for the parser
fn envelope_text(container: &str, bytes: &[u8]) -> Result<String> {
    let text = decode_text(container, bytes, &detect_encoding(bytes))?;
    Ok(strip_xml_declaration(&text))
}

fn is_absolute_windows_path(name: &str) -> bool {
    let bytes = name.as_bytes();
    name.starts_with("\\\\")
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/'))
}
