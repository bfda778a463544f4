use std::io::{Cursor, Read};

use flate2::read::GzDecoder;

use crate::error::{Result, SourceError};

#[derive(Debug, Clone)]
struct TarEntry {
    name: String,
    offset: usize,
    size: usize,
}

/// A gzip-compressed tarball, inflated into memory with an index of its
/// regular files
pub struct TarGzContainer {
    data: Vec<u8>,
    entries: Vec<TarEntry>,
    names: Vec<String>,
}

impl TarGzContainer {
    pub fn open(container: &str, compressed: &[u8]) -> Result<Self> {
        let mut data = Vec::new();
        GzDecoder::new(compressed)
            .read_to_end(&mut data)
            .map_err(|e| SourceError::format(container, None, e))?;

        let mut entries = Vec::new();
        {
            let mut archive = tar::Archive::new(Cursor::new(&data[..]));
            let iter = archive
                .entries()
                .map_err(|e| SourceError::format(container, None, e))?;
            for entry in iter {
                let entry = entry.map_err(|e| SourceError::format(container, None, e))?;
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let path = entry
                    .path()
                    .map_err(|e| SourceError::format(container, None, e))?;
                let name = path.to_string_lossy().replace('\\', "/");
                let name = name.strip_prefix("./").unwrap_or(&name).to_string();
                entries.push(TarEntry {
                    name,
                    offset: usize::try_from(entry.raw_file_position()).unwrap_or(usize::MAX),
                    size: usize::try_from(entry.size()).unwrap_or(usize::MAX),
                });
            }
        }
        let names = entries.iter().map(|e| e.name.clone()).collect();
        Ok(Self {
            data,
            entries,
            names,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, member: &str) -> bool {
        self.entries.iter().any(|e| e.name == member)
    }

    pub fn read(&self, container: &str, member: &str) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == member)
            .ok_or_else(|| SourceError::MemberNotFound {
                archive: container.to_string(),
                member: member.to_string(),
            })?;
        entry
            .offset
            .checked_add(entry.size)
            .and_then(|end| self.data.get(entry.offset..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| SourceError::format(container, Some(member), "entry runs past end of archive"))
    }
}
