use std::io::{Cursor, Read};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Result, SourceError};

/// An opened ZIP archive held in memory
pub struct ZipContainer {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    names: Vec<String>,
    backslashed: bool,
}

impl ZipContainer {
    pub fn open(container: &str, bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| SourceError::format(container, None, e))?;
        let raw_names: Vec<&str> = archive.file_names().collect();
        // some producers write Windows separators into member names
        let backslashed = raw_names.iter().any(|name| name.contains('\\'));
        let names = raw_names
            .iter()
            .map(|name| {
                if backslashed {
                    name.replace('\\', "/")
                } else {
                    name.to_string()
                }
            })
            .collect();
        Ok(Self {
            archive,
            names,
            backslashed,
        })
    }

    /// Member names, always with `/` separators
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_backslashed(&self) -> bool {
        self.backslashed
    }

    pub fn contains(&self, member: &str) -> bool {
        self.names.iter().any(|name| name == member)
    }

    pub fn read(&mut self, container: &str, member: &str) -> Result<Vec<u8>> {
        let stored_name = if self.backslashed {
            member.replace('/', "\\")
        } else {
            member.to_string()
        };
        let mut file = match self.archive.by_name(&stored_name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(SourceError::MemberNotFound {
                    archive: container.to_string(),
                    member: member.to_string(),
                });
            }
            Err(e) => return Err(SourceError::format(container, Some(member), e)),
        };
        let mut content = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut content)
            .map_err(|e| SourceError::format(container, Some(member), e))?;
        Ok(content)
    }
}
