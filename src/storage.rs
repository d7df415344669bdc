//! Named-blob storage used at startup.

use alloc::{collections::btree_map::BTreeMap, string::String, vec::Vec};

use crate::error::StorageError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite in place. The file must exist.
    Update,
    /// Create or empty the file, then write.
    CreateReadWrite,
    /// Create or empty the file, write-only.
    Truncate,
    /// Write at the end of the file, creating it if needed.
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found,
    NotFound,
}

pub trait Storage {
    /// Reads up to `buf.len()` bytes starting at `offset`. Returns how many were read.
    fn read(&mut self, path: &str, offset: usize, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(
        &mut self,
        path: &str,
        offset: usize,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), StorageError>;

    /// Looks for a regular file called `name` directly inside `dir`.
    fn search(&mut self, dir: &str, name: &str) -> Result<Lookup, StorageError>;
}

/// Storage kept in RAM. Contents are lost on reset.
#[derive(Debug, Default)]
pub struct MemStorage {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn read(&mut self, path: &str, offset: usize, buf: &mut [u8]) -> Result<usize, StorageError> {
        let file = self.files.get(path).ok_or(StorageError::NotFound)?;
        let available = file.get(offset..).ok_or(StorageError::InvalidOffset)?;
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        Ok(count)
    }

    fn write(
        &mut self,
        path: &str,
        offset: usize,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), StorageError> {
        let file = match mode {
            WriteMode::Update => self.files.get_mut(path).ok_or(StorageError::NotFound)?,
            WriteMode::CreateReadWrite | WriteMode::Truncate => {
                let file = self.files.entry(String::from(path)).or_default();
                file.clear();
                file
            }
            WriteMode::Append => {
                let file = self.files.entry(String::from(path)).or_default();
                file.extend_from_slice(data);
                return Ok(());
            }
        };

        if offset > file.len() {
            return Err(StorageError::InvalidOffset);
        }
        let end = offset + data.len();
        if end > file.len() {
            file.resize(end, 0);
        }
        file[offset..end].copy_from_slice(data);

        Ok(())
    }

    fn search(&mut self, dir: &str, name: &str) -> Result<Lookup, StorageError> {
        let found = self.files.keys().any(|path| {
            path.strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|rest| rest == name)
        });

        Ok(if found { Lookup::Found } else { Lookup::NotFound })
    }
}
