use alloc::string::String;
use alloc::vec::Vec;
use std::io::{self, Write};

use bytes::Bytes;
use formbind_decode::Values;
use indexmap::IndexMap;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::FileHeader;

/// Default memory budget for file content, 32 MiB.
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// A parsed `multipart/form-data` submission: text parts and file parts,
/// each keyed by part name.
#[derive(Debug)]
pub struct MultipartForm {
    /// Text parts.
    pub value: Values,

    /// File parts, in the order they were added.
    pub file: IndexMap<String, Vec<FileHeader>>,

    max_memory: u64,
    memory_used: u64,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// An empty form with the default memory budget.
    pub fn new() -> Self {
        Self::with_max_memory(DEFAULT_MAX_MEMORY)
    }

    /// An empty form that keeps at most `max_memory` bytes of file content
    /// in memory. Files that do not fit go to temporary files.
    pub fn with_max_memory(max_memory: u64) -> Self {
        Self {
            value: Values::new(),
            file: IndexMap::new(),
            max_memory,
            memory_used: 0,
        }
    }

    /// Appends a text value under `key`.
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.value.add(key, value);
    }

    /// Appends an uploaded file under `key`.
    ///
    /// Returns the new [`FileHeader`] so its part headers can be filled in.
    pub fn add_file(
        &mut self,
        key: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> io::Result<&mut FileHeader> {
        let content = content.into();
        let size = content.len() as u64;

        let file = if self.memory_used.saturating_add(size) <= self.max_memory {
            self.memory_used += size;
            FileHeader::in_memory(filename, content)
        } else {
            debug!(size, max_memory = self.max_memory, "writing upload to a temporary file");
            let mut tmp = NamedTempFile::new()?;
            tmp.write_all(&content)?;
            tmp.flush()?;
            FileHeader::on_disk(filename, tmp, size)
        };
        Ok(self.insert_file(key, file))
    }

    /// Appends an already built [`FileHeader`] under `key`.
    pub fn insert_file(&mut self, key: impl Into<String>, file: FileHeader) -> &mut FileHeader {
        let files = self.file.entry(key.into()).or_default();
        let index = files.len();
        files.push(file);
        &mut files[index]
    }

    /// The files under `key`, in upload order.
    pub fn files(&self, key: &str) -> &[FileHeader] {
        self.file.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `key`, or a key nested below it, has a file.
    pub fn has_file_under(&self, key: &str) -> bool {
        self.file.iter().any(|(candidate, files)| {
            let under = candidate == key
                || candidate
                    .strip_prefix(key)
                    .is_some_and(|rest| rest.starts_with('.'));
            under && !files.is_empty()
        })
    }

    /// Bytes of file content currently held in memory.
    pub fn memory_used(&self) -> u64 {
        self.memory_used
    }

    /// The memory budget for file content.
    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }
}
