use alloc::string::String;
use alloc::sync::Arc;
use std::fs::File;
use std::io::{self, Cursor, Read};

use bytes::Bytes;
use formbind_core::{Bind, Shape};
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
enum Content {
    Memory(Bytes),
    Disk(Arc<NamedTempFile>),
}

/// An uploaded file: its part headers and a handle to its content.
///
/// Cloning is cheap; clones share the same content. Decoding never reads
/// the content, call [`open`](Self::open) afterwards for that.
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// The filename the client sent.
    pub filename: String,

    /// Headers of the multipart part, e.g. `Content-Type`.
    pub header: HeaderMap,

    /// Size of the content in bytes.
    pub size: u64,

    content: Content,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::in_memory(String::new(), Bytes::new())
    }
}

impl Bind for FileHeader {
    const SHAPE: &'static Shape = &const { Shape::opaque::<Self>("FileHeader") };
}

impl FileHeader {
    /// A file whose content is held in memory.
    pub fn in_memory(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            filename: filename.into(),
            header: HeaderMap::new(),
            size: content.len() as u64,
            content: Content::Memory(content),
        }
    }

    /// A file whose content was written to `file`.
    pub fn on_disk(filename: impl Into<String>, file: NamedTempFile, size: u64) -> Self {
        Self {
            filename: filename.into(),
            header: HeaderMap::new(),
            size,
            content: Content::Disk(Arc::new(file)),
        }
    }

    /// Replaces the part headers.
    pub fn with_header(mut self, header: HeaderMap) -> Self {
        self.header = header;
        self
    }

    /// The `Content-Type` part header, if present and valid text.
    pub fn content_type(&self) -> Option<&str> {
        self.header.get(CONTENT_TYPE)?.to_str().ok()
    }

    /// Returns `true` if the content is held in memory.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.content, Content::Memory(_))
    }

    /// Opens the content for reading from the start.
    ///
    /// Each call returns an independent reader; the underlying handle is
    /// released when the reader is dropped.
    pub fn open(&self) -> io::Result<FileReader> {
        match &self.content {
            Content::Memory(bytes) => Ok(FileReader::Memory(Cursor::new(bytes.clone()))),
            Content::Disk(file) => file.reopen().map(FileReader::Disk),
        }
    }

    /// Reads the whole content.
    pub fn bytes(&self) -> io::Result<Bytes> {
        match &self.content {
            Content::Memory(bytes) => Ok(bytes.clone()),
            Content::Disk(_) => {
                let mut buf = Vec::with_capacity(self.size as usize);
                self.open()?.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// Reader over the content of a [`FileHeader`].
#[derive(Debug)]
pub enum FileReader {
    /// Content held in memory.
    Memory(Cursor<Bytes>),
    /// Content spilled to a temporary file.
    Disk(File),
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileReader::Memory(cursor) => cursor.read(buf),
            FileReader::Disk(file) => file.read(buf),
        }
    }
}
