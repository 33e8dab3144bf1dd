use memmap2::Mmap;
use std::sync::Arc;

mod detail {
    use memmap2::Mmap;
    use std::sync::Arc;

    pub enum Bytes<'a> {
        Owned(Vec<u8>),
        Borrowed(&'a [u8]),
        Mapped {
            offset: usize,
            len: usize,
            mmap: Arc<Mmap>,
        },
    }
}

use detail::Bytes::*;

/// A buffer of bytes that is either owned, borrowed from the caller for the duration of a read,
/// or a view into a shared memory-mapped file.
pub struct Bytes<'a> {
    container: detail::Bytes<'a>,
}

impl<'a> Default for Bytes<'a> {
    fn default() -> Self {
        Self::from_owned(Vec::new())
    }
}

impl<'a> Bytes<'a> {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.container {
            Owned(x) => x,
            Borrowed(x) => x,
            Mapped { offset, len, mmap } => &mmap[*offset..*offset + *len],
        }
    }

    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }

    #[must_use]
    pub fn from_borrowed(bytes: &'a [u8]) -> Self {
        Self {
            container: Borrowed(bytes),
        }
    }

    #[must_use]
    pub fn from_owned(bytes: Vec<u8>) -> Self {
        Self {
            container: Owned(bytes),
        }
    }

    #[must_use]
    pub fn from_mapped(offset: usize, len: usize, mmap: Arc<Mmap>) -> Self {
        Self {
            container: Mapped { offset, len, mmap },
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.container {
            Owned(x) => x.len(),
            Borrowed(x) => x.len(),
            Mapped { len, .. } => *len,
        }
    }

    #[must_use]
    pub fn into_owned(self) -> Bytes<'static> {
        match self.container {
            Owned(x) => Bytes::from_owned(x),
            Borrowed(x) => Bytes::from_owned(x.to_owned()),
            Mapped { offset, len, mmap } => Bytes::from_mapped(offset, len, mmap),
        }
    }

    /// Pairs these bytes with an optional decompressed length, producing a
    /// [`CompressableBytes`]. A `None` length means the payload is stored uncompressed.
    #[must_use]
    pub fn into_compressable(self, decompressed_len: Option<usize>) -> CompressableBytes<'a> {
        CompressableBytes {
            bytes: self,
            decompressed_len,
        }
    }
}

impl<'a> Clone for Bytes<'a> {
    fn clone(&self) -> Self {
        match &self.container {
            Owned(x) => Self::from_owned(x.clone()),
            Borrowed(x) => Self::from_borrowed(x),
            Mapped { offset, len, mmap } => Self::from_mapped(*offset, *len, mmap.clone()),
        }
    }
}

impl<'a> core::fmt::Debug for Bytes<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bytes").field("len", &self.len()).finish()
    }
}

/// A [`Bytes`] payload that remembers whether it represents compressed data, and if so, how
/// large the decompressed form is.
#[derive(Clone, Debug, Default)]
pub struct CompressableBytes<'a> {
    bytes: Bytes<'a>,
    decompressed_len: Option<usize>,
}

impl<'a> CompressableBytes<'a> {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_bytes()
    }

    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    #[must_use]
    pub fn decompressed_len(&self) -> Option<usize> {
        self.decompressed_len
    }

    #[must_use]
    pub fn from_borrowed(bytes: &'a [u8], decompressed_len: Option<usize>) -> Self {
        Self {
            bytes: Bytes::from_borrowed(bytes),
            decompressed_len,
        }
    }

    #[must_use]
    pub fn from_owned(bytes: Vec<u8>, decompressed_len: Option<usize>) -> Self {
        Self {
            bytes: Bytes::from_owned(bytes),
            decompressed_len,
        }
    }

    #[must_use]
    pub fn into_owned(self) -> CompressableBytes<'static> {
        CompressableBytes {
            bytes: self.bytes.into_owned(),
            decompressed_len: self.decompressed_len,
        }
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.decompressed_len.is_some()
    }

    #[must_use]
    pub fn is_decompressed(&self) -> bool {
        !self.is_compressed()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl<'a> From<Bytes<'a>> for CompressableBytes<'a> {
    fn from(bytes: Bytes<'a>) -> Self {
        bytes.into_compressable(None)
    }
}
