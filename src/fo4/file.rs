use crate::{
    containers::CompressableBytes,
    fo4::{self, dds, Chunk, ChunkCompressionOptions, ChunkDX10, ChunkExtra, Format, Result},
    CompressableFrom,
};
use core::{
    fmt::{self, Debug, Display, Formatter},
    ops::RangeBounds,
    result,
};
use std::{
    error,
    io::{Read, Write},
    slice, vec,
};

pub struct CapacityError<'bytes>(Chunk<'bytes>);

impl<'bytes> CapacityError<'bytes> {
    #[must_use]
    pub fn into_element(self) -> Chunk<'bytes> {
        self.0
    }
}

impl<'bytes> Debug for CapacityError<'bytes> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

impl<'bytes> Display for CapacityError<'bytes> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not insert another chunk because the file was already full"
        )
    }
}

impl<'bytes> error::Error for CapacityError<'bytes> {}

/// File header metadata that only applies to the `directx` sub-format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DX10 {
    pub height: u16,
    pub width: u16,
    pub mip_count: u8,
    pub format: u8,
    pub flags: u8,
    pub tile_mode: u8,
}

/// Per-file metadata that differs between the `general` and `directx` sub-formats.
#[derive(Clone, Copy, Debug, Default)]
pub enum Header {
    /// No extra metadata -- used by the `general` sub-format.
    #[default]
    GNRL,

    /// DDS metadata -- used by the `directx` sub-format.
    DX10(DX10),
}

impl From<DX10> for Header {
    fn from(value: DX10) -> Self {
        Self::DX10(value)
    }
}

/// Configures how a loose file is read from disk into chunks.
#[derive(Clone, Copy, Debug)]
pub struct ReadOptions {
    format: Format,
    mip_chunk_width: u32,
    mip_chunk_height: u32,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            format: Format::GNRL,
            mip_chunk_width: 512,
            mip_chunk_height: 512,
        }
    }
}

impl ReadOptions {
    #[must_use]
    pub fn builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::new()
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    #[must_use]
    pub fn mip_chunk_height(&self) -> u32 {
        self.mip_chunk_height
    }

    #[must_use]
    pub fn mip_chunk_width(&self) -> u32 {
        self.mip_chunk_width
    }
}

/// See also [`FileReadOptions`](ReadOptions).
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct ReadOptionsBuilder(ReadOptions);

impl Default for ReadOptionsBuilder {
    fn default() -> Self {
        Self(ReadOptions::default())
    }
}

impl ReadOptionsBuilder {
    #[must_use]
    pub fn build(self) -> ReadOptions {
        self.0
    }

    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.0.format = format;
        self
    }

    #[must_use]
    pub fn mip_chunk_height(mut self, mip_chunk_height: u32) -> Self {
        self.0.mip_chunk_height = mip_chunk_height;
        self
    }

    #[must_use]
    pub fn mip_chunk_width(mut self, mip_chunk_width: u32) -> Self {
        self.0.mip_chunk_width = mip_chunk_width;
        self
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Configures how a file's chunks are compressed on export.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteOptions {
    compression_format: fo4::CompressionFormat,
}

impl WriteOptions {
    #[must_use]
    pub fn builder() -> WriteOptionsBuilder {
        WriteOptionsBuilder::new()
    }

    #[must_use]
    pub fn compression_format(&self) -> fo4::CompressionFormat {
        self.compression_format
    }
}

/// See also [`FileWriteOptions`](WriteOptions).
#[derive(Clone, Copy, Debug, Default)]
#[repr(transparent)]
pub struct WriteOptionsBuilder(WriteOptions);

impl WriteOptionsBuilder {
    #[must_use]
    pub fn build(self) -> WriteOptions {
        self.0
    }

    #[must_use]
    pub fn compression_format(mut self, compression_format: fo4::CompressionFormat) -> Self {
        self.0.compression_format = compression_format;
        self
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<fo4::ArchiveOptions> for WriteOptions {
    fn from(value: fo4::ArchiveOptions) -> Self {
        (&value).into()
    }
}

impl From<&fo4::ArchiveOptions> for WriteOptions {
    fn from(value: &fo4::ArchiveOptions) -> Self {
        Self {
            compression_format: value.compression_format(),
        }
    }
}

#[derive(Default)]
pub struct File<'bytes> {
    pub(crate) chunks: Vec<Chunk<'bytes>>,
    pub header: Header,

    /// The file record's `mod_index` byte.
    ///
    /// Always `0` in archives written by this crate's writer, but the field is preserved
    /// verbatim on read so an unusual non-zero value round-trips rather than being silently
    /// discarded (§9's modIndex open question).
    pub mod_index: u8,
}

impl<'bytes> File<'bytes> {
    /// Reads a loose file (e.g. a `.dds` on disk) and splits it into chunks.
    ///
    /// `general` files always become a single chunk holding the whole payload. `directx` files
    /// are parsed just enough to find their mip levels, which are then grouped into chunks per
    /// `options`'s `mip_chunk_width`/`mip_chunk_height` thresholds.
    pub fn read<In>(stream: &mut In, options: &ReadOptions) -> Result<Self>
    where
        In: ?Sized + Read,
    {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;

        match options.format {
            Format::GNRL => Ok(Self {
                chunks: vec![Chunk::from_decompressed(bytes)],
                header: Header::GNRL,
                mod_index: 0,
            }),
            Format::DX10 => Self::read_dx10(bytes, options),
        }
    }

    fn read_dx10(bytes: Vec<u8>, options: &ReadOptions) -> Result<Self> {
        let metadata = dds::parse(&bytes)?;
        let ranges = dds::chunk_ranges(
            metadata.mip_count,
            metadata.width,
            metadata.height,
            options.mip_chunk_width,
            options.mip_chunk_height,
        );

        let mut offset = metadata.body_offset;
        let mut chunks = Vec::with_capacity(ranges.len());
        for range in ranges {
            let mut width = metadata.width;
            let mut height = metadata.height;
            let mut len = 0usize;
            for mip in 0..range.end {
                let size = dds::mip_size(metadata.format, width, height);
                if mip >= range.start {
                    len += size;
                }
                width = (width / 2).max(1);
                height = (height / 2).max(1);
            }

            let end = offset
                .checked_add(len)
                .filter(|&end| end <= bytes.len())
                .ok_or_else(|| {
                    fo4::Error::InvalidDDSHeaderSize(u32::try_from(len).unwrap_or(u32::MAX))
                })?;
            let chunk_bytes = bytes[offset..end].to_vec();
            offset = end;
            chunks.push(Chunk {
                bytes: CompressableBytes::from_owned(chunk_bytes, None),
                extra: ChunkExtra::DX10(ChunkDX10 {
                    mips: range.start..range.end,
                }),
            });
        }

        Ok(Self {
            chunks,
            header: Header::DX10(DX10 {
                height: metadata.height.try_into().unwrap_or(u16::MAX),
                width: metadata.width.try_into().unwrap_or(u16::MAX),
                mip_count: metadata.mip_count,
                format: metadata.format.try_into().unwrap_or(u8::MAX),
                flags: 0,
                tile_mode: 0,
            }),
            mod_index: 0,
        })
    }

    /// Writes this file back out, decompressing any compressed chunks as needed and, for
    /// `directx` files, reconstructing a standard `.dds` header up front.
    pub fn write<Out>(&self, stream: &mut Out, options: &WriteOptions) -> Result<()>
    where
        Out: ?Sized + Write,
    {
        if let Header::DX10(x) = &self.header {
            dds::write_header(stream, x.height, x.width, x.mip_count, x.format.into())?;
        }

        let compression_options = ChunkCompressionOptions::from(*options);
        for chunk in &self.chunks {
            if chunk.is_compressed() {
                let mut bytes = Vec::new();
                chunk.decompress_into(&mut bytes, &compression_options)?;
                stream.write_all(&bytes)?;
            } else {
                stream.write_all(chunk.as_bytes())?;
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn iter(&self) -> slice::Iter<'_, Chunk<'bytes>> {
        self.chunks.iter()
    }

    #[must_use]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Chunk<'bytes>> {
        self.chunks.iter_mut()
    }

    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut Chunk<'bytes> {
        self.chunks.as_mut_ptr()
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [Chunk<'bytes>] {
        self.chunks.as_mut_slice()
    }

    #[must_use]
    pub fn as_ptr(&self) -> *const Chunk<'bytes> {
        self.chunks.as_ptr()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Chunk<'bytes>] {
        self.chunks.as_slice()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        4
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// # Panics
    ///
    /// Panics if [`start_bound`](RangeBounds::start_bound) exceeds [`end_bound`](RangeBounds::end_bound), or if [`end_bound`](RangeBounds::end_bound) exceeds [`len`](Self::len).
    pub fn drain<R>(&mut self, range: R) -> impl Iterator<Item = Chunk<'bytes>> + '_
    where
        R: RangeBounds<usize>,
    {
        self.chunks.drain(range)
    }

    /// # Panics
    ///
    /// Panics if `index` exceeds [`len`](Self::len), or [`is_full`](Self::is_full).
    pub fn insert(&mut self, index: usize, element: Chunk<'bytes>) {
        self.try_insert(index, element).unwrap();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<Chunk<'bytes>> {
        self.chunks.pop()
    }

    /// # Panics
    ///
    /// Panics if [`is_full`](Self::is_full).
    pub fn push(&mut self, element: Chunk<'bytes>) {
        self.try_push(element).unwrap();
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity() - self.len()
    }

    /// # Panics
    ///
    /// Panics if `index` exceeds [`len`](Self::len).
    pub fn remove(&mut self, index: usize) -> Chunk<'bytes> {
        self.chunks.remove(index)
    }

    pub fn retain_mut<F>(&mut self, f: F)
    where
        F: FnMut(&mut Chunk<'bytes>) -> bool,
    {
        self.chunks.retain_mut(f);
    }

    /// # Panics
    ///
    /// Panics if `index` exceeds [`len`](Self::len), or [`is_empty`](Self::is_empty).
    pub fn swap_remove(&mut self, index: usize) -> Chunk<'bytes> {
        self.try_swap_remove(index).unwrap()
    }

    pub fn truncate(&mut self, len: usize) {
        self.chunks.truncate(len);
    }

    /// # Panics
    ///
    /// Panics if `index` exceeds [`len`](Self::len).
    pub fn try_insert(
        &mut self,
        index: usize,
        element: Chunk<'bytes>,
    ) -> result::Result<(), CapacityError<'bytes>> {
        if self.is_full() {
            Err(CapacityError(element))
        } else {
            self.do_reserve();
            self.chunks.insert(index, element);
            Ok(())
        }
    }

    pub fn try_push(
        &mut self,
        element: Chunk<'bytes>,
    ) -> result::Result<(), CapacityError<'bytes>> {
        if self.is_full() {
            Err(CapacityError(element))
        } else {
            self.do_reserve();
            self.chunks.push(element);
            Ok(())
        }
    }

    /// # Panics
    ///
    /// Panics if `index` exceeds [`len`](Self::len).
    pub fn try_swap_remove(&mut self, index: usize) -> Option<Chunk<'bytes>> {
        if index < self.len() {
            Some(self.chunks.swap_remove(index))
        } else {
            None
        }
    }

    fn do_reserve(&mut self) {
        match self.len() {
            0 | 3 => self.chunks.reserve_exact(1),
            1 => self.chunks.reserve_exact(3),
            2 => self.chunks.reserve_exact(2),
            _ => unreachable!(),
        }
    }
}

impl<'bytes> FromIterator<Chunk<'bytes>> for File<'bytes> {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Chunk<'bytes>>,
    {
        Self {
            chunks: iter.into_iter().collect(),
            header: Header::default(),
            mod_index: 0,
        }
    }
}

impl<'bytes> IntoIterator for File<'bytes> {
    type Item = Chunk<'bytes>;
    type IntoIter = vec::IntoIter<Chunk<'bytes>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl<'a, 'bytes> IntoIterator for &'a File<'bytes> {
    type Item = &'a Chunk<'bytes>;
    type IntoIter = slice::Iter<'a, Chunk<'bytes>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        fo4::{dds, Chunk, Error, File, FileDX10, FileHeader, FileReadOptions, Format},
        CompressableFrom as _,
    };

    #[test]
    fn default_state() {
        let f = File::default();
        assert!(f.is_empty());
        assert!(f.as_slice().is_empty());
        assert!(!f.is_full());
        assert_eq!(f.capacity(), 4);
        assert!(matches!(f.header, FileHeader::GNRL));
        assert_eq!(f.mod_index, 0);
    }

    #[test]
    fn collect_from_chunks() {
        let chunk = Chunk::from_decompressed(b"hello world".as_slice());
        let file: File = [chunk].into_iter().collect();
        assert_eq!(file.len(), 1);
        assert_eq!(file.iter().next().unwrap().as_bytes(), b"hello world");
    }

    #[test]
    fn truncated_dx10_body_fails_closed_instead_of_panicking() {
        let mut bytes = Vec::new();
        dds::write_header(&mut bytes, 64, 64, 1, 71).unwrap(); // BC1, no mips

        let options = FileReadOptions::builder().format(Format::DX10).build();
        let result = File::read(&mut bytes.as_slice(), &options);
        assert!(matches!(result, Err(Error::InvalidDDSHeaderSize(_))));
    }

    #[test]
    fn assign_dx10_header() {
        let mut f = File::default();
        f.header = FileDX10 {
            height: 512,
            width: 512,
            mip_count: 9,
            format: 98,
            flags: 0,
            tile_mode: 0,
        }
        .into();
        assert!(matches!(f.header, FileHeader::DX10(_)));
    }
}
