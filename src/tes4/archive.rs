use crate::{
    containers::CompressableBytes,
    derive,
    io::{Endian, Sink, Source},
    protocols::{self, BZString, ZString},
    tes4::{
        self, directory::Map as DirectoryMap, Directory, DirectoryHash, DirectoryKey, Error, File,
        Hash, Result, Version,
    },
};
use bstr::BString;
use core::mem;
use std::io::Write;

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u32 {
        const DIRECTORY_STRINGS = 1 << 0;
        const FILE_STRINGS = 1 << 1;
        const COMPRESSED = 1 << 2;
        const RETAIN_DIRECTORY_NAMES = 1 << 3;
        const RETAIN_FILE_NAMES = 1 << 4;
        const RETAIN_FILE_NAME_OFFSETS = 1 << 5;
        const XBOX_ARCHIVE = 1 << 6;
        const RETAIN_STRINGS_DURING_STARTUP = 1 << 7;
        const EMBEDDED_FILE_NAMES = 1 << 8;
        const XBOX_COMPRESSED = 1 << 9;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::DIRECTORY_STRINGS | Self::FILE_STRINGS
    }
}

impl Flags {
    #[must_use]
    pub fn directory_strings(&self) -> bool {
        self.contains(Self::DIRECTORY_STRINGS)
    }

    #[must_use]
    pub fn file_strings(&self) -> bool {
        self.contains(Self::FILE_STRINGS)
    }

    #[must_use]
    pub fn compressed(&self) -> bool {
        self.contains(Self::COMPRESSED)
    }

    #[must_use]
    pub fn retain_directory_names(&self) -> bool {
        self.contains(Self::RETAIN_DIRECTORY_NAMES)
    }

    #[must_use]
    pub fn retain_file_names(&self) -> bool {
        self.contains(Self::RETAIN_FILE_NAMES)
    }

    #[must_use]
    pub fn retain_file_name_offsets(&self) -> bool {
        self.contains(Self::RETAIN_FILE_NAME_OFFSETS)
    }

    #[must_use]
    pub fn xbox_archive(&self) -> bool {
        self.contains(Self::XBOX_ARCHIVE)
    }

    #[must_use]
    pub fn retain_strings_during_startup(&self) -> bool {
        self.contains(Self::RETAIN_STRINGS_DURING_STARTUP)
    }

    #[must_use]
    pub fn embedded_file_names(&self) -> bool {
        self.contains(Self::EMBEDDED_FILE_NAMES)
    }

    #[must_use]
    pub fn xbox_compressed(&self) -> bool {
        self.contains(Self::XBOX_COMPRESSED)
    }
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Types: u16 {
        const MESHES = 1 << 0;
        const TEXTURES = 1 << 1;
        const MENUS = 1 << 2;
        const SOUNDS = 1 << 3;
        const VOICES = 1 << 4;
        const SHADERS = 1 << 5;
        const TREES = 1 << 6;
        const FONTS = 1 << 7;
        const MISC = 1 << 8;
    }
}

impl Types {
    #[must_use]
    pub fn meshes(&self) -> bool {
        self.contains(Self::MESHES)
    }

    #[must_use]
    pub fn textures(&self) -> bool {
        self.contains(Self::TEXTURES)
    }

    #[must_use]
    pub fn menus(&self) -> bool {
        self.contains(Self::MENUS)
    }

    #[must_use]
    pub fn sounds(&self) -> bool {
        self.contains(Self::SOUNDS)
    }

    #[must_use]
    pub fn voices(&self) -> bool {
        self.contains(Self::VOICES)
    }

    #[must_use]
    pub fn shaders(&self) -> bool {
        self.contains(Self::SHADERS)
    }

    #[must_use]
    pub fn trees(&self) -> bool {
        self.contains(Self::TREES)
    }

    #[must_use]
    pub fn fonts(&self) -> bool {
        self.contains(Self::FONTS)
    }

    #[must_use]
    pub fn misc(&self) -> bool {
        self.contains(Self::MISC)
    }
}

mod constants {
    use crate::cc;

    pub const BSA: u32 = cc::make_four(b"BSA");

    pub const HEADER_SIZE: u32 = 0x24;
    pub const DIRECTORY_ENTRY_SIZE_X86: usize = 0x10;
    pub const DIRECTORY_ENTRY_SIZE_X64: usize = 0x18;
    pub const FILE_ENTRY_SIZE: usize = 0x10;

    pub const FILE_FLAG_COMPRESSION: u32 = 1 << 30;
    pub const FILE_FLAG_CHECKED: u32 = 1 << 31;
    pub const FILE_FLAG_SECONDARY_ARCHIVE: u32 = 1 << 31;
}

struct Offsets {
    file_entries: usize,
    file_names: usize,
}

struct Header {
    version: Version,
    archive_flags: Flags,
    directory_count: u32,
    file_count: u32,
    directory_names_len: u32,
    file_names_len: u32,
    archive_types: Types,
}

impl Header {
    #[must_use]
    fn hash_endian(&self) -> Endian {
        if self.archive_flags.xbox_archive() {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    #[must_use]
    fn compute_offsets(&self) -> Offsets {
        let file_entries = {
            let directory_entries = constants::HEADER_SIZE as usize;
            let directory_entry_size = match self.version {
                Version::TES4 | Version::FO3 => constants::DIRECTORY_ENTRY_SIZE_X86,
                Version::SSE => constants::DIRECTORY_ENTRY_SIZE_X64,
            };
            directory_entries + (directory_entry_size * self.directory_count as usize)
        };
        let file_names = {
            let directory_names_len = if self.archive_flags.directory_strings() {
                // directory names are stored using a bzstring
                // directory_names_len includes the length of the string + the null terminator,
                // but not the prefix length byte, so we add directory_count to include it
                self.directory_names_len as usize + self.directory_count as usize
            } else {
                0
            };
            file_entries
                + (directory_names_len + constants::FILE_ENTRY_SIZE * self.file_count as usize)
        };
        Offsets {
            file_entries,
            file_names,
        }
    }
}

derive::key!(Key: DirectoryHash);

impl Key {
    #[must_use]
    fn hash_in_place(name: &mut BString) -> DirectoryHash {
        tes4::hash_directory_in_place(name)
    }
}

/// See also [`ArchiveOptions`](Options).
#[derive(Clone, Copy, Debug, Default)]
#[repr(transparent)]
pub struct OptionsBuilder(Options);

impl OptionsBuilder {
    #[must_use]
    pub fn build(self) -> Options {
        self.0
    }

    #[must_use]
    pub fn flags(mut self, flags: Flags) -> Self {
        self.0.flags = flags;
        self
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn types(mut self, types: Types) -> Self {
        self.0.types = types;
        self
    }

    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.0.version = version;
        self
    }
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    version: Version,
    flags: Flags,
    types: Types,
}

impl Options {
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    #[must_use]
    pub fn types(&self) -> Types {
        self.types
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }
}

type ReadResult<T> = (T, Options);
derive::archive!(sorted Archive => ReadResult, Error, Map: Key => Directory);

impl<'a> Archive<'a> {
    /// Writes this archive to the given output stream, using the given options.
    pub fn write<Out>(&self, stream: &mut Out, options: &Options) -> Result<()>
    where
        Out: Write,
    {
        let mut sink = Sink::new(stream);
        let header = self.make_header(options)?;
        Self::write_header(&mut sink, &header)?;
        self.write_directory_entries(&mut sink, &header)?;
        self.write_file_entries(&mut sink, &header)?;
        self.write_file_names(&mut sink, &header)?;
        self.write_file_data(&mut sink, &header)?;
        Ok(())
    }

    /// Checks that every quantity this archive would need to serialize for the given version
    /// fits within the bit widths the BSA file format allots it -- in particular, that the
    /// cumulative size of the archive doesn't overflow the 32-bit offsets used by v103/v104, or
    /// the secondary-archive bit reserved on the offset field for every version.
    #[must_use]
    pub fn verify_offsets(&self, version: Version) -> bool {
        let Ok(header) = self.make_header(&Options {
            version,
            flags: Flags::default(),
            types: Types::default(),
        }) else {
            return false;
        };

        let offsets = header.compute_offsets();
        let mut data_offset = offsets.file_names + header.file_names_len as usize;
        for file in self.map.values().flat_map(Directory::values) {
            let size = file.len();
            if u32::try_from(data_offset).is_err() {
                return false;
            }
            if data_offset & (constants::FILE_FLAG_SECONDARY_ARCHIVE as usize) != 0 {
                return false;
            }
            data_offset += size;
        }

        u32::try_from(data_offset).is_ok()
    }

    fn make_header(&self, options: &Options) -> Result<Header> {
        let mut file_count: usize = 0;
        let mut directory_names_len: usize = 0;
        let mut file_names_len: usize = 0;

        for (key, directory) in self.map.iter() {
            file_count += directory.len();
            if options.flags().directory_strings() {
                directory_names_len += key.name.len() + 1;
            }
            if options.flags().file_strings() {
                for file_key in directory.keys() {
                    file_names_len += file_key.name.len() + 1;
                }
            }
        }

        Ok(Header {
            version: options.version(),
            archive_flags: options.flags(),
            directory_count: self.map.len().try_into()?,
            file_count: file_count.try_into()?,
            directory_names_len: directory_names_len.try_into()?,
            file_names_len: file_names_len.try_into()?,
            archive_types: options.types(),
        })
    }

    fn write_directory_entries<Out>(&self, sink: &mut Sink<Out>, header: &Header) -> Result<()>
    where
        Out: Write,
    {
        let mut offset = header.compute_offsets().file_entries;
        for (key, directory) in self.map.iter() {
            Self::write_hash(sink, &key.hash, header.hash_endian())?;
            sink.write(&u32::try_from(directory.len())?, Endian::Little)?;

            match header.version {
                Version::TES4 | Version::FO3 => {
                    sink.write(&u32::try_from(offset)?, Endian::Little)?;
                }
                Version::SSE => {
                    sink.write(&0u32, Endian::Little)?;
                    sink.write(&u64::try_from(offset)?, Endian::Little)?;
                }
            }

            let name_len = if header.archive_flags.directory_strings() {
                key.name.len() + 2 // length-prefix byte + null terminator
            } else {
                0
            };
            offset += name_len + constants::FILE_ENTRY_SIZE * directory.len();
        }

        Ok(())
    }

    fn write_file_entries<Out>(&self, sink: &mut Sink<Out>, header: &Header) -> Result<()>
    where
        Out: Write,
    {
        let offsets = header.compute_offsets();
        let mut data_offset = offsets.file_names + header.file_names_len as usize;

        for (key, directory) in self.map.iter() {
            if header.archive_flags.directory_strings() {
                sink.write_protocol::<BZString>(&key.name, Endian::Little)?;
            }

            for (file_key, file) in directory.iter() {
                let embedded_len = Self::embedded_name_len(header, &key.name, &file_key.name);
                let compression_flipped = file.is_compressed() != header.archive_flags.compressed();
                let prefix_len = usize::from(compression_flipped) * mem::size_of::<u32>();
                let size = embedded_len + prefix_len + file.len();

                Self::write_hash(sink, &file_key.hash, header.hash_endian())?;

                let size_field = u32::try_from(size)? | Self::compression_flag(compression_flipped);
                let offset_field =
                    u32::try_from(data_offset)? | Self::secondary_archive_flag(file.secondary_archive);
                sink.write(&(size_field, offset_field), Endian::Little)?;

                data_offset += size;
            }
        }

        Ok(())
    }

    fn write_file_names<Out>(&self, sink: &mut Sink<Out>, header: &Header) -> Result<()>
    where
        Out: Write,
    {
        if header.archive_flags.file_strings() {
            for directory in self.map.values() {
                for file_key in directory.keys() {
                    sink.write_protocol::<ZString>(&file_key.name, Endian::Little)?;
                }
            }
        }

        Ok(())
    }

    fn write_file_data<Out>(&self, sink: &mut Sink<Out>, header: &Header) -> Result<()>
    where
        Out: Write,
    {
        for (key, directory) in self.map.iter() {
            for (file_key, file) in directory.iter() {
                if let Some(embedded) = Self::embedded_name(header, &key.name, &file_key.name) {
                    sink.write_protocol::<protocols::BString>(&embedded, Endian::Little)?;
                }

                let compression_flipped = file.is_compressed() != header.archive_flags.compressed();
                if compression_flipped {
                    let decompressed_len = file.decompressed_len().unwrap_or(file.len());
                    sink.write(&u32::try_from(decompressed_len)?, Endian::Little)?;
                }

                sink.write_bytes(file.as_bytes())?;
            }
        }

        Ok(())
    }

    #[must_use]
    fn compression_flag(flipped: bool) -> u32 {
        if flipped {
            constants::FILE_FLAG_COMPRESSION
        } else {
            0
        }
    }

    #[must_use]
    fn secondary_archive_flag(secondary: bool) -> u32 {
        if secondary {
            constants::FILE_FLAG_SECONDARY_ARCHIVE
        } else {
            0
        }
    }

    #[must_use]
    fn embedded_name(header: &Header, directory_name: &BString, file_name: &BString) -> Option<BString> {
        let embed = matches!(header.version, Version::FO3 | Version::SSE)
            && header.archive_flags.embedded_file_names();
        if !embed {
            return None;
        }

        if directory_name.is_empty() || directory_name.as_slice() == b"." {
            Some(file_name.clone())
        } else {
            let mut result = directory_name.clone();
            result.push(b'\\');
            result.extend_from_slice(file_name);
            Some(result)
        }
    }

    #[must_use]
    fn embedded_name_len(header: &Header, directory_name: &BString, file_name: &BString) -> usize {
        match Self::embedded_name(header, directory_name, file_name) {
            Some(name) => name.len() + 1, // length-prefix byte
            None => 0,
        }
    }

    fn do_read<I>(source: &mut I) -> Result<ReadResult<Self>>
    where
        I: ?Sized + Source<'a>,
    {
        let header = Self::read_header(source)?;
        let mut offsets = header.compute_offsets();
        let mut map = Map::default();

        for _ in 0..header.directory_count {
            let (key, value) = Self::read_directory(source, &header, &mut offsets)?;
            map.insert(key, value);
        }

        Ok((
            Self { map },
            Options {
                version: header.version,
                flags: header.archive_flags,
                types: header.archive_types,
            },
        ))
    }

    fn read_directory<I>(
        source: &mut I,
        header: &Header,
        offsets: &mut Offsets,
    ) -> Result<(Key, Directory<'a>)>
    where
        I: ?Sized + Source<'a>,
    {
        let hash = Self::read_hash(source, header.hash_endian())?;
        let file_count: u32 = source.read(Endian::Little)?;
        #[allow(clippy::cast_possible_wrap)]
        match header.version {
            Version::TES4 | Version::FO3 => source.seek_relative(mem::size_of::<u32>() as isize)?,
            Version::SSE => source.seek_relative((mem::size_of::<u32>() * 3) as isize)?,
        }

        let mut map = DirectoryMap::default();
        let (name, directory) =
            source.save_restore_position(|source| -> Result<(BString, Directory<'a>)> {
                source.seek_absolute(offsets.file_entries)?;
                let mut name = if header.archive_flags.directory_strings() {
                    Some(source.read_protocol::<BZString>(Endian::Little)?)
                } else {
                    None
                };
                for _ in 0..file_count {
                    let (key, value) = Self::read_file_entry(source, header, offsets, &mut name)?;
                    map.insert(key, value);
                }
                offsets.file_entries = source.stream_position();
                Ok((name.unwrap_or_default(), Directory { map }))
            })??;

        Ok((
            Key {
                hash: hash.into(),
                name,
            },
            directory,
        ))
    }

    fn read_file_entry<I>(
        source: &mut I,
        header: &Header,
        offsets: &mut Offsets,
        directory_name: &mut Option<BString>,
    ) -> Result<(DirectoryKey, File<'a>)>
    where
        I: ?Sized + Source<'a>,
    {
        let hash = Self::read_hash(source, header.hash_endian())?;
        let (compression_flipped, mut data_size, secondary_archive, data_offset) = {
            let (size, offset): (u32, u32) = source.read(Endian::Little)?;
            (
                (size & constants::FILE_FLAG_COMPRESSION) != 0,
                (size & !(constants::FILE_FLAG_COMPRESSION | constants::FILE_FLAG_CHECKED))
                    as usize,
                (offset & constants::FILE_FLAG_SECONDARY_ARCHIVE) != 0,
                (offset & !constants::FILE_FLAG_SECONDARY_ARCHIVE) as usize,
            )
        };

        let mut name = if header.archive_flags.file_strings() {
            source.save_restore_position(|source| -> Result<Option<BString>> {
                source.seek_absolute(offsets.file_names)?;
                let result = source.read_protocol::<ZString>(Endian::Little)?;
                offsets.file_names = source.stream_position();
                Ok(Some(result))
            })??
        } else {
            None
        };

        let container =
            source.save_restore_position(|source| -> Result<CompressableBytes<'a>> {
                source.seek_absolute(data_offset)?;

                match header.version {
                    Version::FO3 | Version::SSE if header.archive_flags.embedded_file_names() => {
                        let mut s = source.read_protocol::<protocols::BString>(Endian::Little)?;
                        data_size -= s.len() + 1; // include prefix byte
                        if let Some(pos) = s.iter().rposition(|&x| x == b'\\' || x == b'/') {
                            if directory_name.is_none() {
                                *directory_name = Some(s[..pos].into());
                            }
                            s.drain(..=pos);
                        }
                        if name.is_none() {
                            name = Some(s);
                        }
                    }
                    _ => (),
                }

                let decompressed_len =
                    match (header.archive_flags.compressed(), compression_flipped) {
                        (true, false) | (false, true) => {
                            let result: u32 = source.read(Endian::Little)?;
                            data_size -= mem::size_of::<u32>();
                            Some(result as usize)
                        }
                        (true, true) | (false, false) => None,
                    };

                let container = source
                    .read_bytes(data_size)?
                    .into_compressable(decompressed_len);
                Ok(container)
            })??;

        Ok((
            DirectoryKey {
                hash: hash.into(),
                name: name.unwrap_or_default(),
            },
            File {
                container,
                secondary_archive,
            },
        ))
    }

    fn read_hash<I>(source: &mut I, endian: Endian) -> Result<Hash>
    where
        I: ?Sized + Source<'a>,
    {
        let (last, last2, length, first, crc) = source.read(endian)?;
        Ok(Hash {
            last,
            last2,
            length,
            first,
            crc,
        })
    }

    fn write_hash<Out>(sink: &mut Sink<Out>, hash: &Hash, endian: Endian) -> Result<()>
    where
        Out: Write,
    {
        sink.write(
            &(hash.last, hash.last2, hash.length, hash.first, hash.crc),
            endian,
        )?;
        Ok(())
    }

    fn read_header<I>(source: &mut I) -> Result<Header>
    where
        I: ?Sized + Source<'a>,
    {
        let (
            magic,
            version,
            header_size,
            archive_flags,
            directory_count,
            file_count,
            directory_names_len,
            file_names_len,
            archive_types,
            padding,
        ) = source.read(Endian::Little)?;
        let _: u16 = padding;

        if magic != constants::BSA {
            return Err(Error::InvalidMagic(magic));
        }

        let version = match version {
            103 => Version::TES4,
            104 => Version::FO3,
            105 => Version::SSE,
            _ => return Err(Error::InvalidVersion(version)),
        };

        if header_size != constants::HEADER_SIZE {
            return Err(Error::InvalidHeaderSize(header_size));
        }

        // there probably exist "valid" archives which set extra bits, so it's not worth validating...
        let archive_flags = Flags::from_bits_truncate(archive_flags);
        let archive_types = Types::from_bits_truncate(archive_types);

        Ok(Header {
            version,
            archive_flags,
            directory_count,
            file_count,
            directory_names_len,
            file_names_len,
            archive_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Flags, Options};
    use crate::{
        prelude::*,
        tes4::{
            Archive, ArchiveKey, Directory, DirectoryKey, Error, File, FileCompressionOptions,
            Version,
        },
        Borrowed,
    };
    use anyhow::Context as _;
    use std::{fs, io, path::Path};

    #[test]
    fn default_state() {
        let bsa = Archive::new();
        assert!(bsa.is_empty());
        assert!(bsa.len() == 0);
    }

    #[test]
    fn read_compressed() -> anyhow::Result<()> {
        let test = |file_name: &str| -> anyhow::Result<()> {
            let root = Path::new("data/tes4_compression_test");

            let (bsa, options) = Archive::read(root.join(file_name).as_path())
                .with_context(|| format!("failed to read archive: {file_name}"))?;
            let compression_options = FileCompressionOptions::builder()
                .version(options.version())
                .build();

            let files = ["License.txt", "Preview.png"];
            for file_name in files {
                let path = root.join(file_name);
                let directory = bsa
                    .get(&ArchiveKey::from(b"."))
                    .with_context(|| format!("failed to get directory for: {file_name}"))?;
                let compressed_from_archive = directory
                    .get(&DirectoryKey::from(file_name))
                    .with_context(|| format!("failed to get file for: {file_name}"))?;
                assert!(compressed_from_archive.is_compressed());

                let metadata = fs::metadata(&path)
                    .with_context(|| format!("failed to get metadata for: {path:?}"))?;
                let decompressed_len = compressed_from_archive
                    .decompressed_len()
                    .with_context(|| format!("file was not compressed: {path:?}"))?
                    as u64;
                assert_eq!(decompressed_len, metadata.len());

                let decompressed_from_disk = File::read(path.as_path())
                    .with_context(|| format!("failed to read file from disk: {path:?}"))?;
                let compressed_from_disk = decompressed_from_disk
                    .compress(&compression_options)
                    .with_context(|| format!("failed to compress file: {path:?}"))?;
                assert_eq!(
                    compressed_from_archive.decompressed_len(),
                    compressed_from_disk.decompressed_len()
                );

                let decompressed_from_archive = compressed_from_archive
                    .decompress(&compression_options)
                    .with_context(|| format!("failed to decompress file: {file_name}"))?;
                assert_eq!(
                    decompressed_from_archive.as_bytes(),
                    decompressed_from_disk.as_bytes()
                );
            }

            Ok(())
        };

        test("test_104.bsa").context("v104")?;
        test("test_105.bsa").context("v105")?;

        Ok(())
    }

    #[test]
    fn xbox_decompressed() -> anyhow::Result<()> {
        let root = Path::new("data/tes4_xbox_read_test");

        let (normal, normal_options) = Archive::read(root.join("normal.bsa").as_path())
            .context("failed to read normal archive")?;
        assert!(!normal_options.flags().xbox_archive());
        assert!(!normal_options.flags().xbox_compressed());
        assert!(!normal_options.flags().compressed());

        let (xbox, xbox_options) = Archive::read(root.join("xbox.bsa").as_path())
            .context("failed to read xbox archive")?;
        assert!(xbox_options.flags().xbox_archive());
        assert!(!xbox_options.flags().xbox_compressed());
        assert!(!xbox_options.flags().compressed());

        assert_eq!(normal.len(), xbox.len());
        for (directory_normal, directory_xbox) in normal.iter().zip(xbox) {
            assert_eq!(directory_normal.0.hash, directory_xbox.0.hash);
            assert_eq!(directory_normal.0.name, directory_xbox.0.name);
            assert_eq!(directory_normal.1.len(), directory_xbox.1.len());

            for (file_normal, file_xbox) in directory_normal.1.iter().zip(directory_xbox.1) {
                assert_eq!(file_normal.0.hash, file_xbox.0.hash);
                assert_eq!(file_normal.0.name, file_xbox.0.name);
                assert!(!file_normal.1.is_compressed());
                assert!(!file_xbox.1.is_compressed());
                assert_eq!(file_normal.1.len(), file_xbox.1.len());
                assert_eq!(file_normal.1.as_bytes(), file_xbox.1.as_bytes());
            }
        }

        Ok(())
    }

    #[test]
    fn file_compression_diverges_from_archive_compression() -> anyhow::Result<()> {
        let root = Path::new("data/tes4_compression_mismatch_test");
        let (bsa, options) =
            Archive::read(root.join("test.bsa").as_path()).context("failed to read archive")?;
        assert!(options.flags().compressed());

        let files = ["License.txt", "SampleA.png"];
        let directory = bsa
            .get(&ArchiveKey::from(b"."))
            .context("failed to get root directory from archive")?;
        assert_eq!(directory.len(), files.len());

        for file_name in files {
            let path = root.join(file_name);
            let metadata = fs::metadata(&path)
                .with_context(|| format!("failed to get metadata for file: {path:?}"))?;
            let file = directory
                .get(&DirectoryKey::from(file_name))
                .with_context(|| format!("failed to get file from directory: {file_name}"))?;
            assert!(!file.is_compressed());
            assert_eq!(file.len() as u64, metadata.len());
        }

        Ok(())
    }

    #[test]
    fn invalid_magic() -> anyhow::Result<()> {
        let path = Path::new("data/tes4_invalid_test/invalid_magic.bsa");
        match Archive::read(path) {
            Err(Error::InvalidMagic(0x00324142)) => Ok(()),
            Err(err) => Err(anyhow::Error::from(err)),
            Ok(_) => anyhow::bail!("read should have failed"),
        }
    }

    #[test]
    fn invalid_size() -> anyhow::Result<()> {
        let path = Path::new("data/tes4_invalid_test/invalid_size.bsa");
        match Archive::read(path) {
            Err(Error::InvalidHeaderSize(0xCC)) => Ok(()),
            Err(err) => Err(anyhow::Error::from(err)),
            Ok(_) => anyhow::bail!("read should have failed"),
        }
    }

    #[test]
    fn invalid_version() -> anyhow::Result<()> {
        let path = Path::new("data/tes4_invalid_test/invalid_version.bsa");
        match Archive::read(path) {
            Err(Error::InvalidVersion(42)) => Ok(()),
            Err(err) => Err(anyhow::Error::from(err)),
            Ok(_) => anyhow::bail!("read should have failed"),
        }
    }

    #[test]
    fn invalid_exhausted() -> anyhow::Result<()> {
        let path = Path::new("data/tes4_invalid_test/invalid_exhausted.bsa");
        match Archive::read(path) {
            Err(Error::Io(error)) => {
                assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
                Ok(())
            }
            Err(err) => Err(anyhow::Error::from(err)),
            Ok(_) => anyhow::bail!("read should have failed"),
        }
    }

    #[test]
    fn writing_round_trip() -> anyhow::Result<()> {
        let license = b"this archive is licensed under the MIT license\n".repeat(4);
        let preview = [0xABu8; 37];

        let mut directory = Directory::new();
        let mut license_file = File::from_decompressed(&license[..]);
        license_file.secondary_archive = true;
        assert!(directory
            .insert(DirectoryKey::from(b"license.txt".as_slice()), license_file)
            .is_none());
        assert!(directory
            .insert(
                DirectoryKey::from(b"preview.png".as_slice()),
                File::from_decompressed(&preview[..])
            )
            .is_none());

        let mut archive = Archive::new();
        assert!(archive
            .insert(ArchiveKey::from(b"textures\\armor".as_slice()), directory)
            .is_none());

        let options = Options::builder().version(Version::SSE).build();
        let bytes = {
            let mut out = Vec::new();
            archive
                .write(&mut out, &options)
                .context("failed to write archive to memory")?;
            out
        };

        let (read_back, read_options) =
            Archive::read(Borrowed(&bytes)).context("failed to read archive back from memory")?;
        assert_eq!(read_options.version(), Version::SSE);
        assert_eq!(read_options.flags(), Flags::default());

        let directory = read_back
            .get(&ArchiveKey::from(b"textures\\armor".as_slice()))
            .context("missing directory after round trip")?;

        let license_back = directory
            .get(&DirectoryKey::from(b"license.txt".as_slice()))
            .context("missing license.txt after round trip")?;
        assert_eq!(license_back.as_bytes(), &license[..]);
        assert!(license_back.secondary_archive);
        assert!(!license_back.is_compressed());

        let preview_back = directory
            .get(&DirectoryKey::from(b"preview.png".as_slice()))
            .context("missing preview.png after round trip")?;
        assert_eq!(preview_back.as_bytes(), &preview[..]);
        assert!(!preview_back.secondary_archive);

        Ok(())
    }

    #[test]
    fn verify_offsets_flags_offset_overflow() {
        const TWO_GIB: usize = 1 << 31;

        let mut directory = Directory::new();
        directory.insert(
            DirectoryKey::from(b"small.dat".as_slice()),
            File::from_decompressed(&[0u8; 16][..]).into_owned(),
        );
        directory.insert(
            DirectoryKey::from(b"big.dat".as_slice()),
            File::from_decompressed(vec![0u8; TWO_GIB]),
        );

        let mut archive = Archive::new();
        archive.insert(ArchiveKey::from(b".".as_slice()), directory);

        assert!(archive.verify_offsets(Version::v103));

        let directory = archive.get_mut(&ArchiveKey::from(b".".as_slice())).unwrap();
        directory.insert(
            DirectoryKey::from(b"tiny.dat".as_slice()),
            File::from_decompressed(&[0u8; 4][..]).into_owned(),
        );

        assert!(!archive.verify_offsets(Version::v103));
    }
}
