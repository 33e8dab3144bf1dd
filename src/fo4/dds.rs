//! Minimal DDS header parsing/synthesis, just enough to support `directx` file chunking.
//!
//! The on-disk `fo4::FileDX10` record only keeps an 8 byte summary of a DDS file's header
//! (height, width, mip count, pixel format, a couple of flag bytes). Reconstructing a loadable
//! `.dds` file on extraction means synthesizing a real DDS header from that summary; splitting a
//! loose `.dds` file into archive chunks on insertion means reading just enough of its header to
//! know where each mip level begins and ends. Neither direction needs the rest of what a full
//! texture toolkit provides, so this is hand-rolled against the (stable, public) DDS layout
//! rather than pulled in through `directxtex` -- see `DESIGN.md`.

use crate::{
    fo4::{Error, Result},
    io::{BorrowedSource, Endian, Sink, Source as _},
};
use core::ops::Range;
use std::io::Write;

const MAGIC: u32 = 0x2053_4444; // "DDS "
const HEADER_SIZE: u32 = 124;
const PIXELFORMAT_SIZE: u32 = 32;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;

const DDPF_FOURCC: u32 = 0x4;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;
const DDSCAPS_TEXTURE: u32 = 0x1000;

const DX10_FOURCC: u32 = 0x3031_5844; // "DX10"
const DIMENSION_TEXTURE2D: u32 = 3;

/// The handful of header fields needed to chunk a `.dds` file by mip level.
pub(crate) struct Metadata {
    pub height: u32,
    pub width: u32,
    pub mip_count: u8,
    pub format: u32,
    pub body_offset: usize,
}

pub(crate) fn parse(bytes: &[u8]) -> Result<Metadata> {
    let mut source: BorrowedSource<'_> = bytes.into();

    let magic: u32 = source.read(Endian::Little)?;
    if magic != MAGIC {
        return Err(Error::InvalidDDSMagic(magic));
    }

    let size: u32 = source.read(Endian::Little)?;
    if size != HEADER_SIZE {
        return Err(Error::InvalidDDSHeaderSize(size));
    }

    let (flags, height, width, _pitch_or_linear_size, _depth, mip_map_count): (
        u32,
        u32,
        u32,
        u32,
        u32,
        u32,
    ) = source.read(Endian::Little)?;
    let mut reserved1 = [0u8; 4 * 11];
    source.read_into(&mut reserved1)?;

    let pf_size: u32 = source.read(Endian::Little)?;
    if pf_size != PIXELFORMAT_SIZE {
        return Err(Error::InvalidDDSHeaderSize(pf_size));
    }
    let (pf_flags, pf_four_cc): (u32, u32) = source.read(Endian::Little)?;
    let mut pf_rest = [0u8; 4 * 5];
    source.read_into(&mut pf_rest)?;

    let mut caps_block = [0u8; 4 * 5];
    source.read_into(&mut caps_block)?;

    let format = if pf_flags & DDPF_FOURCC != 0 && pf_four_cc == DX10_FOURCC {
        let (dxgi_format, _resource_dimension, _misc_flag, _array_size, _misc_flags2): (
            u32,
            u32,
            u32,
            u32,
            u32,
        ) = source.read(Endian::Little)?;
        dxgi_format
    } else {
        0
    };

    let mip_count = if flags & DDSD_MIPMAPCOUNT != 0 {
        mip_map_count.max(1)
    } else {
        1
    };

    let body_offset = source.stream_position();
    Ok(Metadata {
        height,
        width,
        mip_count: mip_count.try_into().unwrap_or(u8::MAX),
        format,
        body_offset,
    })
}

/// Writes a full DDS header (including the `DX10` extension) reconstructed from the archive's
/// compact 8 byte summary.
pub(crate) fn write_header<Out>(
    stream: &mut Out,
    height: u16,
    width: u16,
    mip_count: u8,
    format: u32,
) -> Result<()>
where
    Out: ?Sized + Write,
{
    let mut sink = Sink::new(stream);
    let has_mips = mip_count > 1;
    let top_mip_size = mip_size(format, width.into(), height.into());

    let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
    flags |= if block_size(format).is_some() {
        DDSD_LINEARSIZE
    } else {
        DDSD_PITCH
    };
    if has_mips {
        flags |= DDSD_MIPMAPCOUNT;
    }

    let mut caps = DDSCAPS_TEXTURE;
    if has_mips {
        caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
    }

    sink.write(
        &(
            MAGIC,
            HEADER_SIZE,
            flags,
            u32::from(height),
            u32::from(width),
            u32::try_from(top_mip_size)?,
            1u32, // depth
            u32::from(mip_count),
        ),
        Endian::Little,
    )?;
    sink.write_bytes(&[0u8; 4 * 11])?; // reserved1

    sink.write(
        &(PIXELFORMAT_SIZE, DDPF_FOURCC, DX10_FOURCC),
        Endian::Little,
    )?;
    sink.write_bytes(&[0u8; 4 * 5])?; // bit counts/masks, unused under fourCC

    sink.write(&caps, Endian::Little)?;
    sink.write_bytes(&[0u8; 4 * 3])?; // caps2, caps3, caps4
    sink.write(&0u32, Endian::Little)?; // reserved2

    sink.write(
        &(
            format,
            DIMENSION_TEXTURE2D,
            0u32, // misc flag
            1u32, // array size
            0u32, // misc flags2
        ),
        Endian::Little,
    )?;

    Ok(())
}

/// The number of bytes a single block-compressed block occupies, if `format` is block compressed.
fn block_size(format: u32) -> Option<usize> {
    match format {
        70..=72 | 79..=81 => Some(8),                     // BC1, BC4
        73..=78 | 82..=84 | 94..=99 => Some(16),          // BC2, BC3, BC5, BC6H, BC7
        _ => None,
    }
}

/// Bytes per pixel for formats this crate can reason about outside of block compression.
fn bytes_per_pixel(format: u32) -> usize {
    match format {
        2 | 5 | 6 | 10 | 17 | 20 | 24 => 16,
        9 | 13 | 16 | 23 | 34 | 35 | 41 => 8,
        28..=33 | 87..=91 => 4,
        48..=52 | 95 | 96 => 4,
        38..=40 | 53..=56 | 61 => 2,
        60..=65 => 1,
        _ => 4,
    }
}

/// Size in bytes of a single mip level at the given dimensions.
pub(crate) fn mip_size(format: u32, width: u32, height: u32) -> usize {
    match block_size(format) {
        Some(block_bytes) => {
            let blocks_wide = ((width + 3) / 4).max(1) as usize;
            let blocks_high = ((height + 3) / 4).max(1) as usize;
            blocks_wide * blocks_high * block_bytes
        }
        None => (width as usize) * (height as usize) * bytes_per_pixel(format),
    }
}

/// Splits `mip_count` mip levels (of a texture sized `width`x`height`) into chunk mip ranges.
///
/// The first chunk is always the largest mip that still exceeds `max_width`/`max_height`; once a
/// mip's dimensions fall within the threshold, exactly one more mip is split out on its own, and
/// everything smaller than that is bundled into a final trailing chunk.
pub(crate) fn chunk_ranges(
    mip_count: u8,
    mut width: u32,
    mut height: u32,
    max_width: u32,
    max_height: u32,
) -> Vec<Range<u16>> {
    let mut ranges = Vec::new();
    let mut mip: u16 = 0;
    let count = u16::from(mip_count);

    while mip < count && (width > max_width || height > max_height) {
        ranges.push(mip..(mip + 1));
        mip += 1;
        width = (width / 2).max(1);
        height = (height / 2).max(1);
    }

    if mip < count {
        ranges.push(mip..(mip + 1));
        mip += 1;
    }

    if mip < count {
        ranges.push(mip..count);
    }

    ranges
}
