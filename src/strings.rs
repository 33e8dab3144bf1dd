use crate::io::{BinaryReadable, BinaryWriteable, Endian, Source};
use bstr::{BStr, BString};
use std::io::{self, Write};

/// A null-terminated string with no length prefix, as used by TES3 BSA name tables.
pub(crate) struct ZString;

impl BinaryReadable for ZString {
    type Item = BString;

    fn from_stream<'bytes, In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
    where
        In: ?Sized + Source<'bytes>,
    {
        let mut result = Vec::new();
        loop {
            let byte: u8 = stream.read(endian)?;
            match byte {
                0 => break,
                byte => result.push(byte),
            };
        }

        result.shrink_to_fit();
        Ok(result.into())
    }
}

impl BinaryWriteable for ZString {
    type Item = BStr;

    fn to_stream<Out>(stream: &mut Out, item: &Self::Item, _: Endian) -> io::Result<()>
    where
        Out: ?Sized + Write,
    {
        stream.write_all(item)?;
        stream.write_all(b"\0")
    }
}
