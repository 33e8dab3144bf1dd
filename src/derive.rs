//! Code generation for the repetitive plumbing shared by every archive format: hash newtypes,
//! keyed entries, byte-container wrappers, and the associative containers that sit at the root
//! of every archive/directory.

macro_rules! container_wrapper {
    ($this:ident $(, extra: $($extra:ident),+)?) => {
        impl<'a> $this<'a> {
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                self.container.as_bytes()
            }

            #[must_use]
            pub fn as_ptr(&self) -> *const u8 {
                self.container.as_ptr()
            }

            #[must_use]
            pub fn into_owned(self) -> $this<'static> {
                $this {
                    container: self.container.into_owned(),
                    $($($extra: self.$extra,)+)?
                }
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.container.is_empty()
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.container.len()
            }

            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}

pub(crate) use container_wrapper;

/// Generates a plain container wrapper (a struct with a single `container: CompressableBytes`
/// or `Bytes` field) around [`container_wrapper`], for types like `tes3::File`/`tes4::File` that
/// are nothing more than a byte buffer with codec-specific compression methods layered on top.
/// The `=> $result, $err` form additionally wires up the `Reader<T>` glue (see
/// [`archive_reader`]) so the type gets a `read` entrypoint accepting a path, an open file, or a
/// borrowed/copied byte slice. Any fields besides `container` (e.g. `tes4::File`'s
/// `secondary_archive` flag) must be named after `extra:` so `into_owned` carries them over.
macro_rules! container {
    ($this:ident $(, extra: $($extra:ident),+)?) => {
        $crate::derive::container_wrapper!($this $(, extra: $($extra),+)?);
    };

    ($this:ident => $result:ident, $err:ty $(, extra: $($extra:ident),+)?) => {
        $crate::derive::container_wrapper!($this $(, extra: $($extra),+)?);
        $crate::derive::container_reader!($this, $result, $err);
    };
}

pub(crate) use container;

/// Generates the same `Reader<T>` glue as [`archive_reader`], but for a plain byte container
/// (`tes3::File`/`tes4::File`) rather than an archive -- the whole source is handed to `do_read`
/// in one shot instead of being scanned for a header-driven set of child records.
macro_rules! container_reader {
    ($this:ident, $result:ident, $err:ty) => {
        impl<'a> $crate::Sealed for $this<'a> {}

        impl<'bytes> $crate::Reader<$crate::Borrowed<'bytes>> for $this<'bytes> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: $crate::Borrowed<'bytes>,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let mut source = $crate::io::BorrowedSource::from(source.0);
                Self::do_read(&mut source)
            }
        }

        impl<'bytes> $crate::Reader<$crate::Copied<'bytes>> for $this<'static> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: $crate::Copied<'bytes>,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let mut source = $crate::io::CopiedSource::from(source.0);
                Self::do_read(&mut source)
            }
        }

        impl $crate::Reader<&::std::fs::File> for $this<'static> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: &::std::fs::File,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let mut source = $crate::io::MappedSource::try_from(source)?;
                Self::do_read(&mut source)
            }
        }

        impl $crate::Reader<&::std::path::Path> for $this<'static> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: &::std::path::Path,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let fd = ::std::fs::File::open(source)?;
                <Self as $crate::Reader<&::std::fs::File>>::read(&fd)
            }
        }

        impl<'a> $this<'a> {
            /// Reads this file from `source`, which may be a [`Path`](std::path::Path), an open
            /// [`File`](std::fs::File), or a [`Borrowed`](crate::Borrowed)/[`Copied`](crate::Copied)
            /// byte slice.
            pub fn read<In>(source: In) -> core::result::Result<$result<Self>, $err>
            where
                Self: $crate::Reader<In, Error = $err, Item = $result<Self>>,
            {
                <Self as $crate::Reader<In>>::read(source)
            }
        }
    };
}

pub(crate) use container_reader;

/// Generates accessors for a type that wraps [`CompressableBytes`](crate::containers::CompressableBytes)
/// directly rather than through [`container!`] -- used by [`fo4::Chunk`](crate::fo4::Chunk), which
/// has extra fields ([`mips`](crate::fo4::Chunk::mips)) alongside its byte payload.
macro_rules! compressable_bytes {
    ($this:ident : $options:ty) => {
        impl<'bytes> $this<'bytes> {
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
                self.bytes.decompressed_len()
            }

            #[must_use]
            pub fn is_compressed(&self) -> bool {
                self.bytes.is_compressed()
            }

            #[must_use]
            pub fn is_decompressed(&self) -> bool {
                self.bytes.is_decompressed()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.bytes.is_empty()
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.bytes.len()
            }

            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}

pub(crate) use compressable_bytes;

/// Generates a newtype over a format's raw `Hash` -- used so archive keys can carry a
/// format-distinctive hash type (`tes3::FileHash`, `tes4::FileHash`, `fo4::FileHash`, ...) while
/// every format shares the same `Hash`-based plumbing underneath.
macro_rules! hash {
    ($name:ident) => {
        $crate::derive::hash!($name, Hash);
    };

    ($name:ident, $hash:ty) => {
        #[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
        #[repr(transparent)]
        pub struct $name($hash);

        impl core::borrow::Borrow<$hash> for $name {
            fn borrow(&self) -> &$hash {
                &self.0
            }
        }

        impl core::ops::Deref for $name {
            type Target = $hash;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl core::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<$hash> for $name {
            fn from(value: $hash) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $hash {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

pub(crate) use hash;

/// Generates a hashed, named key type (`hash` + normalized `name`) used as the key of every
/// archive/directory map. `$hash` is whichever hash newtype [`hash!`] produced for this format.
///
/// The key orders and compares purely by hash -- for TES4 that ordering is the archive's actual
/// on-disk iteration order, for TES3/FO4 it exists only so the key type has a total order, never
/// as a format contract.
macro_rules! key {
    ($name:ident : $hash:ty) => {
        #[derive(Clone, Debug, Default)]
        pub struct $name {
            pub hash: $hash,
            pub name: ::bstr::BString,
        }

        impl core::borrow::Borrow<$hash> for $name {
            fn borrow(&self) -> &$hash {
                &self.hash
            }
        }

        impl core::cmp::PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.hash == other.hash
            }
        }

        impl core::cmp::Eq for $name {}

        impl core::cmp::PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl core::cmp::Ord for $name {
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                self.hash.cmp(&other.hash)
            }
        }

        impl From<$hash> for $name {
            fn from(hash: $hash) -> Self {
                Self {
                    hash,
                    name: ::bstr::BString::default(),
                }
            }
        }

        impl From<::bstr::BString> for $name {
            fn from(mut name: ::bstr::BString) -> Self {
                let hash = Self::hash_in_place(&mut name);
                Self { hash, name }
            }
        }

        impl From<&[u8]> for $name {
            fn from(name: &[u8]) -> Self {
                Self::from(::bstr::BString::from(name))
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::from(::bstr::BString::from(name))
            }
        }
    };
}

pub(crate) use key;

/// Generates the forwarding accessors shared by every archive-shaped map: `Archive` (the
/// entrypoint) and `Directory` (a nested, non-entrypoint map). Backed by `$backing`, which is
/// either an insertion-order-preserving [`OrderedMap`](crate::hashmap::OrderedMap) (TES3, FO4 --
/// the on-disk position of an entry is part of the format) or a [`BTreeMap`](std::collections::BTreeMap)
/// (TES4 -- directories/files are required to iterate in ascending hash order).
macro_rules! map_body {
    ($name:ident, $map:ident, $key:ty, $value:ty, $backing:ty) => {
        pub(crate) type $map<'bytes> = $backing;

        impl<'bytes> $name<'bytes> {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.map.is_empty()
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.map.len()
            }

            pub fn get<Q>(&self, key: &Q) -> Option<&$value>
            where
                $key: core::borrow::Borrow<Q>,
                Q: ?Sized + Ord + Eq,
            {
                self.map.get(key)
            }

            pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut $value>
            where
                $key: core::borrow::Borrow<Q>,
                Q: ?Sized + Ord + Eq,
            {
                self.map.get_mut(key)
            }

            pub fn remove<Q>(&mut self, key: &Q) -> Option<$value>
            where
                $key: core::borrow::Borrow<Q>,
                Q: ?Sized + Ord + Eq,
            {
                self.map.remove(key)
            }

            pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<($key, $value)>
            where
                $key: core::borrow::Borrow<Q>,
                Q: ?Sized + Ord + Eq,
            {
                self.map.remove_entry(key)
            }

            pub fn insert<K>(&mut self, key: K, value: $value) -> Option<$value>
            where
                K: Into<$key>,
            {
                self.map.insert(key.into(), value)
            }

            pub fn keys(&self) -> impl Iterator<Item = &$key> {
                self.map.keys()
            }

            pub fn values(&self) -> impl Iterator<Item = &$value> {
                self.map.values()
            }

            pub fn values_mut(&mut self) -> impl Iterator<Item = &mut $value> {
                self.map.values_mut()
            }

            pub fn iter(&self) -> impl Iterator<Item = (&$key, &$value)> {
                self.map.iter()
            }
        }

        impl<'bytes> Default for $name<'bytes> {
            fn default() -> Self {
                Self {
                    map: Default::default(),
                }
            }
        }

        impl<'bytes, K> FromIterator<(K, $value)> for $name<'bytes>
        where
            K: Into<$key>,
        {
            fn from_iter<I>(iter: I) -> Self
            where
                I: IntoIterator<Item = (K, $value)>,
            {
                let mut result = Self::default();
                for (key, value) in iter {
                    result.insert(key, value);
                }
                result
            }
        }

        impl<'a, 'bytes> IntoIterator for &'a $name<'bytes> {
            type Item = (&'a $key, &'a $value);
            type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

            fn into_iter(self) -> Self::IntoIter {
                Box::new(self.map.iter())
            }
        }

        impl<'bytes> IntoIterator for $name<'bytes> {
            type Item = ($key, $value);
            type IntoIter = <$backing as IntoIterator>::IntoIter;

            fn into_iter(self) -> Self::IntoIter {
                self.map.into_iter()
            }
        }
    };
}

pub(crate) use map_body;

/// Generates a nested, non-entrypoint map type (e.g. [`tes4::Directory`](crate::tes4::Directory)).
macro_rules! mapping {
    ($name:ident, $map:ident : $key:ty => $value:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name<'bytes> {
            pub(crate) map: $map<'bytes>,
        }

        $crate::derive::map_body!($name, $map, $key, $value<'bytes>, ::std::collections::BTreeMap<$key, $value<'bytes>>);
    };

    ($name:ident, $map:ident : ($key:ty, $hashty:ty) => $value:ident) => {
        $crate::derive::mapping!($name, $map : $key => $value);
    };
}

pub(crate) use mapping;

/// Generates the archive entrypoint type: a map plus the `Reader<T>` glue that dispatches
/// on the caller's input (a borrowed slice, a copied slice, an open file, or a path) to build
/// the right [`Source`](crate::io::Source) and call into the format's own `do_read`.
macro_rules! archive {
    (ordered $name:ident => $result:ident, $err:ty, $map:ident : $key:ty => $value:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name<'bytes> {
            pub(crate) map: $map<'bytes>,
        }

        $crate::derive::map_body!(
            $name,
            $map,
            $key,
            $value<'bytes>,
            $crate::hashmap::OrderedMap<$key, $value<'bytes>>
        );

        $crate::derive::archive_reader!($name, $result, $err);
    };

    (sorted $name:ident => $result:ident, $err:ty, $map:ident : $key:ty => $value:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name<'bytes> {
            pub(crate) map: $map<'bytes>,
        }

        $crate::derive::map_body!(
            $name,
            $map,
            $key,
            $value<'bytes>,
            ::std::collections::BTreeMap<$key, $value<'bytes>>
        );

        $crate::derive::archive_reader!($name, $result, $err);
    };
}

pub(crate) use archive;

macro_rules! archive_reader {
    ($name:ident, $result:ident, $err:ty) => {
        impl<'bytes> $crate::Sealed for $name<'bytes> {}

        impl<'bytes> $crate::Reader<$crate::Borrowed<'bytes>> for $name<'bytes> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: $crate::Borrowed<'bytes>,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let mut source = $crate::io::BorrowedSource::from(source.0);
                Self::do_read(&mut source)
            }
        }

        impl<'bytes> $crate::Reader<$crate::Copied<'bytes>> for $name<'static> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: $crate::Copied<'bytes>,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let mut source = $crate::io::CopiedSource::from(source.0);
                Self::do_read(&mut source)
            }
        }

        impl $crate::Reader<&::std::fs::File> for $name<'static> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: &::std::fs::File,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let mut source = $crate::io::MappedSource::try_from(source)?;
                Self::do_read(&mut source)
            }
        }

        impl $crate::Reader<&::std::path::Path> for $name<'static> {
            type Error = $err;
            type Item = $result<Self>;

            fn read(
                source: &::std::path::Path,
            ) -> core::result::Result<Self::Item, Self::Error> {
                let fd = ::std::fs::File::open(source)?;
                <Self as $crate::Reader<&::std::fs::File>>::read(&fd)
            }
        }

        impl<'bytes> $name<'bytes> {
            /// Reads an archive from `source`, which may be a [`Path`](std::path::Path), an
            /// open [`File`](std::fs::File), or a [`Borrowed`](crate::Borrowed)/[`Copied`](crate::Copied)
            /// byte slice.
            pub fn read<In>(source: In) -> core::result::Result<$result<Self>, $err>
            where
                Self: $crate::Reader<In, Error = $err, Item = $result<Self>>,
            {
                <Self as $crate::Reader<In>>::read(source)
            }
        }
    };
}

pub(crate) use archive_reader;
