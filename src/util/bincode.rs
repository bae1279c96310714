//! Fixed-width, little-endian bincode for the small records kept next to the
//! index entries. Go through these helpers rather than `bincode` directly so
//! the on-disk format cannot drift with the crate's defaults.

use bincode_do_not_use_directly as bincode;
use bincode::Options;

pub fn serialize_little<T>(value: &T) -> Result<Vec<u8>, bincode::Error>
where
    T: ?Sized + serde::Serialize,
{
    little_endian().serialize(value)
}

pub fn deserialize_little<'a, T>(bytes: &'a [u8]) -> Result<T, bincode::Error>
where
    T: serde::Deserialize<'a>,
{
    little_endian().deserialize(bytes)
}

fn little_endian() -> impl Options {
    bincode::options()
        .with_little_endian()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}
