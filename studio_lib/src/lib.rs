//! A library for reading Source engine studio model and texture file formats.
//!
//! Supported formats are the studio model header `.mdl`, the vertex data `.vvd`,
//! the optimized strip data `.vtx`, and the texture container `.vtf`.
//!
//! # Getting Started
//! Each format has its own module based on the name of the type representing the root of the file.
//! Only these top level types support reading from files.
//!
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mdl = studio_lib::mdl::Mdl::from_file("models/props/barrel.mdl")?;
//! println!("{mdl:#?}");
//!
//! let vvd = studio_lib::vvd::Vvd::from_file("models/props/barrel.vvd")?;
//! println!("{} vertices", vvd.vertices.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! Each file format consists of a set of Rust types representing the structures in the binary file.
//! studio_lib uses binrw derive macros to generate reading code from the type and its attribute annotations.
//!
//! Almost all offsets in these formats are relative to the start of the record containing them.
//! Records capture their own start position before reading any fields
//! and pass it to the helper functions that follow each offset.
//! The helpers always restore the stream position after reading,
//! so the parent record continues reading where it left off.
//!
//! Each file is fully parsed and any structural error fails the entire read.
//! studio_lib does not validate references between files like vertex indices
//! into the [vvd::Vvd] vertices. These checks are left to applications.
use std::{
    io::{Cursor, Read, Seek, SeekFrom},
    path::Path,
};

use binrw::{file_ptr::FilePtrArgs, BinRead, BinReaderExt, BinResult, NullString, VecArgs};
use error::{DecodeError, Format, LayoutError, ReadFileError};
use log::trace;

pub mod dds;
pub mod error;
pub mod mdl;
pub mod vtf;
pub mod vtx;
pub mod vvd;

/// A signed offset from a file relative to some `base` position.
///
/// The base position depends on the field.
/// Most offsets are relative to the start of the record containing the offset.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RelativeOffset {
    /// The absolute position the offset is relative to.
    pub base: u64,
    /// The stored offset value.
    pub delta: i32,
}

impl RelativeOffset {
    pub fn new(base: u64, delta: i32) -> Self {
        Self { base, delta }
    }

    /// The absolute position `base + delta`.
    ///
    /// This performs no bounds checking.
    /// The result may be negative or beyond the end of the stream for invalid files.
    pub fn resolve(&self) -> i64 {
        self.base as i64 + self.delta as i64
    }

    /// Returns `true` if the offset uses 0 to indicate no data.
    pub fn is_null(&self) -> bool {
        self.delta == 0
    }

    /// Resolve the offset and check that it lies within the stream.
    fn position<R: Seek>(&self, reader: &mut R) -> BinResult<u64> {
        let pos = reader.stream_position()?;
        let resolved = self.resolve();
        let len = stream_len(reader)?;
        // A non null offset never points back at the start of the file.
        if resolved == 0 && !self.is_null() {
            return Err(LayoutError::inconsistent(
                "offset",
                format!("offset {} from {:#x} resolves to 0", self.delta, self.base),
            )
            .at(pos));
        }
        if resolved < 0 || resolved as u64 > len {
            return Err(LayoutError::truncated(format!(
                "offset {} from {:#x} resolves to {resolved} outside stream length {len}",
                self.delta, self.base
            ))
            .at(pos));
        }
        Ok(resolved as u64)
    }
}

fn stream_len<R: Seek>(reader: &mut R) -> BinResult<u64> {
    let pos = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(len)
}

/// Classify an error from reading an entire file from `reader`.
fn decode_error<R: Seek>(reader: &mut R, format: Format, error: binrw::Error) -> DecodeError {
    // Running out of data is reported at the end of the stream.
    let len = stream_len(reader).unwrap_or_default();
    DecodeError::from_binrw(format, error, len)
}

/// Check that `size` bytes can be read from `pos` before allocating anything.
fn check_remaining<R: Seek>(reader: &mut R, pos: u64, size: u64) -> BinResult<()> {
    let len = stream_len(reader)?;
    if pos.checked_add(size).map(|end| end > len).unwrap_or(true) {
        return Err(LayoutError::truncated(format!(
            "{size} bytes at {pos:#x} exceed stream length {len}"
        ))
        .at(pos));
    }
    Ok(())
}

/// Read `size` bytes at the current position.
fn read_bytes<R: Read + Seek>(reader: &mut R, size: usize) -> BinResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    check_remaining(reader, pos, size as u64)?;

    let mut bytes = vec![0u8; size];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Read a null terminated string at `pos` without changing the current position.
///
/// Each byte is decoded as a single character.
pub fn read_string_at<R: Read + Seek>(reader: &mut R, pos: u64) -> BinResult<String> {
    let saved_pos = reader.stream_position()?;

    reader.seek(SeekFrom::Start(pos))?;
    let value = NullString::read_options(reader, binrw::Endian::Little, ()).map_err(|e| {
        if e.is_eof() {
            LayoutError::truncated(format!("unterminated string at {pos:#x}")).at(pos)
        } else {
            e
        }
    })?;
    reader.seek(SeekFrom::Start(saved_pos))?;

    Ok(value.0.iter().map(|b| *b as char).collect())
}

/// Decode a space or null padded inline name.
fn fixed_string<const N: usize>(bytes: [u8; N]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(N);
    bytes[..end]
        .iter()
        .map(|b| *b as char)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn parse_count32_offset32<T, R, Args>(
    reader: &mut R,
    endian: binrw::Endian,
    args: FilePtrArgs<Args>,
) -> BinResult<Vec<T>>
where
    for<'a> T: BinRead<Args<'a> = Args> + 'static,
    R: std::io::Read + std::io::Seek,
    Args: Clone,
{
    let count = i32::read_options(reader, endian, ())?;
    let delta = i32::read_options(reader, endian, ())?;
    let offset = RelativeOffset::new(args.offset, delta);
    parse_table(reader, endian, args.inner, offset, count)
}

/// Parse a table whose count was read separately from its offset.
fn parse_offset32_count<T, R>(
    reader: &mut R,
    endian: binrw::Endian,
    (base_offset, count): (u64, i32),
) -> BinResult<Vec<T>>
where
    for<'a> T: BinRead<Args<'a> = ()> + 'static,
    R: std::io::Read + std::io::Seek,
{
    let delta = i32::read_options(reader, endian, ())?;
    parse_table(
        reader,
        endian,
        (),
        RelativeOffset::new(base_offset, delta),
        count,
    )
}

fn parse_table<T, R, Args>(
    reader: &mut R,
    endian: binrw::Endian,
    inner: Args,
    offset: RelativeOffset,
    count: i32,
) -> BinResult<Vec<T>>
where
    for<'a> T: BinRead<Args<'a> = Args> + 'static,
    R: std::io::Read + std::io::Seek,
    Args: Clone,
{
    let pos = reader.stream_position()?;
    if count < 0 {
        return Err(LayoutError::inconsistent("count", format!("negative count {count}")).at(pos));
    }

    // Empty tables often use 0 or an arbitrary offset.
    if count == 0 {
        return Ok(Vec::new());
    }

    if offset.is_null() {
        return Err(LayoutError::inconsistent(
            "offset",
            format!("unexpected null offset for count {count}"),
        )
        .at(pos));
    }

    let start = offset.position(reader)?;
    // Records in the file are at least one byte even for placeholder types.
    check_remaining(reader, start, count as u64)?;

    parse_vec(reader, endian, inner, start, count as usize)
}

fn parse_vec<T, R, Args>(
    reader: &mut R,
    endian: binrw::Endian,
    inner: Args,
    pos: u64,
    count: usize,
) -> BinResult<Vec<T>>
where
    for<'a> T: BinRead<Args<'a> = Args> + 'static,
    R: std::io::Read + std::io::Seek,
    Args: Clone,
{
    let saved_pos = reader.stream_position()?;

    reader.seek(SeekFrom::Start(pos))?;
    trace!("{}: {:?}", std::any::type_name::<Vec<T>>(), pos);

    let values = Vec::<T>::read_options(reader, endian, VecArgs { count, inner })?;

    reader.seek(SeekFrom::Start(saved_pos))?;

    Ok(values)
}

fn parse_ptr<T, R, Args>(
    offset: RelativeOffset,
    reader: &mut R,
    endian: binrw::Endian,
    inner: Args,
) -> BinResult<T>
where
    for<'a> T: BinRead<Args<'a> = Args> + 'static,
    R: std::io::Read + std::io::Seek,
    Args: Clone,
{
    let saved_pos = reader.stream_position()?;

    let pos = offset.position(reader)?;
    reader.seek(SeekFrom::Start(pos))?;
    trace!("{}: {:?}", std::any::type_name::<T>(), pos);
    let value = T::read_options(reader, endian, inner)?;
    reader.seek(SeekFrom::Start(saved_pos))?;

    Ok(value)
}

fn parse_opt_ptr32<T, R, Args>(
    reader: &mut R,
    endian: binrw::Endian,
    args: FilePtrArgs<Args>,
) -> BinResult<Option<T>>
where
    for<'a> T: BinRead<Args<'a> = Args> + 'static,
    R: std::io::Read + std::io::Seek,
    Args: Clone,
{
    let delta = i32::read_options(reader, endian, ())?;
    let offset = RelativeOffset::new(args.offset, delta);
    if offset.is_null() {
        Ok(None)
    } else {
        parse_ptr(offset, reader, endian, args.inner).map(Some)
    }
}

/// Parse a name where a null offset indicates an empty name.
fn parse_string_ptr32<R: Read + Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    args: FilePtrArgs<()>,
) -> BinResult<String> {
    parse_string_opt_ptr32(reader, endian, args).map(Option::unwrap_or_default)
}

fn parse_string_opt_ptr32<R: Read + Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    args: FilePtrArgs<()>,
) -> BinResult<Option<String>> {
    let delta = i32::read_options(reader, endian, ())?;
    let offset = RelativeOffset::new(args.offset, delta);
    if offset.is_null() {
        Ok(None)
    } else {
        let pos = offset.position(reader)?;
        read_string_at(reader, pos).map(Some)
    }
}

/// Parse a count and offset to a table of string offsets relative to `args.offset`.
fn parse_string_table<R: Read + Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    args: FilePtrArgs<()>,
) -> BinResult<Vec<String>> {
    let base_offset = args.offset;
    let offsets: Vec<i32> = parse_count32_offset32(reader, endian, args)?;
    offsets
        .into_iter()
        .map(|delta| {
            let pos = RelativeOffset::new(base_offset, delta).position(reader)?;
            read_string_at(reader, pos)
        })
        .collect()
}

macro_rules! file_read_impl {
    ($($type_name:path => $format:expr),*) => {
        $(
            impl $type_name {
                pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, DecodeError> {
                    reader
                        .read_le()
                        .map_err(|e| decode_error(reader, $format, e))
                }

                /// Read from `path` using a fully buffered reader for performance.
                pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReadFileError> {
                    let path = path.as_ref();
                    std::fs::read(path)
                        .map_err(|source| DecodeError::Io {
                            format: $format,
                            source,
                        })
                        .and_then(Self::from_bytes)
                        .map_err(|source| ReadFileError {
                            path: path.to_owned(),
                            source,
                        })
                }

                /// Read from `bytes` using a fully buffered reader for performance.
                pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, DecodeError> {
                    Self::read(&mut Cursor::new(bytes))
                }
            }
        )*
    };
}

file_read_impl!(
    mdl::Mdl => Format::Mdl,
    vvd::Vvd => Format::Vvd,
    vtf::Vtf => Format::Vtf
);

#[cfg(test)]
mod tests {
    use super::*;

    use hexlit::hex;

    #[test]
    fn resolve_offsets() {
        assert_eq!(108, RelativeOffset::new(100, 8).resolve());
        assert_eq!(92, RelativeOffset::new(100, -8).resolve());
        assert_eq!(-4, RelativeOffset::new(0, -4).resolve());
        assert_eq!(100, RelativeOffset::new(100, 0).resolve());
        assert!(RelativeOffset::new(100, 0).is_null());
        assert!(!RelativeOffset::new(0, 4).is_null());
    }

    #[test]
    fn offset_position_out_of_bounds() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        assert_eq!(16, RelativeOffset::new(8, 8).position(&mut reader).unwrap());
        assert!(RelativeOffset::new(8, 9).position(&mut reader).is_err());
        assert!(RelativeOffset::new(8, -9).position(&mut reader).is_err());
    }

    #[test]
    fn offset_position_zero() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        assert_eq!(0, RelativeOffset::new(0, 0).position(&mut reader).unwrap());
        assert!(matches!(
            DecodeError::from_binrw(
                Format::Mdl,
                RelativeOffset::new(8, -8).position(&mut reader).unwrap_err(),
                16
            ),
            DecodeError::InconsistentLayout {
                field: "offset",
                ..
            }
        ));
    }

    #[test]
    fn read_string_restores_position() {
        let mut reader = Cursor::new(hex!(01020304 61626300 78797a00));
        reader.set_position(2);

        assert_eq!("abc", read_string_at(&mut reader, 4).unwrap());
        assert_eq!(2, reader.position());

        assert_eq!("xyz", read_string_at(&mut reader, 8).unwrap());
        assert_eq!(2, reader.position());

        assert_eq!("", read_string_at(&mut reader, 7).unwrap());
        assert_eq!(2, reader.position());
    }

    #[test]
    fn read_string_interleaved_with_records() {
        // Two records of (u16 value, i32 string offset) followed by strings.
        let mut reader = Cursor::new(hex!(
            0100 0c000000
            0200 0f000000
            6100 00 6200
        ));
        let mut values = Vec::new();
        for _ in 0..2 {
            let value: u16 = reader.read_le().unwrap();
            let offset: i32 = reader.read_le().unwrap();
            let name = read_string_at(&mut reader, offset as u64).unwrap();
            values.push((value, name));
        }
        assert_eq!(vec![(1, "a".to_string()), (2, "b".to_string())], values);
        assert_eq!(12, reader.position());
    }

    #[test]
    fn read_string_unterminated() {
        let mut reader = Cursor::new(hex!(61626364));
        let error = read_string_at(&mut reader, 1).unwrap_err();
        assert!(matches!(
            DecodeError::from_binrw(Format::Mdl, error, 4),
            DecodeError::TruncatedData { .. }
        ));
    }

    #[test]
    fn fixed_string_padding() {
        assert_eq!("abc", fixed_string(*b"abc\0\0\0\0\0"));
        assert_eq!("abc", fixed_string(*b"abc     "));
        assert_eq!("abcdefgh", fixed_string(*b"abcdefgh"));
    }

    #[test]
    fn parse_empty_table_without_seeking() {
        // The offset is invalid but never resolved for a count of 0.
        let mut reader = Cursor::new(hex!(00000000 ffffff7f));
        let values: Vec<u32> = parse_count32_offset32(
            &mut reader,
            binrw::Endian::Little,
            FilePtrArgs {
                offset: 0,
                inner: (),
            },
        )
        .unwrap();
        assert!(values.is_empty());
        assert_eq!(8, reader.position());
    }

    #[test]
    fn parse_table_relative_to_base() {
        let mut reader = Cursor::new(hex!(
            00000000
            02000000 04000000
            0a000000 0c000000
        ));
        reader.set_position(4);
        let values: Vec<u32> = parse_count32_offset32(
            &mut reader,
            binrw::Endian::Little,
            FilePtrArgs {
                offset: 8,
                inner: (),
            },
        )
        .unwrap();
        assert_eq!(vec![10, 12], values);
        assert_eq!(12, reader.position());
    }

    #[test]
    fn parse_table_null_offset() {
        let mut reader = Cursor::new(hex!(01000000 00000000));
        let error = parse_count32_offset32::<u32, _, _>(
            &mut reader,
            binrw::Endian::Little,
            FilePtrArgs {
                offset: 0,
                inner: (),
            },
        )
        .unwrap_err();
        assert!(matches!(
            DecodeError::from_binrw(Format::Vtx, error, 0),
            DecodeError::InconsistentLayout { .. }
        ));
    }

    #[test]
    fn parse_table_count_exceeds_stream() {
        let mut reader = Cursor::new(hex!(ffffff00 08000000));
        let error = parse_count32_offset32::<u32, _, _>(
            &mut reader,
            binrw::Endian::Little,
            FilePtrArgs {
                offset: 0,
                inner: (),
            },
        )
        .unwrap_err();
        assert!(matches!(
            DecodeError::from_binrw(Format::Vtx, error, 0),
            DecodeError::TruncatedData { .. }
        ));
    }

    #[test]
    fn parse_string_table_file_relative() {
        let mut reader = Cursor::new(hex!(
            02000000 08000000
            10000000 13000000
            61620063 646500
        ));
        let values = parse_string_table(
            &mut reader,
            binrw::Endian::Little,
            FilePtrArgs {
                offset: 0,
                inner: (),
            },
        )
        .unwrap();
        assert_eq!(vec!["ab".to_string(), "cde".to_string()], values);
        assert_eq!(8, reader.position());
    }
}
