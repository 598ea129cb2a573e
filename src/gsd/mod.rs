//! Reading and writing GSD files.
//!
//! GSD is a little-endian container of named, typed `N x M` chunks grouped
//! into frames. [`GsdFile`] and [`GsdWriter`] handle the container; the
//! [`hoomd`] module maps the `hoomd` schema onto a [`Snapshot`].

mod file;
pub mod hoomd;
mod writer;

pub use file::GsdFile;
pub use hoomd::Snapshot;
pub use writer::GsdWriter;

use num_traits::{NumCast, ToPrimitive};

use crate::{Error, Result};

pub(crate) const MAGIC: u64 = 0x65DF_65DF_65DF_65DF;
pub(crate) const HEADER_SIZE: usize = 256;
pub(crate) const INDEX_ENTRY_SIZE: usize = 32;
pub(crate) const NAME_SIZE: usize = 64;

pub const fn make_version(major: u32, minor: u32) -> u32 {
    (major << 16) | minor
}

/// File header found at offset 0
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub index_location: u64,
    pub index_allocated_entries: u64,
    pub namelist_location: u64,
    pub namelist_allocated_entries: u64,
    pub schema_version: u32,
    pub gsd_version: u32,
    pub application: String,
    pub schema: String,
}
impl Header {
    pub(crate) fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        if read_u64(bytes, 0) != MAGIC {
            return Err(Error::Format(String::from("missing GSD magic number")));
        }
        Ok(Self {
            index_location: read_u64(bytes, 8),
            index_allocated_entries: read_u64(bytes, 16),
            namelist_location: read_u64(bytes, 24),
            namelist_allocated_entries: read_u64(bytes, 32),
            schema_version: read_u32(bytes, 40),
            gsd_version: read_u32(bytes, 44),
            application: fixed_str(&bytes[48..48 + NAME_SIZE]),
            schema: fixed_str(&bytes[48 + NAME_SIZE..48 + 2 * NAME_SIZE]),
        })
    }
    pub(crate) fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&MAGIC.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.index_location.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.index_allocated_entries.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.namelist_location.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.namelist_allocated_entries.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.schema_version.to_le_bytes());
        bytes[44..48].copy_from_slice(&self.gsd_version.to_le_bytes());
        write_fixed_str(&mut bytes[48..48 + NAME_SIZE], &self.application);
        write_fixed_str(&mut bytes[48 + NAME_SIZE..48 + 2 * NAME_SIZE], &self.schema);
        bytes
    }
    pub fn major_version(&self) -> u32 {
        self.gsd_version >> 16
    }
}

/// One entry of the chunk index
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexEntry {
    pub frame: u64,
    pub n: u64,
    pub location: i64,
    pub m: u32,
    pub id: u16,
    pub type_id: u8,
    pub flags: u8,
}
impl IndexEntry {
    pub(crate) fn decode(bytes: &[u8]) -> Self {
        Self {
            frame: read_u64(bytes, 0),
            n: read_u64(bytes, 8),
            location: read_u64(bytes, 16) as i64,
            m: read_u32(bytes, 24),
            id: u16::from_le_bytes([bytes[28], bytes[29]]),
            type_id: bytes[30],
            flags: bytes[31],
        }
    }
    pub(crate) fn encode(&self) -> [u8; INDEX_ENTRY_SIZE] {
        let mut bytes = [0u8; INDEX_ENTRY_SIZE];
        bytes[0..8].copy_from_slice(&self.frame.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.n.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.location.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.m.to_le_bytes());
        bytes[28..30].copy_from_slice(&self.id.to_le_bytes());
        bytes[30] = self.type_id;
        bytes[31] = self.flags;
        bytes
    }
    pub fn is_used(&self) -> bool {
        self.location != 0
    }
}

/// Element type of a chunk, with its on-disk identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkType {
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
    F32 = 9,
    F64 = 10,
    Char = 11,
}
impl ChunkType {
    pub fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            1 => ChunkType::U8,
            2 => ChunkType::U16,
            3 => ChunkType::U32,
            4 => ChunkType::U64,
            5 => ChunkType::I8,
            6 => ChunkType::I16,
            7 => ChunkType::I32,
            8 => ChunkType::I64,
            9 => ChunkType::F32,
            10 => ChunkType::F64,
            11 => ChunkType::Char,
            _ => return Err(Error::Format(format!("unknown chunk type {}", id))),
        })
    }
    pub fn size(&self) -> usize {
        match self {
            ChunkType::U8 | ChunkType::I8 | ChunkType::Char => 1,
            ChunkType::U16 | ChunkType::I16 => 2,
            ChunkType::U32 | ChunkType::I32 | ChunkType::F32 => 4,
            ChunkType::U64 | ChunkType::I64 | ChunkType::F64 => 8,
        }
    }
}

/// Typed contents of a chunk, row-major
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Char(Vec<u8>),
}

fn decode_le<T, const W: usize>(bytes: &[u8], from: fn([u8; W]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(W)
        .map(|c| {
            let mut a = [0u8; W];
            a.copy_from_slice(c);
            from(a)
        })
        .collect()
}

fn cast_all<S: ToPrimitive + Copy, D: NumCast>(values: &[S]) -> Option<Vec<D>> {
    values.iter().map(|&v| D::from(v)).collect()
}

impl ChunkData {
    pub fn decode(chunk_type: ChunkType, bytes: &[u8]) -> Self {
        match chunk_type {
            ChunkType::U8 => ChunkData::U8(bytes.to_vec()),
            ChunkType::Char => ChunkData::Char(bytes.to_vec()),
            ChunkType::I8 => ChunkData::I8(bytes.iter().map(|&b| b as i8).collect()),
            ChunkType::U16 => ChunkData::U16(decode_le(bytes, u16::from_le_bytes)),
            ChunkType::I16 => ChunkData::I16(decode_le(bytes, i16::from_le_bytes)),
            ChunkType::U32 => ChunkData::U32(decode_le(bytes, u32::from_le_bytes)),
            ChunkType::I32 => ChunkData::I32(decode_le(bytes, i32::from_le_bytes)),
            ChunkType::F32 => ChunkData::F32(decode_le(bytes, f32::from_le_bytes)),
            ChunkType::U64 => ChunkData::U64(decode_le(bytes, u64::from_le_bytes)),
            ChunkType::I64 => ChunkData::I64(decode_le(bytes, i64::from_le_bytes)),
            ChunkType::F64 => ChunkData::F64(decode_le(bytes, f64::from_le_bytes)),
        }
    }
    pub fn encode(&self) -> Vec<u8> {
        fn flat<T, const W: usize>(values: &[T], to: fn(&T) -> [u8; W]) -> Vec<u8> {
            values.iter().flat_map(to).collect()
        }
        match self {
            ChunkData::U8(v) | ChunkData::Char(v) => v.clone(),
            ChunkData::I8(v) => v.iter().map(|&b| b as u8).collect(),
            ChunkData::U16(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::I16(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::U32(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::I32(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::F32(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::U64(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::I64(v) => flat(v, |x| x.to_le_bytes()),
            ChunkData::F64(v) => flat(v, |x| x.to_le_bytes()),
        }
    }
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            ChunkData::U8(_) => ChunkType::U8,
            ChunkData::U16(_) => ChunkType::U16,
            ChunkData::U32(_) => ChunkType::U32,
            ChunkData::U64(_) => ChunkType::U64,
            ChunkData::I8(_) => ChunkType::I8,
            ChunkData::I16(_) => ChunkType::I16,
            ChunkData::I32(_) => ChunkType::I32,
            ChunkData::I64(_) => ChunkType::I64,
            ChunkData::F32(_) => ChunkType::F32,
            ChunkData::F64(_) => ChunkType::F64,
            ChunkData::Char(_) => ChunkType::Char,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            ChunkData::U8(v) | ChunkData::Char(v) => v.len(),
            ChunkData::U16(v) => v.len(),
            ChunkData::U32(v) => v.len(),
            ChunkData::U64(v) => v.len(),
            ChunkData::I8(v) => v.len(),
            ChunkData::I16(v) => v.len(),
            ChunkData::I32(v) => v.len(),
            ChunkData::I64(v) => v.len(),
            ChunkData::F32(v) => v.len(),
            ChunkData::F64(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Convert every element to `D`, failing if any value does not fit
    pub fn cast<D: NumCast>(&self) -> Result<Vec<D>> {
        let converted = match self {
            ChunkData::U8(v) | ChunkData::Char(v) => cast_all(v),
            ChunkData::U16(v) => cast_all(v),
            ChunkData::U32(v) => cast_all(v),
            ChunkData::U64(v) => cast_all(v),
            ChunkData::I8(v) => cast_all(v),
            ChunkData::I16(v) => cast_all(v),
            ChunkData::I32(v) => cast_all(v),
            ChunkData::I64(v) => cast_all(v),
            ChunkData::F32(v) => cast_all(v),
            ChunkData::F64(v) => cast_all(v),
        };
        converted.ok_or_else(|| {
            Error::Format(format!(
                "{:?} chunk holds values out of range for the requested type",
                self.chunk_type()
            ))
        })
    }
    /// Raw bytes of an 8-bit chunk
    pub fn bytes(&self) -> Result<Vec<u8>> {
        match self {
            ChunkData::U8(v) | ChunkData::Char(v) => Ok(v.clone()),
            ChunkData::I8(v) => Ok(v.iter().map(|&b| b as u8).collect()),
            other => Err(Error::Format(format!(
                "expected a character chunk, found {:?}",
                other.chunk_type()
            ))),
        }
    }
}

/// A chunk read from a file: `n` rows of `m` columns
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub n: u64,
    pub m: u32,
    pub data: ChunkData,
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(a)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut a = [0u8; 4];
    a.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(a)
}

/// Null-padded string stored in a fixed-size field
pub(crate) fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn write_fixed_str(field: &mut [u8], s: &str) {
    // keep one byte for the terminator
    let n = s.len().min(field.len() - 1);
    field[..n].copy_from_slice(&s.as_bytes()[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = Header {
            index_location: 1024,
            index_allocated_entries: 16,
            namelist_location: 2048,
            namelist_allocated_entries: 2,
            schema_version: make_version(1, 4),
            gsd_version: make_version(2, 0),
            application: String::from("mdrun"),
            schema: String::from("hoomd"),
        };
        let bytes = header.encode();
        assert_eq!(&bytes[0..8], &[0xDF, 0x65, 0xDF, 0x65, 0xDF, 0x65, 0xDF, 0x65]);
        assert_eq!(&bytes[48..53], b"mdrun");
        assert_eq!(bytes[112], b'h');
        assert_eq!(Header::decode(&bytes).unwrap(), header);
        assert_eq!(header.major_version(), 2);
    }

    #[test]
    fn bad_magic() {
        let bytes = [0u8; HEADER_SIZE];
        assert!(matches!(Header::decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn cast_checks_range() {
        let data = ChunkData::I32(vec![-1, 2]);
        assert_eq!(data.cast::<f64>().unwrap(), vec![-1.0, 2.0]);
        assert!(data.cast::<u32>().is_err());
        assert_eq!(ChunkType::from_id(9).unwrap().size(), 4);
        assert!(ChunkType::from_id(42).is_err());
    }

    #[test]
    fn index_entry_layout() {
        let entry = IndexEntry {
            frame: 3,
            n: 10,
            location: 256,
            m: 3,
            id: 7,
            type_id: ChunkType::F32 as u8,
            flags: 0,
        };
        let bytes = entry.encode();
        assert_eq!(bytes[30], 9);
        assert_eq!(IndexEntry::decode(&bytes), entry);
    }
}
