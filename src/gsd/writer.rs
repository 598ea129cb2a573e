use std::{
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use super::{make_version, ChunkData, Header, IndexEntry, HEADER_SIZE, NAME_SIZE};
use crate::{Error, Result};

/// Writes a GSD 2.0 file frame by frame.
///
/// Chunk data is appended as it is written; the index and the name list
/// follow the last frame and the header is rewritten by [`GsdWriter::finish`].
pub struct GsdWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    header: Header,
    names: Vec<String>,
    index: Vec<IndexEntry>,
    frame: u64,
    location: u64,
}
impl GsdWriter {
    pub fn create(
        path: impl AsRef<Path>,
        application: &str,
        schema: &str,
        schema_version: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&[0u8; HEADER_SIZE])
            .map_err(|e| Error::io(&path, e))?;
        let header = Header {
            index_location: 0,
            index_allocated_entries: 0,
            namelist_location: 0,
            namelist_allocated_entries: 0,
            schema_version,
            gsd_version: make_version(2, 0),
            application: application.to_owned(),
            schema: schema.to_owned(),
        };
        Ok(Self {
            path,
            writer,
            header,
            names: Vec::new(),
            index: Vec::new(),
            frame: 0,
            location: HEADER_SIZE as u64,
        })
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Append an `n x m` chunk to the current frame
    pub fn write_chunk(&mut self, name: &str, n: u64, m: u32, data: &ChunkData) -> Result<()> {
        if n == 0 || m == 0 {
            return Err(Error::Format(format!("chunk {} has no data", name)));
        }
        if data.len() as u64 != n * m as u64 {
            return Err(Error::Format(format!(
                "chunk {} declares {}x{} values but holds {}",
                name,
                n,
                m,
                data.len()
            )));
        }
        if name.is_empty() || name.contains('\0') {
            return Err(Error::Format(format!("invalid chunk name {:?}", name)));
        }
        let id = match self.names.iter().position(|n| n == name) {
            Some(id) => id,
            None => {
                self.names.push(name.to_owned());
                self.names.len() - 1
            }
        };
        let id = u16::try_from(id)
            .map_err(|_| Error::Format(String::from("too many distinct chunk names")))?;

        let bytes = data.encode();
        self.writer
            .write_all(&bytes)
            .map_err(|e| Error::io(&self.path, e))?;
        self.index.push(IndexEntry {
            frame: self.frame,
            n,
            location: self.location as i64,
            m,
            id,
            type_id: data.chunk_type() as u8,
            flags: 0,
        });
        self.location += bytes.len() as u64;
        Ok(())
    }

    pub fn end_frame(&mut self) {
        self.frame += 1;
    }

    /// Write the index, the name list and the final header
    pub fn finish(mut self) -> Result<()> {
        let path = self.path.clone();
        let io = |e| Error::io(&path, e);

        self.header.index_location = self.location;
        self.header.index_allocated_entries = self.index.len().max(1) as u64;
        for entry in &self.index {
            self.writer.write_all(&entry.encode()).map_err(io)?;
        }
        if self.index.is_empty() {
            self.writer.write_all(&[0u8; 32]).map_err(io)?;
        }
        self.location += self.header.index_allocated_entries * 32;

        let mut namelist: Vec<u8> = Vec::new();
        for name in &self.names {
            namelist.extend_from_slice(name.as_bytes());
            namelist.push(0);
        }
        let allocated = namelist.len() / NAME_SIZE + 1;
        namelist.resize(allocated * NAME_SIZE, 0);
        self.header.namelist_location = self.location;
        self.header.namelist_allocated_entries = allocated as u64;
        self.writer.write_all(&namelist).map_err(io)?;

        self.writer.seek(SeekFrom::Start(0)).map_err(io)?;
        self.writer.write_all(&self.header.encode()).map_err(io)?;
        self.writer.flush().map_err(io)
    }
}
