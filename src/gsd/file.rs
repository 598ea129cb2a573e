use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use super::{
    fixed_str, Chunk, ChunkData, ChunkType, Header, IndexEntry, HEADER_SIZE, INDEX_ENTRY_SIZE,
    NAME_SIZE,
};
use crate::{Error, Result};

/// A GSD file opened for reading
pub struct GsdFile {
    path: PathBuf,
    reader: BufReader<File>,
    file_len: u64,
    header: Header,
    index: Vec<IndexEntry>,
    names: Vec<String>,
    num_frames: u64,
}
impl GsdFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let file_len = file.metadata().map_err(|e| Error::io(&path, e))?.len();
        let mut reader = BufReader::new(file);

        if file_len < HEADER_SIZE as u64 {
            return Err(Error::Format(format!(
                "{} is too short to be a GSD file",
                path.display()
            )));
        }
        let mut header_bytes = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| Error::io(&path, e))?;
        let header = Header::decode(&header_bytes)?;
        let major = header.major_version();
        if major != 1 && major != 2 {
            return Err(Error::Format(format!(
                "unsupported GSD version {}.{}",
                major,
                header.gsd_version & 0xffff
            )));
        }

        let mut gsd = Self {
            path,
            reader,
            file_len,
            header,
            index: Vec::new(),
            names: Vec::new(),
            num_frames: 0,
        };
        gsd.read_index()?;
        gsd.read_namelist()?;
        gsd.check_index()?;
        Ok(gsd)
    }

    // Getters
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn header(&self) -> &Header {
        &self.header
    }
    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn find_chunk(&self, frame: u64, name: &str) -> Option<&IndexEntry> {
        let id = self.names.iter().position(|n| n == name)?;
        self.index
            .iter()
            .find(|e| e.frame == frame && e.id as usize == id)
    }
    pub fn chunk_exists(&self, frame: u64, name: &str) -> bool {
        self.find_chunk(frame, name).is_some()
    }
    /// Read a chunk, or `None` if the frame does not hold it
    pub fn read_chunk(&mut self, frame: u64, name: &str) -> Result<Option<Chunk>> {
        let entry = match self.find_chunk(frame, name) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        let chunk_type = ChunkType::from_id(entry.type_id)?;
        let size = entry
            .n
            .checked_mul(entry.m as u64)
            .and_then(|c| c.checked_mul(chunk_type.size() as u64))
            .ok_or_else(|| Error::Format(format!("chunk {} is too large", name)))?;
        let bytes = self.read_at(entry.location as u64, size)?;
        Ok(Some(Chunk {
            n: entry.n,
            m: entry.m,
            data: ChunkData::decode(chunk_type, &bytes),
        }))
    }

    fn read_at(&mut self, location: u64, size: u64) -> Result<Vec<u8>> {
        if location < HEADER_SIZE as u64 || location.saturating_add(size) > self.file_len {
            return Err(Error::Format(format!(
                "block of {} bytes at {} lies outside {}",
                size,
                location,
                self.path.display()
            )));
        }
        let mut bytes = vec![0u8; size as usize];
        self.reader
            .seek(SeekFrom::Start(location))
            .and_then(|_| self.reader.read_exact(&mut bytes))
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(bytes)
    }

    fn read_index(&mut self) -> Result<()> {
        let size = self
            .header
            .index_allocated_entries
            .saturating_mul(INDEX_ENTRY_SIZE as u64);
        let bytes = self.read_at(self.header.index_location, size)?;
        self.index = bytes
            .chunks_exact(INDEX_ENTRY_SIZE)
            .map(IndexEntry::decode)
            .filter(|e| e.is_used())
            .collect();
        self.num_frames = self.index.iter().map(|e| e.frame + 1).max().unwrap_or(0);
        Ok(())
    }

    fn read_namelist(&mut self) -> Result<()> {
        let location = self.header.namelist_location;
        let size = self
            .header
            .namelist_allocated_entries
            .saturating_mul(NAME_SIZE as u64);
        let bytes = self.read_at(location, size)?;

        self.names = if self.header.major_version() == 1 {
            bytes
                .chunks(NAME_SIZE)
                .map(fixed_str)
                .take_while(|n| !n.is_empty())
                .collect()
        } else {
            bytes
                .split(|&b| b == 0)
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .take_while(|n| !n.is_empty())
                .collect()
        };
        Ok(())
    }

    /// Every used index entry must name a chunk in the name list
    fn check_index(&self) -> Result<()> {
        match self.index.iter().find(|e| e.id as usize >= self.names.len()) {
            Some(entry) => Err(Error::Format(format!(
                "index entry in frame {} refers to unknown name {} in {}",
                entry.frame,
                entry.id,
                self.path.display()
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::gsd::{make_version, ChunkData, GsdWriter};

    fn write_two_chunks(path: &Path) {
        let mut writer = GsdWriter::create(path, "test", "custom", make_version(1, 0)).unwrap();
        writer
            .write_chunk("a/value", 2, 1, &ChunkData::U32(vec![7, 8]))
            .unwrap();
        writer
            .write_chunk("b/value", 1, 3, &ChunkData::F64(vec![0.5, 1.5, 2.5]))
            .unwrap();
        writer.end_frame();
        writer.finish().unwrap();
    }

    #[test]
    fn truncated_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.gsd");
        write_two_chunks(&path);
        let full = fs::read(&path).unwrap();
        assert!(GsdFile::open(&path).is_ok());

        for cut in [1, 10, 40, 64] {
            fs::write(&path, &full[..full.len() - cut]).unwrap();
            match GsdFile::open(&path) {
                Err(Error::Format(_)) => {}
                other => panic!("cut of {} bytes gave {:?}", cut, other.map(|f| f.num_frames())),
            }
        }
    }

    #[test]
    fn index_ids_must_name_a_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.gsd");
        write_two_chunks(&path);
        let mut bytes = fs::read(&path).unwrap();
        let header_bytes: [u8; HEADER_SIZE] = bytes[..HEADER_SIZE].try_into().unwrap();
        let header = Header::decode(&header_bytes).unwrap();

        // id of the second index entry
        let id_at = header.index_location as usize + INDEX_ENTRY_SIZE + 28;
        bytes[id_at..id_at + 2].copy_from_slice(&9u16.to_le_bytes());
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(GsdFile::open(&path), Err(Error::Format(_))));
    }
}
