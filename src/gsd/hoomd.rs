//! The `hoomd` schema: one particle configuration per frame.

use std::path::Path;

use num_traits::NumCast;

use super::{make_version, Chunk, ChunkData, GsdFile, GsdWriter};
use crate::{Error, Result};

pub const SCHEMA: &str = "hoomd";
pub const SCHEMA_VERSION: u32 = make_version(1, 4);
pub const APPLICATION: &str = concat!("mdrun ", env!("CARGO_PKG_VERSION"));

/// Particle configuration of one frame
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub step: u64,
    pub dimensions: u8,
    /// `[Lx, Ly, Lz, xy, xz, yz]`
    pub box_: [f64; 6],
    pub types: Vec<String>,
    pub typeid: Vec<u32>,
    pub mass: Vec<f64>,
    pub position: Vec<[f64; 3]>,
    pub velocity: Vec<[f64; 3]>,
    pub image: Vec<[i32; 3]>,
}
impl Default for Snapshot {
    fn default() -> Self {
        Self {
            step: 0,
            dimensions: 3,
            box_: [1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            types: vec![String::from("A")],
            typeid: Vec::new(),
            mass: Vec::new(),
            position: Vec::new(),
            velocity: Vec::new(),
            image: Vec::new(),
        }
    }
}

/// Resolve a frame index where negative values count back from the end
pub fn resolve_frame(frame: i64, num_frames: u64) -> Result<u64> {
    if num_frames == 0 {
        return Err(Error::Format(String::from("file contains no frames")));
    }
    let resolved = if frame < 0 {
        num_frames as i64 + frame
    } else {
        frame
    };
    if resolved < 0 || resolved as u64 >= num_frames {
        return Err(Error::Format(format!(
            "frame {} is out of range for a file with {} frames",
            frame, num_frames
        )));
    }
    Ok(resolved as u64)
}

impl Snapshot {
    pub fn num_particles(&self) -> usize {
        self.position.len()
    }

    /// Snapshot of `n` particles of type "A" at the origin, at rest
    pub fn with_particles(n: usize, box_: [f64; 6]) -> Self {
        Self {
            box_,
            typeid: vec![0; n],
            mass: vec![1.0; n],
            position: vec![[0.0; 3]; n],
            velocity: vec![[0.0; 3]; n],
            image: vec![[0; 3]; n],
            ..Self::default()
        }
    }

    /// Read one frame of a file, counting negative frames from the end
    pub fn read(path: impl AsRef<Path>, frame: i64) -> Result<Self> {
        let mut file = GsdFile::open(path)?;
        if file.header().schema != SCHEMA {
            return Err(Error::Format(format!(
                "expected the {} schema, found {:?}",
                SCHEMA,
                file.header().schema
            )));
        }
        let frame = resolve_frame(frame, file.num_frames())?;
        Self::from_frame(&mut file, frame)
    }

    /// Read a frame; absent chunks come from frame 0, then from the defaults
    pub fn from_frame(file: &mut GsdFile, frame: u64) -> Result<Self> {
        let defaults = Snapshot::default();

        let step = match read_with_fallback(file, frame, "configuration/step")? {
            Some(chunk) => scalar::<u64>(&chunk, "configuration/step")?,
            None => defaults.step,
        };
        let dimensions = match read_with_fallback(file, frame, "configuration/dimensions")? {
            Some(chunk) => scalar::<u8>(&chunk, "configuration/dimensions")?,
            None => defaults.dimensions,
        };
        if dimensions != 3 {
            return Err(Error::Format(format!(
                "only 3D systems are supported, found dimensions = {}",
                dimensions
            )));
        }
        let box_ = match read_with_fallback(file, frame, "configuration/box")? {
            Some(chunk) => {
                let values = column::<f64>(&chunk, "configuration/box", 1)?;
                <[f64; 6]>::try_from(values.as_slice()).map_err(|_| {
                    Error::Format(format!(
                        "configuration/box should hold 6 values, found {}",
                        values.len()
                    ))
                })?
            }
            None => defaults.box_,
        };

        let n = match read_with_fallback(file, frame, "particles/N")? {
            Some(chunk) => scalar::<usize>(&chunk, "particles/N")?,
            None => 0,
        };

        let types = match read_with_fallback(file, frame, "particles/types")? {
            Some(chunk) => type_names(&chunk)?,
            None => defaults.types,
        };
        let typeid = match read_with_fallback(file, frame, "particles/typeid")? {
            Some(chunk) => {
                per_particle(column::<u32>(&chunk, "particles/typeid", 1)?, n, "particles/typeid")?
            }
            None => vec![0; n],
        };
        if let Some(bad) = typeid.iter().find(|&&t| t as usize >= types.len()) {
            return Err(Error::Format(format!(
                "type id {} has no entry in particles/types ({} types)",
                bad,
                types.len()
            )));
        }
        let mass = match read_with_fallback(file, frame, "particles/mass")? {
            Some(chunk) => {
                per_particle(column::<f64>(&chunk, "particles/mass", 1)?, n, "particles/mass")?
            }
            None => vec![1.0; n],
        };
        let position = match read_with_fallback(file, frame, "particles/position")? {
            Some(chunk) => {
                per_particle(triples::<f64>(&chunk, "particles/position")?, n, "particles/position")?
            }
            None => vec![[0.0; 3]; n],
        };
        let velocity = match read_with_fallback(file, frame, "particles/velocity")? {
            Some(chunk) => {
                per_particle(triples::<f64>(&chunk, "particles/velocity")?, n, "particles/velocity")?
            }
            None => vec![[0.0; 3]; n],
        };
        let image = match read_with_fallback(file, frame, "particles/image")? {
            Some(chunk) => {
                per_particle(triples::<i32>(&chunk, "particles/image")?, n, "particles/image")?
            }
            None => vec![[0; 3]; n],
        };

        Ok(Self {
            step,
            dimensions,
            box_,
            types,
            typeid,
            mass,
            position,
            velocity,
            image,
        })
    }

    /// Write this snapshot as the next frame of `writer`
    pub fn write_frame(&self, writer: &mut GsdWriter) -> Result<()> {
        let n = self.num_particles();
        if self.typeid.len() != n
            || self.mass.len() != n
            || self.velocity.len() != n
            || self.image.len() != n
        {
            return Err(Error::Format(String::from(
                "per-particle arrays of the snapshot differ in length",
            )));
        }
        writer.write_chunk(
            "configuration/step",
            1,
            1,
            &ChunkData::U64(vec![self.step]),
        )?;
        writer.write_chunk(
            "configuration/dimensions",
            1,
            1,
            &ChunkData::U8(vec![self.dimensions]),
        )?;
        writer.write_chunk(
            "configuration/box",
            6,
            1,
            &ChunkData::F32(self.box_.iter().map(|&x| x as f32).collect()),
        )?;
        writer.write_chunk("particles/N", 1, 1, &ChunkData::U32(vec![n as u32]))?;

        let width = self.types.iter().map(|t| t.len()).max().unwrap_or(0) + 1;
        let mut names = vec![0u8; width * self.types.len()];
        for (i, t) in self.types.iter().enumerate() {
            names[i * width..i * width + t.len()].copy_from_slice(t.as_bytes());
        }
        writer.write_chunk(
            "particles/types",
            self.types.len() as u64,
            width as u32,
            &ChunkData::I8(names.into_iter().map(|b| b as i8).collect()),
        )?;
        if n == 0 {
            writer.end_frame();
            return Ok(());
        }

        let flat_f32 = |v: &[[f64; 3]]| -> ChunkData {
            ChunkData::F32(v.iter().flatten().map(|&x| x as f32).collect())
        };
        writer.write_chunk(
            "particles/typeid",
            n as u64,
            1,
            &ChunkData::U32(self.typeid.clone()),
        )?;
        writer.write_chunk(
            "particles/mass",
            n as u64,
            1,
            &ChunkData::F32(self.mass.iter().map(|&m| m as f32).collect()),
        )?;
        writer.write_chunk("particles/position", n as u64, 3, &flat_f32(&self.position))?;
        writer.write_chunk("particles/velocity", n as u64, 3, &flat_f32(&self.velocity))?;
        writer.write_chunk(
            "particles/image",
            n as u64,
            3,
            &ChunkData::I32(self.image.iter().flatten().copied().collect()),
        )?;
        writer.end_frame();
        Ok(())
    }

    /// Write a single-frame file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = GsdWriter::create(path, APPLICATION, SCHEMA, SCHEMA_VERSION)?;
        self.write_frame(&mut writer)?;
        writer.finish()
    }
}

fn read_with_fallback(file: &mut GsdFile, frame: u64, name: &str) -> Result<Option<Chunk>> {
    match file.read_chunk(frame, name)? {
        Some(chunk) => Ok(Some(chunk)),
        None if frame != 0 => file.read_chunk(0, name),
        None => Ok(None),
    }
}

fn column<D: NumCast>(chunk: &Chunk, name: &str, m: u32) -> Result<Vec<D>> {
    if chunk.m != m {
        return Err(Error::Format(format!(
            "{} should have {} column(s), found {}",
            name, m, chunk.m
        )));
    }
    chunk.data.cast()
}

fn scalar<D: NumCast + Copy>(chunk: &Chunk, name: &str) -> Result<D> {
    column::<D>(chunk, name, 1)?
        .first()
        .copied()
        .ok_or_else(|| Error::Format(format!("{} is empty", name)))
}

fn triples<D: NumCast + Copy>(chunk: &Chunk, name: &str) -> Result<Vec<[D; 3]>> {
    let flat = column::<D>(chunk, name, 3)?;
    Ok(flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

fn per_particle<T>(values: Vec<T>, n: usize, name: &str) -> Result<Vec<T>> {
    if values.len() != n {
        return Err(Error::Format(format!(
            "{} holds {} entries but particles/N is {}",
            name,
            values.len(),
            n
        )));
    }
    Ok(values)
}

fn type_names(chunk: &Chunk) -> Result<Vec<String>> {
    let bytes = chunk.data.bytes()?;
    let width = chunk.m as usize;
    Ok(bytes.chunks(width.max(1)).map(super::fixed_str).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gsd::GsdWriter;

    fn two_particles() -> Snapshot {
        let mut snapshot = Snapshot::with_particles(2, [4.0, 5.0, 6.0, 0.0, 0.0, 0.0]);
        snapshot.step = 12;
        snapshot.types = vec![String::from("A"), String::from("Bb")];
        snapshot.typeid = vec![1, 0];
        snapshot.mass = vec![1.0, 2.5];
        snapshot.position = vec![[0.5, -1.0, 2.0], [1.25, 0.0, -2.5]];
        snapshot.velocity = vec![[0.0, 1.0, 0.0], [-0.5, 0.0, 0.25]];
        snapshot.image = vec![[0, 1, 0], [-1, 0, 0]];
        snapshot
    }

    #[test]
    fn later_frames_fall_back_to_frame_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.gsd");
        let first = two_particles();

        let mut writer = GsdWriter::create(&path, APPLICATION, SCHEMA, SCHEMA_VERSION).unwrap();
        first.write_frame(&mut writer).unwrap();
        // second frame only updates the step and positions
        writer
            .write_chunk("configuration/step", 1, 1, &ChunkData::U64(vec![20]))
            .unwrap();
        writer
            .write_chunk(
                "particles/position",
                2,
                3,
                &ChunkData::F32(vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0]),
            )
            .unwrap();
        writer.end_frame();
        writer.finish().unwrap();

        let last = Snapshot::read(&path, -1).unwrap();
        assert_eq!(last.step, 20);
        assert_eq!(last.position, vec![[1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]]);
        assert_eq!(last.types, first.types);
        assert_eq!(last.mass, first.mass);
        assert_eq!(last.velocity, first.velocity);

        assert_eq!(Snapshot::read(&path, 0).unwrap(), first);
        assert!(Snapshot::read(&path, 2).is_err());
        assert!(Snapshot::read(&path, -3).is_err());
    }

    #[test]
    fn missing_chunks_use_schema_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.gsd");
        let mut writer = GsdWriter::create(&path, APPLICATION, SCHEMA, SCHEMA_VERSION).unwrap();
        writer
            .write_chunk("particles/N", 1, 1, &ChunkData::U32(vec![2]))
            .unwrap();
        writer
            .write_chunk(
                "particles/position",
                2,
                3,
                &ChunkData::F32(vec![0.0, 0.0, 0.0, 0.25, 0.0, 0.0]),
            )
            .unwrap();
        writer.end_frame();
        writer.finish().unwrap();

        let snapshot = Snapshot::read(&path, -1).unwrap();
        assert_eq!(snapshot.step, 0);
        assert_eq!(snapshot.box_, [1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(snapshot.types, vec![String::from("A")]);
        assert_eq!(snapshot.typeid, vec![0, 0]);
        assert_eq!(snapshot.mass, vec![1.0, 1.0]);
        assert_eq!(snapshot.velocity, vec![[0.0; 3]; 2]);
    }

    #[test]
    fn rejects_inconsistent_particle_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gsd");
        let mut writer = GsdWriter::create(&path, APPLICATION, SCHEMA, SCHEMA_VERSION).unwrap();
        writer
            .write_chunk("particles/N", 1, 1, &ChunkData::U32(vec![3]))
            .unwrap();
        writer
            .write_chunk("particles/position", 1, 3, &ChunkData::F32(vec![0.0; 3]))
            .unwrap();
        writer.end_frame();
        writer.finish().unwrap();
        assert!(matches!(Snapshot::read(&path, 0), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_two_dimensional_systems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.gsd");
        let mut snapshot = two_particles();
        snapshot.dimensions = 2;
        snapshot.write(&path).unwrap();
        assert!(matches!(Snapshot::read(&path, 0), Err(Error::Format(_))));
    }

    #[test]
    fn truncated_snapshot_does_not_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.gsd");
        two_particles().write(&path).unwrap();
        let full = std::fs::read(&path).unwrap();
        std::fs::write(&path, &full[..full.len() - 40]).unwrap();
        assert!(matches!(Snapshot::read(&path, 0), Err(Error::Format(_))));
    }

    #[test]
    fn negative_frames_count_from_the_end() {
        assert_eq!(resolve_frame(-1, 5).unwrap(), 4);
        assert_eq!(resolve_frame(0, 5).unwrap(), 0);
        assert!(resolve_frame(5, 5).is_err());
        assert!(resolve_frame(0, 0).is_err());
    }
}
