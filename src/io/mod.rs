//! Chart group file reading and writing

pub mod json;

pub use json::{BpmJson, GroupJson, NodeJson, NoteJson, TrackJson};

use crate::error::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Gzip magic bytes
const GZ_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn has_gz_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Read a chart group file, decompressing by extension or magic
pub fn read_group_file(path: &Path) -> Result<GroupJson> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();

    if has_gz_extension(path) {
        GzDecoder::new(file).read_to_end(&mut data)?;
    } else {
        file.read_to_end(&mut data)?;
        if data.starts_with(&GZ_MAGIC) {
            let compressed = std::mem::take(&mut data);
            GzDecoder::new(compressed.as_slice()).read_to_end(&mut data)?;
        }
    }

    Ok(serde_json::from_slice(&data)?)
}

/// Write a chart group file, compressing when the path ends in `.gz`
pub fn write_group_file(path: &Path, group: &GroupJson, compact: bool) -> Result<()> {
    let data = if compact {
        serde_json::to_vec(group)?
    } else {
        serde_json::to_vec_pretty(group)?
    };

    let mut file = File::create(path)?;
    if has_gz_extension(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&data)?;
        encoder.write_all(b"\n")?;
        encoder.finish()?;
    } else {
        file.write_all(&data)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}
