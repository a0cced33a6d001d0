//! Binary level format.
//!
//! Layout (little-endian, no padding):
//!
//! ```text
//! [u32 number_of_picks][u32 max_height]
//! [u32 tumbler_block_size][tumbler_block]
//! [u32 binding_block_size][binding_block]
//! ```
//!
//! Tumbler block: `[u32 count]`, then per tumbler
//! `[i32 position][u8 upper][i32 group][i32 base_height][i32 post_release_height][u8 master]`.
//!
//! Binding block: `[u32 count]`, then per source
//! `[i32 position][u8 upper][u32 target_count]` and per target
//! `[i32 position][u8 upper][i32 difference]`.
//!
//! Files on disk hold the payload gzip-compressed.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::error::LockError;
use crate::level::{Binding, Level};
use crate::location::Location;
use crate::tumbler::{Height, TumblerConfig};

const TUMBLER_RECORD_LEN: usize = 4 + 1 + 4 + 4 + 4 + 1;

/// Errors that can occur when reading or writing level files.
#[derive(Debug, Error)]
pub enum LevelFileError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Payload ended before a field could be read.
    #[error("level data truncated at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    /// A boolean byte other than 0 or 1.
    #[error("invalid bool byte {value:#04x} at offset {offset}")]
    InvalidBool { offset: usize, value: u8 },

    /// Declared block size disagrees with its contents.
    #[error("{block} block declares {declared} bytes but holds {actual}")]
    BlockSize {
        block: &'static str,
        declared: usize,
        actual: usize,
    },

    /// Bytes left over after the binding block.
    #[error("{count} trailing bytes after level data")]
    TrailingBytes { count: usize },

    /// A field that must be non-negative was negative.
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: i64 },

    /// A count or value does not fit the on-disk integer width.
    #[error("{field} does not fit in 32 bits")]
    Overflow { field: &'static str },

    /// Well-formed bytes describing an invalid level.
    #[error("invalid level: {0}")]
    Level(#[from] LockError),
}

pub type Result<T> = std::result::Result<T, LevelFileError>;

/// Serializes the level configuration (runtime state is not persisted).
pub fn encode(level: &Level) -> Result<Vec<u8>> {
    let tumblers = encode_tumblers(level)?;
    let bindings = encode_bindings(level)?;

    let mut out = Vec::with_capacity(20 + tumblers.len() + bindings.len());
    out.extend_from_slice(&level.number_of_picks().to_le_bytes());
    out.extend_from_slice(&to_u32("max_height", level.max_height())?.to_le_bytes());
    out.extend_from_slice(&len_u32("tumbler block size", tumblers.len())?.to_le_bytes());
    out.extend_from_slice(&tumblers);
    out.extend_from_slice(&len_u32("binding block size", bindings.len())?.to_le_bytes());
    out.extend_from_slice(&bindings);
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Level> {
    let mut reader = ByteReader::new(data);
    let number_of_picks = reader.read_u32()?;
    let max_height = from_u32("max_height", reader.read_u32()?)?;

    let tumbler_block = reader.read_block("tumbler")?;
    let binding_block = reader.read_block("binding")?;
    if reader.remaining() > 0 {
        return Err(LevelFileError::TrailingBytes {
            count: reader.remaining(),
        });
    }

    let tumblers = decode_tumblers(tumbler_block)?;
    let bindings = decode_bindings(binding_block)?;
    Ok(Level::from_parts(number_of_picks, max_height, tumblers, bindings)?)
}

pub fn compress(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    Ok(encoder.finish()?)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut payload = Vec::new();
    decoder.read_to_end(&mut payload)?;
    Ok(payload)
}

pub fn save(level: &Level, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = compress(&encode(level)?)?;
    fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), "level saved");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Level> {
    let path = path.as_ref();
    let level = decode(&decompress(&fs::read(path)?)?)?;
    tracing::debug!(
        path = %path.display(),
        tumblers = level.tumblers().len(),
        bindings = level.binding_count(),
        "level loaded"
    );
    Ok(level)
}

fn encode_tumblers(level: &Level) -> Result<Vec<u8>> {
    let tumblers = level.tumblers();
    let mut out = Vec::with_capacity(4 + tumblers.len() * TUMBLER_RECORD_LEN);
    out.extend_from_slice(&len_u32("tumbler count", tumblers.len())?.to_le_bytes());
    for tumbler in tumblers.values() {
        let config = tumbler.config();
        write_location(&mut out, config.location)?;
        out.extend_from_slice(&position_i32("group", config.group)?.to_le_bytes());
        out.extend_from_slice(&config.base_height.to_le_bytes());
        out.extend_from_slice(&config.post_release_height.to_le_bytes());
        out.push(u8::from(config.master));
    }
    Ok(out)
}

fn encode_bindings(level: &Level) -> Result<Vec<u8>> {
    let mut graph: BTreeMap<Location, Vec<(Location, Height)>> = BTreeMap::new();
    for binding in level.bindings() {
        graph
            .entry(binding.from)
            .or_default()
            .push((binding.to, binding.difference));
    }

    let mut out = Vec::new();
    out.extend_from_slice(&len_u32("binding source count", graph.len())?.to_le_bytes());
    for (from, targets) in &graph {
        write_location(&mut out, *from)?;
        out.extend_from_slice(&len_u32("binding target count", targets.len())?.to_le_bytes());
        for (to, difference) in targets {
            write_location(&mut out, *to)?;
            out.extend_from_slice(&difference.to_le_bytes());
        }
    }
    Ok(out)
}

fn decode_tumblers(block: &[u8]) -> Result<Vec<TumblerConfig>> {
    let mut reader = ByteReader::new(block);
    let count = reader.read_u32()? as usize;
    let expected = count.saturating_mul(TUMBLER_RECORD_LEN).saturating_add(4);
    if expected != block.len() {
        return Err(LevelFileError::BlockSize {
            block: "tumbler",
            declared: expected,
            actual: block.len(),
        });
    }

    let mut tumblers = Vec::with_capacity(count);
    for _ in 0..count {
        let location = reader.read_location()?;
        let group = reader.read_i32()?;
        let group = u32::try_from(group).map_err(|_| LockError::InvalidGroup(i64::from(group)))?;
        let base_height = reader.read_i32()?;
        let post_release_height = reader.read_i32()?;
        let master = reader.read_bool()?;
        tumblers.push(
            TumblerConfig::new(location, group, base_height)
                .with_post_release_height(post_release_height)
                .with_master(master),
        );
    }
    Ok(tumblers)
}

fn decode_bindings(block: &[u8]) -> Result<Vec<Binding>> {
    let mut reader = ByteReader::new(block);
    let sources = reader.read_u32()?;
    let mut bindings = Vec::new();
    for _ in 0..sources {
        let from = reader.read_location()?;
        let targets = reader.read_u32()?;
        for _ in 0..targets {
            let to = reader.read_location()?;
            let difference = reader.read_i32()?;
            bindings.push(Binding {
                from,
                to,
                difference,
            });
        }
    }
    if reader.remaining() > 0 {
        return Err(LevelFileError::BlockSize {
            block: "binding",
            declared: block.len(),
            actual: reader.offset,
        });
    }
    Ok(bindings)
}

fn write_location(out: &mut Vec<u8>, location: Location) -> Result<()> {
    out.extend_from_slice(&position_i32("position", location.position)?.to_le_bytes());
    out.push(u8::from(location.upper));
    Ok(())
}

fn len_u32(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| LevelFileError::Overflow { field })
}

fn position_i32(field: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| LevelFileError::Overflow { field })
}

fn to_u32(field: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| LevelFileError::Negative {
        field,
        value: i64::from(value),
    })
}

fn from_u32(field: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| LevelFileError::Overflow { field })
}

struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or(LevelFileError::Truncated {
                offset: self.offset,
                needed: len - self.remaining().min(len),
            })?;
        self.offset += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    fn read_bool(&mut self) -> Result<bool> {
        let offset = self.offset;
        match self.read_array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(LevelFileError::InvalidBool { offset, value }),
        }
    }

    fn read_location(&mut self) -> Result<Location> {
        let position = self.read_i32()?;
        let position = u32::try_from(position).map_err(|_| LevelFileError::Negative {
            field: "position",
            value: i64::from(position),
        })?;
        let upper = self.read_bool()?;
        Ok(Location::new(position, upper))
    }

    fn read_block(&mut self, block: &'static str) -> Result<&'a [u8]> {
        let declared = self.read_u32()? as usize;
        if declared > self.remaining() {
            return Err(LevelFileError::BlockSize {
                block,
                declared,
                actual: self.remaining(),
            });
        }
        self.take(declared)
    }
}
