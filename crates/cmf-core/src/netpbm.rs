//! Netpbm (PGM/PPM/PFM) raster support.
//!
//! Reads ASCII and binary greymaps/pixmaps (`P2`, `P3`, `P5`, `P6`) with
//! 8- or 16-bit samples, and portable float maps (`Pf`, `PF`). Integer
//! samples are normalised by maxval into `0..1`.
//!
//! Writing picks the variant from the image's data type: float types go to
//! PFM, `U16` and `U32` to 16-bit binary, everything else to 8-bit binary.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::{DataType, Error, Image, Result};

/// Parsed netpbm header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// 1 for greymaps, 3 for pixmaps.
    pub channels: u32,
    /// Native sample type.
    pub data_type: DataType,
    kind: Kind,
    /// Maxval for integer formats, scale for PFM.
    scale: f64,
}

impl Header {
    /// Samples in the raster.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] when the header's size does not fit in memory.
    pub fn sample_count(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.channels as usize))
            .ok_or_else(|| Error::decode("raster too large"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ascii,
    Binary,
    Float,
}

/// Reads the header of a netpbm file.
pub fn read_header(path: &Path) -> Result<Header> {
    let mut reader = BufReader::new(File::open(path)?);
    parse_header(&mut reader)
}

/// Reads a netpbm file fully into an in-memory image.
pub fn read(path: &Path) -> Result<Image> {
    let mut reader = BufReader::new(File::open(path)?);
    let header = parse_header(&mut reader)?;
    let count = header.sample_count()?;

    let data = match header.kind {
        Kind::Ascii => read_ascii(&mut reader, count, header.scale)?,
        Kind::Binary => read_binary(&mut reader, count, header.scale)?,
        Kind::Float => read_float(&mut reader, &header, count)?,
    };

    Ok(Image::from_data(header.width, header.height, header.channels, data)?
        .with_data_type(header.data_type))
}

/// Writes an image as binary netpbm.
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] for channel counts other than 1 or 3.
pub fn write(image: &Image, path: &Path) -> Result<()> {
    let channels = image.channels();
    if channels != 1 && channels != 3 {
        return Err(Error::UnsupportedFormat(format!(
            "netpbm cannot store {channels} channels"
        )));
    }
    let data = image.load()?;
    let mut writer = BufWriter::new(File::create(path)?);
    let (w, h) = (image.width(), image.height());

    if image.data_type().is_float() {
        let magic = if channels == 1 { "Pf" } else { "PF" };
        write!(writer, "{magic}\n{w} {h}\n-1.0\n")?;
        // PFM stores rows bottom to top
        let row_len = w as usize * channels as usize;
        for row in (0..h as usize).rev() {
            for v in &data[row * row_len..(row + 1) * row_len] {
                writer.write_all(&v.to_le_bytes())?;
            }
        }
    } else {
        let magic = if channels == 1 { "P5" } else { "P6" };
        let wide = matches!(image.data_type(), DataType::U16 | DataType::U32);
        let maxval: u32 = if wide { 65535 } else { 255 };
        write!(writer, "{magic}\n{w} {h}\n{maxval}\n")?;
        for v in data {
            let code = (v.clamp(0.0, 1.0) * maxval as f32).round() as u32;
            if wide {
                writer.write_all(&(code as u16).to_be_bytes())?;
            } else {
                writer.write_all(&[code as u8])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<Header> {
    let magic = next_token(reader)?;
    let (channels, kind) = match magic.as_str() {
        "P2" => (1, Kind::Ascii),
        "P3" => (3, Kind::Ascii),
        "P5" => (1, Kind::Binary),
        "P6" => (3, Kind::Binary),
        "Pf" => (1, Kind::Float),
        "PF" => (3, Kind::Float),
        other => {
            return Err(Error::UnsupportedFormat(format!("netpbm magic {other:?}")));
        }
    };
    let width = parse_num::<u32>(&next_token(reader)?)?;
    let height = parse_num::<u32>(&next_token(reader)?)?;
    let scale = parse_num::<f64>(&next_token(reader)?)?;

    let data_type = match kind {
        Kind::Float => DataType::Float,
        _ if scale > 255.0 => DataType::U16,
        _ => DataType::U8,
    };
    if kind != Kind::Float && !(1.0..=65535.0).contains(&scale) {
        return Err(Error::decode(format!("maxval {scale} out of range")));
    }

    Ok(Header {
        width,
        height,
        channels,
        data_type,
        kind,
        scale,
    })
}

/// Next whitespace-delimited token, skipping `#` comments.
///
/// Consumes exactly one whitespace byte after the token, which is what the
/// binary variants require before the raster.
fn next_token<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut token = String::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            if token.is_empty() {
                return Err(Error::decode("unexpected end of header"));
            }
            return Ok(token);
        }
        let c = byte[0];
        if c == b'#' && token.is_empty() {
            let mut skip = Vec::new();
            reader.read_until(b'\n', &mut skip)?;
            continue;
        }
        if c.is_ascii_whitespace() {
            if token.is_empty() {
                continue;
            }
            return Ok(token);
        }
        token.push(c as char);
    }
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse()
        .map_err(|_| Error::decode(format!("invalid header number {s:?}")))
}

/// Reads `count` samples of `bytes_per_sample` bytes, growing the buffer
/// as data arrives.
fn read_raw<R: Read>(reader: &mut R, count: usize, bytes_per_sample: usize) -> Result<Vec<u8>> {
    let len = count
        .checked_mul(bytes_per_sample)
        .ok_or_else(|| Error::decode("raster too large"))?;
    let mut raw = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut raw)?;
    if raw.len() != len {
        return Err(Error::decode(format!(
            "raster truncated: {} of {len} bytes",
            raw.len()
        )));
    }
    Ok(raw)
}

fn read_ascii<R: BufRead>(reader: &mut R, count: usize, maxval: f64) -> Result<Vec<f32>> {
    let mut data = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let v = parse_num::<f64>(&next_token(reader)?)?;
        data.push((v / maxval) as f32);
    }
    Ok(data)
}

fn read_binary<R: Read>(reader: &mut R, count: usize, maxval: f64) -> Result<Vec<f32>> {
    if maxval > 255.0 {
        let raw = read_raw(reader, count, 2)?;
        Ok(raw
            .chunks_exact(2)
            .map(|b| (u16::from_be_bytes([b[0], b[1]]) as f64 / maxval) as f32)
            .collect())
    } else {
        let raw = read_raw(reader, count, 1)?;
        Ok(raw.iter().map(|&b| (b as f64 / maxval) as f32).collect())
    }
}

fn read_float<R: Read>(reader: &mut R, header: &Header, count: usize) -> Result<Vec<f32>> {
    let row_len = header.width as usize * header.channels as usize;
    let raw = read_raw(reader, count, 4)?;
    let little = header.scale < 0.0;
    let samples: Vec<f32> = raw
        .chunks_exact(4)
        .map(|b| {
            let bytes = [b[0], b[1], b[2], b[3]];
            if little {
                f32::from_le_bytes(bytes)
            } else {
                f32::from_be_bytes(bytes)
            }
        })
        .collect();
    if row_len == 0 {
        return Ok(samples);
    }
    Ok(samples
        .chunks_exact(row_len)
        .rev()
        .flat_map(|row| row.iter().copied())
        .collect())
}
