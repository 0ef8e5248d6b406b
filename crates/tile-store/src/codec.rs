//! Binary container format for on-disk tiles.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic      4 bytes  "DEMT"
//! version    u16      container format version
//! hdr_len    u32      length of the JSON header
//! header     hdr_len  JSON-encoded TileHeader
//! crc32      u32      CRC-32 of the compressed payload
//! body_len   u32      length of the compressed payload
//! body       body_len zlib-compressed f32 LE samples
//! ```
//!
//! Nodata samples are stored as the header's sentinel value so the payload
//! stays plain IEEE floats; the sentinel is mapped back to NaN on decode.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use dem_common::{GeoBounds, GridCell, Resolution};

use crate::error::{StoreError, StoreResult};
use crate::tile::Tile;

const MAGIC: &[u8; 4] = b"DEMT";
const FORMAT_VERSION: u16 = 1;

/// On-disk value used for nodata samples.
const NODATA_SENTINEL: f32 = -32768.0;

/// JSON header stored in every tile file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileHeader {
    pub crs: String,
    pub dataset: String,
    pub resolution: Resolution,
    pub cell: GridCell,
    pub bounds: GeoBounds,
    pub width: usize,
    pub height: usize,
    pub processing_version: u32,
    pub nodata: f32,
}

/// Encode a tile into container bytes.
pub fn encode(tile: &Tile) -> StoreResult<Vec<u8>> {
    let header = TileHeader {
        crs: tile.crs.clone(),
        dataset: tile.dataset.clone(),
        resolution: tile.resolution,
        cell: tile.cell,
        bounds: tile.bounds,
        width: tile.width,
        height: tile.height,
        processing_version: tile.processing_version,
        nodata: NODATA_SENTINEL,
    };
    let header_bytes =
        serde_json::to_vec(&header).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    let mut raw = Vec::with_capacity(tile.samples.len() * 4);
    for &v in &tile.samples {
        let stored = if v.is_nan() { NODATA_SENTINEL } else { v };
        raw.extend_from_slice(&stored.to_le_bytes());
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let body = encoder.finish()?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&body);
    let crc = hasher.finalize();

    let mut out = BytesMut::with_capacity(4 + 2 + 4 + header_bytes.len() + 4 + 4 + body.len());
    out.put_slice(MAGIC);
    out.put_u16_le(FORMAT_VERSION);
    out.put_u32_le(header_bytes.len() as u32);
    out.put_slice(&header_bytes);
    out.put_u32_le(crc);
    out.put_u32_le(body.len() as u32);
    out.put_slice(&body);
    Ok(out.to_vec())
}

/// Decode only the header, without touching the compressed payload.
pub fn decode_header(bytes: &[u8]) -> StoreResult<TileHeader> {
    let mut buf = bytes;
    if buf.remaining() < 10 {
        return Err(StoreError::Corrupt("file too short for header".to_string()));
    }

    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(StoreError::Corrupt(format!(
            "bad magic {:02x?}, not a tile file",
            magic
        )));
    }

    let version = buf.get_u16_le();
    if version != FORMAT_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported container version {version}"
        )));
    }

    let hdr_len = buf.get_u32_le() as usize;
    if buf.remaining() < hdr_len {
        return Err(StoreError::Corrupt("truncated header".to_string()));
    }
    let header: TileHeader = serde_json::from_slice(&buf[..hdr_len])
        .map_err(|e| StoreError::Corrupt(format!("header JSON: {e}")))?;
    Ok(header)
}

/// Decode a full tile, verifying the payload checksum and sample count.
pub fn decode(bytes: &[u8]) -> StoreResult<Tile> {
    let header = decode_header(bytes)?;

    let mut buf = bytes;
    buf.advance(4 + 2);
    let hdr_len = buf.get_u32_le() as usize;
    buf.advance(hdr_len);

    if buf.remaining() < 8 {
        return Err(StoreError::Corrupt("truncated payload header".to_string()));
    }
    let expected_crc = buf.get_u32_le();
    let body_len = buf.get_u32_le() as usize;
    if buf.remaining() != body_len {
        return Err(StoreError::Corrupt(format!(
            "payload is {} bytes, header says {}",
            buf.remaining(),
            body_len
        )));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(buf);
    if hasher.finalize() != expected_crc {
        return Err(StoreError::Corrupt("payload checksum mismatch".to_string()));
    }

    let mut raw = Vec::new();
    ZlibDecoder::new(buf)
        .read_to_end(&mut raw)
        .map_err(|e| StoreError::Corrupt(format!("decompress: {e}")))?;

    if raw.len() != header.width * header.height * 4 {
        return Err(StoreError::Corrupt(format!(
            "payload decodes to {} bytes, expected {} for {}x{}",
            raw.len(),
            header.width * header.height * 4,
            header.width,
            header.height
        )));
    }

    let nodata = header.nodata;
    let samples: Vec<f32> = raw
        .chunks_exact(4)
        .map(|c| {
            let v = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
            if v == nodata {
                f32::NAN
            } else {
                v
            }
        })
        .collect();

    Ok(Tile {
        cell: header.cell,
        bounds: header.bounds,
        dataset: header.dataset,
        resolution: header.resolution,
        width: header.width,
        height: header.height,
        crs: header.crs,
        processing_version: header.processing_version,
        samples,
    })
}
