//! routing.bin format - the relocatable routing structure as one blob
//!
//! Format (little-endian):
//!
//! Header (16 bytes):
//!   magic:       u32 = 0x52544E47  // "RTNG"
//!   version:     u16 = 1
//!   reserved:    u16 = 0
//!   payload_len: u64
//!
//! Body: bincode-encoded [`Routing`]
//!
//! Footer (16 bytes):
//!   body_crc64:  u64
//!   file_crc64:  u64

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::crc::Digest;
use crate::error::GraphError;
use crate::graph::routing::Routing;

const MAGIC: u32 = 0x52544E47; // "RTNG"
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 16;
const FOOTER_SIZE: usize = 16;

/// Write routing.bin
pub fn write<P: AsRef<Path>>(path: P, routing: &Routing) -> Result<(), GraphError> {
    let payload = bincode::serialize(routing)?;

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(&MAGIC.to_le_bytes());
    header.extend_from_slice(&VERSION.to_le_bytes());
    header.extend_from_slice(&0u16.to_le_bytes());
    header.extend_from_slice(&(payload.len() as u64).to_le_bytes());

    let mut body_digest = Digest::new();
    body_digest.update(&payload);
    let body_crc = body_digest.finalize();

    let mut file_digest = Digest::new();
    file_digest.update(&header);
    file_digest.update(&payload);
    let file_crc = file_digest.finalize();

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header)?;
    writer.write_all(&payload)?;
    writer.write_all(&body_crc.to_le_bytes())?;
    writer.write_all(&file_crc.to_le_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read routing.bin, verifying magic, version, and both checksums.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Routing, GraphError> {
    let bytes = std::fs::read(path.as_ref())?;
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(GraphError::Truncated);
    }

    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(GraphError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
    if version != VERSION {
        return Err(GraphError::BadVersion(version));
    }
    let payload_len = u64::from_le_bytes(bytes[8..16].try_into().unwrap()) as usize;
    if bytes.len() != HEADER_SIZE + payload_len + FOOTER_SIZE {
        return Err(GraphError::Truncated);
    }

    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + payload_len];
    let footer = &bytes[HEADER_SIZE + payload_len..];
    let stored_body_crc = u64::from_le_bytes(footer[0..8].try_into().unwrap());
    let stored_file_crc = u64::from_le_bytes(footer[8..16].try_into().unwrap());

    let mut body_digest = Digest::new();
    body_digest.update(payload);
    let body_crc = body_digest.finalize();
    if body_crc != stored_body_crc {
        return Err(GraphError::ChecksumMismatch {
            stored: stored_body_crc,
            computed: body_crc,
        });
    }

    let mut file_digest = Digest::new();
    file_digest.update(&bytes[..HEADER_SIZE + payload_len]);
    let file_crc = file_digest.finalize();
    if file_crc != stored_file_crc {
        return Err(GraphError::ChecksumMismatch {
            stored: stored_file_crc,
            computed: file_crc,
        });
    }

    Ok(bincode::deserialize(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::routing::WayProperties;
    use tempfile::TempDir;

    fn sample() -> Routing {
        let mut r = Routing::default();
        r.way_vertices.push_bucket(&[0, 1]);
        r.way_dists.push_bucket(&[17]);
        r.way_component.push(0);
        r.way_properties.push(WayProperties::default());
        r.vertex_ways.push_bucket(&[0]);
        r.vertex_ways.push_bucket(&[0]);
        r.vertex_in_way_pos.push_bucket(&[0]);
        r.vertex_in_way_pos.push_bucket(&[2]);
        r.vertex_is_restricted.resize(2);
        r.vertex_restrictions.resize(2);
        r
    }

    #[test]
    fn test_blob_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("routing.bin");
        let routing = sample();
        write(&path, &routing).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back, routing);
    }

    #[test]
    fn test_blob_detects_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("routing.bin");
        write(&path, &sample()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            read(&path),
            Err(GraphError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_blob_rejects_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("routing.bin");
        write(&path, &sample()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = 0;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(read(&path), Err(GraphError::BadMagic { .. })));
    }
}
