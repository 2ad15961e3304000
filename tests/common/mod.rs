//! Builds small ZIP archives for tests.

#![allow(dead_code)]

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;

pub enum Member<'a> {
    Stored(&'a str, &'a [u8]),
    Deflated(&'a str, &'a [u8]),
    Dir(&'a str),
    /// Deflated, but the central directory claims the given compressed size
    /// through a ZIP64 extra field.
    Oversized(&'a str, &'a [u8], u64),
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A ZIP archive containing `members` in order, with an optional comment.
///
/// CRCs are left at zero; the reader never checks them.
pub fn zip(members: &[Member<'_>], comment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();
    let mut count = 0u16;

    for member in members {
        let (name, method, data, size) = match member {
            Member::Stored(name, data) => (*name, 0u16, data.to_vec(), data.len()),
            Member::Deflated(name, data) | Member::Oversized(name, data, _) => {
                (*name, 8u16, deflate(data), data.len())
            }
            Member::Dir(name) => (*name, 0u16, Vec::new(), 0),
        };
        let declared = match member {
            Member::Oversized(_, _, declared) => Some(*declared),
            _ => None,
        };
        let offset = out.len() as u32;

        // Local file header
        out.extend_from_slice(b"PK\x03\x04");
        out.write_u16::<LittleEndian>(20).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(method).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // time, date
        out.write_u32::<LittleEndian>(0).unwrap(); // crc
        out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(size as u32).unwrap();
        out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&data);

        // Central directory file header
        central.extend_from_slice(b"PK\x01\x02");
        central.write_u16::<LittleEndian>(20).unwrap();
        central.write_u16::<LittleEndian>(20).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(method).unwrap();
        central.write_u32::<LittleEndian>(0).unwrap(); // time, date
        central.write_u32::<LittleEndian>(0).unwrap(); // crc
        match declared {
            Some(_) => central.write_u32::<LittleEndian>(u32::MAX).unwrap(),
            None => central.write_u32::<LittleEndian>(data.len() as u32).unwrap(),
        }
        central.write_u32::<LittleEndian>(size as u32).unwrap();
        central.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        let extra_len = if declared.is_some() { 12 } else { 0 };
        central.write_u16::<LittleEndian>(extra_len).unwrap(); // extra
        central.write_u16::<LittleEndian>(0).unwrap(); // comment
        central.write_u16::<LittleEndian>(0).unwrap(); // disk
        central.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
        central.write_u32::<LittleEndian>(0).unwrap(); // external attrs
        central.write_u32::<LittleEndian>(offset).unwrap();
        central.extend_from_slice(name.as_bytes());
        if let Some(declared) = declared {
            central.write_u16::<LittleEndian>(0x0001).unwrap(); // ZIP64 extra
            central.write_u16::<LittleEndian>(8).unwrap();
            central.write_u64::<LittleEndian>(declared).unwrap();
        }

        count += 1;
    }

    let cd_offset = out.len() as u32;
    out.extend_from_slice(&central);

    // End of central directory
    out.extend_from_slice(b"PK\x05\x06");
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(count).unwrap();
    out.write_u16::<LittleEndian>(count).unwrap();
    out.write_u32::<LittleEndian>(central.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
    out.extend_from_slice(comment);

    out
}

/// Offset of the first central directory record of an archive without a
/// comment.
pub fn central_directory_offset(bytes: &[u8]) -> usize {
    let eocd = bytes.len() - 22;
    u32::from_le_bytes(bytes[eocd + 16..eocd + 20].try_into().unwrap()) as usize
}

/// Bytes that don't compress, from a fixed linear congruential sequence.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}
