use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use anyhow::{Result, bail};

/// Central Directory File Header signature; records are 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header signature; headers are 30 bytes plus name and extra field
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Header fields saturated to this value defer to the ZIP64 extra field.
const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;
const ZIP64_MARKER_16: u16 = 0xFFFF;
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// Split off a record of `size` bytes starting with `signature`.
fn record<'a>(data: &'a [u8], signature: &[u8], size: usize, what: &str) -> Result<Cursor<&'a [u8]>> {
    if data.len() < size || &data[..signature.len()] != signature {
        bail!("invalid {what}");
    }
    Ok(Cursor::new(&data[signature.len()..size]))
}

/// Where the central directory is, as told by the end records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryLocation {
    pub offset: u64,
    pub size: u64,
    pub entries: u64,
}

/// End of Central Directory (EOCD), 22 bytes plus comment
#[derive(Debug, Clone, Copy)]
pub struct EndOfCentralDirectory {
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
    zip64: bool,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = record(data, Self::SIGNATURE, Self::SIZE, "end of central directory")?;
        let _disk_number = cursor.read_u16::<LittleEndian>()?;
        let _disk_with_cd = cursor.read_u16::<LittleEndian>()?;
        let disk_entries = cursor.read_u16::<LittleEndian>()?;
        let total_entries = cursor.read_u16::<LittleEndian>()?;
        let cd_size = cursor.read_u32::<LittleEndian>()?;
        let cd_offset = cursor.read_u32::<LittleEndian>()?;
        let comment_len = cursor.read_u16::<LittleEndian>()?;

        let zip64 = disk_entries == ZIP64_MARKER_16
            || total_entries == ZIP64_MARKER_16
            || cd_size == ZIP64_MARKER_32
            || cd_offset == ZIP64_MARKER_32;

        Ok(Self {
            total_entries,
            cd_size,
            cd_offset,
            comment_len,
            zip64,
        })
    }

    /// Whether the real values live in the ZIP64 end record.
    pub fn is_zip64(&self) -> bool {
        self.zip64
    }

    pub fn location(&self) -> CentralDirectoryLocation {
        CentralDirectoryLocation {
            offset: self.cd_offset as u64,
            size: self.cd_size as u64,
            entries: self.total_entries as u64,
        }
    }
}

/// ZIP64 End of Central Directory Locator, 20 bytes, right before the EOCD
pub struct Zip64EOCDLocator;

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    /// Offset of the ZIP64 EOCD record.
    pub fn eocd64_offset(data: &[u8]) -> Result<u64> {
        let mut cursor = record(data, Self::SIGNATURE, Self::SIZE, "ZIP64 locator")?;
        let _disk_with_eocd64 = cursor.read_u32::<LittleEndian>()?;
        Ok(cursor.read_u64::<LittleEndian>()?)
    }
}

/// ZIP64 End of Central Directory, 56 bytes minimum
pub struct Zip64EOCD;

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn location(data: &[u8]) -> Result<CentralDirectoryLocation> {
        let mut cursor = record(data, Self::SIGNATURE, Self::MIN_SIZE, "ZIP64 end record")?;
        // record size (8), versions (2 + 2), disk numbers (4 + 4), disk entries (8)
        cursor.set_position(28);
        let entries = cursor.read_u64::<LittleEndian>()?;
        let size = cursor.read_u64::<LittleEndian>()?;
        let offset = cursor.read_u64::<LittleEndian>()?;
        Ok(CentralDirectoryLocation {
            offset,
            size,
            entries,
        })
    }
}

/// Parsed central directory record of one archive member
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    /// Path inside the archive, always '/'-separated
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Parse the Central Directory File Header at the cursor and advance past
    /// it, including its extra field and comment.
    pub fn read_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            bail!("invalid central directory file header");
        }

        // versions (2 + 2), flags (2)
        cursor.set_position(cursor.position() + 6);
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        // time, date (2 + 2), crc32 (4)
        cursor.set_position(cursor.position() + 8);
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let name_len = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_len = cursor.read_u16::<LittleEndian>()? as u64;
        let comment_len = cursor.read_u16::<LittleEndian>()? as u64;
        // disk start (2), internal attrs (2), external attrs (4)
        cursor.set_position(cursor.position() + 8);
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut name = vec![0u8; name_len as usize];
        cursor.read_exact(&mut name)?;
        // Non-UTF-8 names are shown lossily; some writers use '\' separators
        let file_name = String::from_utf8_lossy(&name).replace('\\', "/");
        let is_directory = file_name.ends_with('/');

        let extra_end = cursor.position() + extra_len;
        while cursor.position() + 4 <= extra_end {
            let id = cursor.read_u16::<LittleEndian>()?;
            let size = cursor.read_u16::<LittleEndian>()? as u64;
            let field_end = (cursor.position() + size).min(extra_end);

            if id == ZIP64_EXTRA_ID {
                // Values appear, in this order, only for saturated header fields
                for field in [&mut uncompressed_size, &mut compressed_size, &mut lfh_offset] {
                    if *field == ZIP64_MARKER_32 as u64 && cursor.position() + 8 <= field_end {
                        *field = cursor.read_u64::<LittleEndian>()?;
                    }
                }
            }
            cursor.set_position(field_end);
        }
        cursor.set_position(extra_end + comment_len);

        Ok(Self {
            file_name,
            compression_method: compression_method.into(),
            compressed_size,
            uncompressed_size,
            lfh_offset,
            is_directory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eocd_flags_zip64_markers() {
        let mut data = Vec::from(EndOfCentralDirectory::SIGNATURE);
        data.extend_from_slice(&[0, 0, 0, 0, 3, 0, 3, 0]);
        data.extend_from_slice(&0x40u32.to_le_bytes());
        data.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        data.extend_from_slice(&[0, 0]);

        let eocd = EndOfCentralDirectory::from_bytes(&data).unwrap();
        assert!(eocd.is_zip64());
        assert_eq!(eocd.total_entries, 3);

        data[0] = b'X';
        assert!(EndOfCentralDirectory::from_bytes(&data).is_err());
        assert!(EndOfCentralDirectory::from_bytes(&data[..10]).is_err());
    }

    #[test]
    fn compression_methods() {
        assert_eq!(CompressionMethod::from(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from(12), CompressionMethod::Unknown(12));
    }
}
